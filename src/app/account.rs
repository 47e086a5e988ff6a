// src/app/account.rs
//! Sign-in, sign-up and profile windows. Requests run on background threads,
//! one at a time per kind; the submit buttons stay disabled while one is out.

use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread;

use eframe::egui as eg;
use tracing::{info, warn};

use super::api::{ApiClient, ApiError};
use super::prep::take_one;
use super::types::{AccountView, AuthMsg, UploadMsg};
use super::utils::{avatar_initial, is_plausible_email};

const SIGN_IN_SERVER_ERROR: &str = "Server error";
const SIGN_UP_SERVER_ERROR: &str = "Server error. Please try again.";
const UPLOAD_FAILED: &str = "Upload failed";

#[derive(Default)]
pub(crate) struct AccountForms {
    pub(crate) view: Option<AccountView>,
    email: String,
    username: String,
    password: String,
    upload_path: String,
    error: Option<String>,
    notice: Option<String>,
}

impl AccountForms {
    pub(crate) fn open(&mut self, view: AccountView) {
        self.view = Some(view);
        self.error = None;
        self.notice = None;
    }

    fn close(&mut self) {
        self.view = None;
        self.password.clear();
        self.error = None;
        self.notice = None;
    }
}

pub(crate) fn validate_sign_in(email: &str, password: &str) -> Result<(), &'static str> {
    if email.trim().is_empty() || password.is_empty() {
        return Err("Email and password are required");
    }
    Ok(())
}

pub(crate) fn validate_sign_up(
    email: &str,
    username: &str,
    password: &str,
) -> Result<(), &'static str> {
    if email.trim().is_empty() || username.trim().is_empty() || password.is_empty() {
        return Err("All fields are required");
    }
    if !is_plausible_email(email) {
        return Err("Enter a valid email address");
    }
    Ok(())
}

/// The server's own words when it said no; a generic line for anything else.
pub(crate) fn failure_message(err: &ApiError, fallback: &str) -> String {
    match err {
        ApiError::Rejected(msg) => msg.clone(),
        other => {
            warn!("account request failed: {other}");
            fallback.to_string()
        }
    }
}

fn spawn_sign_in(api: ApiClient, email: String, password: String, tx: Sender<AuthMsg>) {
    thread::spawn(move || {
        let msg = match api.sign_in(&email, &password) {
            Ok(user) => AuthMsg::SignedIn(user),
            Err(e) => AuthMsg::Failed(failure_message(&e, SIGN_IN_SERVER_ERROR)),
        };
        let _ = tx.send(msg);
    });
}

fn spawn_sign_up(
    api: ApiClient,
    email: String,
    username: String,
    password: String,
    tx: Sender<AuthMsg>,
) {
    thread::spawn(move || {
        let msg = match api.sign_up(&email, &username, &password) {
            Ok(()) => AuthMsg::SignedUp,
            Err(e) => AuthMsg::Failed(failure_message(&e, SIGN_UP_SERVER_ERROR)),
        };
        let _ = tx.send(msg);
    });
}

fn spawn_upload(api: ApiClient, user_id: String, file: PathBuf, tx: Sender<UploadMsg>) {
    thread::spawn(move || {
        let msg = match api.upload_profile_image(&user_id, &file) {
            Ok(path) => UploadMsg::Uploaded(path),
            Err(ApiError::Io(e)) => UploadMsg::Failed(format!("Cannot read {}: {e}", file.display())),
            Err(e) => UploadMsg::Failed(failure_message(&e, UPLOAD_FAILED)),
        };
        let _ = tx.send(msg);
    });
}

impl crate::app::CatalogApp {
    pub(crate) fn poll_account(&mut self, ctx: &eg::Context) {
        let mut seen_any = false;

        if let Some(msg) = take_one(&mut self.auth_rx) {
            seen_any = true;
            match msg {
                AuthMsg::SignedIn(user) => {
                    info!(user_id = %user.user_id, "signed in");
                    let name = user.username.clone();
                    if let Err(e) = self.session.set_identity(user) {
                        warn!("failed to persist identity: {e}");
                    }
                    self.account.close();
                    self.set_status(format!("Signed in as {name}."));
                    self.start_watchlist_sync();
                    self.view_dirty = true;
                }
                AuthMsg::SignedUp => {
                    info!("account created");
                    self.account.open(AccountView::SignIn);
                    self.account.password.clear();
                    self.account.notice = Some("Account created. Sign in to continue.".into());
                }
                AuthMsg::Failed(msg) => self.account.error = Some(msg),
            }
        }

        if let Some(msg) = take_one(&mut self.upload_rx) {
            seen_any = true;
            match msg {
                UploadMsg::Uploaded(path) => {
                    if let Err(e) = self.session.set_profile_image(&path) {
                        warn!("failed to persist profile image: {e}");
                    }
                    self.account.error = None;
                    self.account.notice = Some("Profile photo updated.".into());
                }
                UploadMsg::Failed(msg) => self.account.error = Some(msg),
            }
        }

        if seen_any {
            ctx.request_repaint();
        }
    }

    pub(crate) fn account_pending(&self) -> bool {
        self.auth_rx.is_some() || self.upload_rx.is_some()
    }

    pub(crate) fn sign_out(&mut self, ctx: &eg::Context) {
        if let Err(e) = self.session.sign_out() {
            warn!("sign-out could not clear the store: {e}");
        }
        self.watchlist_rx = None;
        self.auth_rx = None;
        self.upload_rx = None;
        self.account.close();
        super::gfx::apply_color_scheme(ctx, self.session.color_scheme());
        self.view_dirty = true;
        self.set_status("Signed out.");
    }

    pub(crate) fn toggle_color_scheme(&mut self, ctx: &eg::Context) {
        let next = self.session.color_scheme().toggled();
        if let Err(e) = self.session.set_color_scheme(next) {
            warn!("failed to persist color scheme: {e}");
        }
        super::gfx::apply_color_scheme(ctx, next);
    }

    pub(crate) fn ui_render_account_window(&mut self, ctx: &eg::Context) {
        let Some(view) = self.account.view else {
            return;
        };
        let title = match view {
            AccountView::SignIn => "Sign In",
            AccountView::SignUp => "Sign Up",
            AccountView::Profile => "Account",
        };

        let mut open = true;
        eg::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .default_width(320.0)
            .open(&mut open)
            .show(ctx, |ui| {
                match view {
                    AccountView::SignIn => self.ui_sign_in(ui),
                    AccountView::SignUp => self.ui_sign_up(ui),
                    AccountView::Profile => self.ui_profile(ui, ctx),
                }

                if let Some(err) = &self.account.error {
                    ui.add_space(6.0);
                    ui.colored_label(ui.visuals().error_fg_color, err);
                }
                if let Some(note) = &self.account.notice {
                    ui.add_space(6.0);
                    ui.colored_label(eg::Color32::from_rgb(80, 170, 90), note);
                }
            });

        // apply after .show to keep the borrow of `open` short
        if !open {
            self.account.close();
        }
    }

    fn ui_sign_in(&mut self, ui: &mut eg::Ui) {
        ui.label("Email");
        ui.text_edit_singleline(&mut self.account.email);
        ui.label("Password");
        ui.add(eg::TextEdit::singleline(&mut self.account.password).password(true));
        ui.add_space(8.0);

        let pending = self.auth_rx.is_some();
        let submit = ui
            .add_enabled(!pending, eg::Button::new("Sign In").min_size(eg::vec2(ui.available_width(), 0.0)))
            .clicked();
        if pending {
            ui.add(eg::Spinner::new());
        }

        ui.horizontal(|ui| {
            ui.label("Don't have an account?");
            if ui.link("Sign Up").clicked() {
                self.account.open(AccountView::SignUp);
            }
        });

        if submit {
            self.account.notice = None;
            match validate_sign_in(&self.account.email, &self.account.password) {
                Err(msg) => self.account.error = Some(msg.into()),
                Ok(()) => {
                    self.account.error = None;
                    let (tx, rx) = mpsc::channel();
                    self.auth_rx = Some(rx);
                    spawn_sign_in(
                        self.api.clone(),
                        self.account.email.trim().to_string(),
                        self.account.password.clone(),
                        tx,
                    );
                }
            }
        }
    }

    fn ui_sign_up(&mut self, ui: &mut eg::Ui) {
        ui.label("Username");
        ui.text_edit_singleline(&mut self.account.username);
        ui.label("Email");
        ui.text_edit_singleline(&mut self.account.email);
        ui.label("Password");
        ui.add(eg::TextEdit::singleline(&mut self.account.password).password(true));
        ui.add_space(8.0);

        let pending = self.auth_rx.is_some();
        let submit = ui
            .add_enabled(!pending, eg::Button::new("Sign Up").min_size(eg::vec2(ui.available_width(), 0.0)))
            .clicked();
        if pending {
            ui.add(eg::Spinner::new());
        }

        ui.horizontal(|ui| {
            ui.label("Already have an account?");
            if ui.link("Sign In").clicked() {
                self.account.open(AccountView::SignIn);
            }
        });

        if submit {
            let a = &self.account;
            match validate_sign_up(&a.email, &a.username, &a.password) {
                Err(msg) => self.account.error = Some(msg.into()),
                Ok(()) => {
                    self.account.error = None;
                    let (tx, rx) = mpsc::channel();
                    self.auth_rx = Some(rx);
                    spawn_sign_up(
                        self.api.clone(),
                        self.account.email.trim().to_string(),
                        self.account.username.trim().to_string(),
                        self.account.password.clone(),
                        tx,
                    );
                }
            }
        }
    }

    fn ui_profile(&mut self, ui: &mut eg::Ui, ctx: &eg::Context) {
        let Some(user) = self.session.user().cloned() else {
            ui.label("Not signed in.");
            if ui.button("Sign In").clicked() {
                self.account.open(AccountView::SignIn);
            }
            return;
        };

        ui.horizontal(|ui| {
            let (rect, _) = ui.allocate_exact_size(eg::vec2(48.0, 48.0), eg::Sense::hover());
            ui.painter()
                .circle_filled(rect.center(), 24.0, eg::Color32::from_rgb(70, 120, 200));
            ui.painter().text(
                rect.center(),
                eg::Align2::CENTER_CENTER,
                avatar_initial(&user.username),
                eg::FontId::proportional(22.0),
                eg::Color32::WHITE,
            );
            ui.vertical(|ui| {
                ui.strong(&user.username);
                ui.label(eg::RichText::new(&user.email).weak());
            });
        });

        ui.add_space(6.0);
        match &user.profile_image {
            Some(p) => ui.label(format!("Photo: {}", self.api.asset_url(p))),
            None => ui.label(eg::RichText::new("No profile photo").weak()),
        };

        ui.separator();
        ui.label("Upload a new photo (file path):");
        ui.text_edit_singleline(&mut self.account.upload_path);
        let pending = self.upload_rx.is_some();
        let can_upload = !pending && !self.account.upload_path.trim().is_empty();
        ui.horizontal(|ui| {
            if ui.add_enabled(can_upload, eg::Button::new("Upload")).clicked() {
                self.account.error = None;
                self.account.notice = None;
                let (tx, rx) = mpsc::channel();
                self.upload_rx = Some(rx);
                spawn_upload(
                    self.api.clone(),
                    user.user_id.clone(),
                    PathBuf::from(self.account.upload_path.trim()),
                    tx,
                );
            }
            if pending {
                ui.add(eg::Spinner::new());
            }
        });

        ui.separator();
        if ui.button("Sign out").clicked() {
            self.sign_out(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_needs_both_fields() {
        assert!(validate_sign_in("a@b.co", "pw").is_ok());
        assert_eq!(
            validate_sign_in("  ", "pw"),
            Err("Email and password are required")
        );
        assert!(validate_sign_in("a@b.co", "").is_err());
    }

    #[test]
    fn sign_up_checks_fields_and_email_shape() {
        assert!(validate_sign_up("a@b.co", "ripley", "pw").is_ok());
        assert_eq!(
            validate_sign_up("a@b.co", "", "pw"),
            Err("All fields are required")
        );
        assert_eq!(
            validate_sign_up("not-an-email", "ripley", "pw"),
            Err("Enter a valid email address")
        );
    }

    #[test]
    fn rejection_text_is_passed_through() {
        let err = ApiError::Rejected("Email already registered".into());
        assert_eq!(
            failure_message(&err, SIGN_UP_SERVER_ERROR),
            "Email already registered"
        );
    }

    #[test]
    fn transport_style_failures_get_generic_text() {
        let status = ApiError::Status {
            status: 502,
            body: "Bad Gateway".into(),
        };
        assert_eq!(failure_message(&status, SIGN_IN_SERVER_ERROR), "Server error");

        let malformed = ApiError::Malformed("auth: expected value".into());
        assert_eq!(
            failure_message(&malformed, SIGN_UP_SERVER_ERROR),
            "Server error. Please try again."
        );
    }

    #[test]
    fn sign_out_discards_in_flight_account_requests() {
        let api = ApiClient::with_client(reqwest::blocking::Client::new(), "http://127.0.0.1:9");
        let mut app = crate::app::CatalogApp::new(
            crate::config::AppConfig::default(),
            api,
            crate::app::session::Session::load(Box::<crate::app::session::MemoryStore>::default()),
        );
        let (auth_tx, auth_rx) = mpsc::channel();
        let (upload_tx, upload_rx) = mpsc::channel();
        app.auth_rx = Some(auth_rx);
        app.upload_rx = Some(upload_rx);

        app.sign_out(&eg::Context::default());
        assert!(app.auth_rx.is_none());
        assert!(app.upload_rx.is_none());
        assert!(upload_tx.send(UploadMsg::Uploaded("uploads/7.png".into())).is_err());
        assert!(auth_tx.send(AuthMsg::Failed("late".into())).is_err());
        assert!(app.session.user().is_none());
    }

    #[test]
    fn closing_forgets_password() {
        let mut f = AccountForms::default();
        f.open(AccountView::SignIn);
        f.password = "hunter2".into();
        f.close();
        assert!(f.view.is_none());
        assert!(f.password.is_empty());
    }
}
