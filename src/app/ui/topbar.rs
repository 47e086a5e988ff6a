// src/app/ui/topbar.rs
use std::time::Instant;

use eframe::egui as eg;
use tracing::{info, warn};

use crate::app::prefs::{backup_ui_prefs, restore_latest_ui_prefs_backup, POSTER_W_RANGE};
use crate::app::types::{AccountView, ColorScheme, FormatType, SortBy};
use crate::app::utils::avatar_initial;

impl crate::app::CatalogApp {
    // ---------- TOP BAR ----------
    pub(crate) fn ui_render_topbar(&mut self, ui: &mut eg::Ui, ctx: &eg::Context) {
        ui.horizontal(|ui| {
            ui.heading("Commitment Issues");
            ui.separator();

            // Search (debounced before it reaches the selections)
            let resp = ui.add(
                eg::TextEdit::singleline(&mut self.search_input)
                    .hint_text("Search titles…")
                    .desired_width(180.0),
            );
            if resp.changed() {
                self.search_debounce
                    .push(self.search_input.clone(), Instant::now());
            }

            ui.separator();

            // Genre picker popup trigger
            let n = self.selections.selected_genres().len();
            let label = if n == 0 {
                "Genres…".to_string()
            } else {
                format!("Genres ({n})…")
            };
            if ui.button(label).clicked() {
                self.show_genre_popup = true;
            }

            // Format
            let mut format = self.selections.format();
            eg::ComboBox::from_id_source("format_combo")
                .selected_text(format!("Format: {}", format.label()))
                .show_ui(ui, |ui| {
                    for f in FormatType::ALL {
                        ui.selectable_value(&mut format, f, f.label());
                    }
                });
            if self.selections.set_format(format) {
                self.view_dirty = true;
            }

            // Sort
            let mut sort_by = self.selections.sort_by();
            eg::ComboBox::from_id_source("sort_by_combo")
                .selected_text(format!("Sort: {}", sort_by.label()))
                .show_ui(ui, |ui| {
                    for s in SortBy::ALL {
                        ui.selectable_value(&mut sort_by, s, s.label());
                    }
                });
            if self.selections.set_sort_by(sort_by) {
                self.view_dirty = true;
            }

            ui.separator();

            // Poster size
            ui.label("Poster:");
            if ui
                .add(eg::Slider::new(&mut self.prefs.poster_w, POSTER_W_RANGE).suffix(" px"))
                .changed()
            {
                self.mark_dirty();
            }

            ui.with_layout(eg::Layout::right_to_left(eg::Align::Center), |ui| {
                self.ui_render_account_menu(ui, ctx);

                let scheme_icon = match self.session.color_scheme() {
                    ColorScheme::Light => "🌙",
                    ColorScheme::Dark => "☀",
                };
                if ui
                    .button(scheme_icon)
                    .on_hover_text("Toggle light/dark")
                    .clicked()
                {
                    self.toggle_color_scheme(ctx);
                }
            });
        });
    }

    fn ui_render_account_menu(&mut self, ui: &mut eg::Ui, ctx: &eg::Context) {
        let label = self
            .session
            .user()
            .map(|u| avatar_initial(&u.username))
            .unwrap_or_else(|| "Account".into());

        ui.menu_button(label, |ui| {
            match self.session.user().map(|u| u.username.clone()) {
                Some(name) => {
                    ui.label(eg::RichText::new(name).strong());
                    ui.separator();
                    if ui.button("Profile…").clicked() {
                        self.account.open(AccountView::Profile);
                        ui.close_menu();
                    }
                    if ui.button("Sign out").clicked() {
                        self.sign_out(ctx);
                        ui.close_menu();
                    }
                }
                None => {
                    if ui.button("Sign in…").clicked() {
                        self.account.open(AccountView::SignIn);
                        ui.close_menu();
                    }
                    if ui.button("Sign up…").clicked() {
                        self.account.open(AccountView::SignUp);
                        ui.close_menu();
                    }
                }
            }

            ui.separator();
            if ui.button("Backup UI prefs").clicked() {
                self.save_prefs();
                match backup_ui_prefs() {
                    Ok(p) => self.set_status(format!("Prefs backed up to {}", p.display())),
                    Err(e) => self.set_status(format!("Backup failed: {e}")),
                }
                ui.close_menu();
            }
            if ui.button("Restore UI prefs").clicked() {
                match restore_latest_ui_prefs_backup() {
                    Ok(Some(p)) => {
                        self.load_prefs();
                        self.set_status(format!("Restored prefs from {}", p.display()));
                    }
                    Ok(None) => self.set_status("No prefs backup found."),
                    Err(e) => self.set_status(format!("Restore failed: {e}")),
                }
                ui.close_menu();
            }
            if ui.button("Clean poster cache").clicked() {
                match crate::app::cache::refresh_poster_cache_light() {
                    Ok(n) => {
                        info!("poster cache cleanup removed {n} files");
                        self.set_status(format!("Removed {n} stale poster files."));
                    }
                    Err(e) => {
                        warn!("poster cache cleanup failed: {e}");
                        self.set_status(format!("Cache cleanup failed: {e}"));
                    }
                }
                ui.close_menu();
            }
        });
    }
}
