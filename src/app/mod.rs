// src/app/mod.rs: app state, frame loop, view refresh

use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use eframe::egui as eg;
use tracing::{debug, warn};

pub mod account;
pub mod api;
pub mod cache;
pub mod data;
pub mod detail;
pub mod filters;
pub mod gfx;
pub mod prefetch;
pub mod prefs;
pub mod prep;
pub mod session;
pub mod types;
pub mod ui;
pub mod utils;

use crate::config::AppConfig;
use account::AccountForms;
use api::{ApiClient, GenreOption};
use data::Movie;
use filters::{derive_view, DisplayList, Selections};
use prefs::UiPrefs;
use session::Session;
use types::{
    AuthMsg, CatalogMsg, GenresMsg, HealthMsg, LoadPhase, PosterDone, PosterSlot, UploadMsg,
    WatchlistMsg,
};
use utils::Debouncer;

// ---- Tunables ----
const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);
const STATUS_EMIT_EVERY_MS: u64 = 120;
const PENDING_REPAINT: Duration = Duration::from_millis(100);
pub(crate) const MAX_UPLOADS_PER_FRAME: usize = 4;
pub(crate) const PREWARM_UPLOADS: usize = 24;

pub struct CatalogApp {
    cfg: AppConfig,
    api: ApiClient,
    session: Session,

    // data
    catalog: Vec<Movie>,
    posters: Vec<PosterSlot>,
    load_phase: LoadPhase,
    load_error: Option<String>,
    genre_options: Vec<GenreOption>,
    genres_fallback: bool,

    // selection + derived view
    selections: Selections,
    view: DisplayList,
    view_dirty: bool,
    selected_idx: Option<usize>,
    search_input: String,
    search_debounce: Debouncer,
    show_genre_popup: bool,

    // status line
    status: String,
    status_last_emit: Instant,
    health_line: String,

    // one-shot loaders
    catalog_rx: Option<Receiver<CatalogMsg>>,
    genres_rx: Option<Receiver<GenresMsg>>,
    watchlist_rx: Option<Receiver<WatchlistMsg>>,
    watchlist_sync_rev: u64,
    health_rx: Option<Receiver<HealthMsg>>,

    // account
    account: AccountForms,
    auth_rx: Option<Receiver<AuthMsg>>,
    upload_rx: Option<Receiver<UploadMsg>>,

    // prefetch plumbing
    prefetch_started: bool,
    posters_total: usize,
    posters_done: usize,
    posters_failed: usize,
    done_rx: Option<Receiver<PosterDone>>,

    // prefs
    prefs: UiPrefs,
    prefs_dirty: bool,
    prefs_last_write: Instant,

    // one-time init guard
    did_init: bool,
}

impl CatalogApp {
    pub fn new(cfg: AppConfig, api: ApiClient, session: Session) -> Self {
        Self {
            cfg,
            api,
            session,

            catalog: Vec::new(),
            posters: Vec::new(),
            load_phase: LoadPhase::Fetching,
            load_error: None,
            genre_options: Vec::new(),
            genres_fallback: false,

            selections: Selections::default(),
            view: DisplayList::default(),
            view_dirty: true,
            selected_idx: None,
            search_input: String::new(),
            search_debounce: Debouncer::new(SEARCH_DEBOUNCE),
            show_genre_popup: false,

            status: String::new(),
            status_last_emit: Instant::now(),
            health_line: "API …".into(),

            catalog_rx: None,
            genres_rx: None,
            watchlist_rx: None,
            watchlist_sync_rev: 0,
            health_rx: None,

            account: AccountForms::default(),
            auth_rx: None,
            upload_rx: None,

            prefetch_started: false,
            posters_total: 0,
            posters_done: 0,
            posters_failed: 0,
            done_rx: None,

            prefs: UiPrefs::default(),
            prefs_dirty: false,
            prefs_last_write: Instant::now(),

            did_init: false,
        }
    }

    fn set_status<S: Into<String>>(&mut self, s: S) {
        let s = s.into();
        let due = self.status_last_emit.elapsed() >= Duration::from_millis(STATUS_EMIT_EVERY_MS);
        if self.status != s || due {
            debug!("status: {s}");
            self.status = s;
            self.status_last_emit = Instant::now();
        }
    }

    /// Re-run the pipeline against the current catalog and selections.
    pub(crate) fn refresh_view(&mut self) {
        self.view = derive_view(&self.catalog, &self.selections, self.session.marks());
        self.view_dirty = false;
    }

    pub(crate) fn toggle_favorite(&mut self, idx: usize) {
        let Some(id) = self.catalog.get(idx).map(|m| m.id.clone()) else {
            return;
        };
        if let Err(e) = self.session.toggle_favorite(&id) {
            warn!("favorite for {id} not persisted: {e}");
            self.set_status("Could not save favorites.");
        }
        self.view_dirty = true;
    }

    pub(crate) fn toggle_watchlist(&mut self, idx: usize) {
        let Some(id) = self.catalog.get(idx).map(|m| m.id.clone()) else {
            return;
        };
        if let Err(e) = self.session.toggle_watchlist(&id) {
            warn!("watchlist entry for {id} not persisted: {e}");
            self.set_status("Could not save watchlist.");
        }
        self.view_dirty = true;
    }

    fn first_frame(&mut self, ctx: &eg::Context) {
        self.did_init = true;
        gfx::apply_color_scheme(ctx, self.session.color_scheme());
        self.load_prefs();

        self.start_catalog_fetch();
        self.start_genre_fetch();
        self.start_watchlist_sync();
        self.start_health_probe();
    }

    fn apply_debounced_search(&mut self) {
        if let Some(q) = self.search_debounce.poll(Instant::now()) {
            if self.selections.set_search_query(q) {
                self.view_dirty = true;
            }
        }
    }
}

// ========== App impl ==========
impl eframe::App for CatalogApp {
    fn update(&mut self, ctx: &eg::Context, _frame: &mut eframe::Frame) {
        if !self.did_init {
            self.first_frame(ctx);
        }

        self.poll_loaders(ctx);
        self.poll_account(ctx);
        self.poll_prefetch_done(ctx);
        self.apply_debounced_search();
        if self.view_dirty {
            self.refresh_view();
        }

        eg::TopBottomPanel::top("topbar").show(ctx, |ui| {
            ui.add_space(4.0);
            self.ui_render_topbar(ui, ctx);
            ui.add_space(4.0);
        });

        eg::TopBottomPanel::bottom("statusbar").show(ctx, |ui| {
            self.ui_render_statusbar(ui);
        });

        if self.selected_idx.is_some() {
            self.ui_render_detail_panel(ctx);
        }

        eg::CentralPanel::default().show(ctx, |ui| match self.load_phase {
            LoadPhase::Fetching => self.ui_render_splash(ui),
            LoadPhase::Failed => self.ui_render_error(ui),
            LoadPhase::Ready if self.view.is_empty() => self.ui_render_empty(ui),
            LoadPhase::Ready => self.ui_render_grid(ui, ctx),
        });

        self.ui_render_genre_popup(ctx);
        self.ui_render_account_window(ctx);

        // selections changed this frame; derive before the next paint
        if self.view_dirty {
            ctx.request_repaint();
        }
        self.maybe_save_prefs();

        if self.loaders_pending()
            || self.account_pending()
            || self.done_rx.is_some()
            || self.search_debounce.is_pending()
            || self.prefs_dirty
        {
            ctx.request_repaint_after(PENDING_REPAINT);
        }
    }
}
