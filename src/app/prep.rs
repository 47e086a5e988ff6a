// src/app/prep.rs
//! One-shot background loaders: catalog, genres, watchlist sync, health.
//! Each runs on its own thread and reports once over a channel that the UI
//! polls every frame.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use eframe::egui as eg;
use tracing::{error, info, warn};

use super::api::{fallback_genres, ApiClient, GenreOption};
use super::data::Movie;
use super::filters::collect_genres;
use super::types::{CatalogMsg, GenresMsg, HealthMsg, LoadPhase, PosterSlot, WatchlistMsg};

pub(crate) fn spawn_catalog_fetch(api: ApiClient, page_size: usize, tx: Sender<CatalogMsg>) {
    thread::spawn(move || {
        let msg = match api.fetch_catalog(page_size) {
            Ok(movies) => CatalogMsg::Done(movies),
            Err(e) => CatalogMsg::Error(e.to_string()),
        };
        let _ = tx.send(msg);
    });
}

pub(crate) fn spawn_genre_fetch(api: ApiClient, tx: Sender<GenresMsg>) {
    thread::spawn(move || {
        let msg = match api.fetch_genres() {
            Ok(list) if !list.is_empty() => GenresMsg::Loaded(list),
            Ok(_) => GenresMsg::Fallback(fallback_genres(), "empty genre list".into()),
            Err(e) => GenresMsg::Fallback(fallback_genres(), e.to_string()),
        };
        let _ = tx.send(msg);
    });
}

pub(crate) fn spawn_watchlist_sync(api: ApiClient, user_id: String, tx: Sender<WatchlistMsg>) {
    thread::spawn(move || {
        let msg = match api.fetch_watchlist(&user_id) {
            Ok(ids) => WatchlistMsg::Synced(ids),
            Err(e) => WatchlistMsg::Error(e.to_string()),
        };
        let _ = tx.send(msg);
    });
}

pub(crate) fn spawn_health_probe(api: ApiClient, tx: Sender<HealthMsg>) {
    thread::spawn(move || {
        let msg = match api.health() {
            Ok(status) => HealthMsg::Ok(status),
            Err(e) => HealthMsg::Unreachable(e.to_string()),
        };
        let _ = tx.send(msg);
    });
}

/// Fallback options augmented with whatever genres the catalog itself carries.
pub(crate) fn merge_catalog_genres(options: &mut Vec<GenreOption>, catalog: &[Movie]) {
    for name in collect_genres(catalog) {
        if !options.iter().any(|o| o.name == name) {
            options.push(GenreOption { name, count: None });
        }
    }
}

/// Take one message if ready; drops the receiver once it has delivered or died.
pub(crate) fn take_one<T>(slot: &mut Option<Receiver<T>>) -> Option<T> {
    let rx = slot.as_ref()?;
    match rx.try_recv() {
        Ok(msg) => {
            *slot = None;
            Some(msg)
        }
        Err(TryRecvError::Empty) => None,
        Err(TryRecvError::Disconnected) => {
            *slot = None;
            None
        }
    }
}

impl crate::app::CatalogApp {
    pub(crate) fn start_catalog_fetch(&mut self) {
        if self.catalog_rx.is_some() {
            return;
        }
        self.load_phase = LoadPhase::Fetching;
        self.load_error = None;
        self.set_status(format!("Fetching catalog from {}…", self.api.base_url()));

        let (tx, rx) = mpsc::channel();
        self.catalog_rx = Some(rx);
        spawn_catalog_fetch(self.api.clone(), self.cfg.page_size, tx);
    }

    pub(crate) fn start_genre_fetch(&mut self) {
        if self.genres_rx.is_some() {
            return;
        }
        let (tx, rx) = mpsc::channel();
        self.genres_rx = Some(rx);
        spawn_genre_fetch(self.api.clone(), tx);
    }

    pub(crate) fn start_watchlist_sync(&mut self) {
        if self.watchlist_rx.is_some() {
            return;
        }
        let Some(user_id) = self.session.user().map(|u| u.user_id.clone()) else {
            return;
        };
        let (tx, rx) = mpsc::channel();
        self.watchlist_rx = Some(rx);
        self.watchlist_sync_rev = self.session.watchlist_revision();
        spawn_watchlist_sync(self.api.clone(), user_id, tx);
    }

    pub(crate) fn start_health_probe(&mut self) {
        if self.health_rx.is_some() {
            return;
        }
        let (tx, rx) = mpsc::channel();
        self.health_rx = Some(rx);
        spawn_health_probe(self.api.clone(), tx);
    }

    pub(crate) fn poll_loaders(&mut self, ctx: &eg::Context) {
        let mut seen_any = false;

        let catalog_in_flight = self.catalog_rx.is_some();
        if let Some(msg) = take_one(&mut self.catalog_rx) {
            seen_any = true;
            match msg {
                CatalogMsg::Done(movies) => {
                    info!("catalog loaded: {} titles", movies.len());
                    self.posters = movies.iter().map(PosterSlot::for_movie).collect();
                    self.catalog = movies;
                    self.load_phase = LoadPhase::Ready;
                    if self.genres_fallback {
                        merge_catalog_genres(&mut self.genre_options, &self.catalog);
                    }
                    self.refresh_view();
                    self.set_status(format!("Loaded {} titles.", self.catalog.len()));
                    self.start_prefetch(ctx);
                }
                CatalogMsg::Error(e) => {
                    error!("catalog fetch failed: {e}");
                    self.catalog.clear();
                    self.posters.clear();
                    self.load_phase = LoadPhase::Failed;
                    self.load_error = Some(format!("Could not load movies: {e}"));
                    self.view_dirty = true;
                    self.set_status("Catalog unavailable.");
                }
            }
        } else if catalog_in_flight
            && self.catalog_rx.is_none()
            && self.load_phase == LoadPhase::Fetching
        {
            // loader thread died without reporting
            seen_any = true;
            error!("catalog loader exited without a result");
            self.load_phase = LoadPhase::Failed;
            self.load_error = Some("Could not load movies: the loader stopped unexpectedly.".into());
            self.view_dirty = true;
            self.set_status("Catalog unavailable.");
        }

        if let Some(msg) = take_one(&mut self.genres_rx) {
            seen_any = true;
            match msg {
                GenresMsg::Loaded(list) => {
                    self.genre_options = list;
                    self.genres_fallback = false;
                }
                GenresMsg::Fallback(list, reason) => {
                    warn!("genre endpoint unavailable ({reason}); using fallback list");
                    self.genre_options = list;
                    self.genres_fallback = true;
                    merge_catalog_genres(&mut self.genre_options, &self.catalog);
                }
            }
        }

        if let Some(msg) = take_one(&mut self.watchlist_rx) {
            seen_any = true;
            match msg {
                WatchlistMsg::Synced(ids) => {
                    let n = ids.len();
                    match self
                        .session
                        .apply_synced_watchlist(ids, self.watchlist_sync_rev)
                    {
                        Ok(true) => info!("watchlist synced: {n} titles"),
                        Ok(false) => {
                            info!("watchlist edited during sync; keeping local copy")
                        }
                        Err(e) => warn!("failed to persist synced watchlist: {e}"),
                    }
                    self.view_dirty = true;
                }
                WatchlistMsg::Error(e) => {
                    warn!("watchlist sync failed; keeping local copy: {e}");
                }
            }
        }

        if let Some(msg) = take_one(&mut self.health_rx) {
            seen_any = true;
            self.health_line = match msg {
                HealthMsg::Ok(status) => format!("API {status}"),
                HealthMsg::Unreachable(e) => {
                    warn!("health probe failed: {e}");
                    "API unreachable".into()
                }
            };
        }

        if seen_any {
            ctx.request_repaint();
        }
    }

    pub(crate) fn loaders_pending(&self) -> bool {
        self.catalog_rx.is_some()
            || self.genres_rx.is_some()
            || self.watchlist_rx.is_some()
            || self.health_rx.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: &str, genres: &[&str]) -> Movie {
        Movie {
            id: id.into(),
            title: id.into(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            ..Movie::default()
        }
    }

    #[test]
    fn catalog_genres_extend_fallback_without_duplicates() {
        let mut opts = fallback_genres();
        let before = opts.len();
        merge_catalog_genres(
            &mut opts,
            &[movie("a", &["Drama", "Western"]), movie("b", &["Noir", "Western"])],
        );
        let names: Vec<_> = opts.iter().skip(before).map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Noir", "Western"]);
    }

    #[test]
    fn take_one_drops_receiver_after_delivery() {
        let (tx, rx) = mpsc::channel::<u8>();
        let mut slot = Some(rx);
        assert_eq!(take_one(&mut slot), None);
        assert!(slot.is_some());

        tx.send(7).unwrap();
        assert_eq!(take_one(&mut slot), Some(7));
        assert!(slot.is_none());
    }

    fn offline_app() -> crate::app::CatalogApp {
        let api = ApiClient::with_client(reqwest::blocking::Client::new(), "http://127.0.0.1:9");
        crate::app::CatalogApp::new(
            crate::config::AppConfig::default(),
            api,
            crate::app::session::Session::load(Box::<crate::app::session::MemoryStore>::default()),
        )
    }

    #[test]
    fn dead_catalog_loader_ends_in_failed_phase() {
        let mut app = offline_app();
        let (tx, rx) = mpsc::channel::<CatalogMsg>();
        drop(tx);
        app.catalog_rx = Some(rx);

        app.poll_loaders(&eg::Context::default());
        assert_eq!(app.load_phase, LoadPhase::Failed);
        assert!(app.load_error.is_some());
        assert!(app.catalog_rx.is_none());
    }

    #[test]
    fn watchlist_sync_keeps_toggles_made_while_in_flight() {
        let mut app = offline_app();
        let (tx, rx) = mpsc::channel::<WatchlistMsg>();
        app.watchlist_rx = Some(rx);
        app.watchlist_sync_rev = app.session.watchlist_revision();
        app.session.toggle_watchlist("local").unwrap();

        tx.send(WatchlistMsg::Synced(vec!["remote".into()])).unwrap();
        app.poll_loaders(&eg::Context::default());
        assert!(app.session.marks().is_watchlisted("local"));
        assert!(!app.session.marks().is_watchlisted("remote"));
    }

    #[test]
    fn take_one_clears_dead_channel() {
        let (tx, rx) = mpsc::channel::<u8>();
        drop(tx);
        let mut slot = Some(rx);
        assert_eq!(take_one(&mut slot), None);
        assert!(slot.is_none());
    }
}
