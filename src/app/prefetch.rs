// src/app/prefetch.rs
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use eframe::egui as eg;
use tracing::{debug, info};

use super::api::ApiClient;
use super::cache::{download_and_store_resized_with_client, find_cached, url_to_cache_key};
use super::types::{PosterDone, PosterJob, PosterState};
use super::utils::placeholder_poster_url;

pub(crate) const RESIZE_MAX_W: u32 = 320;
pub(crate) const RESIZE_QUALITY: u8 = 80;
pub(crate) const LOOKUP_SIZE: &str = "w342";
const MAX_DONE_PER_FRAME: usize = 12;

/// Artwork URL for a job: catalog value, else backend lookup, else placeholder.
fn resolve_url(api: &ApiClient, job: &PosterJob) -> String {
    if !job.url.trim().is_empty() {
        return job.url.clone();
    }
    match api.fetch_poster_url(&job.movie_id, LOOKUP_SIZE) {
        Ok(Some(url)) => url,
        Ok(None) => placeholder_poster_url(&job.title),
        Err(e) => {
            debug!("poster lookup for {} failed: {e}", job.movie_id);
            placeholder_poster_url(&job.title)
        }
    }
}

fn run_job(api: &ApiClient, job: &PosterJob) -> Result<PathBuf, String> {
    if let Some(p) = &job.cached {
        return Ok(p.clone());
    }
    let url = resolve_url(api, job);
    let key = url_to_cache_key(&url);
    if let Some(p) = find_cached(&key) {
        return Ok(p);
    }
    download_and_store_resized_with_client(api.http(), &url, &key, RESIZE_MAX_W, RESIZE_QUALITY)
}

impl crate::app::CatalogApp {
    /// Queue every catalog entry, visible ones first. Workers share the API
    /// client's connection pool.
    pub(crate) fn start_prefetch(&mut self, ctx: &eg::Context) {
        if self.prefetch_started || self.catalog.is_empty() {
            return;
        }
        if self.cfg.disable_prefetch {
            info!("prefetch disabled; only cached posters will show");
            self.try_upload_first_screen(ctx);
            return;
        }
        self.prefetch_started = true;
        self.posters_done = 0;
        self.posters_failed = 0;

        let (work_tx, work_rx) = mpsc::channel::<PosterJob>();
        let (done_tx, done_rx) = mpsc::channel::<PosterDone>();
        self.done_rx = Some(done_rx);
        let work_rx = Arc::new(Mutex::new(work_rx));

        for _ in 0..self.cfg.poster_workers.max(1) {
            let work_rx = Arc::clone(&work_rx);
            let done_tx = done_tx.clone();
            let api = self.api.clone();

            thread::spawn(move || loop {
                let job = {
                    let Ok(rx) = work_rx.lock() else { break };
                    rx.recv()
                };
                let Ok(job) = job else { break };
                let result = run_job(&api, &job);
                if done_tx
                    .send(PosterDone {
                        movie_idx: job.movie_idx,
                        result,
                    })
                    .is_err()
                {
                    break;
                }
            });
        }

        // Derived order first so the first screen fills early.
        let mut order: Vec<usize> = self.view.entries.iter().map(|e| e.index).collect();
        let mut queued = vec![false; self.catalog.len()];
        for &i in &order {
            queued[i] = true;
        }
        order.extend((0..self.catalog.len()).filter(|&i| !queued[i]));

        let mut total = 0usize;
        for idx in order {
            let (Some(movie), Some(slot)) = (self.catalog.get(idx), self.posters.get_mut(idx)) else {
                continue;
            };
            if matches!(slot.state, PosterState::Ready | PosterState::Cached) {
                continue;
            }
            slot.state = PosterState::Pending;
            total += 1;
            let _ = work_tx.send(PosterJob {
                movie_idx: idx,
                movie_id: movie.id.clone(),
                title: movie.title.clone(),
                url: slot.url.clone(),
                cached: slot.path.clone(),
            });
        }
        self.posters_total = total;
        // dropping work_tx lets idle workers exit once the queue drains
        drop(work_tx);

        self.try_upload_first_screen(ctx);
        ctx.request_repaint();
    }

    pub(crate) fn poll_prefetch_done(&mut self, ctx: &eg::Context) {
        let Some(rx) = &self.done_rx else {
            return;
        };
        let mut drained = 0usize;
        let mut disconnected = false;

        while drained < MAX_DONE_PER_FRAME {
            match rx.try_recv() {
                Ok(msg) => {
                    drained += 1;
                    let Some(slot) = self.posters.get_mut(msg.movie_idx) else {
                        self.posters_failed += 1;
                        continue;
                    };
                    match msg.result {
                        Ok(path) => {
                            slot.path = Some(path);
                            slot.state = PosterState::Cached; // uploaded lazily during paint
                            self.posters_done += 1;
                        }
                        Err(e) => {
                            debug!("poster for {} failed: {e}", slot.key);
                            slot.state = PosterState::Failed;
                            self.posters_failed += 1;
                        }
                    }
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        if disconnected {
            self.done_rx = None;
            info!(
                cached = self.posters_done,
                failed = self.posters_failed,
                "poster prefetch finished"
            );
        }
        if drained > 0 {
            ctx.request_repaint();
        }
    }

    /// Upload the texture for one catalog entry if its file is on disk.
    /// Returns true if a texture was uploaded this call.
    pub(crate) fn try_lazy_upload(&mut self, ctx: &eg::Context, idx: usize) -> bool {
        let Some(slot) = self.posters.get_mut(idx) else {
            return false;
        };
        if slot.tex.is_some() || slot.state != PosterState::Cached {
            return false;
        }
        let Some(path) = slot.path.as_ref() else {
            return false;
        };
        match super::gfx::load_texture_from_path(ctx, path, &slot.key) {
            Ok(tex) => {
                slot.tex = Some(tex);
                slot.state = PosterState::Ready;
                true
            }
            Err(e) => {
                debug!("texture upload for {} failed: {e}", slot.key);
                slot.state = PosterState::Failed;
                false
            }
        }
    }

    fn try_upload_first_screen(&mut self, ctx: &eg::Context) {
        let first: Vec<usize> = self
            .view
            .entries
            .iter()
            .take(super::PREWARM_UPLOADS)
            .map(|e| e.index)
            .collect();
        for idx in first {
            self.try_lazy_upload(ctx, idx);
        }
    }

    pub(crate) fn prefetch_progress(&self) -> Option<String> {
        if !self.prefetch_started || self.done_rx.is_none() {
            return None;
        }
        Some(format!(
            "Posters {}/{} ({} failed)",
            self.posters_done, self.posters_total, self.posters_failed
        ))
    }
}
