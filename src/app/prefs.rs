// src/app/prefs.rs
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use std::{fs, io};

use tracing::warn;

pub const POSTER_W_RANGE: std::ops::RangeInclusive<f32> = 120.0..=260.0;
pub const DETAIL_W_RANGE: std::ops::RangeInclusive<f32> = 260.0..=600.0;

const PREFS_FILE: &str = "ui_prefs.txt";
const BACKUP_PREFIX: &str = "ui_prefs_backup_";
const SAVE_DEBOUNCE: Duration = Duration::from_millis(300);

/// Layout knobs that survive restarts. Selections deliberately do not.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UiPrefs {
    pub poster_w: f32,
    pub detail_w: f32,
}

impl Default for UiPrefs {
    fn default() -> Self {
        Self {
            poster_w: 160.0,
            detail_w: 340.0,
        }
    }
}

impl UiPrefs {
    /// `key=value` lines; unknown keys and bad numbers are skipped.
    pub fn parse(txt: &str) -> Self {
        let mut out = Self::default();
        for line in txt.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((k, v)) = line.split_once('=') else {
                continue;
            };
            match k.trim() {
                "poster_w" => {
                    if let Ok(n) = v.trim().parse::<f32>() {
                        out.poster_w = n.clamp(*POSTER_W_RANGE.start(), *POSTER_W_RANGE.end());
                    }
                }
                "detail_w" => {
                    if let Ok(n) = v.trim().parse::<f32>() {
                        out.detail_w = n.clamp(*DETAIL_W_RANGE.start(), *DETAIL_W_RANGE.end());
                    }
                }
                _ => {}
            }
        }
        out
    }

    pub fn render(&self) -> String {
        format!(
            "# cinelist ui prefs\n\
             poster_w={:.1}\n\
             detail_w={:.1}\n",
            self.poster_w, self.detail_w
        )
    }
}

impl crate::app::CatalogApp {
    pub(crate) fn mark_dirty(&mut self) {
        self.prefs_dirty = true;
    }

    pub(crate) fn maybe_save_prefs(&mut self) {
        // debounce a bit to avoid writing every frame
        if self.prefs_dirty && self.prefs_last_write.elapsed() >= SAVE_DEBOUNCE {
            self.save_prefs();
            self.prefs_dirty = false;
            self.prefs_last_write = Instant::now();
        }
    }

    pub(crate) fn load_prefs(&mut self) {
        if let Ok(txt) = fs::read_to_string(prefs_path()) {
            self.prefs = UiPrefs::parse(&txt);
        }
    }

    pub(crate) fn save_prefs(&self) {
        let path = prefs_path();
        if let Err(e) = fs::write(&path, self.prefs.render()) {
            warn!("failed to save {}: {e}", path.display());
        }
    }
}

pub fn prefs_path() -> PathBuf {
    crate::app::cache::cache_dir().join(PREFS_FILE)
}

pub fn backup_ui_prefs() -> io::Result<PathBuf> {
    backup_prefs_in(&crate::app::cache::cache_dir())
}

pub fn restore_latest_ui_prefs_backup() -> io::Result<Option<PathBuf>> {
    restore_latest_backup_in(&crate::app::cache::cache_dir())
}

fn backup_prefs_in(dir: &Path) -> io::Result<PathBuf> {
    use chrono::Local;
    let src = dir.join(PREFS_FILE);
    if !src.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            "ui_prefs.txt not found",
        ));
    }
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let dest = dir.join(format!("{BACKUP_PREFIX}{stamp}.txt"));
    fs::copy(&src, &dest)?;
    Ok(dest)
}

fn restore_latest_backup_in(dir: &Path) -> io::Result<Option<PathBuf>> {
    let mut backups: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_backup = path
            .file_name()
            .and_then(|s| s.to_str())
            .is_some_and(|name| name.starts_with(BACKUP_PREFIX) && name.ends_with(".txt"));
        if is_backup && entry.file_type()?.is_file() {
            let modified = entry
                .metadata()?
                .modified()
                .unwrap_or(SystemTime::UNIX_EPOCH);
            backups.push((modified, path));
        }
    }

    // newest mtime wins; names break ties (timestamps sort lexically)
    let Some((_, latest)) = backups.into_iter().max() else {
        return Ok(None);
    };
    fs::copy(&latest, dir.join(PREFS_FILE))?;
    Ok(Some(latest))
}
