use std::{env, fs, path::Path, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

pub const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_PAGE_SIZE: usize = 200;
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_POSTER_WORKERS: usize = 8;

const MAX_PAGE_SIZE: usize = 1000;
const MAX_POSTER_WORKERS: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub api_base_url: String,
    pub page_size: usize,
    pub cache_dir: Option<String>,
    pub request_timeout_secs: u64,
    pub poster_workers: usize,
    pub disable_prefetch: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            cache_dir: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            poster_workers: DEFAULT_POSTER_WORKERS,
            disable_prefetch: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(alias = "api_url")]
    api_base_url: Option<String>,
    page_size: Option<usize>,
    cache_dir: Option<String>,
    request_timeout_secs: Option<u64>,
    poster_workers: Option<usize>,
    disable_prefetch: Option<bool>,
}

/// Load `config.json` next to the executable, then apply `CINELIST_*` env overrides.
pub fn load_config() -> AppConfig {
    let mut cfg = load_config_from(Path::new(&resolve_relative_path(CONFIG_FILE)));
    apply_env_overrides(&mut cfg, |key| env::var(key).ok());
    cfg
}

pub fn load_config_from(cfg_path: &Path) -> AppConfig {
    let mut cfg = AppConfig::default();

    match fs::read_to_string(cfg_path) {
        Ok(raw) => match serde_json::from_str::<RawConfig>(&raw) {
            Ok(parsed) => {
                if let Some(url) = parsed.api_base_url {
                    cfg.api_base_url = normalize_base_url(&url);
                    if raw.contains("\"api_url\"") {
                        warn!("`api_url` is deprecated; rename it to `api_base_url` in config.json.");
                    }
                }
                if let Some(n) = parsed.page_size {
                    cfg.page_size = sanitize_page_size(n);
                }
                if parsed.cache_dir.is_some() {
                    cfg.cache_dir = parsed.cache_dir;
                }
                if let Some(secs) = parsed.request_timeout_secs {
                    cfg.request_timeout_secs = secs.max(1);
                }
                if let Some(n) = parsed.poster_workers {
                    cfg.poster_workers = n.clamp(1, MAX_POSTER_WORKERS);
                }
                if let Some(flag) = parsed.disable_prefetch {
                    cfg.disable_prefetch = flag;
                }
                info!("Loaded config from {}", cfg_path.display());
            }
            Err(err) => {
                warn!("Failed to parse {} ({}). Using defaults.", cfg_path.display(), err);
            }
        },
        Err(_) => {
            info!("No {} found; using defaults", cfg_path.display());
        }
    }

    cfg
}

/// Env wins over the file. `lookup` is injected so tests never touch the process env.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("CINELIST_API_URL").filter(|s| !s.trim().is_empty()) {
        cfg.api_base_url = normalize_base_url(&url);
    }
    if let Some(raw) = lookup("CINELIST_PAGE_SIZE") {
        match raw.trim().parse::<usize>() {
            Ok(n) => cfg.page_size = sanitize_page_size(n),
            Err(_) => warn!("Ignoring CINELIST_PAGE_SIZE=`{raw}` (not a number)"),
        }
    }
    if let Some(dir) = lookup("CINELIST_CACHE_DIR").filter(|s| !s.trim().is_empty()) {
        cfg.cache_dir = Some(dir);
    }
    if lookup("CINELIST_DISABLE_PREFETCH").is_some() {
        cfg.disable_prefetch = true;
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn sanitize_page_size(n: usize) -> usize {
    if n == 0 {
        warn!("page_size 0 is not usable; falling back to {DEFAULT_PAGE_SIZE}");
        return DEFAULT_PAGE_SIZE;
    }
    n.min(MAX_PAGE_SIZE)
}

/// Resolve `name` against the executable's directory (falls back to the cwd).
pub fn resolve_relative_path(name: &str) -> String {
    let p = Path::new(name);
    if p.is_absolute() {
        return name.to_string();
    }
    let base = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join(p).to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_file_gives_defaults() {
        let cfg = load_config_from(Path::new("/nonexistent/cinelist/config.json"));
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.page_size, 200);
        assert_eq!(cfg.api_base_url, "http://localhost:8000");
    }

    #[test]
    fn file_values_override_defaults() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"{{ "api_base_url": "http://catalog.local:9000/", "page_size": 50, "poster_workers": 99 }}"#
        )
        .unwrap();

        let cfg = load_config_from(f.path());
        assert_eq!(cfg.api_base_url, "http://catalog.local:9000");
        assert_eq!(cfg.page_size, 50);
        assert_eq!(cfg.poster_workers, 32);
        assert_eq!(cfg.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn deprecated_api_url_key_still_works() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, r#"{{ "api_url": "http://old.example" }}"#).unwrap();
        let cfg = load_config_from(f.path());
        assert_eq!(cfg.api_base_url, "http://old.example");
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "{{ not json").unwrap();
        assert_eq!(load_config_from(f.path()), AppConfig::default());
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("CINELIST_API_URL", "http://env.example/"),
            ("CINELIST_PAGE_SIZE", "0"),
            ("CINELIST_DISABLE_PREFETCH", "1"),
        ]
        .into_iter()
        .collect();

        let mut cfg = AppConfig::default();
        apply_env_overrides(&mut cfg, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.api_base_url, "http://env.example");
        assert_eq!(cfg.page_size, DEFAULT_PAGE_SIZE);
        assert!(cfg.disable_prefetch);
    }

    #[test]
    fn bad_page_size_env_is_ignored() {
        let mut cfg = AppConfig {
            page_size: 40,
            ..AppConfig::default()
        };
        apply_env_overrides(&mut cfg, |k| (k == "CINELIST_PAGE_SIZE").then(|| "lots".to_string()));
        assert_eq!(cfg.page_size, 40);
    }
}
