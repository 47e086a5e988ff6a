use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Once, OnceLock};
use std::time::{Duration, SystemTime};

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use reqwest::blocking::Client;
use tracing::{debug, warn};

use crate::config::{load_config, resolve_relative_path};

static CACHE_DIR_ONCE: OnceLock<PathBuf> = OnceLock::new();
static POSTER_DIR_ONCE: OnceLock<PathBuf> = OnceLock::new();
static POSTER_PRUNE_ONCE: Once = Once::new();

const DEFAULT_CACHE_DIR: &str = ".cinelist_cache";
const POSTER_RETENTION_DAYS: u64 = 14;
pub const POSTER_RETENTION: Duration = Duration::from_secs(POSTER_RETENTION_DAYS * 24 * 60 * 60);

const POSTER_EXTS: [&str; 3] = ["jpg", "png", "jpeg"];

pub fn cache_dir() -> PathBuf {
    CACHE_DIR_ONCE
        .get_or_init(|| {
            let cfg = load_config();
            let mut path = PathBuf::from(
                cfg.cache_dir
                    .unwrap_or_else(|| resolve_relative_path(DEFAULT_CACHE_DIR)),
            );
            if let Err(e) = fs::create_dir_all(&path) {
                warn!("failed to create cache dir {}: {e}", path.display());
                path = PathBuf::from(resolve_relative_path(DEFAULT_CACHE_DIR));
                let _ = fs::create_dir_all(&path);
            }
            path
        })
        .clone()
}

/// Where the client key/value store lives.
pub fn store_dir() -> PathBuf {
    cache_dir().join("store")
}

pub fn poster_cache_dir() -> PathBuf {
    let dir = POSTER_DIR_ONCE.get_or_init(|| {
        let mut path = cache_dir().join("posters");
        if let Err(e) = fs::create_dir_all(&path) {
            warn!("failed to create poster cache dir {}: {e}", path.display());
            path = cache_dir();
        }
        path
    });

    POSTER_PRUNE_ONCE.call_once({
        let path = dir.clone();
        move || match prune_posters_older_than(&path, POSTER_RETENTION) {
            Ok(0) => {}
            Ok(n) => debug!("pruned {n} stale posters"),
            Err(err) => warn!("poster cache prune failed: {err}"),
        }
    });

    dir.clone()
}

pub fn url_to_cache_key(url: &str) -> String {
    format!("{:x}", md5::compute(url.as_bytes()))
}

pub fn find_cached(key: &str) -> Option<PathBuf> {
    find_cached_in(&poster_cache_dir(), key)
}

fn find_cached_in(dir: &Path, key: &str) -> Option<PathBuf> {
    POSTER_EXTS
        .iter()
        .map(|ext| dir.join(format!("{key}.{ext}")))
        .find(|p| p.exists())
}

/// Decode a cached file into (width, height, RGBA8 bytes).
pub fn load_rgba(path: &Path) -> Result<(u32, u32, Vec<u8>), String> {
    let img = image::ImageReader::open(path)
        .map_err(|e| format!("open image {}: {e}", path.display()))?
        .with_guessed_format()
        .map_err(|e| format!("guess format {}: {e}", path.display()))?
        .decode()
        .map_err(|e| format!("decode {}: {e}", path.display()))?;
    let (w, h) = img.dimensions();
    Ok((w, h, img.to_rgba8().into_raw()))
}

/// Decode, shrink to `max_width` (keeping aspect) and re-encode as JPEG.
pub fn encode_resized_jpeg(bytes: &[u8], max_width: u32, quality: u8) -> Result<Vec<u8>, String> {
    let img = image::load_from_memory(bytes).map_err(|e| format!("decode: {e}"))?;
    let (w, h) = img.dimensions();
    let out: DynamicImage = if w > max_width {
        let new_h = ((h as f32) * (max_width as f32 / w as f32))
            .round()
            .max(1.0) as u32;
        img.resize_exact(max_width, new_h, FilterType::CatmullRom)
    } else {
        img
    };

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(out.to_rgb8());
    let mut jpeg_bytes: Vec<u8> = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg_bytes, quality)
        .encode_image(&rgb)
        .map_err(|e| format!("jpeg encode: {e}"))?;
    Ok(jpeg_bytes)
}

fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<(), String> {
    if let Some(parent) = dest.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let tmp = dest.with_extension("part");
    {
        let mut f = fs::File::create(&tmp).map_err(|e| format!("create tmp: {e}"))?;
        f.write_all(bytes).map_err(|e| format!("write: {e}"))?;
    }
    fs::rename(&tmp, dest).map_err(|e| format!("rename: {e}"))
}

/// Download `url` with the shared pool, resize and store as `<key>.jpg`.
/// Returns the on-disk path; an existing file short-circuits the download.
pub fn download_and_store_resized_with_client(
    client: &Client,
    url: &str,
    key: &str,
    max_width: u32,
    quality: u8,
) -> Result<PathBuf, String> {
    let dest = poster_cache_dir().join(format!("{key}.jpg"));
    if dest.exists() {
        return Ok(dest);
    }

    let bytes = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .and_then(|r| r.bytes())
        .map_err(|e| format!("download {url}: {e}"))?;

    let jpeg = encode_resized_jpeg(&bytes, max_width, quality)?;
    write_atomic(&dest, &jpeg)?;
    Ok(dest)
}

/// Remove poster files last modified before `max_age` ago.
pub fn prune_posters_older_than(dir: &Path, max_age: Duration) -> std::io::Result<usize> {
    let cutoff = SystemTime::now()
        .checked_sub(max_age)
        .unwrap_or(SystemTime::UNIX_EPOCH);
    let mut removed = 0usize;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let is_poster = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| POSTER_EXTS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !is_poster {
            continue;
        }
        let modified = entry
            .metadata()?
            .modified()
            .unwrap_or(SystemTime::UNIX_EPOCH);
        if modified < cutoff {
            let _ = fs::remove_file(&path);
            removed += 1;
        }
    }
    Ok(removed)
}

/// Drop half-written and empty files, then age out stale posters.
pub fn clean_poster_dir(dir: &Path) -> std::io::Result<usize> {
    let mut removed = 0usize;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let broken = match path.extension().and_then(|e| e.to_str()) {
            Some("part") => true,
            Some(_) => entry.metadata()?.len() == 0,
            None => true,
        };
        if broken {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed + prune_posters_older_than(dir, POSTER_RETENTION)?)
}

pub fn refresh_poster_cache_light() -> std::io::Result<usize> {
    clean_poster_dir(&poster_cache_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbaImage};
    use std::io::Cursor;
    use tempfile::tempdir;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(w, h));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn cache_key_is_stable_md5() {
        assert_eq!(url_to_cache_key(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(url_to_cache_key("a"), url_to_cache_key("a"));
        assert_ne!(url_to_cache_key("a"), url_to_cache_key("b"));
    }

    #[test]
    fn wide_images_are_shrunk() {
        let jpeg = encode_resized_jpeg(&png_bytes(600, 900), 200, 80).unwrap();
        let img = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(img.dimensions(), (200, 300));
    }

    #[test]
    fn small_images_keep_size() {
        let jpeg = encode_resized_jpeg(&png_bytes(100, 150), 200, 80).unwrap();
        let img = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(img.dimensions(), (100, 150));
    }

    #[test]
    fn garbage_bytes_do_not_decode() {
        assert!(encode_resized_jpeg(b"<html>nope</html>", 200, 80).is_err());
    }

    #[test]
    fn prune_removes_only_stale_posters() {
        let dir = tempdir().unwrap();
        let old = dir.path().join("old.jpg");
        let fresh = dir.path().join("fresh.jpg");
        let other = dir.path().join("notes.txt");
        for p in [&old, &fresh, &other] {
            fs::write(p, b"x").unwrap();
        }
        let month_ago = SystemTime::now() - Duration::from_secs(30 * 24 * 3600);
        for p in [&old, &other] {
            fs::File::options()
                .write(true)
                .open(p)
                .unwrap()
                .set_modified(month_ago)
                .unwrap();
        }

        let removed = prune_posters_older_than(dir.path(), POSTER_RETENTION).unwrap();
        assert_eq!(removed, 1);
        assert!(!old.exists());
        assert!(fresh.exists());
        assert!(other.exists());
    }

    #[test]
    fn clean_drops_partial_and_empty_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.part"), b"half").unwrap();
        fs::write(dir.path().join("b.jpg"), b"").unwrap();
        fs::write(dir.path().join("c.jpg"), b"ok").unwrap();
        assert_eq!(clean_poster_dir(dir.path()).unwrap(), 2);
        assert!(dir.path().join("c.jpg").exists());
    }

    #[test]
    fn finds_cached_by_key() {
        let dir = tempdir().unwrap();
        assert!(find_cached_in(dir.path(), "abc").is_none());
        fs::write(dir.path().join("abc.png"), b"x").unwrap();
        assert_eq!(
            find_cached_in(dir.path(), "abc"),
            Some(dir.path().join("abc.png"))
        );
    }

    #[test]
    fn load_rgba_reads_written_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("p.jpg");
        write_atomic(&path, &encode_resized_jpeg(&png_bytes(20, 30), 200, 90).unwrap()).unwrap();
        let (w, h, bytes) = load_rgba(&path).unwrap();
        assert_eq!((w, h), (20, 30));
        assert_eq!(bytes.len(), 20 * 30 * 4);
    }
}
