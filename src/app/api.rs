// src/app/api.rs
//! Blocking HTTP client for the catalog backend. Every call is made from a
//! background thread; parsing lives in free `parse_*` functions so it can be
//! tested without a server.

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{multipart, Client, Response};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use super::data::{normalize_catalog, ApiScalar, CatalogResponse, Movie};
use crate::config::AppConfig;

const USER_AGENT: &str = concat!("cinelist/", env!("CARGO_PKG_VERSION"));
const BODY_EXCERPT: usize = 200;

pub const DEFAULT_POSTER_SIZE: &str = "w500";
const POSTER_SIZES: [&str; 7] = ["w92", "w154", "w185", "w342", "w500", "w780", "original"];

pub const FALLBACK_GENRES: [&str; 13] = [
    "Drama",
    "Comedy",
    "Action",
    "Thriller",
    "Romance",
    "Horror",
    "Sci-Fi",
    "Adventure",
    "Fantasy",
    "Crime",
    "Mystery",
    "Family",
    "Biography",
];

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Malformed(String),

    #[error("{0}")]
    Rejected(String),

    #[error("file error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenreOption {
    pub name: String,
    pub count: Option<u64>,
}

impl GenreOption {
    pub fn label(&self) -> String {
        match self.count {
            Some(n) => format!("{} ({n})", self.name),
            None => self.name.clone(),
        }
    }
}

pub fn fallback_genres() -> Vec<GenreOption> {
    FALLBACK_GENRES
        .iter()
        .map(|g| GenreOption {
            name: g.to_string(),
            count: None,
        })
        .collect()
}

/// Identity returned by a successful sign-in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub profile_image: Option<String>,
}

// ---- wire shapes ----

#[derive(Deserialize)]
struct GenresResponse {
    genres: Vec<ApiGenre>,
}

#[derive(Deserialize)]
struct ApiGenre {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    count: Option<u64>,
}

#[derive(Deserialize)]
struct WatchlistResponse {
    movies: Vec<WatchlistEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WatchlistEntry {
    Id(ApiScalar),
    Movie { id: ApiScalar },
}

#[derive(Deserialize)]
struct AuthResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    user_id: Option<ApiScalar>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    profile_image: Option<String>,
}

#[derive(Deserialize)]
struct PosterResponse {
    #[serde(rename = "posterUrl", default)]
    poster_url: Option<String>,
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
}

// ---- parsing ----

pub fn parse_catalog(body: &str) -> Result<Vec<Movie>, ApiError> {
    let resp: CatalogResponse = serde_json::from_str(body)
        .map_err(|e| ApiError::Malformed(format!("catalog: {e}")))?;
    normalize_catalog(resp).map_err(|e| ApiError::Malformed(e.to_string()))
}

/// Options sorted by descending count; unnamed entries are dropped.
pub fn parse_genres(body: &str) -> Result<Vec<GenreOption>, ApiError> {
    let resp: GenresResponse = serde_json::from_str(body)
        .map_err(|e| ApiError::Malformed(format!("genres: {e}")))?;
    let mut out: Vec<GenreOption> = resp
        .genres
        .into_iter()
        .filter_map(|g| {
            let name = g.name?.trim().to_string();
            (!name.is_empty()).then_some(GenreOption {
                name,
                count: g.count,
            })
        })
        .collect();
    out.sort_by(|a, b| b.count.unwrap_or(0).cmp(&a.count.unwrap_or(0)));
    Ok(out)
}

pub fn parse_watchlist(body: &str) -> Result<Vec<String>, ApiError> {
    let resp: WatchlistResponse = serde_json::from_str(body)
        .map_err(|e| ApiError::Malformed(format!("watchlist: {e}")))?;
    Ok(resp
        .movies
        .into_iter()
        .map(|e| match e {
            WatchlistEntry::Id(id) | WatchlistEntry::Movie { id } => id.as_text(),
        })
        .filter(|id| !id.is_empty())
        .collect())
}

/// `rejected` is shown when the server says no without an `error` text.
fn parse_auth(body: &str, rejected: &str) -> Result<AuthResponse, ApiError> {
    let resp: AuthResponse = serde_json::from_str(body)
        .map_err(|e| ApiError::Malformed(format!("auth: {e}")))?;
    if resp.success {
        Ok(resp)
    } else {
        let msg = resp
            .error
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| rejected.to_string());
        Err(ApiError::Rejected(msg))
    }
}

pub fn parse_sign_in(body: &str) -> Result<AuthUser, ApiError> {
    let resp = parse_auth(body, "Invalid credentials")?;
    let user_id = resp
        .user_id
        .map(|v| v.as_text())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Malformed("sign-in response has no user_id".into()))?;
    Ok(AuthUser {
        user_id,
        username: resp.username.unwrap_or_default(),
        email: resp.email.unwrap_or_default(),
        profile_image: resp.profile_image.filter(|p| !p.trim().is_empty()),
    })
}

pub fn parse_sign_up(body: &str) -> Result<(), ApiError> {
    parse_auth(body, "Signup failed").map(|_| ())
}

pub fn parse_upload(body: &str) -> Result<String, ApiError> {
    parse_auth(body, "Upload failed")?
        .profile_image
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::Malformed("upload response has no profile_image".into()))
}

pub fn parse_poster(body: &str) -> Result<Option<String>, ApiError> {
    let resp: PosterResponse = serde_json::from_str(body)
        .map_err(|e| ApiError::Malformed(format!("poster: {e}")))?;
    Ok(resp.poster_url.filter(|u| !u.trim().is_empty()))
}

pub fn parse_health(body: &str) -> Result<String, ApiError> {
    let resp: HealthResponse = serde_json::from_str(body)
        .map_err(|e| ApiError::Malformed(format!("health: {e}")))?;
    Ok(resp.status)
}

/// Unknown sizes fall back to the backend default.
pub fn poster_size(size: &str) -> &'static str {
    POSTER_SIZES
        .iter()
        .copied()
        .find(|s| *s == size)
        .unwrap_or(DEFAULT_POSTER_SIZE)
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

// ---- client ----

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base: String,
}

impl ApiClient {
    pub fn new(cfg: &AppConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self::with_client(http, &cfg.api_base_url))
    }

    pub fn with_client(http: Client, base: &str) -> Self {
        Self {
            http,
            base: base.trim().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Shared connection pool, also used by the poster workers.
    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    /// Absolute URL for a server-relative asset such as an uploaded avatar.
    pub fn asset_url(&self, rel: &str) -> String {
        if rel.starts_with("http://") || rel.starts_with("https://") {
            rel.to_string()
        } else {
            self.url(rel)
        }
    }

    fn get_ok(&self, url: &str) -> Result<String, ApiError> {
        debug!("GET {url}");
        let resp = self.http.get(url).send()?;
        ok_body(resp)
    }

    pub fn fetch_catalog(&self, page_size: usize) -> Result<Vec<Movie>, ApiError> {
        let body = self.get_ok(&self.url(&format!("api/movies?pageSize={page_size}")))?;
        parse_catalog(&body)
    }

    pub fn fetch_genres(&self) -> Result<Vec<GenreOption>, ApiError> {
        parse_genres(&self.get_ok(&self.url("api/genres"))?)
    }

    pub fn fetch_watchlist(&self, user_id: &str) -> Result<Vec<String>, ApiError> {
        let url = self.url(&format!("api/watchlist/{}", urlencoding::encode(user_id)));
        parse_watchlist(&self.get_ok(&url)?)
    }

    pub fn fetch_poster_url(&self, movie_id: &str, size: &str) -> Result<Option<String>, ApiError> {
        let url = self.url(&format!(
            "api/movies/{}/poster?size={}",
            urlencoding::encode(movie_id),
            poster_size(size)
        ));
        parse_poster(&self.get_ok(&url)?)
    }

    pub fn health(&self) -> Result<String, ApiError> {
        parse_health(&self.get_ok(&self.url("api/health"))?)
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, ApiError> {
        let resp = self
            .http
            .post(self.url("api/signin"))
            .json(&json!({ "email": email, "password": password }))
            .send()?;
        parse_sign_in(&auth_body(resp)?)
    }

    pub fn sign_up(&self, email: &str, username: &str, password: &str) -> Result<(), ApiError> {
        let resp = self
            .http
            .post(self.url("api/signup"))
            .json(&json!({ "email": email, "password": password, "username": username }))
            .send()?;
        parse_sign_up(&auth_body(resp)?)
    }

    /// Multipart upload under the `image` field. Returns the stored image path.
    pub fn upload_profile_image(&self, user_id: &str, file: &Path) -> Result<String, ApiError> {
        let form = multipart::Form::new().file("image", file)?;
        let url = self.url(&format!(
            "api/upload_profile_image/{}",
            urlencoding::encode(user_id)
        ));
        let resp = self.http.post(url).multipart(form).send()?;
        parse_upload(&auth_body(resp)?)
    }
}

fn ok_body(resp: Response) -> Result<String, ApiError> {
    let status = resp.status();
    let body = resp.text()?;
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body: excerpt(&body),
        });
    }
    Ok(body)
}

/// Auth endpoints answer 4xx with a JSON `{ success:false, error }` body; keep
/// that body so the server's message reaches the user.
fn auth_body(resp: Response) -> Result<String, ApiError> {
    let status = resp.status();
    let body = resp.text()?;
    if status.is_success() || serde_json::from_str::<AuthResponse>(&body).is_ok() {
        Ok(body)
    } else {
        Err(ApiError::Status {
            status: status.as_u16(),
            body: excerpt(&body),
        })
    }
}
