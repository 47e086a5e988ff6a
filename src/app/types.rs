// src/app/types.rs
use eframe::egui::TextureHandle;
use std::path::PathBuf;

use super::api::{AuthUser, GenreOption};
use super::data::Movie;

// ---- cross-thread messages ----
pub enum CatalogMsg {
    Done(Vec<Movie>),
    Error(String),
}

pub enum GenresMsg {
    Loaded(Vec<GenreOption>),
    /// Endpoint failed; carries the fallback list plus the reason for the log.
    Fallback(Vec<GenreOption>, String),
}

pub enum WatchlistMsg {
    Synced(Vec<String>),
    Error(String),
}

pub enum HealthMsg {
    Ok(String),
    Unreachable(String),
}

pub enum AuthMsg {
    SignedIn(AuthUser),
    SignedUp,
    Failed(String),
}

pub enum UploadMsg {
    Uploaded(String),
    Failed(String),
}

pub struct PosterDone {
    pub movie_idx: usize,
    pub result: Result<PathBuf, String>,
}

/// One poster worker job. `url` is empty when the catalog had no artwork and
/// the worker must ask the backend (or fall back to a placeholder).
pub struct PosterJob {
    pub movie_idx: usize,
    pub movie_id: String,
    pub title: String,
    pub url: String,
    pub cached: Option<PathBuf>,
}

// ---- app phases / states ----
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadPhase {
    Fetching,
    Ready,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PosterState {
    Idle,    // not queued (prefetch disabled or not started)
    Pending, // queued or downloading
    Cached,  // file present on disk (ready to upload)
    Ready,   // texture uploaded
    Failed,  // permanent failure; card is drawn locally
}

/// Per-movie artwork slot, index-aligned with the catalog.
pub struct PosterSlot {
    /// Texture name; the movie id.
    pub key: String,
    pub url: String,
    pub path: Option<PathBuf>,
    pub tex: Option<TextureHandle>, // UI thread only
    pub state: PosterState,
}

impl PosterSlot {
    pub fn for_movie(movie: &Movie) -> Self {
        let path = movie
            .has_artwork()
            .then(|| super::cache::find_cached(&super::cache::url_to_cache_key(&movie.image_url)))
            .flatten();
        Self {
            key: movie.id.clone(),
            url: movie.image_url.clone(),
            state: if path.is_some() {
                PosterState::Cached
            } else {
                PosterState::Idle
            },
            path,
            tex: None,
        }
    }
}

// ---- UI controls ----
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatType {
    #[default]
    Movie,
    Any,
}

impl FormatType {
    pub const ALL: [Self; 2] = [Self::Movie, Self::Any];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Movie => "Movie",
            Self::Any => "Any",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" | "movies" => Some(Self::Movie),
            "any" | "all" => Some(Self::Any),
            _ => None,
        }
    }

    /// Backend `title_type` this format keeps; `None` is the wildcard.
    pub const fn kind_value(self) -> Option<&'static str> {
        match self {
            Self::Movie => Some("movie"),
            Self::Any => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    MostPopular,
    TopRated,
    Favorited,
    Watchlist,
}

impl SortBy {
    pub const ALL: [Self; 4] = [
        Self::MostPopular,
        Self::TopRated,
        Self::Favorited,
        Self::Watchlist,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::MostPopular => "Most Popular",
            Self::TopRated => "Top Rated",
            Self::Favorited => "Favorited",
            Self::Watchlist => "Watchlist",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MostPopular => "popular",
            Self::TopRated => "top_rated",
            Self::Favorited => "favorited",
            Self::Watchlist => "watchlist",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "popular" | "most_popular" | "most popular" => Some(Self::MostPopular),
            "top_rated" | "top rated" | "rating" => Some(Self::TopRated),
            "favorited" | "favorites" => Some(Self::Favorited),
            "watchlist" => Some(Self::Watchlist),
            _ => None,
        }
    }

    /// Favorited / Watchlist are collections, not rankings.
    pub const fn is_ranked(self) -> bool {
        matches!(self, Self::MostPopular | Self::TopRated)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

impl ColorScheme {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().trim_matches('"') {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

/// Which account window is open, if any.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountView {
    SignIn,
    SignUp,
    Profile,
}
