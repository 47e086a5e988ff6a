// src/app/data.rs
use serde::Deserialize;
use thiserror::Error;

/// One catalog entry as the UI sees it. Immutable once fetched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub image_url: String,
    /// Average on the source 0..=10 scale.
    pub rating: f64,
    pub votes: u64,
    /// `title_type` from the backend, e.g. "movie", "short", "tvSeries".
    pub kind: String,
    pub genres: Vec<String>,
    pub description: String,
    pub release_date: String,
    pub runtime: u32,
    pub actors: Vec<String>,
}

impl Movie {
    pub fn first_genre(&self) -> Option<&str> {
        self.genres.first().map(String::as_str)
    }

    pub fn has_artwork(&self) -> bool {
        !self.image_url.trim().is_empty()
    }
}

// ---- wire schema (GET /api/movies) ----

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogResponse {
    pub movies: Vec<ApiMovie>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiMovie {
    #[serde(default)]
    pub id: Option<ApiScalar>,
    #[serde(default)]
    pub primary_title: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub rating: Option<ApiRating>,
    #[serde(default)]
    pub title_type: Option<String>,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_year: Option<ApiScalar>,
    #[serde(default)]
    pub runtime: Option<ApiScalar>,
    /// JSON-encoded array of names, serialized a second time by the backend.
    #[serde(default)]
    pub actors: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiRating {
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub num_votes: Option<u64>,
}

/// The backend is not consistent about numbers vs strings for ids and years.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ApiScalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ApiScalar {
    pub(crate) fn as_text(&self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.trim().to_string(),
        }
    }

    fn as_u32(&self) -> Option<u32> {
        match self {
            Self::Int(n) => u32::try_from(*n).ok(),
            Self::Float(f) if f.is_finite() && *f >= 0.0 => Some(f.round() as u32),
            Self::Float(_) => None,
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Error)]
pub enum MovieError {
    #[error("catalog record #{index} is missing `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("catalog record `{id}` has an unreadable actor list: {source}")]
    BadActors {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

const NOT_AVAILABLE: &str = "N/A";

impl ApiMovie {
    /// Validate and convert. `index` only feeds the error message.
    pub fn into_movie(self, index: usize) -> Result<Movie, MovieError> {
        let id = self
            .id
            .map(|v| v.as_text())
            .filter(|s| !s.is_empty())
            .ok_or(MovieError::MissingField { index, field: "id" })?;
        let title = self
            .primary_title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(MovieError::MissingField {
                index,
                field: "primary_title",
            })?;

        let actors = match self.actors.as_deref().map(str::trim) {
            None | Some("") => Vec::new(),
            Some(raw) => serde_json::from_str::<Vec<String>>(raw).map_err(|source| {
                MovieError::BadActors {
                    id: id.clone(),
                    source,
                }
            })?,
        };

        let rating = self.rating.unwrap_or_default();
        let description = self
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let release_date = self
            .start_year
            .map(|y| y.as_text())
            .filter(|y| !y.is_empty())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        Ok(Movie {
            id,
            title,
            image_url: self.poster_url.unwrap_or_default().trim().to_string(),
            rating: rating
                .average_rating
                .filter(|r| r.is_finite())
                .unwrap_or(0.0)
                .clamp(0.0, 10.0),
            votes: rating.num_votes.unwrap_or(0),
            kind: self.title_type.unwrap_or_default(),
            genres: self
                .genres
                .unwrap_or_default()
                .into_iter()
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty())
                .collect(),
            description,
            release_date,
            runtime: self.runtime.and_then(|r| r.as_u32()).unwrap_or(0),
            actors,
        })
    }
}

impl TryFrom<ApiMovie> for Movie {
    type Error = MovieError;

    fn try_from(raw: ApiMovie) -> Result<Self, Self::Error> {
        raw.into_movie(0)
    }
}

/// All-or-nothing: one bad record rejects the whole page.
pub fn normalize_catalog(resp: CatalogResponse) -> Result<Vec<Movie>, MovieError> {
    resp.movies
        .into_iter()
        .enumerate()
        .map(|(i, m)| m.into_movie(i))
        .collect()
}
