//! Stremio deep links
//!
//! ```text
//! stremio:///detail/movie/{id}/{id}
//! stremio:///detail/series/{id}/{id}:{season}:{episode}
//! ```

use std::fmt;
use thiserror::Error;

use crate::models::MediaKind;

/// Scheme registered by the Stremio Android TV app
pub const DEFAULT_SCHEME: &str = "stremio";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeepLinkError {
    #[error("Invalid IMDB ID '{0}' (expected tt followed by 7+ digits)")]
    InvalidImdbId(String),

    #[error("Season and episode are required for TV shows")]
    MissingEpisode,

    #[error("Invalid URI scheme '{0}'")]
    InvalidScheme(String),
}

/// Validate IMDB ID format (tt followed by digits)
pub fn validate_imdb_id(id: &str) -> Result<&str, DeepLinkError> {
    if id.starts_with("tt") && id.len() >= 9 && id[2..].chars().all(|c| c.is_ascii_digit()) {
        Ok(id)
    } else {
        Err(DeepLinkError::InvalidImdbId(id.to_string()))
    }
}

/// Content page inside the app
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepLink {
    Movie {
        imdb_id: String,
    },
    Episode {
        imdb_id: String,
        season: u16,
        episode: u16,
    },
}

impl DeepLink {
    pub fn movie(imdb_id: impl Into<String>) -> Result<Self, DeepLinkError> {
        let imdb_id = imdb_id.into();
        validate_imdb_id(&imdb_id)?;
        Ok(DeepLink::Movie { imdb_id })
    }

    pub fn episode(
        imdb_id: impl Into<String>,
        season: u16,
        episode: u16,
    ) -> Result<Self, DeepLinkError> {
        let imdb_id = imdb_id.into();
        validate_imdb_id(&imdb_id)?;
        Ok(DeepLink::Episode {
            imdb_id,
            season,
            episode,
        })
    }

    /// Build from a media kind and optional episode coordinates
    pub fn for_kind(
        kind: MediaKind,
        imdb_id: impl Into<String>,
        season: Option<u16>,
        episode: Option<u16>,
    ) -> Result<Self, DeepLinkError> {
        match (kind, season, episode) {
            (MediaKind::Movie, _, _) => Self::movie(imdb_id),
            (MediaKind::Tv, Some(s), Some(e)) => Self::episode(imdb_id, s, e),
            (MediaKind::Tv, _, _) => Err(DeepLinkError::MissingEpisode),
        }
    }

    pub fn imdb_id(&self) -> &str {
        match self {
            DeepLink::Movie { imdb_id } | DeepLink::Episode { imdb_id, .. } => imdb_id,
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            DeepLink::Movie { .. } => MediaKind::Movie,
            DeepLink::Episode { .. } => MediaKind::Tv,
        }
    }

    /// Video id segment: the IMDb id, plus `:season:episode` for series
    pub fn video_id(&self) -> String {
        match self {
            DeepLink::Movie { imdb_id } => imdb_id.clone(),
            DeepLink::Episode {
                imdb_id,
                season,
                episode,
            } => format!("{}:{}:{}", imdb_id, season, episode),
        }
    }

    pub fn to_uri(&self, scheme: &str) -> Result<String, DeepLinkError> {
        let valid = scheme
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !valid {
            return Err(DeepLinkError::InvalidScheme(scheme.to_string()));
        }
        Ok(format!(
            "{}:///detail/{}/{}/{}",
            scheme,
            self.kind().stremio_type(),
            self.imdb_id(),
            self.video_id()
        ))
    }
}

impl fmt::Display for DeepLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeepLink::Movie { imdb_id } => write!(f, "movie {}", imdb_id),
            DeepLink::Episode {
                imdb_id,
                season,
                episode,
            } => write!(f, "{} S{:02}E{:02}", imdb_id, season, episode),
        }
    }
}
