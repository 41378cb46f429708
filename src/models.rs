//! Data structures for title lookup
//!
//! Search results carry the external (IMDb) id that Stremio deep links are
//! keyed on, so a search hit can be played without a second lookup.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Media Kind
// =============================================================================

/// Movie or TV series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Tv,
}

impl MediaKind {
    /// TMDB path segment (`/search/{kind}`, `/{kind}/{id}/external_ids`)
    pub fn tmdb_path(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Tv => "tv",
        }
    }

    /// Stremio content type used in deep links
    pub fn stremio_type(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Tv => "series",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Movie => write!(f, "Movie"),
            MediaKind::Tv => write!(f, "TV Show"),
        }
    }
}

// =============================================================================
// Search Result
// =============================================================================

/// A resolved title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub year: Option<u16>,
    /// IMDb id (`tt...`), absent when TMDB has no mapping
    pub external_id: Option<String>,
    pub media_kind: MediaKind,
    pub tmdb_id: u64,
}

impl SearchResult {
    /// Whether this result can be turned into a deep link
    pub fn is_playable(&self) -> bool {
        self.external_id.is_some()
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year_str = self.year.map(|y| format!(" ({})", y)).unwrap_or_default();
        let id = self.external_id.as_deref().unwrap_or("N/A");
        write!(
            f,
            "{}{} [{}] IMDb: {}",
            self.title, year_str, self.media_kind, id
        )
    }
}
