//! TMDB (The Movie Database) API client
//!
//! Resolves a free-text title to IMDb ids, which is what Stremio deep links
//! are keyed on.
//! API docs: https://developer.themoviedb.org/docs

use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::models::{MediaKind, SearchResult};

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

/// TMDB API error types
#[derive(Error, Debug)]
pub enum TmdbError {
    #[error("TMDB API key is not configured (set TMDB_API_KEY)")]
    MissingApiKey,

    #[error("Resource not found (404)")]
    NotFound,

    #[error("Rate limited (429), retries exhausted")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(u16),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

/// TMDB API client
pub struct TmdbClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl TmdbClient {
    /// Create a new TMDB client with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing)
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            max_retries: 3,
        }
    }

    /// GET with the API key attached, retrying on rate limits
    async fn get<T: for<'de> Deserialize<'de>>(&self, endpoint: &str) -> Result<T, TmdbError> {
        if self.api_key.is_empty() {
            return Err(TmdbError::MissingApiKey);
        }

        let url = format!("{}{}", self.base_url, endpoint);
        let mut retries = 0;

        loop {
            let response = self
                .client
                .get(&url)
                .query(&[("api_key", self.api_key.as_str())])
                .header("Accept", "application/json")
                .send()
                .await?;

            match response.status() {
                StatusCode::OK => {
                    let body = response.text().await?;
                    return serde_json::from_str(&body).map_err(|e| {
                        TmdbError::InvalidResponse(format!("JSON parse error: {}", e))
                    });
                }
                StatusCode::NOT_FOUND => return Err(TmdbError::NotFound),
                StatusCode::TOO_MANY_REQUESTS => {
                    retries += 1;
                    if retries >= self.max_retries {
                        return Err(TmdbError::RateLimited);
                    }

                    // Retry-After header, else exponential backoff
                    let wait_secs = response
                        .headers()
                        .get("Retry-After")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(2u64.pow(retries));

                    tracing::debug!(endpoint, retries, wait_secs, "TMDB rate limited");
                    tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                }
                status => return Err(TmdbError::ServerError(status.as_u16())),
            }
        }
    }

    async fn search(
        &self,
        kind: MediaKind,
        query: &str,
        year: Option<u16>,
    ) -> Result<Vec<SearchHit>, TmdbError> {
        let mut endpoint = format!(
            "/search/{}?query={}&include_adult=false",
            kind.tmdb_path(),
            urlencoding::encode(query)
        );
        if let Some(year) = year {
            let key = match kind {
                MediaKind::Movie => "year",
                MediaKind::Tv => "first_air_date_year",
            };
            endpoint.push_str(&format!("&{}={}", key, year));
        }

        let response: SearchResponse = self.get(&endpoint).await?;
        Ok(response.into_hits(kind))
    }

    /// Search movies by title
    pub async fn search_movie(
        &self,
        query: &str,
        year: Option<u16>,
    ) -> Result<Vec<SearchHit>, TmdbError> {
        self.search(MediaKind::Movie, query, year).await
    }

    /// Search TV shows by title (`year` filters on first air date)
    pub async fn search_tv(
        &self,
        query: &str,
        year: Option<u16>,
    ) -> Result<Vec<SearchHit>, TmdbError> {
        self.search(MediaKind::Tv, query, year).await
    }

    /// IMDb id for a TMDB id, if TMDB knows one
    pub async fn external_imdb_id(
        &self,
        kind: MediaKind,
        tmdb_id: u64,
    ) -> Result<Option<String>, TmdbError> {
        let endpoint = format!("/{}/{}/external_ids", kind.tmdb_path(), tmdb_id);
        let ids: ExternalIds = self.get(&endpoint).await?;
        Ok(ids.imdb_id.filter(|id| !id.is_empty()))
    }

    /// Search and attach IMDb ids to the first `limit` hits
    ///
    /// A failed id lookup leaves that result without an id rather than
    /// failing the whole search.
    pub async fn resolve(
        &self,
        query: &str,
        kind: MediaKind,
        year: Option<u16>,
        limit: usize,
    ) -> Result<Vec<SearchResult>, TmdbError> {
        let hits = self.search(kind, query, year).await?;

        let mut results = Vec::new();
        for hit in hits.into_iter().take(limit) {
            let external_id = match self.external_imdb_id(kind, hit.tmdb_id).await {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!(tmdb_id = hit.tmdb_id, error = %e, "external id lookup failed");
                    None
                }
            };
            results.push(SearchResult {
                title: hit.title,
                year: hit.year,
                external_id,
                media_kind: kind,
                tmdb_id: hit.tmdb_id,
            });
        }
        Ok(results)
    }
}

/// Search hit before the IMDb id is known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub tmdb_id: u64,
    pub title: String,
    pub year: Option<u16>,
}

// =============================================================================
// Response Structures (internal deserialization)
// =============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResultRaw>,
}

impl SearchResponse {
    fn into_hits(self, kind: MediaKind) -> Vec<SearchHit> {
        self.results
            .into_iter()
            .map(|r| r.into_hit(kind))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct SearchResultRaw {
    id: u64,
    // Movies use "title", TV uses "name"
    title: Option<String>,
    name: Option<String>,
    // Movies use "release_date", TV uses "first_air_date"
    release_date: Option<String>,
    first_air_date: Option<String>,
}

impl SearchResultRaw {
    fn into_hit(self, kind: MediaKind) -> SearchHit {
        let (title, date) = match kind {
            MediaKind::Movie => (self.title.or(self.name), self.release_date),
            MediaKind::Tv => (self.name.or(self.title), self.first_air_date),
        };
        SearchHit {
            tmdb_id: self.id,
            title: title.unwrap_or_default(),
            year: date.and_then(|d| extract_year(&d)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    imdb_id: Option<String>,
}

/// Extract year from a date string like "2022-03-04"
fn extract_year(date: &str) -> Option<u16> {
    date.get(..4).and_then(|y| y.parse().ok())
}
