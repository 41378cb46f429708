//! API clients for external services
//!
//! - TMDB: title search and IMDb id lookup

pub mod tmdb;

pub use tmdb::{SearchHit, TmdbClient, TmdbError};
