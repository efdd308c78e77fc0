//! The catalog provider seam and its error type.

use async_trait::async_trait;
use model::{EngineError, Movie, MovieId};
use thiserror::Error;

use crate::types::{CatalogPage, DiscoverQuery};

/// Errors that can occur when talking to a catalog provider
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Catalog returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Failed to parse catalog response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Failed to read catalog dump: {0}")]
    Dump(#[from] model::ParseError),

    #[error("Catalog fetch task failed: {0}")]
    Task(String),
}

impl From<CatalogError> for EngineError {
    fn from(err: CatalogError) -> Self {
        EngineError::CatalogUnavailable(err.to_string())
    }
}

/// Source of movie records: paged discovery plus per-movie lookups.
///
/// Implementations are shared across concurrent requests, hence `Send + Sync`.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Returns the name of this provider (for logging/debugging)
    fn name(&self) -> &str;

    /// Fetch one page of movies matching the query's filters.
    async fn discover(&self, query: &DiscoverQuery) -> Result<CatalogPage, CatalogError>;

    /// Look up a single movie. `Ok(None)` means the catalog doesn't know it.
    async fn movie_details(&self, id: MovieId) -> Result<Option<Movie>, CatalogError>;
}
