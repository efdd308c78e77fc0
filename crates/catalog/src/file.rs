//! Offline catalog backed by a local dump file.

use async_trait::async_trait;
use model::{parse_catalog, Movie, MovieId};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::provider::{CatalogError, CatalogProvider};
use crate::types::{CatalogPage, DiscoverQuery};

/// Results per discovery page, matching the remote API.
pub const PAGE_SIZE: usize = 20;

/// Serves discovery and lookups from an in-memory movie list.
///
/// Discovery applies the query filters locally and pages through matches
/// in popularity order, so it behaves like the remote API for a given dump.
pub struct FileCatalog {
    /// Sorted by popularity desc, then id asc
    movies: Vec<Movie>,
    by_id: HashMap<MovieId, usize>,
}

impl FileCatalog {
    pub fn new(mut movies: Vec<Movie>) -> Self {
        movies.sort_by(|a, b| {
            b.popularity
                .total_cmp(&a.popularity)
                .then_with(|| a.id.cmp(&b.id))
        });
        let by_id = movies
            .iter()
            .enumerate()
            .map(|(idx, m)| (m.id, idx))
            .collect();

        Self { movies, by_id }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let movies = parse_catalog(path)?;
        info!(count = movies.len(), path = %path.display(), "Loaded catalog dump");
        Ok(Self::new(movies))
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }
}

#[async_trait]
impl CatalogProvider for FileCatalog {
    fn name(&self) -> &str {
        "file"
    }

    async fn discover(&self, query: &DiscoverQuery) -> Result<CatalogPage, CatalogError> {
        let matching: Vec<&Movie> = self.movies.iter().filter(|m| query.matches(m)).collect();
        let total_pages = matching.len().div_ceil(PAGE_SIZE) as u32;

        let start = (query.page.max(1) as usize - 1) * PAGE_SIZE;
        let results = matching
            .into_iter()
            .skip(start)
            .take(PAGE_SIZE)
            .cloned()
            .collect();

        Ok(CatalogPage {
            page: query.page,
            total_pages,
            results,
        })
    }

    async fn movie_details(&self, id: MovieId) -> Result<Option<Movie>, CatalogError> {
        Ok(self.by_id.get(&id).map(|&idx| self.movies[idx].clone()))
    }
}
