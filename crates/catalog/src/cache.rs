//! TTL cache in front of a catalog provider.

use async_trait::async_trait;
use model::{Movie, MovieId};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::provider::{CatalogError, CatalogProvider};
use crate::types::{CatalogPage, DiscoverQuery};

/// Caches discovery pages and movie details by query content.
///
/// Only successful responses are cached. A miss, or an expired entry, always
/// falls through to the wrapped provider.
pub struct CachedCatalog {
    inner: Arc<dyn CatalogProvider>,
    pages: Cache<DiscoverQuery, Arc<CatalogPage>>,
    details: Cache<MovieId, Arc<Option<Movie>>>,
}

impl CachedCatalog {
    pub fn new(inner: Arc<dyn CatalogProvider>, max_capacity: u64, ttl: Duration) -> Self {
        let pages = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        let details = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        Self {
            inner,
            pages,
            details,
        }
    }
}

#[async_trait]
impl CatalogProvider for CachedCatalog {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn discover(&self, query: &DiscoverQuery) -> Result<CatalogPage, CatalogError> {
        if let Some(page) = self.pages.get(query).await {
            debug!(page = query.page, "Catalog page cache hit");
            return Ok(page.as_ref().clone());
        }

        let page = self.inner.discover(query).await?;
        self.pages
            .insert(query.clone(), Arc::new(page.clone()))
            .await;
        Ok(page)
    }

    async fn movie_details(&self, id: MovieId) -> Result<Option<Movie>, CatalogError> {
        if let Some(movie) = self.details.get(&id).await {
            return Ok(movie.as_ref().clone());
        }

        let movie = self.inner.movie_details(id).await?;
        self.details.insert(id, Arc::new(movie.clone())).await;
        Ok(movie)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and fails on demand.
    #[derive(Default)]
    struct CountingCatalog {
        discover_calls: AtomicUsize,
        fail: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl CatalogProvider for CountingCatalog {
        fn name(&self) -> &str {
            "counting"
        }

        async fn discover(&self, query: &DiscoverQuery) -> Result<CatalogPage, CatalogError> {
            self.discover_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(CatalogError::Task("boom".into()));
            }
            Ok(CatalogPage {
                page: query.page,
                total_pages: 1,
                results: vec![Movie::new(query.page, "Movie")],
            })
        }

        async fn movie_details(&self, id: MovieId) -> Result<Option<Movie>, CatalogError> {
            Ok(Some(Movie::new(id, "Detail")))
        }
    }

    fn query(page: u32) -> DiscoverQuery {
        DiscoverQuery {
            with_genres: Default::default(),
            without_genres: Default::default(),
            max_rating: None,
            page,
        }
    }

    #[tokio::test]
    async fn test_repeated_query_hits_cache() {
        let inner = Arc::new(CountingCatalog::default());
        let cached = CachedCatalog::new(inner.clone(), 100, Duration::from_secs(60));

        cached.discover(&query(1)).await.unwrap();
        cached.discover(&query(1)).await.unwrap();
        assert_eq!(inner.discover_calls.load(Ordering::SeqCst), 1);

        // Different content, different key
        cached.discover(&query(2)).await.unwrap();
        assert_eq!(inner.discover_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let inner = Arc::new(CountingCatalog::default());
        let cached = CachedCatalog::new(inner.clone(), 100, Duration::from_secs(60));

        inner.fail.store(true, Ordering::SeqCst);
        assert!(cached.discover(&query(1)).await.is_err());

        inner.fail.store(false, Ordering::SeqCst);
        let page = cached.discover(&query(1)).await.unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(inner.discover_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_entries_fall_through() {
        let inner = Arc::new(CountingCatalog::default());
        let cached = CachedCatalog::new(inner.clone(), 100, Duration::from_millis(50));

        cached.discover(&query(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        cached.discover(&query(1)).await.unwrap();
        assert_eq!(inner.discover_calls.load(Ordering::SeqCst), 2);
    }
}
