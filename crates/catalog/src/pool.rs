//! Candidate gathering for a round.
//!
//! Combines catalog discovery with the group's saved watchlist into one
//! deduplicated candidate set. Discovery pages are fetched concurrently; a
//! failed page fails the whole gather so callers never see a partial pool.
//!
//! Discovery results may arrive without a certification. Those are resolved
//! through `movie_details` before the pool is returned, so every candidate
//! carries the catalog's own rating rather than whatever the query asked for.

use model::{Movie, MovieId, Provenance};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, instrument};

use crate::provider::{CatalogError, CatalogProvider};
use crate::types::{Candidate, CatalogPage, DiscoverQuery, GroupConstraints};

/// Fetches candidates for one set of constraints.
#[derive(Clone)]
pub struct CandidatePool {
    catalog: Arc<dyn CatalogProvider>,
    /// Discovery pages fetched per gather
    pages: u32,
}

impl CandidatePool {
    pub fn new(catalog: Arc<dyn CatalogProvider>) -> Self {
        Self { catalog, pages: 2 }
    }

    /// Configure how many discovery pages to fetch per gather (default: 2)
    pub fn with_pages(mut self, pages: u32) -> Self {
        self.pages = pages.max(1);
        self
    }

    /// Gather candidates matching `constraints`.
    ///
    /// Movies in `excluded` never appear. Watchlist entries are tagged
    /// [`Provenance::Watchlist`] and take precedence over the same movie
    /// found through discovery. The result is ordered by movie id.
    #[instrument(skip_all, fields(provider = self.catalog.name(), pages = self.pages))]
    pub async fn gather(
        &self,
        constraints: &GroupConstraints,
        excluded: &HashSet<MovieId>,
        watchlist: &[Movie],
    ) -> Result<Vec<Candidate>, CatalogError> {
        let discovered = self.fetch_pages(constraints).await?;

        let mut by_id: HashMap<MovieId, Candidate> = HashMap::new();
        for movie in discovered {
            if excluded.contains(&movie.id) {
                continue;
            }
            by_id
                .entry(movie.id)
                .or_insert_with(|| Candidate::new(movie, Provenance::Algorithm));
        }
        self.resolve_ratings(&mut by_id).await?;

        for movie in watchlist {
            if excluded.contains(&movie.id) {
                continue;
            }
            by_id.insert(movie.id, Candidate::new(movie.clone(), Provenance::Watchlist));
        }

        let mut candidates: Vec<Candidate> = by_id.into_values().collect();
        candidates.sort_by_key(|c| c.movie_id());

        debug!(
            candidates = candidates.len(),
            watchlist = watchlist.len(),
            "Gathered candidate pool"
        );
        Ok(candidates)
    }

    async fn fetch_pages(&self, constraints: &GroupConstraints) -> Result<Vec<Movie>, CatalogError> {
        let mut tasks = JoinSet::new();
        for page in 1..=self.pages {
            let catalog = Arc::clone(&self.catalog);
            let query = DiscoverQuery::from_constraints(constraints, page);
            tasks.spawn(async move { catalog.discover(&query).await });
        }

        let mut pages: Vec<CatalogPage> = Vec::with_capacity(self.pages as usize);
        while let Some(joined) = tasks.join_next().await {
            let page = joined.map_err(|e| CatalogError::Task(e.to_string()))??;
            pages.push(page);
        }

        // Page order keeps the merge deterministic
        pages.sort_by_key(|p| p.page);
        Ok(pages.into_iter().flat_map(|p| p.results).collect())
    }

    /// Fill in missing certifications from the detail endpoint.
    ///
    /// A movie the catalog has no certification for stays unrated.
    async fn resolve_ratings(
        &self,
        by_id: &mut HashMap<MovieId, Candidate>,
    ) -> Result<(), CatalogError> {
        let mut tasks = JoinSet::new();
        for candidate in by_id.values() {
            if candidate.movie.content_rating.is_some() {
                continue;
            }
            let catalog = Arc::clone(&self.catalog);
            let id = candidate.movie_id();
            tasks.spawn(async move { (id, catalog.movie_details(id).await) });
        }
        if tasks.is_empty() {
            return Ok(());
        }

        let mut resolved = 0usize;
        while let Some(joined) = tasks.join_next().await {
            let (id, details) = joined.map_err(|e| CatalogError::Task(e.to_string()))?;
            let rating = details?.and_then(|movie| movie.content_rating);
            if let (Some(rating), Some(candidate)) = (rating, by_id.get_mut(&id)) {
                candidate.movie.content_rating = Some(rating);
                resolved += 1;
            }
        }
        debug!(resolved, "Resolved certifications from movie details");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::FileCatalog;
    use async_trait::async_trait;
    use model::{ContentRating, Genre};

    fn create_test_catalog() -> Arc<dyn CatalogProvider> {
        Arc::new(FileCatalog::new(vec![
            Movie::new(1, "Paddington")
                .with_genres([Genre::Family, Genre::Comedy])
                .with_rating(ContentRating::Pg)
                .with_popularity(50.0),
            Movie::new(2, "Up")
                .with_genres([Genre::Animation, Genre::Family])
                .with_rating(ContentRating::Pg)
                .with_popularity(80.0),
            Movie::new(3, "Alien")
                .with_genres([Genre::Horror, Genre::SciFi])
                .with_rating(ContentRating::R)
                .with_popularity(70.0),
        ]))
    }

    #[tokio::test]
    async fn test_gather_excludes_and_dedupes() {
        let pool = CandidatePool::new(create_test_catalog());
        let excluded: HashSet<MovieId> = [3].into();
        let watchlist = vec![Movie::new(2, "Up"), Movie::new(9, "Watchlist Only")];

        let candidates = pool
            .gather(&GroupConstraints::default(), &excluded, &watchlist)
            .await
            .unwrap();

        let ids: Vec<MovieId> = candidates.iter().map(|c| c.movie_id()).collect();
        assert_eq!(ids, vec![1, 2, 9]);
        assert_eq!(candidates[0].provenance, Provenance::Algorithm);
        assert_eq!(candidates[1].provenance, Provenance::Watchlist);
        assert_eq!(candidates[2].provenance, Provenance::Watchlist);
    }

    #[tokio::test]
    async fn test_gather_applies_constraints_to_discovery() {
        let pool = CandidatePool::new(create_test_catalog()).with_pages(3);
        let constraints = GroupConstraints {
            max_rating: Some(ContentRating::Pg13),
            ..Default::default()
        };

        let candidates = pool
            .gather(&constraints, &HashSet::new(), &[])
            .await
            .unwrap();
        assert_eq!(candidates.len(), 2);
    }

    struct FailingCatalog;

    #[async_trait]
    impl CatalogProvider for FailingCatalog {
        fn name(&self) -> &str {
            "failing"
        }

        async fn discover(&self, query: &DiscoverQuery) -> Result<CatalogPage, CatalogError> {
            if query.page == 2 {
                return Err(CatalogError::Status {
                    status: 503,
                    url: "test".into(),
                });
            }
            Ok(CatalogPage {
                page: query.page,
                total_pages: 2,
                results: vec![Movie::new(query.page, "Page movie")],
            })
        }

        async fn movie_details(&self, _id: MovieId) -> Result<Option<Movie>, CatalogError> {
            Ok(None)
        }
    }

    /// Discovery without certifications; details know the real ones.
    struct UncertifiedCatalog;

    #[async_trait]
    impl CatalogProvider for UncertifiedCatalog {
        fn name(&self) -> &str {
            "uncertified"
        }

        async fn discover(&self, query: &DiscoverQuery) -> Result<CatalogPage, CatalogError> {
            let results = if query.page == 1 {
                vec![Movie::new(1, "Bluey"), Movie::new(2, "Unrated Short")]
            } else {
                Vec::new()
            };
            Ok(CatalogPage {
                page: query.page,
                total_pages: 1,
                results,
            })
        }

        async fn movie_details(&self, id: MovieId) -> Result<Option<Movie>, CatalogError> {
            Ok(match id {
                1 => Some(Movie::new(1, "Bluey").with_rating(ContentRating::G)),
                2 => Some(Movie::new(2, "Unrated Short")),
                _ => None,
            })
        }
    }

    #[tokio::test]
    async fn test_gather_resolves_certifications_from_details() {
        let pool = CandidatePool::new(Arc::new(UncertifiedCatalog));
        let constraints = GroupConstraints {
            max_rating: Some(ContentRating::Pg),
            ..Default::default()
        };

        let candidates = pool
            .gather(&constraints, &HashSet::new(), &[])
            .await
            .unwrap();

        let ratings: Vec<_> = candidates
            .iter()
            .map(|c| (c.movie_id(), c.movie.content_rating))
            .collect();
        // The query's PG ceiling is never stamped onto results
        assert_eq!(ratings, vec![(1, Some(ContentRating::G)), (2, None)]);
    }

    #[tokio::test]
    async fn test_failed_page_fails_gather() {
        let pool = CandidatePool::new(Arc::new(FailingCatalog));
        let result = pool
            .gather(&GroupConstraints::default(), &HashSet::new(), &[])
            .await;
        assert!(matches!(result, Err(CatalogError::Status { status: 503, .. })));
    }
}
