//! Constraint relaxation for slate generation.
//!
//! A pass gathers candidates for the active constraints and runs them
//! through the filters in fixed order: rating ceiling, disliked genres,
//! liked genres. While a pass leaves fewer candidates than the slate needs,
//! the next pass drops the liked-genre requirement, then the disliked-genre
//! exclusion. The ceiling is never dropped.

use catalog::{Candidate, CandidatePool, GroupConstraints};
use model::{Movie, MovieId, Provenance, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument};

use crate::filter_pipeline::FilterPipeline;
use crate::filters::{ContentRatingFilter, DislikedGenreFilter, LikedGenreFilter};

/// A single taste constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constraint {
    ContentRating,
    DislikedGenres,
    LikedGenres,
}

impl Constraint {
    /// Relaxation order, first dropped first. The ceiling is absent.
    pub const RELAXABLE: [Constraint; 2] = [Constraint::LikedGenres, Constraint::DislikedGenres];

    /// Name reported to callers when this constraint is relaxed.
    pub fn relaxation_name(self) -> &'static str {
        match self {
            Constraint::ContentRating => "content_rating_ceiling",
            Constraint::DislikedGenres => "disliked_genre_exclusion",
            Constraint::LikedGenres => "liked_genre_requirement",
        }
    }
}

/// Which constraints a pass enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveConstraints {
    pub content_rating: bool,
    pub disliked_genres: bool,
    pub liked_genres: bool,
}

impl Default for ActiveConstraints {
    fn default() -> Self {
        Self {
            content_rating: true,
            disliked_genres: true,
            liked_genres: true,
        }
    }
}

impl ActiveConstraints {
    pub fn is_enabled(&self, constraint: Constraint) -> bool {
        match constraint {
            Constraint::ContentRating => self.content_rating,
            Constraint::DislikedGenres => self.disliked_genres,
            Constraint::LikedGenres => self.liked_genres,
        }
    }

    pub fn without(mut self, constraint: Constraint) -> Self {
        match constraint {
            Constraint::ContentRating => self.content_rating = false,
            Constraint::DislikedGenres => self.disliked_genres = false,
            Constraint::LikedGenres => self.liked_genres = false,
        }
        self
    }

    /// The subset of `constraints` this pass enforces.
    pub fn restrict(&self, constraints: &GroupConstraints) -> GroupConstraints {
        GroupConstraints {
            liked_genres: if self.liked_genres {
                constraints.liked_genres.clone()
            } else {
                Default::default()
            },
            disliked_genres: if self.disliked_genres {
                constraints.disliked_genres.clone()
            } else {
                Default::default()
            },
            max_rating: constraints.max_rating.filter(|_| self.content_rating),
        }
    }

    /// Filters for the enabled constraints, in application order.
    pub fn pipeline(&self) -> FilterPipeline {
        let mut pipeline = FilterPipeline::new();
        if self.content_rating {
            pipeline = pipeline.add_filter(ContentRatingFilter);
        }
        if self.disliked_genres {
            pipeline = pipeline.add_filter(DislikedGenreFilter);
        }
        if self.liked_genres {
            pipeline = pipeline.add_filter(LikedGenreFilter);
        }
        pipeline
    }
}

/// Candidates surviving relaxation, with the relaxations that were needed.
#[derive(Debug, Clone, Default)]
pub struct RelaxationOutcome {
    /// Ordered by movie id
    pub candidates: Vec<Candidate>,
    /// Relaxation names in the order applied; only those that changed the count
    pub relaxed: Vec<String>,
}

/// Runs filter passes over the candidate pool until the slate can be filled
/// or nothing is left to relax.
pub struct ConstraintRelaxationEngine {
    pool: CandidatePool,
    slate_size: usize,
    active: ActiveConstraints,
}

impl ConstraintRelaxationEngine {
    pub fn new(pool: CandidatePool, slate_size: usize) -> Self {
        Self {
            pool,
            slate_size,
            active: ActiveConstraints::default(),
        }
    }

    /// Start from a different set of enabled constraints (default: all).
    pub fn with_active(mut self, active: ActiveConstraints) -> Self {
        self.active = active;
        self
    }

    /// Produce the candidate set for a round.
    ///
    /// Zero surviving candidates is a normal outcome. Catalog failures in any
    /// pass fail the whole run.
    #[instrument(skip_all, fields(slate_size = self.slate_size))]
    pub async fn run(
        &self,
        constraints: &GroupConstraints,
        excluded: &HashSet<MovieId>,
        watchlist: &[Movie],
    ) -> Result<RelaxationOutcome> {
        let mut active = self.active;
        let mut candidates = self.pass(constraints, active, excluded, watchlist).await?;
        let mut relaxed = Vec::new();

        for constraint in Constraint::RELAXABLE {
            if candidates.len() >= self.slate_size {
                break;
            }
            if !active.is_enabled(constraint) {
                continue;
            }

            active = active.without(constraint);
            let before = candidates.len();
            let loosened = self.pass(constraints, active, excluded, watchlist).await?;
            candidates = merge(candidates, loosened);

            if candidates.len() != before {
                info!(
                    relaxed = constraint.relaxation_name(),
                    before,
                    after = candidates.len(),
                    "Relaxed constraint"
                );
                relaxed.push(constraint.relaxation_name().to_string());
            } else {
                debug!(
                    constraint = constraint.relaxation_name(),
                    "Relaxation did not change the pool"
                );
            }
        }

        Ok(RelaxationOutcome {
            candidates,
            relaxed,
        })
    }

    async fn pass(
        &self,
        constraints: &GroupConstraints,
        active: ActiveConstraints,
        excluded: &HashSet<MovieId>,
        watchlist: &[Movie],
    ) -> Result<Vec<Candidate>> {
        let effective = active.restrict(constraints);
        let gathered = self.pool.gather(&effective, excluded, watchlist).await?;
        active.pipeline().apply(gathered, &effective)
    }
}

/// Union of two passes. Every earlier survivor also satisfies the looser
/// pass, so keeping them means relaxing never shrinks the pool.
fn merge(previous: Vec<Candidate>, loosened: Vec<Candidate>) -> Vec<Candidate> {
    let mut by_id: HashMap<MovieId, Candidate> = HashMap::new();
    for candidate in previous.into_iter().chain(loosened) {
        by_id
            .entry(candidate.movie_id())
            .and_modify(|existing| {
                if candidate.provenance == Provenance::Watchlist {
                    existing.provenance = Provenance::Watchlist;
                }
            })
            .or_insert(candidate);
    }

    let mut merged: Vec<Candidate> = by_id.into_values().collect();
    merged.sort_by_key(|c| c.movie_id());
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::{CatalogProvider, FileCatalog};
    use model::{ContentRating, Genre};
    use std::sync::Arc;

    fn movie(id: MovieId, genres: &[Genre], rating: ContentRating) -> Movie {
        Movie::new(id, format!("Movie {id}"))
            .with_genres(genres.iter().copied())
            .with_rating(rating)
            .with_popularity(100.0 - id as f32)
    }

    fn engine(movies: Vec<Movie>, slate_size: usize) -> ConstraintRelaxationEngine {
        let catalog: Arc<dyn CatalogProvider> = Arc::new(FileCatalog::new(movies));
        ConstraintRelaxationEngine::new(CandidatePool::new(catalog), slate_size)
    }

    fn comedy_lovers() -> GroupConstraints {
        GroupConstraints {
            liked_genres: [Genre::Comedy].into(),
            disliked_genres: [Genre::Horror].into(),
            max_rating: Some(ContentRating::Pg),
        }
    }

    #[tokio::test]
    async fn test_no_relaxation_when_slate_fills() {
        let movies = (1..=6)
            .map(|id| movie(id, &[Genre::Comedy], ContentRating::G))
            .collect();
        let outcome = engine(movies, 5)
            .run(&comedy_lovers(), &HashSet::new(), &[])
            .await
            .unwrap();

        assert_eq!(outcome.candidates.len(), 6);
        assert!(outcome.relaxed.is_empty());
    }

    #[tokio::test]
    async fn test_liked_requirement_relaxed_first() {
        let movies = vec![
            movie(1, &[Genre::Drama], ContentRating::G),
            movie(2, &[Genre::Family], ContentRating::Pg),
            movie(3, &[Genre::Horror], ContentRating::Pg),
        ];
        let outcome = engine(movies, 5)
            .run(&comedy_lovers(), &HashSet::new(), &[])
            .await
            .unwrap();

        let ids: Vec<MovieId> = outcome.candidates.iter().map(|c| c.movie_id()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(
            outcome.relaxed,
            vec!["liked_genre_requirement", "disliked_genre_exclusion"]
        );
    }

    #[tokio::test]
    async fn test_ceiling_never_relaxed() {
        let movies = vec![
            movie(1, &[Genre::Comedy], ContentRating::R),
            movie(2, &[Genre::Horror], ContentRating::Nc17),
        ];
        let outcome = engine(movies, 5)
            .run(&comedy_lovers(), &HashSet::new(), &[])
            .await
            .unwrap();

        assert!(outcome.candidates.is_empty());
        assert!(outcome.relaxed.is_empty());
    }

    #[tokio::test]
    async fn test_unchanged_count_not_reported() {
        // Nothing disliked is in the catalog, so dropping the exclusion adds nothing
        let movies = vec![
            movie(1, &[Genre::Comedy], ContentRating::G),
            movie(2, &[Genre::Drama], ContentRating::G),
        ];
        let outcome = engine(movies, 5)
            .run(&comedy_lovers(), &HashSet::new(), &[])
            .await
            .unwrap();

        assert_eq!(outcome.candidates.len(), 2);
        assert_eq!(outcome.relaxed, vec!["liked_genre_requirement"]);
    }

    #[tokio::test]
    async fn test_disabled_constraint_is_skipped() {
        let movies = vec![movie(1, &[Genre::Drama], ContentRating::G)];
        let active = ActiveConstraints::default().without(Constraint::LikedGenres);
        let outcome = engine(movies, 5)
            .with_active(active)
            .run(&comedy_lovers(), &HashSet::new(), &[])
            .await
            .unwrap();

        assert_eq!(outcome.candidates.len(), 1);
        assert!(outcome.relaxed.is_empty());
    }

    #[test]
    fn test_restrict_keeps_ceiling() {
        let active = ActiveConstraints::default()
            .without(Constraint::LikedGenres)
            .without(Constraint::DislikedGenres);
        let restricted = active.restrict(&comedy_lovers());

        assert!(restricted.liked_genres.is_empty());
        assert!(restricted.disliked_genres.is_empty());
        assert_eq!(restricted.max_rating, Some(ContentRating::Pg));
        assert_eq!(active.pipeline().len(), 1);
    }
}
