//! Ordered filter chains.
//!
//! The relaxation engine builds one pipeline per pass from whichever
//! constraints are still active.

use crate::traits::Filter;
use catalog::{Candidate, GroupConstraints};
use model::Result;
use tracing;

/// Filters applied one after another to a candidate set.
///
/// ## Usage
/// ```ignore
/// let pipeline = FilterPipeline::new()
///     .add_filter(ContentRatingFilter)
///     .add_filter(DislikedGenreFilter)
///     .add_filter(LikedGenreFilter);
///
/// let filtered = pipeline.apply(candidates, &constraints)?;
/// ```
pub struct FilterPipeline {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Append a filter; filters run in the order they were added.
    pub fn add_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Apply all filters in insertion order, stopping at the first error.
    pub fn apply(
        &self,
        candidates: Vec<Candidate>,
        constraints: &GroupConstraints,
    ) -> Result<Vec<Candidate>> {
        let mut current = candidates;
        for filter in &self.filters {
            let before = current.len();
            current = filter.apply(current, constraints)?;
            tracing::debug!(
                "Filter applied: {} ({} -> {})",
                filter.name(),
                before,
                current.len()
            );
        }
        Ok(current)
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::test_support::{candidate, ids};
    use crate::filters::{ContentRatingFilter, DislikedGenreFilter, LikedGenreFilter};
    use model::{ContentRating, Genre};

    #[test]
    fn test_empty_pipeline() {
        let pipeline = FilterPipeline::new();
        let candidates = vec![
            candidate(1, &[Genre::Horror], Some(ContentRating::R)),
            candidate(2, &[Genre::Family], None),
        ];

        let filtered = pipeline
            .apply(candidates, &GroupConstraints::default())
            .unwrap();
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_full_pipeline() {
        let constraints = GroupConstraints {
            liked_genres: [Genre::Comedy].into(),
            disliked_genres: [Genre::Horror].into(),
            max_rating: Some(ContentRating::Pg13),
        };
        let pipeline = FilterPipeline::new()
            .add_filter(ContentRatingFilter)
            .add_filter(DislikedGenreFilter)
            .add_filter(LikedGenreFilter);

        let candidates = vec![
            candidate(1, &[Genre::Comedy], Some(ContentRating::Pg)),
            candidate(2, &[Genre::Comedy], Some(ContentRating::R)),
            candidate(3, &[Genre::Comedy, Genre::Horror], Some(ContentRating::Pg)),
            candidate(4, &[Genre::Drama], Some(ContentRating::G)),
        ];

        let filtered = pipeline.apply(candidates, &constraints).unwrap();
        assert_eq!(pipeline.len(), 3);
        assert_eq!(ids(&filtered), vec![1]);
    }
}
