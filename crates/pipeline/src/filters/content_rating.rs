//! Filter enforcing the group's content-rating ceiling.

use crate::traits::Filter;
use catalog::{Candidate, GroupConstraints};
use model::Result;

/// Removes candidates rated above the most restrictive attendee ceiling.
///
/// When a ceiling is set, movies without a certification are removed too:
/// an unknown rating can't be proven safe.
pub struct ContentRatingFilter;

impl Filter for ContentRatingFilter {
    fn name(&self) -> &str {
        "ContentRatingFilter"
    }

    fn apply(
        &self,
        candidates: Vec<Candidate>,
        constraints: &GroupConstraints,
    ) -> Result<Vec<Candidate>> {
        let Some(ceiling) = constraints.max_rating else {
            return Ok(candidates);
        };

        Ok(candidates
            .into_iter()
            .filter(|c| c.movie.content_rating.is_some_and(|r| r <= ceiling))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::test_support::{candidate, ids};
    use model::{ContentRating, Genre};

    #[test]
    fn test_content_rating_filter() {
        let constraints = GroupConstraints {
            max_rating: Some(ContentRating::Pg),
            ..Default::default()
        };
        let candidates = vec![
            candidate(1, &[Genre::Family], Some(ContentRating::G)),
            candidate(2, &[Genre::Family], Some(ContentRating::Pg)),
            candidate(3, &[Genre::Action], Some(ContentRating::Pg13)),
            candidate(4, &[Genre::Action], None),
        ];

        let filtered = ContentRatingFilter.apply(candidates, &constraints).unwrap();
        assert_eq!(ids(&filtered), vec![1, 2]);
    }

    #[test]
    fn test_no_ceiling_keeps_everything() {
        let candidates = vec![
            candidate(1, &[], Some(ContentRating::Nc17)),
            candidate(2, &[], None),
        ];
        let filtered = ContentRatingFilter
            .apply(candidates, &GroupConstraints::default())
            .unwrap();
        assert_eq!(filtered.len(), 2);
    }
}
