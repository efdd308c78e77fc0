//! Filter to remove movies in any genre an attendee dislikes.

use crate::traits::Filter;
use catalog::{Candidate, GroupConstraints};
use model::Result;

pub struct DislikedGenreFilter;

impl Filter for DislikedGenreFilter {
    fn name(&self) -> &str {
        "DislikedGenreFilter"
    }

    fn apply(
        &self,
        candidates: Vec<Candidate>,
        constraints: &GroupConstraints,
    ) -> Result<Vec<Candidate>> {
        if constraints.disliked_genres.is_empty() {
            return Ok(candidates);
        }

        Ok(candidates
            .into_iter()
            .filter(|c| {
                !c.movie
                    .genres
                    .iter()
                    .any(|g| constraints.disliked_genres.contains(g))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::test_support::{candidate, ids};
    use model::Genre;

    #[test]
    fn test_disliked_genre_filter() {
        let constraints = GroupConstraints {
            disliked_genres: [Genre::Horror, Genre::War].into(),
            ..Default::default()
        };
        let candidates = vec![
            candidate(1, &[Genre::Comedy], None),
            candidate(2, &[Genre::Comedy, Genre::Horror], None),
            candidate(3, &[Genre::War], None),
            candidate(4, &[], None),
        ];

        let filtered = DislikedGenreFilter.apply(candidates, &constraints).unwrap();
        assert_eq!(ids(&filtered), vec![1, 4]);
    }
}
