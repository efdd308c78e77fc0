//! Filter to keep only movies overlapping the group's liked genres.

use crate::traits::Filter;
use catalog::{Candidate, GroupConstraints};
use model::Result;

/// Keeps candidates sharing at least one genre with the liked set.
///
/// An empty liked set is no requirement at all.
pub struct LikedGenreFilter;

impl Filter for LikedGenreFilter {
    fn name(&self) -> &str {
        "LikedGenreFilter"
    }

    fn apply(
        &self,
        candidates: Vec<Candidate>,
        constraints: &GroupConstraints,
    ) -> Result<Vec<Candidate>> {
        if constraints.liked_genres.is_empty() {
            return Ok(candidates);
        }

        Ok(candidates
            .into_iter()
            .filter(|c| {
                c.movie
                    .genres
                    .iter()
                    .any(|g| constraints.liked_genres.contains(g))
            })
            .collect())
    }
}
