//! Merge attendee taste profiles into round-wide constraints.
//!
//! A family round is exactly as permissive as its most restrictive member:
//! likes and dislikes are unioned, and the lowest content-rating ceiling
//! wins. Attendees without a stored profile contribute nothing.

use model::PreferenceProfile;
use tracing::debug;

use crate::types::GroupConstraints;

pub struct PreferenceAggregator;

impl PreferenceAggregator {
    pub fn aggregate<'a>(
        profiles: impl IntoIterator<Item = &'a PreferenceProfile>,
    ) -> GroupConstraints {
        let mut constraints = GroupConstraints::default();
        let mut count = 0;

        for profile in profiles {
            count += 1;
            constraints
                .liked_genres
                .extend(profile.liked_genres.iter().copied());
            constraints
                .disliked_genres
                .extend(profile.disliked_genres.iter().copied());

            constraints.max_rating = match (constraints.max_rating, profile.max_rating) {
                (Some(current), Some(ceiling)) => Some(current.min(ceiling)),
                (current, ceiling) => current.or(ceiling),
            };
        }

        debug!(
            profiles = count,
            liked = constraints.liked_genres.len(),
            disliked = constraints.disliked_genres.len(),
            max_rating = ?constraints.max_rating,
            "Aggregated group preferences"
        );
        constraints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{ContentRating, Genre};
    use uuid::Uuid;

    fn profile(
        liked: &[Genre],
        disliked: &[Genre],
        max_rating: Option<ContentRating>,
    ) -> PreferenceProfile {
        PreferenceProfile::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            liked.iter().copied(),
            disliked.iter().copied(),
            max_rating,
        )
        .unwrap()
    }

    #[test]
    fn test_most_restrictive_ceiling_wins() {
        let profiles = [
            profile(&[Genre::Action], &[], Some(ContentRating::Pg13)),
            profile(&[Genre::Animation], &[Genre::Horror], Some(ContentRating::G)),
            profile(&[], &[], None),
        ];
        let constraints = PreferenceAggregator::aggregate(&profiles);

        assert_eq!(constraints.max_rating, Some(ContentRating::G));
        assert_eq!(constraints.liked_genres.len(), 2);
        assert!(constraints.disliked_genres.contains(&Genre::Horror));
    }

    #[test]
    fn test_no_profiles_is_unconstrained() {
        let constraints = PreferenceAggregator::aggregate(std::iter::empty());
        assert_eq!(constraints, GroupConstraints::default());
    }

    #[test]
    fn test_likes_and_dislikes_may_overlap_across_members() {
        let profiles = [
            profile(&[Genre::Horror], &[], None),
            profile(&[], &[Genre::Horror], None),
        ];
        let constraints = PreferenceAggregator::aggregate(&profiles);
        assert!(constraints.liked_genres.contains(&Genre::Horror));
        assert!(constraints.disliked_genres.contains(&Genre::Horror));
    }
}
