//! Candidate and query types shared by the catalog sources and the pipeline.

use model::{ContentRating, Genre, Movie, MovieId, Provenance};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A movie eligible for a round's slate, tagged with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub movie: Movie,
    pub provenance: Provenance,
}

impl Candidate {
    pub fn new(movie: Movie, provenance: Provenance) -> Self {
        Self { movie, provenance }
    }

    pub fn movie_id(&self) -> MovieId {
        self.movie.id
    }
}

/// Taste constraints of a whole round, merged across attendees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConstraints {
    pub liked_genres: BTreeSet<Genre>,
    pub disliked_genres: BTreeSet<Genre>,
    /// Most restrictive ceiling among attendees; `None` when nobody set one.
    pub max_rating: Option<ContentRating>,
}

impl GroupConstraints {
    /// Count of liked genres present minus disliked genres present.
    pub fn taste_match(&self, movie: &Movie) -> i32 {
        let liked = movie
            .genres
            .iter()
            .filter(|g| self.liked_genres.contains(g))
            .count() as i32;
        let disliked = movie
            .genres
            .iter()
            .filter(|g| self.disliked_genres.contains(g))
            .count() as i32;
        liked - disliked
    }
}

/// One page of a discovery query.
///
/// The query is its own cache key: sets are ordered, so equal filters always
/// hash the same regardless of how they were assembled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiscoverQuery {
    /// Any-of genre filter; empty means unrestricted.
    pub with_genres: BTreeSet<Genre>,
    /// None-of genre filter.
    pub without_genres: BTreeSet<Genre>,
    pub max_rating: Option<ContentRating>,
    /// 1-based page number.
    pub page: u32,
}

impl DiscoverQuery {
    pub fn from_constraints(constraints: &GroupConstraints, page: u32) -> Self {
        Self {
            with_genres: constraints.liked_genres.clone(),
            without_genres: constraints.disliked_genres.clone(),
            max_rating: constraints.max_rating,
            page,
        }
    }

    /// Whether a movie satisfies every filter of this query.
    pub fn matches(&self, movie: &Movie) -> bool {
        let rating_ok = match self.max_rating {
            Some(ceiling) => movie.content_rating.is_some_and(|r| r <= ceiling),
            None => true,
        };
        let liked_ok = self.with_genres.is_empty()
            || movie.genres.iter().any(|g| self.with_genres.contains(g));
        let disliked_ok = !movie.genres.iter().any(|g| self.without_genres.contains(g));
        rating_ok && liked_ok && disliked_ok
    }
}

/// A page of discovery results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogPage {
    pub page: u32,
    pub total_pages: u32,
    pub results: Vec<Movie>,
}
