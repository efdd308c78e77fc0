//! Suggestion scoring.
//!
//! Each candidate gets a weighted score from three signals plus a freshness
//! penalty:
//!
//! - popularity, normalized against the most popular candidate in the pool
//! - taste match: liked genres present minus disliked genres present,
//!   normalized by the size of the liked set
//! - audience rating (`vote_average / 10`)
//! - minus a penalty per recent round in which the group ignored the movie
//!
//! Scores are computed once when a round is created and frozen into its
//! suggestions.

use catalog::{Candidate, GroupConstraints};
use model::{Genre, MovieId, Provenance};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const REASON_WATCHLIST: &str = "From your watchlist";
pub const REASON_TASTE: &str = "Matches your top genres";
pub const REASON_FAMILY: &str = "Popular with families";
pub const REASON_POPULAR: &str = "Popular right now";
pub const REASON_RATED: &str = "Highly rated";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScorerWeights {
    pub popularity: f32,
    pub taste: f32,
    pub rating: f32,
    /// Subtracted once per recent round the movie was ignored in
    pub freshness_penalty: f32,
}

impl Default for ScorerWeights {
    fn default() -> Self {
        Self {
            popularity: 0.4,
            taste: 0.4,
            rating: 0.2,
            freshness_penalty: 0.15,
        }
    }
}

/// Score breakdown for one candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Signals {
    popularity: f32,
    taste: f32,
    rating: f32,
    penalty: f32,
}

/// A candidate with its frozen score and reason.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f32,
    pub reason: String,
}

pub struct SuggestionScorer {
    weights: ScorerWeights,
    slate_size: usize,
}

impl SuggestionScorer {
    pub fn new(weights: ScorerWeights, slate_size: usize) -> Self {
        Self {
            weights,
            slate_size,
        }
    }

    /// Score, order and truncate candidates into a slate.
    ///
    /// `ignored` maps movie ids to the number of recent rounds in which the
    /// group was offered the movie and didn't pick it. Ordering is score
    /// descending, then movie id ascending.
    pub fn score(
        &self,
        candidates: Vec<Candidate>,
        constraints: &GroupConstraints,
        ignored: &HashMap<MovieId, u32>,
    ) -> Vec<ScoredCandidate> {
        let max_popularity = candidates
            .iter()
            .map(|c| c.movie.popularity)
            .fold(0.0_f32, f32::max);
        let liked_count = constraints.liked_genres.len().max(1) as f32;

        let mut scored: Vec<ScoredCandidate> = candidates
            .into_par_iter()
            .map(|candidate| {
                let signals = Signals {
                    popularity: if max_popularity > 0.0 {
                        candidate.movie.popularity / max_popularity
                    } else {
                        0.0
                    },
                    taste: (constraints.taste_match(&candidate.movie) as f32 / liked_count)
                        .clamp(-1.0, 1.0),
                    rating: (candidate.movie.vote_average / 10.0).clamp(0.0, 1.0),
                    penalty: ignored.get(&candidate.movie_id()).copied().unwrap_or(0) as f32
                        * self.weights.freshness_penalty,
                };

                let score = self.weights.popularity * signals.popularity
                    + self.weights.taste * signals.taste
                    + self.weights.rating * signals.rating
                    - signals.penalty;
                let reason = self.reason(&candidate, &signals).to_string();

                ScoredCandidate {
                    candidate,
                    score,
                    reason,
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.candidate.movie_id().cmp(&b.candidate.movie_id()))
        });
        scored.truncate(self.slate_size);
        scored
    }

    /// Names the dominant weighted signal. Watchlist entries always say so.
    fn reason(&self, candidate: &Candidate, signals: &Signals) -> &'static str {
        if candidate.provenance == Provenance::Watchlist {
            return REASON_WATCHLIST;
        }

        let popularity = self.weights.popularity * signals.popularity;
        let taste = self.weights.taste * signals.taste;
        let rating = self.weights.rating * signals.rating;

        if taste > 0.0 && taste >= popularity && taste >= rating {
            REASON_TASTE
        } else if rating > popularity {
            REASON_RATED
        } else if candidate.movie.has_genre(Genre::Family) {
            REASON_FAMILY
        } else {
            REASON_POPULAR
        }
    }
}

impl Default for SuggestionScorer {
    fn default() -> Self {
        Self::new(ScorerWeights::default(), 5)
    }
}
