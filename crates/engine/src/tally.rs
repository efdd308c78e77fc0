//! Vote counting and ranking.
//!
//! Tallies are derived from the live vote set on every read; nothing here is
//! persisted.

use model::{MemberId, Movie, MovieId, Suggestion, Vote, VoteDirection};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One member's current vote on a movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoterEntry {
    pub member_id: MemberId,
    pub direction: VoteDirection,
}

/// Running up/down count for one slate movie.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MovieTally {
    pub up: u32,
    pub down: u32,
    pub voters: Vec<VoterEntry>,
}

impl MovieTally {
    pub fn net(&self) -> i64 {
        self.up as i64 - self.down as i64
    }
}

/// Share of attendees who have cast at least one vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteProgress {
    pub voted: usize,
    pub attendees: usize,
}

impl VoteProgress {
    pub fn fraction(&self) -> f32 {
        if self.attendees == 0 {
            0.0
        } else {
            self.voted as f32 / self.attendees as f32
        }
    }
}

/// A slate movie in display order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    /// 1-based display rank; unique even among tied entries
    pub rank: usize,
    pub movie: Movie,
    pub up: u32,
    pub down: u32,
    pub net: i64,
    /// Another entry has the same net score
    pub tied: bool,
    pub voters: Vec<VoterEntry>,
}

/// Per-round tally over the slate.
#[derive(Debug, Clone)]
pub struct VoteTally {
    movies: Vec<Movie>,
    tallies: HashMap<MovieId, MovieTally>,
    progress: VoteProgress,
}

impl VoteTally {
    /// Count `votes` against `slate`.
    ///
    /// Votes for movies outside the slate are ignored. Progress counts
    /// distinct attendees with at least one vote.
    pub fn new(slate: &[Suggestion], votes: &[Vote], attendees: &[MemberId]) -> Self {
        let mut tallies: HashMap<MovieId, MovieTally> = slate
            .iter()
            .map(|s| (s.movie_id(), MovieTally::default()))
            .collect();

        let mut ordered: Vec<&Vote> = votes.iter().collect();
        ordered.sort_by(|a, b| {
            a.voted_at
                .cmp(&b.voted_at)
                .then_with(|| a.member_id.cmp(&b.member_id))
        });

        let attendee_set: HashSet<&MemberId> = attendees.iter().collect();
        let mut voted: HashSet<MemberId> = HashSet::new();

        for vote in ordered {
            let Some(tally) = tallies.get_mut(&vote.movie_id) else {
                continue;
            };
            match vote.direction {
                VoteDirection::Up => tally.up += 1,
                VoteDirection::Down => tally.down += 1,
            }
            tally.voters.push(VoterEntry {
                member_id: vote.member_id,
                direction: vote.direction,
            });
            if attendee_set.contains(&vote.member_id) {
                voted.insert(vote.member_id);
            }
        }

        Self {
            movies: slate.iter().map(|s| s.movie.clone()).collect(),
            tallies,
            progress: VoteProgress {
                voted: voted.len(),
                attendees: attendees.len(),
            },
        }
    }

    pub fn get(&self, movie_id: MovieId) -> Option<&MovieTally> {
        self.tallies.get(&movie_id)
    }

    pub fn progress(&self) -> VoteProgress {
        self.progress
    }

    /// Every slate movie ordered by net score desc, then popularity desc,
    /// then movie id asc. Entries sharing a net score are flagged `tied`
    /// whatever their display order.
    pub fn ranking(&self) -> Vec<RankedEntry> {
        let mut entries: Vec<RankedEntry> = self
            .movies
            .iter()
            .map(|movie| {
                let tally = self.tallies.get(&movie.id).cloned().unwrap_or_default();
                RankedEntry {
                    rank: 0,
                    movie: movie.clone(),
                    up: tally.up,
                    down: tally.down,
                    net: tally.net(),
                    tied: false,
                    voters: tally.voters,
                }
            })
            .collect();

        entries.sort_by(|a, b| {
            b.net
                .cmp(&a.net)
                .then_with(|| b.movie.popularity.total_cmp(&a.movie.popularity))
                .then_with(|| a.movie.id.cmp(&b.movie.id))
        });

        let mut net_counts: HashMap<i64, usize> = HashMap::new();
        for entry in &entries {
            *net_counts.entry(entry.net).or_insert(0) += 1;
        }

        for (idx, entry) in entries.iter_mut().enumerate() {
            entry.rank = idx + 1;
            entry.tied = net_counts.get(&entry.net).copied().unwrap_or(0) > 1;
        }
        entries
    }
}
