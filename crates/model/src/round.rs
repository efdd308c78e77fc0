//! Round lifecycle records: rounds, suggestions, votes, picks and ratings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EngineError, Result};
use crate::types::{GroupId, MemberId, Movie, MovieId, PickId, RoundId};

// =============================================================================
// Status
// =============================================================================

/// Lifecycle status of a round.
///
/// `voting -> closed -> selected -> watched -> rated`, with `discarded`
/// reachable from `voting` or `closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Voting,
    Closed,
    Selected,
    Watched,
    Rated,
    Discarded,
}

impl RoundStatus {
    /// Literal older records carry instead of `selected`.
    pub const LEGACY_SELECTED: &'static str = "picked";

    pub fn as_str(self) -> &'static str {
        match self {
            RoundStatus::Voting => "voting",
            RoundStatus::Closed => "closed",
            RoundStatus::Selected => "selected",
            RoundStatus::Watched => "watched",
            RoundStatus::Rated => "rated",
            RoundStatus::Discarded => "discarded",
        }
    }

    /// Map a persisted status literal onto the canonical vocabulary.
    ///
    /// This is the only place stored literals are interpreted. The legacy
    /// synonym is normalized here and never written back.
    pub fn from_stored(raw: &str) -> Result<Self> {
        match raw {
            "voting" => Ok(RoundStatus::Voting),
            "closed" => Ok(RoundStatus::Closed),
            "selected" | RoundStatus::LEGACY_SELECTED => Ok(RoundStatus::Selected),
            "watched" => Ok(RoundStatus::Watched),
            "rated" => Ok(RoundStatus::Rated),
            "discarded" => Ok(RoundStatus::Discarded),
            other => Err(EngineError::UnknownStatus(other.to_string())),
        }
    }

    /// True once the round has left voting, whatever the outcome.
    pub fn is_finished(self) -> bool {
        self != RoundStatus::Voting
    }
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The statuses a round write requires, checked by the store under the same
/// lock as the write itself.
///
/// A round read earlier may have moved on by the time it is written back;
/// the guard turns that into an `InvalidTransition` instead of a silent
/// overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusGuard {
    pub action: &'static str,
    pub allowed: &'static [RoundStatus],
}

impl StatusGuard {
    pub fn admit(&self, round_id: RoundId, actual: RoundStatus) -> Result<()> {
        if self.allowed.contains(&actual) {
            Ok(())
        } else {
            Err(EngineError::InvalidTransition {
                round_id,
                action: self.action,
                actual,
                expected: self.allowed.to_vec(),
            })
        }
    }

    /// Check a persisted record's raw status literal.
    pub fn admit_record(&self, record: &RoundRecord) -> Result<()> {
        self.admit(record.id, RoundStatus::from_stored(&record.status)?)
    }
}

// =============================================================================
// Round
// =============================================================================

/// A round exactly as persisted; `status` is the raw stored literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub id: RoundId,
    pub group_id: GroupId,
    pub status: String,
    pub created_by: MemberId,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub pick_id: Option<PickId>,
    /// Explicit attendee list; `None` means every group member attends.
    pub attendees: Option<Vec<MemberId>>,
}

/// A round as handed to callers, with its status normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub group_id: GroupId,
    pub status: RoundStatus,
    pub created_by: MemberId,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub pick_id: Option<PickId>,
    pub attendees: Option<Vec<MemberId>>,
}

impl Round {
    pub fn new(
        id: RoundId,
        group_id: GroupId,
        created_by: MemberId,
        attendees: Option<Vec<MemberId>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            group_id,
            status: RoundStatus::Voting,
            created_by,
            created_at: now,
            closed_at: None,
            pick_id: None,
            attendees,
        }
    }

    pub fn to_record(&self) -> RoundRecord {
        RoundRecord {
            id: self.id,
            group_id: self.group_id,
            status: self.status.as_str().to_string(),
            created_by: self.created_by,
            created_at: self.created_at,
            closed_at: self.closed_at,
            pick_id: self.pick_id,
            attendees: self.attendees.clone(),
        }
    }
}

impl TryFrom<RoundRecord> for Round {
    type Error = EngineError;

    fn try_from(record: RoundRecord) -> Result<Self> {
        Ok(Self {
            id: record.id,
            group_id: record.group_id,
            status: RoundStatus::from_stored(&record.status)?,
            created_by: record.created_by,
            created_at: record.created_at,
            closed_at: record.closed_at,
            pick_id: record.pick_id,
            attendees: record.attendees,
        })
    }
}

// =============================================================================
// Suggestions
// =============================================================================

/// Where a suggestion came from. Scoring and ranking ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Found through taste-filtered catalog discovery.
    Algorithm,
    /// Taken from the group's saved watchlist.
    Watchlist,
}

/// A slate entry, frozen when the round is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub round_id: RoundId,
    /// Zero-based position in the slate.
    pub position: usize,
    pub movie: Movie,
    pub score: f32,
    pub reason: String,
    pub provenance: Provenance,
}

impl Suggestion {
    pub fn movie_id(&self) -> MovieId {
        self.movie.id
    }
}

// =============================================================================
// Votes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteDirection {
    Up,
    Down,
}

/// Live vote, keyed by `(round_id, movie_id, member_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub round_id: RoundId,
    pub movie_id: MovieId,
    pub member_id: MemberId,
    pub direction: VoteDirection,
    pub voted_at: DateTime<Utc>,
}

// =============================================================================
// Picks and ratings
// =============================================================================

/// The committed winner of a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pick {
    pub id: PickId,
    pub round_id: RoundId,
    pub group_id: GroupId,
    pub movie_id: MovieId,
    pub picked_by: MemberId,
    pub picked_at: DateTime<Utc>,
    pub watched: bool,
    pub watched_at: Option<DateTime<Utc>>,
}

/// Three-point post-viewing verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingScore {
    Disliked,
    Okay,
    Loved,
}

impl std::str::FromStr for RatingScore {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disliked" | "down" | "1" => Ok(RatingScore::Disliked),
            "okay" | "ok" | "meh" | "2" => Ok(RatingScore::Okay),
            "loved" | "up" | "3" => Ok(RatingScore::Loved),
            _ => Err(EngineError::Validation(format!("unknown rating: {s:?}"))),
        }
    }
}

/// One rating per member per round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub round_id: RoundId,
    pub member_id: MemberId,
    pub score: RatingScore,
    pub rated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn record_with_status(status: &str) -> RoundRecord {
        RoundRecord {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            status: status.to_string(),
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            closed_at: None,
            pick_id: None,
            attendees: None,
        }
    }

    #[test]
    fn test_legacy_status_reads_as_selected() {
        let record = record_with_status("picked");
        let round = Round::try_from(record.clone()).unwrap();
        assert_eq!(round.status, RoundStatus::Selected);
        // The record itself is untouched
        assert_eq!(record.status, "picked");
    }

    #[test]
    fn test_every_canonical_status_round_trips() {
        for status in [
            RoundStatus::Voting,
            RoundStatus::Closed,
            RoundStatus::Selected,
            RoundStatus::Watched,
            RoundStatus::Rated,
            RoundStatus::Discarded,
        ] {
            assert_eq!(RoundStatus::from_stored(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let err = Round::try_from(record_with_status("archived")).unwrap_err();
        assert!(matches!(err, EngineError::UnknownStatus(s) if s == "archived"));
    }

    #[test]
    fn test_guard_rejects_status_that_moved_on() {
        let guard = StatusGuard {
            action: "close",
            allowed: &[RoundStatus::Voting, RoundStatus::Closed],
        };
        assert!(guard.admit_record(&record_with_status("closed")).is_ok());

        let err = guard.admit_record(&record_with_status("picked")).unwrap_err();
        match err {
            EngineError::InvalidTransition {
                action,
                actual,
                expected,
                ..
            } => {
                assert_eq!(action, "close");
                assert_eq!(actual, RoundStatus::Selected);
                assert_eq!(expected, vec![RoundStatus::Voting, RoundStatus::Closed]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_guard_surfaces_unknown_literal() {
        let guard = StatusGuard {
            action: "discard",
            allowed: &[RoundStatus::Voting],
        };
        let err = guard.admit_record(&record_with_status("archived")).unwrap_err();
        assert!(matches!(err, EngineError::UnknownStatus(_)));
    }

    #[test]
    fn test_provenance_serializes_as_tag() {
        let json = serde_json::to_string(&Provenance::Watchlist).unwrap();
        assert_eq!(json, "\"watchlist\"");
    }
}
