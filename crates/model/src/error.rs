//! Error types shared by the round engine crates.
//!
//! Every variant maps onto one [`ErrorKind`], which is what request handlers
//! translate into a response. Nothing here is retried internally.

use thiserror::Error;

use crate::round::RoundStatus;
use crate::types::{MemberId, MovieId, PickId, RoundId};

/// Coarse classification surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Forbidden,
    Conflict,
    NotFound,
    /// A transient dependency failure; the caller may retry the request.
    Unavailable,
    Internal,
}

#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed or missing input, rejected before any write
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The round is not in a status that permits the requested action
    #[error("Round {round_id} is {actual}; {action} requires {}", format_statuses(.expected))]
    InvalidTransition {
        round_id: RoundId,
        action: &'static str,
        actual: RoundStatus,
        expected: Vec<RoundStatus>,
    },

    /// Actor is not a participant, or lacks the role for the action
    #[error("Member {member_id} may not {action}")]
    Forbidden {
        member_id: MemberId,
        action: &'static str,
    },

    /// A round is already open for the group
    #[error("Round {existing} is already open for this group")]
    RoundAlreadyOpen { existing: RoundId },

    /// First committer won; the existing pick is reported back
    #[error("Round {round_id} already has pick {pick_id} (movie {movie_id})")]
    PickExists {
        round_id: RoundId,
        pick_id: PickId,
        movie_id: MovieId,
    },

    /// Referenced entity doesn't exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Catalog provider failed; the slate was not generated
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// A persisted status literal outside the known vocabulary
    #[error("Unknown round status literal: {0:?}")]
    UnknownStatus(String),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        EngineError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_) | EngineError::InvalidTransition { .. } => {
                ErrorKind::Validation
            }
            EngineError::Forbidden { .. } => ErrorKind::Forbidden,
            EngineError::RoundAlreadyOpen { .. } | EngineError::PickExists { .. } => {
                ErrorKind::Conflict
            }
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::CatalogUnavailable(_) => ErrorKind::Unavailable,
            EngineError::UnknownStatus(_) => ErrorKind::Internal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Unavailable
    }
}

/// Errors raised while reading an offline catalog dump.
#[derive(Error, Debug)]
pub enum ParseError {
    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Line couldn't be parsed
    #[error("Parse error at line {line} in {file}: {reason}")]
    Line {
        file: String,
        line: usize,
        reason: String,
    },
}

fn format_statuses(statuses: &[RoundStatus]) -> String {
    statuses
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Convenience type alias for Results in the engine crates
pub type Result<T> = std::result::Result<T, EngineError>;
