//! Round lifecycle.
//!
//! ```text
//! voting -> closed -> selected -> watched -> rated
//!    \________\______> discarded
//! ```
//!
//! Every mutation of a round goes through [`RoundStateMachine::transition`],
//! which either returns the next status or an `InvalidTransition` naming the
//! statuses the action requires. The same [`StatusGuard`] travels with the
//! write so the store re-checks it against whatever status is stored by then.

use model::{Result, Round, RoundStatus, StatusGuard};

/// Something a member (or the pick selector) asks of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundAction {
    Vote,
    Close,
    Pick,
    MarkWatched,
    UndoWatched,
    Rate,
    Discard,
}

impl RoundAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RoundAction::Vote => "vote",
            RoundAction::Close => "close",
            RoundAction::Pick => "pick",
            RoundAction::MarkWatched => "mark watched",
            RoundAction::UndoWatched => "undo watched",
            RoundAction::Rate => "rate",
            RoundAction::Discard => "discard",
        }
    }
}

pub struct RoundStateMachine;

impl RoundStateMachine {
    /// Statuses from which `action` is accepted.
    pub fn allowed_from(action: RoundAction) -> &'static [RoundStatus] {
        use RoundStatus::*;
        match action {
            RoundAction::Vote => &[Voting],
            // Closing twice is harmless
            RoundAction::Close => &[Voting, Closed],
            RoundAction::Pick => &[Voting, Closed],
            RoundAction::MarkWatched => &[Selected],
            RoundAction::UndoWatched => &[Watched, Rated],
            RoundAction::Rate => &[Watched, Rated],
            RoundAction::Discard => &[Voting, Closed],
        }
    }

    /// Status after `action` succeeds.
    fn target(action: RoundAction) -> RoundStatus {
        match action {
            RoundAction::Vote => RoundStatus::Voting,
            RoundAction::Close => RoundStatus::Closed,
            RoundAction::Pick => RoundStatus::Selected,
            RoundAction::MarkWatched => RoundStatus::Watched,
            RoundAction::UndoWatched => RoundStatus::Selected,
            RoundAction::Rate => RoundStatus::Rated,
            RoundAction::Discard => RoundStatus::Discarded,
        }
    }

    pub fn guard(action: RoundAction) -> StatusGuard {
        StatusGuard {
            action: action.as_str(),
            allowed: Self::allowed_from(action),
        }
    }

    /// Check the guard and return the status `round` moves to.
    pub fn transition(round: &Round, action: RoundAction) -> Result<RoundStatus> {
        Self::guard(action).admit(round.id, round.status)?;
        Ok(Self::target(action))
    }
}
