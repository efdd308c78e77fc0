//! The acting member of a request.

use model::{GroupId, MemberId};
use std::fmt;

/// Resolved identity for one engine call.
///
/// `member_id` is the effective actor every authorization check applies to.
/// When a parent acts for a managed member (a child without their own
/// login), `principal` keeps the authenticated member for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorContext {
    pub group_id: GroupId,
    pub member_id: MemberId,
    pub principal: MemberId,
}

impl ActorContext {
    pub fn new(group_id: GroupId, member_id: MemberId) -> Self {
        Self {
            group_id,
            member_id,
            principal: member_id,
        }
    }

    /// Act as `member_id` on behalf of the current principal.
    pub fn acting_as(self, member_id: MemberId) -> Self {
        Self { member_id, ..self }
    }

    pub fn is_delegated(&self) -> bool {
        self.member_id != self.principal
    }
}

impl fmt::Display for ActorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_delegated() {
            write!(f, "{} (via {})", self.member_id, self.principal)
        } else {
            write!(f, "{}", self.member_id)
        }
    }
}
