//! Persistence seams for the round engine.
//!
//! [`RoundStore`] owns rounds, slates, votes, picks and ratings;
//! [`GroupStore`] exposes the group data the engine only reads (members,
//! taste profiles, watch history, watchlist) plus the watched-history side
//! effect. [`MemoryStore`] implements both.

pub mod memory;
pub mod traits;

pub use memory::{GroupRecord, MemberRecord, MemoryStore, SnapshotError};
pub use traits::{GroupStore, RoundStore};
