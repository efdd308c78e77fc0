//! Round engine for family movie nights.
//!
//! This crate wires the catalog, pipeline and store crates into the
//! operations a client calls: create a round, vote, close, pick, mark
//! watched, rate and read results.

pub mod config;
pub mod context;
pub mod engine;
pub mod pick;
pub mod state;
pub mod tally;

pub use config::EngineConfig;
pub use context::ActorContext;
pub use engine::{
    CreateRoundRequest, CreatedRound, RoundEngine, RoundResults, RoundView, SlateEntry,
};
pub use pick::PickSelector;
pub use state::{RoundAction, RoundStateMachine};
pub use tally::{MovieTally, RankedEntry, VoteProgress, VoteTally, VoterEntry};
