//! Slate generation for movie-night rounds.
//!
//! This crate provides:
//! - Filter trait and the rating, disliked-genre and liked-genre filters
//! - FilterPipeline for composing filters
//! - ConstraintRelaxationEngine, which loosens taste filters until a slate
//!   can be filled
//! - SuggestionScorer, which orders and truncates the survivors
//!
//! ## Architecture
//! Slate generation runs in stages:
//! 1. The relaxation engine gathers candidates from the catalog pool and
//!    filters them, relaxing taste constraints as needed
//! 2. The scorer computes a frozen score and reason per survivor
//! 3. The top entries become the round's suggestions
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{ConstraintRelaxationEngine, SuggestionScorer, ScorerWeights};
//!
//! let relaxation = ConstraintRelaxationEngine::new(pool, 5);
//! let outcome = relaxation.run(&constraints, &excluded, &watchlist).await?;
//!
//! let scorer = SuggestionScorer::new(ScorerWeights::default(), 5);
//! let slate = scorer.score(outcome.candidates, &constraints, &ignored);
//! ```

pub mod filter_pipeline;
pub mod filters;
pub mod relaxation;
pub mod scorer;
pub mod traits;

// Re-export main types
pub use filter_pipeline::FilterPipeline;
pub use relaxation::{ActiveConstraints, Constraint, ConstraintRelaxationEngine, RelaxationOutcome};
pub use scorer::{ScoredCandidate, ScorerWeights, SuggestionScorer};
pub use traits::Filter;
