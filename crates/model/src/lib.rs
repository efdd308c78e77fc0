//! # Model Crate
//!
//! Domain types for the movie-night round engine.
//!
//! ## Main Components
//!
//! - **types**: ids, genres, content ratings, movies, preference profiles
//! - **round**: rounds and their status vocabulary, suggestions, votes, picks, ratings
//! - **error**: `EngineError` and its coarse `ErrorKind`
//! - **parser**: offline catalog dump parser

pub mod error;
pub mod parser;
pub mod round;
pub mod types;

pub use error::{EngineError, ErrorKind, ParseError, Result};
pub use parser::{parse_catalog, parse_catalog_str};
pub use round::{
    Pick, Provenance, Rating, RatingScore, Round, RoundRecord, RoundStatus, StatusGuard,
    Suggestion, Vote, VoteDirection,
};
pub use types::{
    ContentRating, Genre, GroupId, MemberId, Movie, MovieId, PickId, PreferenceProfile, RoundId,
};
