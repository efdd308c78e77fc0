//! Storage seams consumed by the round engine.
//!
//! Backends implement both traits; the engine only ever talks to them
//! through `Arc<dyn RoundStore>` / `Arc<dyn GroupStore>`.

use async_trait::async_trait;
use std::collections::HashSet;

use model::{
    GroupId, MemberId, Movie, MovieId, Pick, PreferenceProfile, Rating, Result, RoundId,
    RoundRecord, StatusGuard, Suggestion, Vote,
};

/// Rounds and everything scoped to them.
///
/// Round writes are conditional: [`RoundStore::create_round`] guards the
/// one-open-round rule, and [`RoundStore::update_round`] and
/// [`RoundStore::commit_pick`] re-check the stored status against a
/// [`StatusGuard`] atomically with the write. Everything else is a plain
/// read or an upsert keyed by the record's identity.
#[async_trait]
pub trait RoundStore: Send + Sync {
    /// Persist a new round with its frozen slate.
    ///
    /// Fails with `RoundAlreadyOpen` if the group already has a round in
    /// `voting`; the check and the insert happen atomically.
    async fn create_round(&self, round: RoundRecord, slate: Vec<Suggestion>) -> Result<()>;

    async fn get_round(&self, id: RoundId) -> Result<Option<RoundRecord>>;

    /// All rounds of a group, newest first.
    async fn list_rounds(&self, group_id: GroupId) -> Result<Vec<RoundRecord>>;

    /// Overwrite a round record if the stored status still passes `guard`.
    ///
    /// Fails with `NotFound` for unknown rounds and `InvalidTransition` when
    /// the stored status has moved outside the guard.
    async fn update_round(&self, round: RoundRecord, guard: StatusGuard) -> Result<()>;

    /// The slate in position order.
    async fn suggestions(&self, round_id: RoundId) -> Result<Vec<Suggestion>>;

    /// Insert or replace the vote keyed by `(round, movie, member)`.
    async fn upsert_vote(&self, vote: Vote) -> Result<()>;

    async fn votes(&self, round_id: RoundId) -> Result<Vec<Vote>>;

    /// Insert the pick and write the updated round, only if the round has no
    /// pick yet and its stored status still passes `guard`. A lost pick race
    /// yields `PickExists` describing the winner; a round that moved on
    /// (discarded, say) yields `InvalidTransition`.
    async fn commit_pick(&self, pick: Pick, round: RoundRecord, guard: StatusGuard)
    -> Result<()>;

    async fn pick_for_round(&self, round_id: RoundId) -> Result<Option<Pick>>;

    async fn update_pick(&self, pick: Pick) -> Result<()>;

    /// Insert or replace the rating keyed by `(round, member)`.
    async fn upsert_rating(&self, rating: Rating) -> Result<()>;

    async fn ratings(&self, round_id: RoundId) -> Result<Vec<Rating>>;
}

/// Group-level data owned by other parts of the product.
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Member ids of the group. Fails with `NotFound` for unknown groups.
    async fn group_members(&self, group_id: GroupId) -> Result<Vec<MemberId>>;

    async fn preference_profile(
        &self,
        group_id: GroupId,
        member_id: MemberId,
    ) -> Result<Option<PreferenceProfile>>;

    async fn watched_movies(&self, group_id: GroupId) -> Result<HashSet<MovieId>>;

    async fn set_watched(&self, group_id: GroupId, movie_id: MovieId, watched: bool)
    -> Result<()>;

    async fn watchlist(&self, group_id: GroupId) -> Result<Vec<Movie>>;
}
