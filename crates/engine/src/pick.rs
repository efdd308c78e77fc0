//! Committing a round's pick.

use catalog::CatalogProvider;
use chrono::{DateTime, Utc};
use model::{EngineError, MemberId, Movie, MovieId, Pick, Result, Round};
use std::sync::Arc;
use store::RoundStore;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::context::ActorContext;
use crate::state::{RoundAction, RoundStateMachine};

/// The one place a round's outcome becomes history.
///
/// First committer wins: the store's conditional write decides races, and
/// the loser gets `PickExists` carrying the winner. A round discarded while
/// the pick was in flight rejects it with `InvalidTransition`.
#[derive(Clone)]
pub struct PickSelector {
    rounds: Arc<dyn RoundStore>,
    catalog: Arc<dyn CatalogProvider>,
}

impl PickSelector {
    pub fn new(rounds: Arc<dyn RoundStore>, catalog: Arc<dyn CatalogProvider>) -> Self {
        Self { rounds, catalog }
    }

    /// Commit `movie_id` as the round's pick and move it to `selected`.
    ///
    /// Movies outside the slate are accepted when the catalog knows them.
    #[instrument(skip(self, ctx, round, members, now), fields(round_id = %round.id))]
    pub async fn select(
        &self,
        ctx: &ActorContext,
        round: &Round,
        members: &[MemberId],
        movie_id: MovieId,
        now: DateTime<Utc>,
    ) -> Result<Pick> {
        if !members.contains(&ctx.member_id) {
            return Err(EngineError::Forbidden {
                member_id: ctx.member_id,
                action: "pick a movie",
            });
        }

        if let Some(existing) = self.rounds.pick_for_round(round.id).await? {
            return Err(EngineError::PickExists {
                round_id: round.id,
                pick_id: existing.id,
                movie_id: existing.movie_id,
            });
        }
        let next = RoundStateMachine::transition(round, RoundAction::Pick)?;

        self.resolve_movie(round, movie_id).await?;

        let pick = Pick {
            id: Uuid::new_v4(),
            round_id: round.id,
            group_id: round.group_id,
            movie_id,
            picked_by: ctx.member_id,
            picked_at: now,
            watched: false,
            watched_at: None,
        };

        let mut updated = round.clone();
        updated.status = next;
        updated.pick_id = Some(pick.id);
        updated.closed_at = updated.closed_at.or(Some(now));

        self.rounds
            .commit_pick(
                pick.clone(),
                updated.to_record(),
                RoundStateMachine::guard(RoundAction::Pick),
            )
            .await?;
        info!(pick_id = %pick.id, movie_id, actor = %ctx, "Committed pick");
        Ok(pick)
    }

    /// Slate movies are known; anything else must exist in the catalog.
    async fn resolve_movie(&self, round: &Round, movie_id: MovieId) -> Result<Movie> {
        let slate = self.rounds.suggestions(round.id).await?;
        if let Some(suggestion) = slate.into_iter().find(|s| s.movie_id() == movie_id) {
            return Ok(suggestion.movie);
        }

        debug!(movie_id, "Free-form pick, checking catalog");
        self.catalog
            .movie_details(movie_id)
            .await?
            .ok_or_else(|| EngineError::not_found("movie", movie_id))
    }
}
