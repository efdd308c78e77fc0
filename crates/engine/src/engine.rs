//! # Round Engine
//!
//! Coordinates a movie-night round end to end:
//! 1. Resolve attendees and merge their taste profiles
//! 2. Gather candidates, relaxing taste constraints as needed
//! 3. Score and freeze the slate
//! 4. Collect votes, close, pick
//! 5. Track watching and ratings afterwards
//!
//! Every operation takes an [`ActorContext`] and re-reads what it needs from
//! the stores; the engine keeps no per-round state between calls.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use catalog::{CandidatePool, CatalogProvider, PreferenceAggregator};
use model::{
    EngineError, MemberId, Movie, MovieId, Pick, Rating, RatingScore, Result, Round, RoundId,
    RoundStatus, Suggestion, Vote, VoteDirection,
};
use pipeline::{ConstraintRelaxationEngine, SuggestionScorer};
use store::{GroupStore, RoundStore};

use crate::config::EngineConfig;
use crate::context::ActorContext;
use crate::pick::PickSelector;
use crate::state::{RoundAction, RoundStateMachine};
use crate::tally::{RankedEntry, VoteProgress, VoteTally, VoterEntry};

/// Options for a new round.
#[derive(Debug, Clone, Default)]
pub struct CreateRoundRequest {
    /// Explicit attendees; `None` means the whole group
    pub attendees: Option<Vec<MemberId>>,
    /// Movies to keep off the slate, on top of the watch history
    pub exclude: Vec<MovieId>,
    /// Fold the group's saved watchlist into the candidate pool
    pub include_watchlist: bool,
}

/// A freshly created round with its frozen slate.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedRound {
    pub round: Round,
    pub slate: Vec<Suggestion>,
    /// Constraint relaxations applied while building the slate, in order
    pub relaxed_constraints: Vec<String>,
}

/// Slate entry with its live tally.
#[derive(Debug, Clone, Serialize)]
pub struct SlateEntry {
    pub suggestion: Suggestion,
    pub up: u32,
    pub down: u32,
    pub net: i64,
    pub voters: Vec<VoterEntry>,
}

/// A round as shown while people are voting.
#[derive(Debug, Clone, Serialize)]
pub struct RoundView {
    pub round: Round,
    pub attendees: Vec<MemberId>,
    pub slate: Vec<SlateEntry>,
    pub progress: VoteProgress,
    pub pick: Option<Pick>,
}

/// Final standings of a round.
#[derive(Debug, Clone, Serialize)]
pub struct RoundResults {
    pub round: Round,
    pub ranking: Vec<RankedEntry>,
    pub progress: VoteProgress,
    pub pick: Option<Pick>,
    pub ratings: Vec<Rating>,
}

/// Main entry point for every round operation
#[derive(Clone)]
pub struct RoundEngine {
    rounds: Arc<dyn RoundStore>,
    groups: Arc<dyn GroupStore>,
    relaxation: Arc<ConstraintRelaxationEngine>,
    scorer: Arc<SuggestionScorer>,
    picks: PickSelector,
    config: EngineConfig,
}

impl RoundEngine {
    /// Create an engine over the given stores and catalog.
    ///
    /// The catalog is used as given; wrap it in a `CachedCatalog` to get
    /// TTL caching of discovery pages.
    pub fn new(
        rounds: Arc<dyn RoundStore>,
        groups: Arc<dyn GroupStore>,
        catalog: Arc<dyn CatalogProvider>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;

        let pool = CandidatePool::new(catalog.clone()).with_pages(config.pages_per_pass);
        let relaxation =
            ConstraintRelaxationEngine::new(pool, config.slate_size).with_active(config.constraints);
        let scorer = SuggestionScorer::new(config.weights, config.slate_size);
        let picks = PickSelector::new(rounds.clone(), catalog);

        Ok(Self {
            rounds,
            groups,
            relaxation: Arc::new(relaxation),
            scorer: Arc::new(scorer),
            picks,
            config,
        })
    }

    /// Start a round for the actor's group.
    ///
    /// Fails with `RoundAlreadyOpen` while another round is voting. An empty
    /// slate is a valid result; catalog failures are not, and nothing is
    /// written when one occurs.
    #[instrument(skip(self, ctx, request), fields(group_id = %ctx.group_id, actor = %ctx))]
    pub async fn create_round(
        &self,
        ctx: &ActorContext,
        request: CreateRoundRequest,
    ) -> Result<CreatedRound> {
        let start_time = Instant::now();

        let members = self.groups.group_members(ctx.group_id).await?;
        ensure_member(ctx, &members, "create a round")?;
        let attendees = resolve_attendees(&members, request.attendees.as_deref())?;

        // Fail fast; the store re-checks atomically on insert
        if let Some(open) = self.open_round(ctx).await? {
            return Err(EngineError::RoundAlreadyOpen { existing: open });
        }

        let mut profiles = Vec::with_capacity(attendees.len());
        for member in &attendees {
            match self.groups.preference_profile(ctx.group_id, *member).await? {
                Some(profile) => profiles.push(profile),
                None => debug!(member_id = %member, "No profile, member is unconstrained"),
            }
        }
        let constraints = PreferenceAggregator::aggregate(&profiles);

        let (watched, watchlist) = tokio::try_join!(
            self.groups.watched_movies(ctx.group_id),
            self.load_watchlist(ctx, request.include_watchlist),
        )?;
        let mut excluded: HashSet<MovieId> = watched;
        excluded.extend(request.exclude.iter().copied());

        let outcome = self
            .relaxation
            .run(&constraints, &excluded, &watchlist)
            .await?;
        info!(
            candidates = outcome.candidates.len(),
            relaxed = ?outcome.relaxed,
            "Candidate pool ready"
        );

        let ignored = self.ignored_movies(ctx).await?;
        let scored = self.scorer.score(outcome.candidates, &constraints, &ignored);

        let round = Round::new(
            Uuid::new_v4(),
            ctx.group_id,
            ctx.member_id,
            request.attendees.map(|_| attendees.clone()),
            Utc::now(),
        );
        let slate: Vec<Suggestion> = scored
            .into_iter()
            .enumerate()
            .map(|(position, scored)| Suggestion {
                round_id: round.id,
                position,
                provenance: scored.candidate.provenance,
                movie: scored.candidate.movie,
                score: scored.score,
                reason: scored.reason,
            })
            .collect();

        self.rounds
            .create_round(round.to_record(), slate.clone())
            .await?;

        info!(
            round_id = %round.id,
            slate = slate.len(),
            "Created round in {:.2?}",
            start_time.elapsed()
        );
        Ok(CreatedRound {
            round,
            slate,
            relaxed_constraints: outcome.relaxed,
        })
    }

    /// A round with live tallies, voter rosters and vote progress.
    #[instrument(skip(self, ctx), fields(actor = %ctx))]
    pub async fn get_round(&self, ctx: &ActorContext, round_id: RoundId) -> Result<RoundView> {
        let (round, members) = self.load_round(ctx, round_id).await?;
        let attendees = attendees_of(&round, &members);

        let (slate, votes, pick) = tokio::try_join!(
            self.rounds.suggestions(round.id),
            self.rounds.votes(round.id),
            self.rounds.pick_for_round(round.id),
        )?;
        let tally = VoteTally::new(&slate, &votes, &attendees);

        let entries = slate
            .into_iter()
            .map(|suggestion| {
                let counts = tally.get(suggestion.movie_id()).cloned().unwrap_or_default();
                SlateEntry {
                    up: counts.up,
                    down: counts.down,
                    net: counts.net(),
                    voters: counts.voters,
                    suggestion,
                }
            })
            .collect();

        Ok(RoundView {
            progress: tally.progress(),
            round,
            attendees,
            slate: entries,
            pick,
        })
    }

    /// Record the actor's vote, replacing any earlier vote on the same movie.
    #[instrument(skip(self, ctx), fields(actor = %ctx))]
    pub async fn submit_vote(
        &self,
        ctx: &ActorContext,
        round_id: RoundId,
        movie_id: MovieId,
        direction: VoteDirection,
    ) -> Result<Vote> {
        let (round, members) = self.load_round(ctx, round_id).await?;
        if !attendees_of(&round, &members).contains(&ctx.member_id) {
            return Err(EngineError::Forbidden {
                member_id: ctx.member_id,
                action: "vote in this round",
            });
        }
        RoundStateMachine::transition(&round, RoundAction::Vote)?;

        let slate = self.rounds.suggestions(round.id).await?;
        if !slate.iter().any(|s| s.movie_id() == movie_id) {
            return Err(EngineError::not_found("suggestion", movie_id));
        }

        let vote = Vote {
            round_id: round.id,
            movie_id,
            member_id: ctx.member_id,
            direction,
            voted_at: Utc::now(),
        };
        self.rounds.upsert_vote(vote.clone()).await?;
        debug!(movie_id, ?direction, "Vote recorded");
        Ok(vote)
    }

    /// Stop voting. Closing an already closed round is a no-op.
    #[instrument(skip(self, ctx), fields(actor = %ctx))]
    pub async fn close_round(&self, ctx: &ActorContext, round_id: RoundId) -> Result<Round> {
        let (mut round, _) = self.load_round(ctx, round_id).await?;
        let next = RoundStateMachine::transition(&round, RoundAction::Close)?;
        if round.status == next {
            return Ok(round);
        }

        round.status = next;
        round.closed_at = Some(Utc::now());
        self.rounds
            .update_round(round.to_record(), RoundStateMachine::guard(RoundAction::Close))
            .await?;
        info!(round_id = %round.id, "Closed round");
        Ok(round)
    }

    /// Commit the round's pick. A second pick yields `PickExists`.
    #[instrument(skip(self, ctx), fields(actor = %ctx))]
    pub async fn pick_movie(
        &self,
        ctx: &ActorContext,
        round_id: RoundId,
        movie_id: MovieId,
    ) -> Result<Pick> {
        let (round, members) = self.load_round(ctx, round_id).await?;
        self.picks
            .select(ctx, &round, &members, movie_id, Utc::now())
            .await
    }

    /// Mark the picked movie as watched and record it in the group's history.
    ///
    /// The round write goes first; the pick and the watch history only change
    /// once the store has accepted the status change.
    #[instrument(skip(self, ctx), fields(actor = %ctx))]
    pub async fn mark_watched(&self, ctx: &ActorContext, round_id: RoundId) -> Result<Pick> {
        let (mut round, _) = self.load_round(ctx, round_id).await?;
        let next = RoundStateMachine::transition(&round, RoundAction::MarkWatched)?;
        let mut pick = self.require_pick(&round).await?;

        round.status = next;
        self.rounds
            .update_round(
                round.to_record(),
                RoundStateMachine::guard(RoundAction::MarkWatched),
            )
            .await?;

        pick.watched = true;
        pick.watched_at = Some(Utc::now());
        self.rounds.update_pick(pick.clone()).await?;
        self.groups
            .set_watched(round.group_id, pick.movie_id, true)
            .await?;

        info!(round_id = %round.id, movie_id = pick.movie_id, "Marked watched");
        Ok(pick)
    }

    /// Revert `mark_watched`. Existing ratings are kept.
    #[instrument(skip(self, ctx), fields(actor = %ctx))]
    pub async fn undo_watched(&self, ctx: &ActorContext, round_id: RoundId) -> Result<Pick> {
        let (mut round, _) = self.load_round(ctx, round_id).await?;
        let next = RoundStateMachine::transition(&round, RoundAction::UndoWatched)?;
        let mut pick = self.require_pick(&round).await?;

        round.status = next;
        self.rounds
            .update_round(
                round.to_record(),
                RoundStateMachine::guard(RoundAction::UndoWatched),
            )
            .await?;

        pick.watched = false;
        pick.watched_at = None;
        self.rounds.update_pick(pick.clone()).await?;
        self.groups
            .set_watched(round.group_id, pick.movie_id, false)
            .await?;

        info!(round_id = %round.id, movie_id = pick.movie_id, "Undid watched");
        Ok(pick)
    }

    /// Record or replace the actor's rating. The first rating moves the
    /// round to `rated`.
    #[instrument(skip(self, ctx), fields(actor = %ctx))]
    pub async fn submit_rating(
        &self,
        ctx: &ActorContext,
        round_id: RoundId,
        score: RatingScore,
    ) -> Result<Rating> {
        let (mut round, _) = self.load_round(ctx, round_id).await?;
        let next = RoundStateMachine::transition(&round, RoundAction::Rate)?;

        // Written even when already rated, so an undo that raced this call
        // rejects the rating instead of leaving it on a `selected` round
        let first_rating = round.status != next;
        round.status = next;
        self.rounds
            .update_round(round.to_record(), RoundStateMachine::guard(RoundAction::Rate))
            .await?;
        if first_rating {
            info!(round_id = %round.id, "Round rated");
        }

        let rating = Rating {
            round_id: round.id,
            member_id: ctx.member_id,
            score,
            rated_at: Utc::now(),
        };
        self.rounds.upsert_rating(rating.clone()).await?;
        Ok(rating)
    }

    /// Ranked slate with ties flagged, plus pick and ratings if any.
    #[instrument(skip(self, ctx), fields(actor = %ctx))]
    pub async fn get_round_results(
        &self,
        ctx: &ActorContext,
        round_id: RoundId,
    ) -> Result<RoundResults> {
        let (round, members) = self.load_round(ctx, round_id).await?;
        let attendees = attendees_of(&round, &members);

        let (slate, votes, pick, ratings) = tokio::try_join!(
            self.rounds.suggestions(round.id),
            self.rounds.votes(round.id),
            self.rounds.pick_for_round(round.id),
            self.rounds.ratings(round.id),
        )?;
        let tally = VoteTally::new(&slate, &votes, &attendees);

        Ok(RoundResults {
            ranking: tally.ranking(),
            progress: tally.progress(),
            round,
            pick,
            ratings,
        })
    }

    /// Abandon a round that never got a pick.
    #[instrument(skip(self, ctx), fields(actor = %ctx))]
    pub async fn discard_round(&self, ctx: &ActorContext, round_id: RoundId) -> Result<Round> {
        let (mut round, _) = self.load_round(ctx, round_id).await?;
        round.status = RoundStateMachine::transition(&round, RoundAction::Discard)?;
        round.closed_at = round.closed_at.or(Some(Utc::now()));
        self.rounds
            .update_round(round.to_record(), RoundStateMachine::guard(RoundAction::Discard))
            .await?;
        info!(round_id = %round.id, "Discarded round");
        Ok(round)
    }

    /// Load a round and check the actor belongs to its group.
    async fn load_round(
        &self,
        ctx: &ActorContext,
        round_id: RoundId,
    ) -> Result<(Round, Vec<MemberId>)> {
        let record = self
            .rounds
            .get_round(round_id)
            .await?
            .ok_or_else(|| EngineError::not_found("round", round_id))?;
        let round = Round::try_from(record)?;

        if round.group_id != ctx.group_id {
            return Err(EngineError::Forbidden {
                member_id: ctx.member_id,
                action: "access another group's round",
            });
        }
        let members = self.groups.group_members(round.group_id).await?;
        ensure_member(ctx, &members, "access this round")?;
        Ok((round, members))
    }

    async fn require_pick(&self, round: &Round) -> Result<Pick> {
        self.rounds
            .pick_for_round(round.id)
            .await?
            .ok_or_else(|| EngineError::not_found("pick for round", round.id))
    }

    async fn load_watchlist(&self, ctx: &ActorContext, include: bool) -> Result<Vec<Movie>> {
        if include {
            self.groups.watchlist(ctx.group_id).await
        } else {
            Ok(Vec::new())
        }
    }

    async fn open_round(&self, ctx: &ActorContext) -> Result<Option<RoundId>> {
        let rounds = self.rounds.list_rounds(ctx.group_id).await?;
        Ok(rounds
            .into_iter()
            .find(|r| RoundStatus::from_stored(&r.status).ok() == Some(RoundStatus::Voting))
            .map(|r| r.id))
    }

    /// Movies offered in recent finished rounds and not picked, with the
    /// number of rounds each was passed over in.
    async fn ignored_movies(&self, ctx: &ActorContext) -> Result<HashMap<MovieId, u32>> {
        let mut ignored: HashMap<MovieId, u32> = HashMap::new();
        if self.config.freshness_rounds == 0 {
            return Ok(ignored);
        }

        let rounds = self.rounds.list_rounds(ctx.group_id).await?;
        let finished = rounds.into_iter().filter(|r| match RoundStatus::from_stored(&r.status) {
            Ok(status) => status.is_finished(),
            Err(e) => {
                warn!(round_id = %r.id, "Skipping round in freshness window: {}", e);
                false
            }
        });

        for record in finished.take(self.config.freshness_rounds) {
            let picked = self
                .rounds
                .pick_for_round(record.id)
                .await?
                .map(|p| p.movie_id);
            for suggestion in self.rounds.suggestions(record.id).await? {
                if Some(suggestion.movie_id()) != picked {
                    *ignored.entry(suggestion.movie_id()).or_insert(0) += 1;
                }
            }
        }
        Ok(ignored)
    }
}

fn ensure_member(ctx: &ActorContext, members: &[MemberId], action: &'static str) -> Result<()> {
    if members.contains(&ctx.member_id) {
        Ok(())
    } else {
        Err(EngineError::Forbidden {
            member_id: ctx.member_id,
            action,
        })
    }
}

/// Validate an explicit attendee list, or default to every member.
fn resolve_attendees(members: &[MemberId], requested: Option<&[MemberId]>) -> Result<Vec<MemberId>> {
    let Some(requested) = requested else {
        return Ok(members.to_vec());
    };
    if requested.is_empty() {
        return Err(EngineError::Validation(
            "attendee list cannot be empty".into(),
        ));
    }

    let mut seen = HashSet::new();
    let mut attendees = Vec::with_capacity(requested.len());
    for member in requested {
        if !members.contains(member) {
            return Err(EngineError::Validation(format!(
                "attendee {member} is not a group member"
            )));
        }
        if seen.insert(*member) {
            attendees.push(*member);
        }
    }
    Ok(attendees)
}

fn attendees_of(round: &Round, members: &[MemberId]) -> Vec<MemberId> {
    round
        .attendees
        .clone()
        .unwrap_or_else(|| members.to_vec())
}
