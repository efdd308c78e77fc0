//! In-memory store backend.
//!
//! All tables live behind a single `RwLock`, so the two conditional writes
//! (open-round guard, first-pick-wins) are atomic with respect to every other
//! request. The whole state can be persisted as a JSON snapshot.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use model::{
    EngineError, GroupId, MemberId, Movie, MovieId, Pick, PreferenceProfile, Rating, Result,
    RoundId, RoundRecord, RoundStatus, StatusGuard, Suggestion, Vote,
};

use crate::traits::{GroupStore, RoundStore};

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

/// A group member with the display name the CLI resolves `--as` against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub id: MemberId,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: GroupId,
    pub name: String,
    pub members: Vec<MemberRecord>,
    pub profiles: HashMap<MemberId, PreferenceProfile>,
    pub watched: BTreeSet<MovieId>,
    pub watchlist: Vec<Movie>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Tables {
    groups: HashMap<GroupId, GroupRecord>,
    rounds: HashMap<RoundId, RoundRecord>,
    suggestions: HashMap<RoundId, Vec<Suggestion>>,
    votes: HashMap<RoundId, Vec<Vote>>,
    picks: HashMap<RoundId, Pick>,
    ratings: HashMap<RoundId, Vec<Rating>>,
}

/// Store backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot previously written by [`MemoryStore::save`].
    ///
    /// Records are loaded verbatim; status literals are not rewritten.
    pub fn load(path: &Path) -> std::result::Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path)?;
        let tables: Tables = serde_json::from_str(&content)?;
        debug!(
            "Loaded snapshot with {} groups and {} rounds",
            tables.groups.len(),
            tables.rounds.len()
        );
        Ok(Self {
            tables: RwLock::new(tables),
        })
    }

    pub async fn save(&self, path: &Path) -> std::result::Result<(), SnapshotError> {
        let content = {
            let tables = self.tables.read().await;
            serde_json::to_string_pretty(&*tables)?
        };
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    // Seeding helpers. Groups, members, profiles and watchlists are owned by
    // other services in production; these exist for fixtures and the CLI.

    pub async fn insert_group(&self, group: GroupRecord) {
        self.tables.write().await.groups.insert(group.id, group);
    }

    pub async fn add_member(&self, group_id: GroupId, name: impl Into<String>) -> Result<MemberId> {
        let mut tables = self.tables.write().await;
        let group = tables
            .groups
            .get_mut(&group_id)
            .ok_or_else(|| EngineError::not_found("group", group_id))?;
        let id = Uuid::new_v4();
        group.members.push(MemberRecord {
            id,
            name: name.into(),
        });
        Ok(id)
    }

    pub async fn put_profile(&self, profile: PreferenceProfile) -> Result<()> {
        profile.validate()?;
        let mut tables = self.tables.write().await;
        let group = tables
            .groups
            .get_mut(&profile.group_id)
            .ok_or_else(|| EngineError::not_found("group", profile.group_id))?;
        group.profiles.insert(profile.member_id, profile);
        Ok(())
    }

    pub async fn add_to_watchlist(&self, group_id: GroupId, movie: Movie) -> Result<()> {
        let mut tables = self.tables.write().await;
        let group = tables
            .groups
            .get_mut(&group_id)
            .ok_or_else(|| EngineError::not_found("group", group_id))?;
        if !group.watchlist.iter().any(|m| m.id == movie.id) {
            group.watchlist.push(movie);
        }
        Ok(())
    }

    /// Write a raw round record, bypassing every guard.
    ///
    /// Used to import historical rounds whose status literal may predate the
    /// current vocabulary.
    pub async fn import_round(&self, round: RoundRecord, slate: Vec<Suggestion>) {
        let mut tables = self.tables.write().await;
        tables.suggestions.insert(round.id, slate);
        tables.rounds.insert(round.id, round);
    }

    pub async fn groups(&self) -> Vec<GroupRecord> {
        self.tables.read().await.groups.values().cloned().collect()
    }

    /// Resolve a member by case-insensitive display name.
    pub async fn find_member(&self, name: &str) -> Option<(GroupId, MemberRecord)> {
        let tables = self.tables.read().await;
        tables.groups.values().find_map(|group| {
            group
                .members
                .iter()
                .find(|m| m.name.eq_ignore_ascii_case(name))
                .map(|m| (group.id, m.clone()))
        })
    }
}

#[async_trait]
impl RoundStore for MemoryStore {
    async fn create_round(&self, round: RoundRecord, slate: Vec<Suggestion>) -> Result<()> {
        let mut tables = self.tables.write().await;
        let open = tables.rounds.values().find(|r| {
            r.group_id == round.group_id
                && RoundStatus::from_stored(&r.status).ok() == Some(RoundStatus::Voting)
        });
        if let Some(existing) = open {
            return Err(EngineError::RoundAlreadyOpen {
                existing: existing.id,
            });
        }
        tables.suggestions.insert(round.id, slate);
        tables.rounds.insert(round.id, round);
        Ok(())
    }

    async fn get_round(&self, id: RoundId) -> Result<Option<RoundRecord>> {
        Ok(self.tables.read().await.rounds.get(&id).cloned())
    }

    async fn list_rounds(&self, group_id: GroupId) -> Result<Vec<RoundRecord>> {
        let tables = self.tables.read().await;
        let mut rounds: Vec<RoundRecord> = tables
            .rounds
            .values()
            .filter(|r| r.group_id == group_id)
            .cloned()
            .collect();
        rounds.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(rounds)
    }

    async fn update_round(&self, round: RoundRecord, guard: StatusGuard) -> Result<()> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .rounds
            .get_mut(&round.id)
            .ok_or_else(|| EngineError::not_found("round", round.id))?;
        guard.admit_record(existing)?;
        *existing = round;
        Ok(())
    }

    async fn suggestions(&self, round_id: RoundId) -> Result<Vec<Suggestion>> {
        let tables = self.tables.read().await;
        let mut slate = tables.suggestions.get(&round_id).cloned().unwrap_or_default();
        slate.sort_by_key(|s| s.position);
        Ok(slate)
    }

    async fn upsert_vote(&self, vote: Vote) -> Result<()> {
        let mut tables = self.tables.write().await;
        let votes = tables.votes.entry(vote.round_id).or_default();
        match votes
            .iter_mut()
            .find(|v| v.movie_id == vote.movie_id && v.member_id == vote.member_id)
        {
            Some(existing) => *existing = vote,
            None => votes.push(vote),
        }
        Ok(())
    }

    async fn votes(&self, round_id: RoundId) -> Result<Vec<Vote>> {
        Ok(self
            .tables
            .read()
            .await
            .votes
            .get(&round_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn commit_pick(
        &self,
        pick: Pick,
        round: RoundRecord,
        guard: StatusGuard,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.picks.get(&pick.round_id) {
            return Err(EngineError::PickExists {
                round_id: existing.round_id,
                pick_id: existing.id,
                movie_id: existing.movie_id,
            });
        }
        let stored = tables
            .rounds
            .get(&round.id)
            .ok_or_else(|| EngineError::not_found("round", round.id))?;
        guard.admit_record(stored)?;
        tables.picks.insert(pick.round_id, pick);
        tables.rounds.insert(round.id, round);
        Ok(())
    }

    async fn pick_for_round(&self, round_id: RoundId) -> Result<Option<Pick>> {
        Ok(self.tables.read().await.picks.get(&round_id).cloned())
    }

    async fn update_pick(&self, pick: Pick) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.picks.get_mut(&pick.round_id) {
            Some(existing) if existing.id == pick.id => {
                *existing = pick;
                Ok(())
            }
            _ => Err(EngineError::not_found("pick", pick.id)),
        }
    }

    async fn upsert_rating(&self, rating: Rating) -> Result<()> {
        let mut tables = self.tables.write().await;
        let ratings = tables.ratings.entry(rating.round_id).or_default();
        match ratings.iter_mut().find(|r| r.member_id == rating.member_id) {
            Some(existing) => *existing = rating,
            None => ratings.push(rating),
        }
        Ok(())
    }

    async fn ratings(&self, round_id: RoundId) -> Result<Vec<Rating>> {
        Ok(self
            .tables
            .read()
            .await
            .ratings
            .get(&round_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn group_members(&self, group_id: GroupId) -> Result<Vec<MemberId>> {
        let tables = self.tables.read().await;
        let group = tables
            .groups
            .get(&group_id)
            .ok_or_else(|| EngineError::not_found("group", group_id))?;
        Ok(group.members.iter().map(|m| m.id).collect())
    }

    async fn preference_profile(
        &self,
        group_id: GroupId,
        member_id: MemberId,
    ) -> Result<Option<PreferenceProfile>> {
        let tables = self.tables.read().await;
        Ok(tables
            .groups
            .get(&group_id)
            .and_then(|g| g.profiles.get(&member_id))
            .cloned())
    }

    async fn watched_movies(&self, group_id: GroupId) -> Result<HashSet<MovieId>> {
        let tables = self.tables.read().await;
        Ok(tables
            .groups
            .get(&group_id)
            .map(|g| g.watched.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn set_watched(
        &self,
        group_id: GroupId,
        movie_id: MovieId,
        watched: bool,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        let group = tables
            .groups
            .get_mut(&group_id)
            .ok_or_else(|| EngineError::not_found("group", group_id))?;
        if watched {
            group.watched.insert(movie_id);
        } else {
            group.watched.remove(&movie_id);
        }
        Ok(())
    }

    async fn watchlist(&self, group_id: GroupId) -> Result<Vec<Movie>> {
        let tables = self.tables.read().await;
        Ok(tables
            .groups
            .get(&group_id)
            .map(|g| g.watchlist.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use model::VoteDirection;
    use std::sync::Arc;

    fn round_record(group_id: GroupId, status: &str) -> RoundRecord {
        RoundRecord {
            id: Uuid::new_v4(),
            group_id,
            status: status.to_string(),
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            closed_at: None,
            pick_id: None,
            attendees: None,
        }
    }

    const PICK: StatusGuard = StatusGuard {
        action: "pick",
        allowed: &[RoundStatus::Voting, RoundStatus::Closed],
    };

    const CLOSE: StatusGuard = StatusGuard {
        action: "close",
        allowed: &[RoundStatus::Voting, RoundStatus::Closed],
    };

    fn with_status(record: &RoundRecord, status: RoundStatus) -> RoundRecord {
        RoundRecord {
            status: status.as_str().to_string(),
            ..record.clone()
        }
    }

    fn pick_for(round: &RoundRecord, movie_id: MovieId) -> Pick {
        Pick {
            id: Uuid::new_v4(),
            round_id: round.id,
            group_id: round.group_id,
            movie_id,
            picked_by: Uuid::new_v4(),
            picked_at: Utc::now(),
            watched: false,
            watched_at: None,
        }
    }

    #[tokio::test]
    async fn test_second_open_round_is_rejected() {
        let store = MemoryStore::new();
        let group_id = Uuid::new_v4();
        let first = round_record(group_id, "voting");
        store.create_round(first.clone(), vec![]).await.unwrap();

        let err = store
            .create_round(round_record(group_id, "voting"), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::RoundAlreadyOpen { existing } if existing == first.id));

        // Another group is unaffected
        store
            .create_round(round_record(Uuid::new_v4(), "voting"), vec![])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_closed_round_does_not_block_new_round() {
        let store = MemoryStore::new();
        let group_id = Uuid::new_v4();
        store
            .create_round(round_record(group_id, "closed"), vec![])
            .await
            .unwrap();
        store
            .create_round(round_record(group_id, "voting"), vec![])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_vote_upsert_keeps_latest_direction() {
        let store = MemoryStore::new();
        let round_id = Uuid::new_v4();
        let member_id = Uuid::new_v4();
        for direction in [VoteDirection::Up, VoteDirection::Down, VoteDirection::Up] {
            store
                .upsert_vote(Vote {
                    round_id,
                    movie_id: 7,
                    member_id,
                    direction,
                    voted_at: Utc::now(),
                })
                .await
                .unwrap();
        }
        store
            .upsert_vote(Vote {
                round_id,
                movie_id: 8,
                member_id,
                direction: VoteDirection::Down,
                voted_at: Utc::now(),
            })
            .await
            .unwrap();

        let votes = store.votes(round_id).await.unwrap();
        assert_eq!(votes.len(), 2);
        let on_seven = votes.iter().find(|v| v.movie_id == 7).unwrap();
        assert_eq!(on_seven.direction, VoteDirection::Up);
    }

    #[tokio::test]
    async fn test_concurrent_picks_have_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let round = round_record(Uuid::new_v4(), "voting");
        store.create_round(round.clone(), vec![]).await.unwrap();

        let mut handles = Vec::new();
        for movie_id in [1, 2] {
            let store = store.clone();
            let round = round.clone();
            handles.push(tokio::spawn(async move {
                let pick = pick_for(&round, movie_id);
                let selected = with_status(&round, RoundStatus::Selected);
                store.commit_pick(pick, selected, PICK).await
            }));
        }

        let mut successes = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => successes += 1,
                Err(EngineError::PickExists { .. }) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!((successes, conflicts), (1, 1));
        assert!(store.pick_for_round(round.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_pick_rejected_once_round_is_discarded() {
        let store = MemoryStore::new();
        let round = round_record(Uuid::new_v4(), "voting");
        store.create_round(round.clone(), vec![]).await.unwrap();
        let discard = StatusGuard {
            action: "discard",
            allowed: &[RoundStatus::Voting, RoundStatus::Closed],
        };
        store
            .update_round(with_status(&round, RoundStatus::Discarded), discard)
            .await
            .unwrap();

        // The picker read the round while it was still voting
        let err = store
            .commit_pick(
                pick_for(&round, 1),
                with_status(&round, RoundStatus::Selected),
                PICK,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransition { actual: RoundStatus::Discarded, .. }
        ));
        assert!(store.pick_for_round(round.id).await.unwrap().is_none());
        let stored = store.get_round(round.id).await.unwrap().unwrap();
        assert_eq!(stored.status, "discarded");
    }

    #[tokio::test]
    async fn test_stale_close_does_not_overwrite_pick() {
        let store = MemoryStore::new();
        let round = round_record(Uuid::new_v4(), "voting");
        store.create_round(round.clone(), vec![]).await.unwrap();
        let pick = pick_for(&round, 3);
        let mut selected = with_status(&round, RoundStatus::Selected);
        selected.pick_id = Some(pick.id);
        store.commit_pick(pick.clone(), selected, PICK).await.unwrap();

        let err = store
            .update_round(with_status(&round, RoundStatus::Closed), CLOSE)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransition { actual: RoundStatus::Selected, .. }
        ));
        let stored = store.get_round(round.id).await.unwrap().unwrap();
        assert_eq!(stored.status, "selected");
        assert_eq!(stored.pick_id, Some(pick.id));
    }

    #[tokio::test]
    async fn test_update_unknown_round_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_round(round_record(Uuid::new_v4(), "closed"), CLOSE)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "round", .. }));
    }

    #[tokio::test]
    async fn test_snapshot_preserves_legacy_status_literal() {
        let store = MemoryStore::new();
        let legacy = round_record(Uuid::new_v4(), RoundStatus::LEGACY_SELECTED);
        store.import_round(legacy.clone(), vec![]).await;

        let path = std::env::temp_dir().join(format!("movie-night-{}.json", Uuid::new_v4()));
        store.save(&path).await.unwrap();
        let reloaded = MemoryStore::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let record = reloaded.get_round(legacy.id).await.unwrap().unwrap();
        assert_eq!(record.status, "picked");
    }

    #[tokio::test]
    async fn test_group_watch_history() {
        let store = MemoryStore::new();
        let group_id = Uuid::new_v4();
        store
            .insert_group(GroupRecord {
                id: group_id,
                name: "Smiths".into(),
                ..Default::default()
            })
            .await;
        let member = store.add_member(group_id, "Ana").await.unwrap();

        store.set_watched(group_id, 42, true).await.unwrap();
        assert!(store.watched_movies(group_id).await.unwrap().contains(&42));
        store.set_watched(group_id, 42, false).await.unwrap();
        assert!(store.watched_movies(group_id).await.unwrap().is_empty());

        assert_eq!(store.group_members(group_id).await.unwrap(), vec![member]);
        let (found_group, found) = store.find_member("ana").await.unwrap();
        assert_eq!(found_group, group_id);
        assert_eq!(found.id, member);
    }
}
