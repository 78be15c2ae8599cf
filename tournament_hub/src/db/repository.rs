//! Repository trait definitions for testability and dependency injection.
//!
//! The coordinator only talks to storage through these traits, so the same
//! logic runs against PostgreSQL in production and in-memory maps in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::errors::StoreResult;
use crate::{
    auth::UserId,
    bracket::TeamId,
    competition::{Competition, CompetitionFilter, CompetitionId, NewCompetition, NewTeam, Team, TeamFilter},
    feedback::{Feedback, FeedbackFilter, FeedbackId, NewFeedback},
    matches::{MatchFilter, MatchId, MatchRecord, MatchStatus, NewMatch},
};

/// Trait for competition repository operations
#[async_trait]
pub trait CompetitionRepository: Send + Sync {
    /// Create a competition owned by `organizer_id`
    async fn insert_competition(
        &self,
        organizer_id: UserId,
        new: &NewCompetition,
        now: DateTime<Utc>,
    ) -> StoreResult<Competition>;

    async fn get_competition(&self, id: CompetitionId) -> StoreResult<Option<Competition>>;

    /// List competitions, most recent start date first
    async fn list_competitions(&self, filter: &CompetitionFilter) -> StoreResult<Vec<Competition>>;

    /// Overwrite a competition with its current in-memory state
    async fn save_competition(&self, competition: &Competition) -> StoreResult<()>;

    /// Returns `false` if nothing was deleted
    async fn delete_competition(&self, id: CompetitionId) -> StoreResult<bool>;
}

/// Trait for team repository operations
#[async_trait]
pub trait TeamRepository: Send + Sync {
    /// Create a team with its captain as the first player; names are unique
    async fn insert_team(&self, captain_id: UserId, new: &NewTeam, now: DateTime<Utc>) -> StoreResult<Team>;

    async fn get_team(&self, id: TeamId) -> StoreResult<Option<Team>>;

    /// Fetch teams in the order of `ids`, skipping unknown IDs
    async fn get_teams(&self, ids: &[TeamId]) -> StoreResult<Vec<Team>>;

    /// List teams ordered by name
    async fn list_teams(&self, filter: &TeamFilter) -> StoreResult<Vec<Team>>;

    /// Save name, description and roster. Win/loss tallies are only written
    /// by [`TransactionRepository::commit_result`].
    async fn save_team(&self, team: &Team) -> StoreResult<()>;

    async fn delete_team(&self, id: TeamId) -> StoreResult<bool>;
}

/// Trait for match repository operations
#[async_trait]
pub trait MatchRepository: Send + Sync {
    async fn insert_match(&self, new: &NewMatch, now: DateTime<Utc>) -> StoreResult<MatchRecord>;

    async fn get_match(&self, id: MatchId) -> StoreResult<Option<MatchRecord>>;

    /// Matches of a competition sorted by `(round, start_time)`
    async fn list_matches(
        &self,
        competition_id: CompetitionId,
        status: Option<MatchStatus>,
    ) -> StoreResult<Vec<MatchRecord>>;

    /// Matches across competitions sorted by `(competition, round, start_time)`
    async fn find_matches(&self, filter: &MatchFilter) -> StoreResult<Vec<MatchRecord>>;

    async fn save_match(&self, record: &MatchRecord) -> StoreResult<()>;

    async fn delete_match(&self, id: MatchId) -> StoreResult<bool>;

    /// Remove every match of a competition, returning how many were removed
    async fn delete_matches_for(&self, competition_id: CompetitionId) -> StoreResult<u64>;
}

/// Trait for feedback repository operations
#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    /// Create feedback; one entry per user per competition
    async fn insert_feedback(
        &self,
        user_id: UserId,
        new: &NewFeedback,
        now: DateTime<Utc>,
    ) -> StoreResult<Feedback>;

    async fn get_feedback(&self, id: FeedbackId) -> StoreResult<Option<Feedback>>;

    /// List feedback, newest first
    async fn list_feedback(&self, filter: &FeedbackFilter) -> StoreResult<Vec<Feedback>>;

    async fn save_feedback(&self, feedback: &Feedback) -> StoreResult<()>;

    async fn delete_feedback(&self, id: FeedbackId) -> StoreResult<bool>;
}

/// Every write caused by one reported result
#[derive(Debug, Clone, Copy)]
pub struct ResultCommit<'a> {
    /// The completed match
    pub record: &'a MatchRecord,
    /// `(winner, loser)` whose tallies are bumped
    pub tally: Option<(TeamId, TeamId)>,
    /// Successor match that became playable
    pub next_match: Option<&'a NewMatch>,
    /// Competition carrying the advanced bracket
    pub competition: Option<&'a Competition>,
}

/// Multi-record writes that complete or fail as a unit
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Replace every match of `competition` with `matches` and save the
    /// competition with its new bracket.
    async fn commit_bracket(
        &self,
        competition: &Competition,
        matches: &[NewMatch],
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<MatchRecord>>;

    /// Apply a reported result, returning the inserted successor match
    async fn commit_result(&self, commit: ResultCommit<'_>, now: DateTime<Utc>) -> StoreResult<Option<MatchRecord>>;
}

/// Everything the services need from storage
pub trait Store:
    CompetitionRepository + TeamRepository + MatchRepository + FeedbackRepository + TransactionRepository
{
}

impl<T> Store for T where
    T: CompetitionRepository + TeamRepository + MatchRepository + FeedbackRepository + TransactionRepository
{
}
