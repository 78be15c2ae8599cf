//! Coordinator error types.

use thiserror::Error;

use super::models::CompetitionId;
use crate::{
    auth::UserId,
    bracket::{BracketError, TeamId},
    db::StoreError,
    feedback::FeedbackId,
    matches::{LifecycleError, MatchError, MatchId},
};

/// Errors surfaced by the coordinator and feedback services
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Request failed a precondition
    #[error("{0}")]
    Validation(String),

    #[error("Competition not found: {0}")]
    CompetitionNotFound(CompetitionId),

    #[error("Team not found: {0}")]
    TeamNotFound(TeamId),

    #[error("User {user_id} is not a player of team {team_id}")]
    PlayerNotFound { team_id: TeamId, user_id: UserId },

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("Feedback not found: {0}")]
    FeedbackNotFound(FeedbackId),

    #[error("Bracket not generated for competition {0}")]
    BracketNotFound(CompetitionId),

    /// Caller lacks the required role or ownership
    #[error("{0}")]
    Forbidden(String),

    /// Unique constraint violated
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Match(#[from] MatchError),

    /// Bracket and match records disagree
    #[error("Bracket inconsistency: {0}")]
    Bracket(#[from] BracketError),

    #[error(transparent)]
    Store(StoreError),
}

impl CoordinatorError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Storage failures and bracket inconsistencies are reported generically.
    pub fn client_message(&self) -> String {
        match self {
            CoordinatorError::Store(_) | CoordinatorError::Bracket(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Failure caused by broken internal state rather than the request
    pub fn is_internal(&self) -> bool {
        matches!(self, CoordinatorError::Store(_) | CoordinatorError::Bracket(_))
    }
}

impl From<StoreError> for CoordinatorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => CoordinatorError::Conflict(msg),
            other => CoordinatorError::Store(other),
        }
    }
}

impl From<LifecycleError> for CoordinatorError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Match(e) => CoordinatorError::Match(e),
            LifecycleError::Bracket(e) => CoordinatorError::Bracket(e),
        }
    }
}

/// Result type for coordinator operations
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
