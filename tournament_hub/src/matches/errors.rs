//! Match lifecycle error types.

use thiserror::Error;

use super::models::MatchStatus;
use crate::bracket::{BracketError, TeamId};

/// Match state errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// Transition not allowed from the current status
    #[error("Cannot move match from {from} to {to}")]
    InvalidStateTransition { from: MatchStatus, to: MatchStatus },

    /// Winner is not one of the two teams
    #[error("Team {0} did not play in this match")]
    InvalidWinner(TeamId),
}

/// Errors raised while applying a result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Match(#[from] MatchError),

    /// Bracket and match records disagree
    #[error("Bracket inconsistency: {0}")]
    Bracket(#[from] BracketError),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;
