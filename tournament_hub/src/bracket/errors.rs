//! Bracket engine error types.

use super::models::{SlotPosition, TeamId};
use thiserror::Error;

/// Bracket errors
///
/// Everything except `EmptyRoster` means the bracket snapshot no longer matches
/// the operation applied to it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BracketError {
    /// No teams to plan
    #[error("Cannot plan a bracket without teams")]
    EmptyRoster,

    /// Slot missing from the bracket
    #[error("Bracket slot {0} not found")]
    SlotNotFound(SlotPosition),

    /// Winner does not play in the completed slot
    #[error("Team {team_id} does not play in bracket slot {position}")]
    WinnerNotInSlot {
        position: SlotPosition,
        team_id: TeamId,
    },

    /// Successor side already filled
    #[error("Bracket slot {0} already has that side filled")]
    SideOccupied(SlotPosition),
}

impl BracketError {
    /// Whether this error indicates a corrupted or mismatched bracket snapshot
    pub fn is_structural(&self) -> bool {
        !matches!(self, BracketError::EmptyRoster)
    }
}

/// Result type for bracket operations
pub type BracketResult<T> = Result<T, BracketError>;
