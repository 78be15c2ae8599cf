//! Match data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{
    bracket::{SlotPosition, TeamId, TeamRef},
    competition::CompetitionId,
};

/// Match ID type
pub type MatchId = i64;

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Waiting to be played
    Scheduled,
    /// Being played
    InProgress,
    /// Result recorded
    Completed,
    /// Called off
    Cancelled,
}

impl MatchStatus {
    /// Terminal states accept no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Cancelled)
    }

    /// Check whether the lifecycle allows moving from `self` to `to`
    pub fn can_transition_to(self, to: MatchStatus) -> bool {
        use MatchStatus::*;
        matches!(
            (self, to),
            (Scheduled, InProgress)
                | (Scheduled, Completed)
                | (Scheduled, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::InProgress => "in_progress",
            MatchStatus::Completed => "completed",
            MatchStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(MatchStatus::Scheduled),
            "in_progress" => Ok(MatchStatus::InProgress),
            "completed" => Ok(MatchStatus::Completed),
            "cancelled" => Ok(MatchStatus::Cancelled),
            other => Err(format!("unknown match status '{other}'")),
        }
    }
}

/// One side of a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSide {
    pub team: TeamRef,
    pub score: u32,
}

impl MatchSide {
    pub fn new(team: TeamRef) -> Self {
        Self { team, score: 0 }
    }
}

/// Persisted match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub competition_id: CompetitionId,
    /// Round number (1-indexed)
    pub round: u32,
    /// Match number within the round (1-indexed)
    pub match_number: u32,
    pub team1: MatchSide,
    pub team2: MatchSide,
    pub winner: Option<TeamId>,
    pub status: MatchStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub venue: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MatchRecord {
    /// Bracket position this match plays
    pub fn position(&self) -> SlotPosition {
        SlotPosition::new(self.round, self.match_number)
    }

    /// Find the team with the given ID on either side
    pub fn team(&self, team_id: TeamId) -> Option<&TeamRef> {
        [&self.team1, &self.team2]
            .into_iter()
            .map(|side| &side.team)
            .find(|team| team.id == team_id)
    }

    /// Team that lost a completed match
    pub fn loser(&self) -> Option<&TeamRef> {
        let winner = self.winner?;
        [&self.team1, &self.team2]
            .into_iter()
            .map(|side| &side.team)
            .find(|team| team.id != winner)
    }
}

/// Match to be inserted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMatch {
    pub competition_id: CompetitionId,
    pub round: u32,
    pub match_number: u32,
    pub team1: TeamRef,
    pub team2: TeamRef,
    pub start_time: DateTime<Utc>,
    pub venue: Option<String>,
    pub notes: Option<String>,
}

impl NewMatch {
    /// Draft a scheduled match for a bracket slot
    pub fn scheduled(
        competition_id: CompetitionId,
        position: SlotPosition,
        team1: TeamRef,
        team2: TeamRef,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            competition_id,
            round: position.round,
            match_number: position.match_number,
            team1,
            team2,
            start_time,
            venue: None,
            notes: None,
        }
    }

    pub fn with_venue(mut self, venue: Option<String>) -> Self {
        self.venue = venue;
        self
    }

    /// Materialize the draft with the ID assigned by storage
    pub fn into_record(self, id: MatchId, now: DateTime<Utc>) -> MatchRecord {
        MatchRecord {
            id,
            competition_id: self.competition_id,
            round: self.round,
            match_number: self.match_number,
            team1: MatchSide::new(self.team1),
            team2: MatchSide::new(self.team2),
            winner: None,
            status: MatchStatus::Scheduled,
            start_time: self.start_time,
            end_time: None,
            venue: self.venue,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Listing filter across competitions
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MatchFilter {
    pub competition_id: Option<CompetitionId>,
    pub status: Option<MatchStatus>,
}

impl MatchFilter {
    pub fn matches(&self, record: &MatchRecord) -> bool {
        self.competition_id.is_none_or(|id| record.competition_id == id)
            && self.status.is_none_or(|s| record.status == s)
    }
}

/// Submitted result of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub team1_score: u32,
    pub team2_score: u32,
    pub winner_id: TeamId,
}
