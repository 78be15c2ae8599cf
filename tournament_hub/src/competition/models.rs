//! Competition and team data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{
    auth::UserId,
    bracket::{Bracket, TeamId, TeamRef},
};

/// Competition ID type
pub type CompetitionId = i64;

/// Maximum length of a competition or team name
pub const MAX_NAME_LEN: usize = 100;

/// Competition status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionStatus {
    /// Accepting registrations
    Upcoming,
    /// Bracket created, matches being played
    Ongoing,
    /// Champion decided
    Completed,
    /// Called off
    Cancelled,
}

impl CompetitionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CompetitionStatus::Upcoming => "upcoming",
            CompetitionStatus::Ongoing => "ongoing",
            CompetitionStatus::Completed => "completed",
            CompetitionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CompetitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompetitionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upcoming" => Ok(CompetitionStatus::Upcoming),
            "ongoing" => Ok(CompetitionStatus::Ongoing),
            "completed" => Ok(CompetitionStatus::Completed),
            "cancelled" => Ok(CompetitionStatus::Cancelled),
            other => Err(format!("unknown competition status '{other}'")),
        }
    }
}

/// Competition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competition {
    pub id: CompetitionId,
    pub name: String,
    pub sport: String,
    pub venue: Option<String>,
    pub description: Option<String>,
    pub rules: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub registration_deadline: DateTime<Utc>,
    pub max_teams: u32,
    pub status: CompetitionStatus,
    pub organizer_id: UserId,
    /// Registered teams in registration order
    pub teams: Vec<TeamId>,
    /// Planned bracket, once generated
    pub bracket: Option<Bracket>,
    pub champion: Option<TeamId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Competition {
    pub fn is_full(&self) -> bool {
        self.teams.len() >= self.max_teams as usize
    }

    pub fn is_registered(&self, team_id: TeamId) -> bool {
        self.teams.contains(&team_id)
    }

    pub fn has_bracket(&self) -> bool {
        self.bracket.is_some()
    }

    /// Registration is open until the deadline and before the bracket exists
    pub fn registration_open(&self, now: DateTime<Utc>) -> bool {
        self.status == CompetitionStatus::Upcoming
            && !self.has_bracket()
            && now <= self.registration_deadline
    }
}

/// Competition creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCompetition {
    pub name: String,
    pub sport: String,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rules: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub registration_deadline: DateTime<Utc>,
    pub max_teams: u32,
}

impl NewCompetition {
    /// Check field constraints
    pub fn validate(&self) -> Result<(), String> {
        validate_name(&self.name)?;
        if self.sport.trim().is_empty() {
            return Err("Sport is required".to_string());
        }
        validate_schedule(self.start_date, self.end_date, self.registration_deadline)?;
        validate_max_teams(self.max_teams)
    }
}

/// Partial competition update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompetitionUpdate {
    pub name: Option<String>,
    pub venue: Option<String>,
    pub description: Option<String>,
    pub rules: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub max_teams: Option<u32>,
    pub status: Option<CompetitionStatus>,
}

impl CompetitionUpdate {
    /// Apply the update to a competition, validating the merged result
    pub fn apply(self, competition: &mut Competition) -> Result<(), String> {
        let mut merged = competition.clone();

        if let Some(name) = self.name {
            validate_name(&name)?;
            merged.name = name;
        }
        if let Some(venue) = self.venue {
            merged.venue = Some(venue);
        }
        if let Some(description) = self.description {
            merged.description = Some(description);
        }
        if let Some(rules) = self.rules {
            merged.rules = Some(rules);
        }
        if let Some(start) = self.start_date {
            merged.start_date = start;
        }
        if let Some(end) = self.end_date {
            merged.end_date = end;
        }
        if let Some(deadline) = self.registration_deadline {
            merged.registration_deadline = deadline;
        }
        if let Some(max_teams) = self.max_teams {
            validate_max_teams(max_teams)?;
            if (max_teams as usize) < merged.teams.len() {
                return Err(format!(
                    "Max teams cannot be below the {} registered teams",
                    merged.teams.len()
                ));
            }
            merged.max_teams = max_teams;
        }
        if let Some(status) = self.status {
            merged.status = status;
        }

        validate_schedule(merged.start_date, merged.end_date, merged.registration_deadline)?;
        *competition = merged;
        Ok(())
    }
}

/// Listing filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompetitionFilter {
    pub status: Option<CompetitionStatus>,
    pub sport: Option<String>,
    /// Only competitions this team is registered for
    pub team: Option<TeamId>,
}

impl CompetitionFilter {
    pub fn matches(&self, competition: &Competition) -> bool {
        self.status.is_none_or(|s| competition.status == s)
            && self
                .sport
                .as_deref()
                .is_none_or(|sport| competition.sport.eq_ignore_ascii_case(sport))
            && self.team.is_none_or(|id| competition.is_registered(id))
    }
}

/// Maximum length of a player position label
pub const MAX_POSITION_LEN: usize = 50;

/// Roster entry of a team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamPlayer {
    pub user_id: UserId,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub jersey_number: Option<u32>,
}

impl TeamPlayer {
    /// Roster entry for the team's captain
    pub fn captain(user_id: UserId) -> Self {
        Self {
            user_id,
            position: Some("Captain".to_string()),
            jersey_number: Some(1),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.user_id <= 0 {
            return Err("User ID is required".to_string());
        }
        if self
            .position
            .as_deref()
            .is_some_and(|p| p.chars().count() > MAX_POSITION_LEN)
        {
            return Err(format!("Position must be at most {MAX_POSITION_LEN} characters"));
        }
        Ok(())
    }
}

/// Team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub captain_id: UserId,
    pub description: Option<String>,
    /// Roster, captain first
    pub players: Vec<TeamPlayer>,
    pub wins: u32,
    pub losses: u32,
    pub created_at: DateTime<Utc>,
}

impl Team {
    /// Reference used by the bracket engine
    pub fn to_ref(&self) -> TeamRef {
        TeamRef::new(self.id, self.name.clone())
    }

    pub fn has_player(&self, user_id: UserId) -> bool {
        self.players.iter().any(|p| p.user_id == user_id)
    }
}

/// Team listing filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamFilter {
    /// Only teams with this user on the roster
    pub player: Option<UserId>,
}

impl TeamFilter {
    pub fn matches(&self, team: &Team) -> bool {
        self.player.is_none_or(|id| team.has_player(id))
    }
}

/// Partial team update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl TeamUpdate {
    pub fn apply(self, team: &mut Team) -> Result<(), String> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(name) = self.name {
            team.name = name.trim().to_string();
        }
        if let Some(description) = self.description {
            team.description = Some(description);
        }
        Ok(())
    }
}

/// Team creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTeam {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewTeam {
    pub fn validate(&self) -> Result<(), String> {
        validate_name(&self.name)
    }
}

fn validate_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name is required".to_string());
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(format!("Name must be at most {MAX_NAME_LEN} characters"));
    }
    Ok(())
}

fn validate_schedule(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    deadline: DateTime<Utc>,
) -> Result<(), String> {
    if end < start {
        return Err("End date must not be before start date".to_string());
    }
    if deadline > start {
        return Err("Registration deadline must not be after start date".to_string());
    }
    Ok(())
}

fn validate_max_teams(max_teams: u32) -> Result<(), String> {
    if max_teams < 2 {
        return Err("Max teams must be at least 2".to_string());
    }
    Ok(())
}
