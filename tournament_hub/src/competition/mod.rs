//! Competitions, rosters and the tournament coordinator.

pub mod coordinator;
pub mod errors;
pub mod models;

pub use coordinator::{ManualMatch, ResultReport, ScheduledBracket, TournamentCoordinator};
pub use errors::{CoordinatorError, CoordinatorResult};
pub use models::{
    Competition, CompetitionFilter, CompetitionId, CompetitionStatus, CompetitionUpdate, NewCompetition, NewTeam,
    Team, TeamFilter, TeamPlayer, TeamUpdate,
};
