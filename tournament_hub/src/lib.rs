//! # Tournament Hub
//!
//! Competition management with a single-elimination bracket engine.
//!
//! Organizers create competitions and register teams. Generating the bracket
//! shuffles the roster, pads it with byes up to the next power of two and
//! schedules every round-1 match between two real teams. Each reported result
//! advances the winner into the next round and schedules the successor match
//! once both of its sides are known.
//!
//! ## Core Modules
//!
//! - [`bracket`]: Bracket planner and advancer (pure, synchronous)
//! - [`matches`]: Match records and their lifecycle state machine
//! - [`competition`]: Competitions, teams and the [`TournamentCoordinator`]
//! - [`feedback`]: Competition feedback and admin review
//! - [`db`]: Repository traits with in-memory and PostgreSQL backends
//! - [`auth`]: Roles, principals and access tokens
//! - [`events`]: Change notifications
//!
//! ## Example
//!
//! ```
//! use rand::{SeedableRng, rngs::StdRng};
//! use tournament_hub::bracket::{TeamRef, plan};
//!
//! let teams: Vec<TeamRef> = (1..=5).map(|id| TeamRef::new(id, format!("Team {id}"))).collect();
//! let bracket = plan(&teams, &mut StdRng::seed_from_u64(7)).unwrap();
//!
//! assert_eq!(bracket.rounds, 3);
//! assert_eq!(bracket.byes, 3);
//! assert_eq!(bracket.total_slots(), 7);
//! ```

pub mod auth;
pub mod bracket;
pub mod competition;
pub mod db;
pub mod events;
pub mod feedback;
pub mod matches;

pub use competition::{CoordinatorError, CoordinatorResult, TournamentCoordinator};
pub use events::{ChangeEvent, EventBus};
pub use feedback::FeedbackManager;
