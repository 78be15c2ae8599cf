//! Matches and their lifecycle.

pub mod errors;
pub mod lifecycle;
pub mod models;

pub use errors::{LifecycleError, LifecycleResult, MatchError};
pub use lifecycle::{ResultOutcome, cancel, report_result, start};
pub use models::{MatchFilter, MatchId, MatchRecord, MatchResult, MatchSide, MatchStatus, NewMatch};
