//! Single-elimination bracket engine.

pub mod advancer;
pub mod errors;
pub mod models;
pub mod planner;

pub use advancer::{Advancement, advance};
pub use errors::{BracketError, BracketResult};
pub use models::{Bracket, BracketSlot, Side, SlotPosition, SlotSide, TeamId, TeamRef};
pub use planner::{plan, rounds_for};
