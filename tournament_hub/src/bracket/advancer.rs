//! Winner propagation through a planned bracket.

use super::{
    errors::{BracketError, BracketResult},
    models::{Bracket, BracketSlot, SlotPosition, SlotSide, TeamRef},
};

/// Result of advancing a winner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advancement {
    /// The completed slot was the final; nothing moved
    Champion(TeamRef),
    /// The winner now sits in the slot at `position`
    Advanced {
        position: SlotPosition,
        /// Slot holds two real teams and can be scheduled
        ready: bool,
    },
}

impl Advancement {
    /// Position that just became playable, if any
    pub fn ready_position(&self) -> Option<SlotPosition> {
        match self {
            Advancement::Advanced {
                position,
                ready: true,
            } => Some(*position),
            _ => None,
        }
    }
}

/// Move the winner of a completed slot into its successor.
///
/// The winner lands in `team1` of the successor when the completed slot has an
/// odd match number and in `team2` when it is even. If the successor ends up as
/// a team facing a bye, that team keeps moving forward.
///
/// # Errors
///
/// * `BracketError::SlotNotFound` - The completed slot or a successor is missing
/// * `BracketError::WinnerNotInSlot` - The winner does not play in the completed slot
/// * `BracketError::SideOccupied` - The successor side was already filled
pub fn advance(
    bracket: &mut Bracket,
    completed: SlotPosition,
    winner: &TeamRef,
) -> BracketResult<Advancement> {
    let slot = bracket
        .slot(completed)
        .ok_or(BracketError::SlotNotFound(completed))?;

    if !slot.contains(winner.id) {
        return Err(BracketError::WinnerNotInSlot {
            position: completed,
            team_id: winner.id,
        });
    }

    let Some(next) = slot.next else {
        return Ok(Advancement::Champion(winner.clone()));
    };

    place(bracket, completed, next, SlotSide::Team(winner.clone()))?;
    resolve_from(bracket, next)
}

/// Push bye outcomes forward starting at `start` until a slot still waits on an
/// opponent or holds two real teams.
pub(super) fn resolve_from(bracket: &mut Bracket, start: SlotPosition) -> BracketResult<Advancement> {
    let mut position = start;

    loop {
        let slot = bracket
            .slot(position)
            .ok_or(BracketError::SlotNotFound(position))?;

        if !slot.is_bye_resolvable() {
            return Ok(Advancement::Advanced {
                position,
                ready: slot.is_playable(),
            });
        }

        let outcome = bye_outcome(slot);
        match slot.next {
            Some(next) => {
                place(bracket, position, next, outcome)?;
                position = next;
            }
            None => {
                return match outcome {
                    SlotSide::Team(team) => Ok(Advancement::Champion(team)),
                    _ => Ok(Advancement::Advanced {
                        position,
                        ready: false,
                    }),
                };
            }
        }
    }
}

fn bye_outcome(slot: &BracketSlot) -> SlotSide {
    match (&slot.team1, &slot.team2) {
        (SlotSide::Team(team), _) | (_, SlotSide::Team(team)) => SlotSide::Team(team.clone()),
        _ => SlotSide::Bye,
    }
}

fn place(
    bracket: &mut Bracket,
    from: SlotPosition,
    target: SlotPosition,
    value: SlotSide,
) -> BracketResult<()> {
    let slot = bracket
        .slot_mut(target)
        .ok_or(BracketError::SlotNotFound(target))?;

    let side = slot.side_mut(from.feeds_side());
    if !side.is_empty() {
        return Err(BracketError::SideOccupied(target));
    }

    *side = value;
    Ok(())
}
