//! Bracket data models for single-elimination competitions.

use serde::{Deserialize, Serialize};

/// Team ID type
pub type TeamId = i64;

/// Reference to a registered team, as seen by the bracket engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamRef {
    /// Team ID
    pub id: TeamId,
    /// Display name
    pub name: String,
}

impl TeamRef {
    /// Create a new team reference
    pub fn new(id: TeamId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// One side of a bracket slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "team", rename_all = "snake_case")]
pub enum SlotSide {
    /// Waiting for the winner of an earlier slot
    Empty,
    /// No opponent; the other side advances automatically
    Bye,
    /// A real team
    Team(TeamRef),
}

impl SlotSide {
    /// Get the team on this side, if any
    pub fn team(&self) -> Option<&TeamRef> {
        match self {
            SlotSide::Team(team) => Some(team),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, SlotSide::Empty)
    }

    pub fn is_bye(&self) -> bool {
        matches!(self, SlotSide::Bye)
    }
}

/// Which side of a slot a team occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Team1,
    Team2,
}

/// Position of a slot within a bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotPosition {
    /// Round number (1-indexed)
    pub round: u32,
    /// Match number within the round (1-indexed)
    pub match_number: u32,
}

impl SlotPosition {
    pub fn new(round: u32, match_number: u32) -> Self {
        Self {
            round,
            match_number,
        }
    }

    /// Position fed by this one in the next round.
    ///
    /// Slot pairs `(2k-1, 2k)` feed slot `k`.
    pub fn successor(&self) -> Self {
        Self {
            round: self.round + 1,
            match_number: (self.match_number - 1) / 2 + 1,
        }
    }

    /// Side of the successor this position feeds: odd numbers go to `team1`, even to `team2`.
    pub fn feeds_side(&self) -> Side {
        if self.match_number % 2 == 0 {
            Side::Team2
        } else {
            Side::Team1
        }
    }
}

impl std::fmt::Display for SlotPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{}M{}", self.round, self.match_number)
    }
}

/// A planned match position in the bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketSlot {
    /// Round number (1-indexed)
    pub round: u32,
    /// Match number within the round (1-indexed)
    pub match_number: u32,
    /// First side
    pub team1: SlotSide,
    /// Second side
    pub team2: SlotSide,
    /// Successor slot (None for the final)
    pub next: Option<SlotPosition>,
}

impl BracketSlot {
    pub fn position(&self) -> SlotPosition {
        SlotPosition::new(self.round, self.match_number)
    }

    pub fn side(&self, side: Side) -> &SlotSide {
        match side {
            Side::Team1 => &self.team1,
            Side::Team2 => &self.team2,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut SlotSide {
        match side {
            Side::Team1 => &mut self.team1,
            Side::Team2 => &mut self.team2,
        }
    }

    /// Both sides hold real teams
    pub fn is_playable(&self) -> bool {
        self.team1.team().is_some() && self.team2.team().is_some()
    }

    /// Both sides are filled and at least one is a bye
    pub fn is_bye_resolvable(&self) -> bool {
        !self.team1.is_empty()
            && !self.team2.is_empty()
            && (self.team1.is_bye() || self.team2.is_bye())
    }

    /// Check whether the team sits on either side
    pub fn contains(&self, team_id: TeamId) -> bool {
        [&self.team1, &self.team2]
            .iter()
            .any(|side| side.team().is_some_and(|t| t.id == team_id))
    }
}

/// Full single-elimination bracket for one competition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bracket {
    /// Number of registered teams the bracket was planned for
    pub team_count: usize,
    /// Number of rounds, `ceil(log2(team_count))`
    pub rounds: u32,
    /// Number of byes handed out in round 1
    pub byes: usize,
    /// All slots, ordered by round then match number
    pub slots: Vec<BracketSlot>,
    /// Tournament winner, once known
    pub champion: Option<TeamRef>,
}

impl Bracket {
    /// Slot count of a perfect bracket, `2^rounds`
    pub fn perfect_size(&self) -> usize {
        1usize << self.rounds
    }

    /// Total slot count, `2^rounds - 1`
    pub fn total_slots(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots in the given round
    pub fn slots_in_round(&self, round: u32) -> usize {
        if round == 0 || round > self.rounds {
            0
        } else {
            1usize << (self.rounds - round)
        }
    }

    /// Iterate over the slots of one round
    pub fn round(&self, round: u32) -> impl Iterator<Item = &BracketSlot> {
        self.slots.iter().filter(move |slot| slot.round == round)
    }

    pub fn slot(&self, position: SlotPosition) -> Option<&BracketSlot> {
        self.index_of(position).map(|idx| &self.slots[idx])
    }

    pub fn slot_mut(&mut self, position: SlotPosition) -> Option<&mut BracketSlot> {
        self.index_of(position).map(move |idx| &mut self.slots[idx])
    }

    /// Position of the final, if the bracket has any rounds
    pub fn final_position(&self) -> Option<SlotPosition> {
        (self.rounds > 0).then(|| SlotPosition::new(self.rounds, 1))
    }

    /// Slots that currently hold two real teams
    pub fn playable_slots(&self) -> impl Iterator<Item = &BracketSlot> {
        self.slots.iter().filter(|slot| slot.is_playable())
    }

    fn index_of(&self, position: SlotPosition) -> Option<usize> {
        if position.round == 0 || position.round > self.rounds || position.match_number == 0 {
            return None;
        }

        if position.match_number as usize > self.slots_in_round(position.round) {
            return None;
        }

        // Slots are laid out round by round, each round half the size of the previous one.
        let offset: usize = (1..position.round).map(|r| self.slots_in_round(r)).sum();
        let idx = offset + position.match_number as usize - 1;

        self.slots
            .get(idx)
            .filter(|slot| slot.position() == position)
            .map(|_| idx)
    }
}
