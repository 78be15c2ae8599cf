//! Randomized single-elimination bracket planning.

use rand::{Rng, seq::SliceRandom};

use super::{
    advancer::{self, Advancement},
    errors::{BracketError, BracketResult},
    models::{Bracket, BracketSlot, SlotPosition, SlotSide, TeamRef},
};

/// Number of rounds needed for `team_count` teams, `ceil(log2(team_count))`
pub fn rounds_for(team_count: usize) -> u32 {
    team_count.next_power_of_two().trailing_zeros()
}

/// Plan a bracket for the given roster.
///
/// Teams are padded with byes up to the next power of two and shuffled with
/// the supplied random source. Slots where a team faces a bye are resolved
/// before returning, so every playable round-1 slot holds two real teams.
///
/// # Arguments
///
/// * `teams` - Registered teams; duplicates must be filtered by the caller
/// * `rng` - Random source used for seeding
///
/// # Returns
///
/// * `BracketResult<Bracket>` - Planned bracket or error
///
/// # Errors
///
/// * `BracketError::EmptyRoster` - No teams were given
pub fn plan<R: Rng + ?Sized>(teams: &[TeamRef], rng: &mut R) -> BracketResult<Bracket> {
    let team_count = teams.len();
    if team_count == 0 {
        return Err(BracketError::EmptyRoster);
    }

    let rounds = rounds_for(team_count);
    if rounds == 0 {
        return Ok(Bracket {
            team_count,
            rounds,
            byes: 0,
            slots: Vec::new(),
            champion: Some(teams[0].clone()),
        });
    }

    let perfect = 1usize << rounds;
    let byes = perfect - team_count;

    let mut working: Vec<SlotSide> = teams
        .iter()
        .cloned()
        .map(SlotSide::Team)
        .chain(std::iter::repeat_n(SlotSide::Bye, byes))
        .collect();
    working.shuffle(rng);

    let mut slots = Vec::with_capacity(perfect - 1);
    for (idx, pair) in working.chunks_exact(2).enumerate() {
        slots.push(slot_at(
            1,
            idx as u32 + 1,
            rounds,
            pair[0].clone(),
            pair[1].clone(),
        ));
    }
    for round in 2..=rounds {
        let count = 1u32 << (rounds - round);
        for match_number in 1..=count {
            slots.push(slot_at(
                round,
                match_number,
                rounds,
                SlotSide::Empty,
                SlotSide::Empty,
            ));
        }
    }

    let mut bracket = Bracket {
        team_count,
        rounds,
        byes,
        slots,
        champion: None,
    };

    // Round-1 slots in order; each cascade stops at the first slot still
    // waiting on its other feeder.
    let first_round = bracket.slots_in_round(1) as u32;
    for match_number in 1..=first_round {
        if let Advancement::Champion(team) =
            advancer::resolve_from(&mut bracket, SlotPosition::new(1, match_number))?
        {
            bracket.champion = Some(team);
        }
    }

    log::debug!(
        "Planned bracket: {} teams, {} rounds, {} byes",
        team_count,
        rounds,
        byes
    );

    Ok(bracket)
}

fn slot_at(round: u32, match_number: u32, rounds: u32, team1: SlotSide, team2: SlotSide) -> BracketSlot {
    let position = SlotPosition::new(round, match_number);
    BracketSlot {
        round,
        match_number,
        team1,
        team2,
        next: (round < rounds).then(|| position.successor()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use std::collections::HashSet;

    fn roster(n: usize) -> Vec<TeamRef> {
        (1..=n as i64)
            .map(|id| TeamRef::new(id, format!("Team {id}")))
            .collect()
    }

    #[test]
    fn test_rounds_for() {
        assert_eq!(rounds_for(1), 0);
        assert_eq!(rounds_for(2), 1);
        assert_eq!(rounds_for(3), 2);
        assert_eq!(rounds_for(5), 3);
        assert_eq!(rounds_for(8), 3);
        assert_eq!(rounds_for(9), 4);
    }

    #[test]
    fn test_empty_roster_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(plan(&[], &mut rng), Err(BracketError::EmptyRoster));
    }

    #[test]
    fn test_single_team_is_degenerate_bracket() {
        let mut rng = StdRng::seed_from_u64(1);
        let bracket = plan(&roster(1), &mut rng).unwrap();

        assert_eq!(bracket.rounds, 0);
        assert!(bracket.slots.is_empty());
        assert_eq!(bracket.champion, Some(TeamRef::new(1, "Team 1")));
        assert_eq!(bracket.final_position(), None);
    }

    #[test]
    fn test_two_teams_single_final() {
        let mut rng = StdRng::seed_from_u64(7);
        let bracket = plan(&roster(2), &mut rng).unwrap();

        assert_eq!(bracket.rounds, 1);
        assert_eq!(bracket.byes, 0);
        assert_eq!(bracket.total_slots(), 1);
        let final_slot = &bracket.slots[0];
        assert!(final_slot.is_playable());
        assert_eq!(final_slot.next, None);
    }

    #[test]
    fn test_five_team_shape() {
        let mut rng = StdRng::seed_from_u64(42);
        let bracket = plan(&roster(5), &mut rng).unwrap();

        assert_eq!(bracket.rounds, 3);
        assert_eq!(bracket.perfect_size(), 8);
        assert_eq!(bracket.byes, 3);
        assert_eq!(bracket.total_slots(), 7);
        assert_eq!(bracket.round(1).count(), 4);
        assert_eq!(bracket.round(2).count(), 2);
        assert_eq!(bracket.round(3).count(), 1);

        let mut real = 0;
        let mut byes = 0;
        for slot in bracket.round(1) {
            for side in [&slot.team1, &slot.team2] {
                match side {
                    SlotSide::Team(_) => real += 1,
                    SlotSide::Bye => byes += 1,
                    SlotSide::Empty => panic!("round 1 side left empty"),
                }
            }
        }
        assert_eq!(real, 5);
        assert_eq!(byes, 3);
    }

    #[test]
    fn test_bye_paired_teams_already_in_round_two() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let bracket = plan(&roster(5), &mut rng).unwrap();

            for slot in bracket.round(1).filter(|s| s.is_bye_resolvable()) {
                let Some(team) = slot.team1.team().or(slot.team2.team()) else {
                    continue;
                };
                let successor = bracket.slot(slot.position().successor()).unwrap();
                assert_eq!(successor.side(slot.position().feeds_side()).team(), Some(team));
            }
        }
    }

    #[test]
    fn test_each_team_in_exactly_one_round_one_slot() {
        let mut rng = StdRng::seed_from_u64(3);
        let teams = roster(11);
        let bracket = plan(&teams, &mut rng).unwrap();

        let mut seen = HashSet::new();
        for slot in bracket.round(1) {
            for team in [slot.team1.team(), slot.team2.team()].into_iter().flatten() {
                assert!(seen.insert(team.id), "team {} placed twice", team.id);
            }
        }
        assert_eq!(seen.len(), teams.len());
    }

    #[test]
    fn test_bye_pairs_are_always_resolved_forward() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let bracket = plan(&roster(6), &mut rng).unwrap();
            for slot in bracket.slots.iter().filter(|s| s.is_bye_resolvable()) {
                let next = slot.next.expect("final never holds a bye");
                let successor = bracket.slot(next).unwrap();
                assert!(!successor.side(slot.position().feeds_side()).is_empty());
            }
        }
    }

    #[test]
    fn test_perfect_roster_has_no_byes() {
        let mut rng = StdRng::seed_from_u64(9);
        let bracket = plan(&roster(8), &mut rng).unwrap();

        assert_eq!(bracket.byes, 0);
        assert_eq!(bracket.playable_slots().count(), 4);
        assert!(bracket.round(2).all(|s| s.team1.is_empty() && s.team2.is_empty()));
    }
}
