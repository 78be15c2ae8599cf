/// Property-based tests for bracket planning and advancement using proptest
///
/// These tests check the structural invariants of planned brackets across
/// many roster sizes and random seeds, then play every bracket to the end.
use proptest::prelude::*;
use rand::{SeedableRng, rngs::StdRng};
use std::collections::{HashMap, HashSet};
use tournament_hub::bracket::{Advancement, SlotPosition, TeamRef, advance, plan};

fn roster(n: usize) -> Vec<TeamRef> {
    (1..=n as i64)
        .map(|id| TeamRef::new(id, format!("Team {id}")))
        .collect()
}

fn expected_rounds(n: usize) -> u32 {
    let mut rounds = 0;
    while (1usize << rounds) < n {
        rounds += 1;
    }
    rounds
}

proptest! {
    #[test]
    fn test_plan_shape(n in 1usize..=64, seed in any::<u64>()) {
        let bracket = plan(&roster(n), &mut StdRng::seed_from_u64(seed)).unwrap();
        let rounds = expected_rounds(n);

        prop_assert_eq!(bracket.rounds, rounds);
        prop_assert_eq!(bracket.total_slots(), (1usize << rounds) - 1);
        prop_assert_eq!(bracket.byes, (1usize << rounds) - n);
        if n >= 2 {
            prop_assert!(bracket.byes < n);
        }

        for round in 1..=rounds {
            prop_assert_eq!(bracket.round(round).count(), 1usize << (rounds - round));
        }
    }

    #[test]
    fn test_each_team_in_one_round_one_slot(n in 2usize..=64, seed in any::<u64>()) {
        let bracket = plan(&roster(n), &mut StdRng::seed_from_u64(seed)).unwrap();

        let mut seen = HashSet::new();
        for slot in bracket.round(1) {
            for team in [slot.team1.team(), slot.team2.team()].into_iter().flatten() {
                prop_assert!(seen.insert(team.id), "team {} appears twice", team.id);
            }
        }
        prop_assert_eq!(seen.len(), n);
    }

    #[test]
    fn test_successor_wiring(n in 2usize..=64, seed in any::<u64>()) {
        let bracket = plan(&roster(n), &mut StdRng::seed_from_u64(seed)).unwrap();

        for slot in &bracket.slots {
            if slot.round == bracket.rounds {
                prop_assert_eq!(slot.next, None);
            } else {
                prop_assert_eq!(slot.next, Some(slot.position().successor()));
            }
        }
    }

    #[test]
    fn test_byes_never_left_playable(n in 2usize..=64, seed in any::<u64>()) {
        let bracket = plan(&roster(n), &mut StdRng::seed_from_u64(seed)).unwrap();

        for slot in bracket.slots.iter().filter(|s| s.is_bye_resolvable()) {
            let next = slot.next;
            prop_assert!(next.is_some(), "final holds a bye");
            let successor = bracket.slot(next.unwrap()).unwrap();
            prop_assert!(!successor.side(slot.position().feeds_side()).is_empty());
        }
        prop_assert!(bracket.final_position().is_some());
        let final_slot = bracket.slot(bracket.final_position().unwrap()).unwrap();
        prop_assert!(!final_slot.team1.is_bye() && !final_slot.team2.is_bye());
    }

    #[test]
    fn test_playing_out_takes_n_minus_one_games(n in 1usize..=40, seed in any::<u64>(), pick in any::<u64>()) {
        let teams = roster(n);
        let mut bracket = plan(&teams, &mut StdRng::seed_from_u64(seed)).unwrap();
        let mut chooser = StdRng::seed_from_u64(pick);
        let mut played: HashMap<SlotPosition, i64> = HashMap::new();
        let mut champion = bracket.champion.clone();

        while champion.is_none() {
            let next = bracket
                .playable_slots()
                .find(|s| !played.contains_key(&s.position()))
                .map(|s| (s.position(), s.team1.team().cloned(), s.team2.team().cloned()));
            prop_assert!(next.is_some(), "bracket stalled without a champion");
            let (position, team1, team2) = next.unwrap();

            let winner = (if rand::Rng::random_bool(&mut chooser, 0.5) { team1 } else { team2 }).unwrap();
            played.insert(position, winner.id);

            if let Advancement::Champion(team) = advance(&mut bracket, position, &winner).unwrap() {
                champion = Some(team);
            }
        }

        prop_assert_eq!(played.len(), n - 1);
        prop_assert!(teams.contains(champion.as_ref().unwrap()));
    }
}
