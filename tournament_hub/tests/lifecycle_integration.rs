//! Integration tests for the match lifecycle
//!
//! Covers the lifecycle driving the bracket engine directly, and manually
//! created matches going through the coordinator without a bracket.

use chrono::{Duration, Utc};
use rand::{SeedableRng, rngs::StdRng};
use std::sync::Arc;
use tournament_hub::{
    CoordinatorError, EventBus, TournamentCoordinator,
    auth::{Principal, Role},
    bracket::{TeamRef, plan},
    competition::{ManualMatch, NewCompetition, NewTeam},
    db::InMemoryStore,
    matches::{self, LifecycleError, MatchError, MatchRecord, MatchResult, MatchStatus, NewMatch},
};

fn roster(n: usize) -> Vec<TeamRef> {
    (1..=n as i64)
        .map(|id| TeamRef::new(id, format!("Team {id}")))
        .collect()
}

fn team2_wins(record: &MatchRecord) -> MatchResult {
    MatchResult {
        team1_score: 0,
        team2_score: 1,
        winner_id: record.team2.team.id,
    }
}

#[test]
fn test_lifecycle_drives_six_team_bracket() {
    let mut bracket = plan(&roster(6), &mut StdRng::seed_from_u64(11)).unwrap();
    let now = Utc::now();
    let mut next_id = 0;
    let mut open: Vec<MatchRecord> = bracket
        .playable_slots()
        .map(|slot| {
            next_id += 1;
            NewMatch::scheduled(
                1,
                slot.position(),
                slot.team1.team().cloned().unwrap(),
                slot.team2.team().cloned().unwrap(),
                now,
            )
            .into_record(next_id, now)
        })
        .collect();

    let mut completed = 0;
    let mut champion = None;
    while let Some(mut record) = open.pop() {
        matches::start(&mut record, now).unwrap();
        let result = team2_wins(&record);
        let outcome = matches::report_result(&mut record, Some(&mut bracket), &result, now).unwrap();
        assert_eq!(record.status, MatchStatus::Completed);
        completed += 1;

        if let Some(new) = outcome.next_match.clone() {
            assert_eq!(new.round, record.round + 1);
            next_id += 1;
            open.push(new.into_record(next_id, now));
        }
        if let Some(team) = outcome.champion() {
            champion = Some(team.clone());
        }
    }

    assert_eq!(completed, 5);
    assert_eq!(bracket.champion, champion);
    assert!(champion.is_some());
}

#[test]
fn test_cancelled_match_cannot_be_reported() {
    let now = Utc::now();
    let teams = roster(2);
    let mut bracket = plan(&teams, &mut StdRng::seed_from_u64(1)).unwrap();
    let slot = bracket.slots[0].clone();
    let mut record = NewMatch::scheduled(
        1,
        slot.position(),
        slot.team1.team().cloned().unwrap(),
        slot.team2.team().cloned().unwrap(),
        now,
    )
    .into_record(1, now);

    matches::cancel(&mut record, now).unwrap();
    let result = team2_wins(&record);
    let err = matches::report_result(&mut record, Some(&mut bracket), &result, now).unwrap_err();
    assert_eq!(
        err,
        LifecycleError::Match(MatchError::InvalidStateTransition {
            from: MatchStatus::Cancelled,
            to: MatchStatus::Completed,
        })
    );
    assert!(bracket.champion.is_none());
}

#[tokio::test]
async fn test_manual_matches_without_bracket() {
    let coordinator = TournamentCoordinator::with_seed(Arc::new(InMemoryStore::new()), EventBus::default(), 1);
    let organizer = Principal::new(1, Role::Organizer);
    let start = Utc::now() + Duration::days(2);

    let competition = coordinator
        .create_competition(
            &organizer,
            NewCompetition {
                name: "Friendly Series".to_string(),
                sport: "Basketball".to_string(),
                venue: Some("Gym".to_string()),
                description: None,
                rules: None,
                start_date: start,
                end_date: start + Duration::days(1),
                registration_deadline: start - Duration::hours(1),
                max_teams: 4,
            },
        )
        .await
        .unwrap();

    let mut team_ids = Vec::new();
    for name in ["North", "South", "East"] {
        let team = coordinator
            .create_team(
                &organizer,
                NewTeam {
                    name: name.to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();
        coordinator
            .register_team(&organizer, competition.id, team.id)
            .await
            .unwrap();
        team_ids.push(team.id);
    }

    let manual = |team1_id, team2_id, match_number| ManualMatch {
        competition_id: competition.id,
        round: 1,
        match_number,
        team1_id,
        team2_id,
        start_time: start,
        venue: None,
        notes: Some("Exhibition".to_string()),
    };

    let first = coordinator
        .create_match(&organizer, manual(team_ids[0], team_ids[1], 1))
        .await
        .unwrap();
    assert_eq!(first.venue.as_deref(), Some("Gym"));
    let second = coordinator
        .create_match(&organizer, manual(team_ids[1], team_ids[2], 2))
        .await
        .unwrap();

    let err = coordinator
        .create_match(&organizer, manual(team_ids[0], team_ids[0], 3))
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::Validation(_)));

    let started = coordinator.start_match(&organizer, first.id).await.unwrap();
    assert_eq!(started.status, MatchStatus::InProgress);

    let report = coordinator
        .report_result(&organizer, first.id, team2_wins(&first))
        .await
        .unwrap();
    assert_eq!(report.record.winner, Some(team_ids[1]));
    assert!(report.next_match.is_none());
    assert!(report.champion.is_none());

    let cancelled = coordinator.cancel_match(&organizer, second.id).await.unwrap();
    assert_eq!(cancelled.status, MatchStatus::Cancelled);
    let err = coordinator.start_match(&organizer, second.id).await.unwrap_err();
    assert!(matches!(err, CoordinatorError::Match(MatchError::InvalidStateTransition { .. })));

    // Manually created matches block bracket generation.
    let err = coordinator
        .create_bracket(&organizer, competition.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::Validation(_)));

    coordinator.delete_match(&organizer, second.id).await.unwrap();
    let remaining = coordinator.list_matches(competition.id, None).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, first.id);
}
