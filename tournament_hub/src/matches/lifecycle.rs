//! Match state machine.
//!
//! `scheduled -> in_progress -> completed`, with `cancelled` reachable from both
//! open states and `scheduled -> completed` allowed for directly reported
//! results. Completed and cancelled matches never change again.

use chrono::{DateTime, Utc};

use super::{
    errors::{LifecycleResult, MatchError},
    models::{MatchRecord, MatchResult, MatchStatus, NewMatch},
};
use crate::bracket::{self, Advancement, Bracket, BracketError, TeamRef};

/// What a reported result changed beyond the match itself
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultOutcome {
    /// Bracket movement, when the match belongs to a bracket
    pub advancement: Option<Advancement>,
    /// Successor match that became playable
    pub next_match: Option<NewMatch>,
}

impl ResultOutcome {
    /// Tournament winner, if this was the final
    pub fn champion(&self) -> Option<&TeamRef> {
        match &self.advancement {
            Some(Advancement::Champion(team)) => Some(team),
            _ => None,
        }
    }
}

fn transition(record: &mut MatchRecord, to: MatchStatus, now: DateTime<Utc>) -> Result<(), MatchError> {
    if !record.status.can_transition_to(to) {
        return Err(MatchError::InvalidStateTransition {
            from: record.status,
            to,
        });
    }

    record.status = to;
    record.updated_at = now;
    Ok(())
}

/// Move a scheduled match into play
pub fn start(record: &mut MatchRecord, now: DateTime<Utc>) -> Result<(), MatchError> {
    transition(record, MatchStatus::InProgress, now)?;
    record.start_time = now;
    Ok(())
}

/// Call off an open match.
///
/// A winner that already advanced out of this match stays where it is.
pub fn cancel(record: &mut MatchRecord, now: DateTime<Utc>) -> Result<(), MatchError> {
    transition(record, MatchStatus::Cancelled, now)?;
    record.end_time = Some(now);
    Ok(())
}

/// Record a result and advance the winner through the bracket.
///
/// The bracket is updated before the match record, so a bracket error leaves
/// the record untouched.
///
/// # Arguments
///
/// * `record` - Match being reported
/// * `bracket` - Competition bracket, if the match was planned from one
/// * `result` - Scores and winner
/// * `now` - Completion time
///
/// # Errors
///
/// * `MatchError::InvalidStateTransition` - Match is already completed or cancelled
/// * `MatchError::InvalidWinner` - Winner is not one of the two teams
/// * `LifecycleError::Bracket` - Bracket does not match the record
pub fn report_result(
    record: &mut MatchRecord,
    bracket: Option<&mut Bracket>,
    result: &MatchResult,
    now: DateTime<Utc>,
) -> LifecycleResult<ResultOutcome> {
    if !record.status.can_transition_to(MatchStatus::Completed) {
        return Err(MatchError::InvalidStateTransition {
            from: record.status,
            to: MatchStatus::Completed,
        }
        .into());
    }

    let winner = record
        .team(result.winner_id)
        .cloned()
        .ok_or(MatchError::InvalidWinner(result.winner_id))?;

    let mut outcome = ResultOutcome::default();
    if let Some(bracket) = bracket {
        let advancement = bracket::advance(bracket, record.position(), &winner)?;

        match &advancement {
            Advancement::Champion(team) => bracket.champion = Some(team.clone()),
            Advancement::Advanced {
                position,
                ready: true,
            } => {
                let slot = bracket
                    .slot(*position)
                    .ok_or(BracketError::SlotNotFound(*position))?;
                if let (Some(team1), Some(team2)) = (slot.team1.team(), slot.team2.team()) {
                    outcome.next_match = Some(
                        NewMatch::scheduled(
                            record.competition_id,
                            *position,
                            team1.clone(),
                            team2.clone(),
                            now,
                        )
                        .with_venue(record.venue.clone()),
                    );
                }
            }
            Advancement::Advanced { .. } => {}
        }

        outcome.advancement = Some(advancement);
    }

    record.team1.score = result.team1_score;
    record.team2.score = result.team2_score;
    record.winner = Some(winner.id);
    record.status = MatchStatus::Completed;
    record.end_time = Some(now);
    record.updated_at = now;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::{BracketSlot, SlotPosition, SlotSide};
    use crate::matches::errors::LifecycleError;

    fn team(id: i64) -> TeamRef {
        TeamRef::new(id, format!("Team {id}"))
    }

    fn record_for(position: SlotPosition, a: i64, b: i64) -> MatchRecord {
        let now = Utc::now();
        NewMatch::scheduled(1, position, team(a), team(b), now).into_record(1, now)
    }

    fn two_round_bracket() -> Bracket {
        let slot = |round, match_number, team1, team2| BracketSlot {
            round,
            match_number,
            team1,
            team2,
            next: (round < 2).then(|| SlotPosition::new(round, match_number).successor()),
        };
        Bracket {
            team_count: 4,
            rounds: 2,
            byes: 0,
            slots: vec![
                slot(1, 1, SlotSide::Team(team(1)), SlotSide::Team(team(2))),
                slot(1, 2, SlotSide::Team(team(3)), SlotSide::Team(team(4))),
                slot(2, 1, SlotSide::Empty, SlotSide::Empty),
            ],
            champion: None,
        }
    }

    fn result(winner_id: i64) -> MatchResult {
        MatchResult {
            team1_score: 3,
            team2_score: 1,
            winner_id,
        }
    }

    #[test]
    fn test_start_then_cancel() {
        let mut record = record_for(SlotPosition::new(1, 1), 1, 2);
        start(&mut record, Utc::now()).unwrap();
        assert_eq!(record.status, MatchStatus::InProgress);

        cancel(&mut record, Utc::now()).unwrap();
        assert_eq!(record.status, MatchStatus::Cancelled);
        assert!(record.end_time.is_some());

        let err = start(&mut record, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            MatchError::InvalidStateTransition {
                from: MatchStatus::Cancelled,
                to: MatchStatus::InProgress
            }
        );
    }

    #[test]
    fn test_report_without_bracket() {
        let mut record = record_for(SlotPosition::new(1, 1), 1, 2);
        let outcome = report_result(&mut record, None, &result(2), Utc::now()).unwrap();

        assert_eq!(outcome, ResultOutcome::default());
        assert_eq!(record.status, MatchStatus::Completed);
        assert_eq!(record.winner, Some(2));
        assert_eq!(record.team1.score, 3);
        assert_eq!(record.team2.score, 1);
        assert!(record.end_time.is_some());
    }

    #[test]
    fn test_report_on_completed_match_rejected() {
        let mut record = record_for(SlotPosition::new(1, 1), 1, 2);
        report_result(&mut record, None, &result(1), Utc::now()).unwrap();

        let err = report_result(&mut record, None, &result(2), Utc::now()).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::Match(MatchError::InvalidStateTransition {
                from: MatchStatus::Completed,
                to: MatchStatus::Completed
            })
        );
        assert_eq!(record.winner, Some(1));
    }

    #[test]
    fn test_foreign_winner_rejected() {
        let mut record = record_for(SlotPosition::new(1, 1), 1, 2);
        let err = report_result(&mut record, None, &result(99), Utc::now()).unwrap_err();
        assert_eq!(err, LifecycleError::Match(MatchError::InvalidWinner(99)));
        assert_eq!(record.status, MatchStatus::Scheduled);
    }

    #[test]
    fn test_second_feeder_schedules_successor() {
        let mut bracket = two_round_bracket();
        let mut first = record_for(SlotPosition::new(1, 1), 1, 2);
        let mut second = record_for(SlotPosition::new(1, 2), 3, 4);

        let outcome = report_result(&mut first, Some(&mut bracket), &result(1), Utc::now()).unwrap();
        assert!(outcome.next_match.is_none());

        let outcome = report_result(&mut second, Some(&mut bracket), &result(4), Utc::now()).unwrap();
        let next = outcome.next_match.unwrap();
        assert_eq!((next.round, next.match_number), (2, 1));
        assert_eq!(next.team1.id, 1);
        assert_eq!(next.team2.id, 4);
    }

    #[test]
    fn test_final_result_crowns_champion() {
        let mut bracket = two_round_bracket();
        let now = Utc::now();
        let mut semi1 = record_for(SlotPosition::new(1, 1), 1, 2);
        let mut semi2 = record_for(SlotPosition::new(1, 2), 3, 4);
        report_result(&mut semi1, Some(&mut bracket), &result(1), now).unwrap();
        report_result(&mut semi2, Some(&mut bracket), &result(3), now).unwrap();

        let mut final_match = record_for(SlotPosition::new(2, 1), 1, 3);
        let outcome = report_result(&mut final_match, Some(&mut bracket), &result(3), now).unwrap();

        assert_eq!(outcome.champion(), Some(&team(3)));
        assert!(outcome.next_match.is_none());
        assert_eq!(bracket.champion, Some(team(3)));
    }

    #[test]
    fn test_bracket_mismatch_leaves_record_untouched() {
        let mut bracket = two_round_bracket();
        // Teams 5 and 6 are not in R1M1 of the bracket.
        let mut record = record_for(SlotPosition::new(1, 1), 5, 6);

        let err = report_result(&mut record, Some(&mut bracket), &result(5), Utc::now()).unwrap_err();
        assert!(matches!(err, LifecycleError::Bracket(BracketError::WinnerNotInSlot { .. })));
        assert_eq!(record.status, MatchStatus::Scheduled);
        assert!(record.winner.is_none());
    }
}
