//! In-memory storage backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{
    errors::{StoreError, StoreResult},
    repository::{
        CompetitionRepository, FeedbackRepository, MatchRepository, ResultCommit, TeamRepository,
        TransactionRepository,
    },
};
use crate::{
    auth::UserId,
    bracket::TeamId,
    competition::{
        Competition, CompetitionFilter, CompetitionId, CompetitionStatus, NewCompetition, NewTeam, Team, TeamFilter,
        TeamPlayer,
    },
    feedback::{Feedback, FeedbackFilter, FeedbackId, FeedbackStatus, NewFeedback},
    matches::{MatchFilter, MatchId, MatchRecord, MatchStatus, NewMatch},
};

#[derive(Default)]
struct Tables {
    competitions: HashMap<CompetitionId, Competition>,
    teams: HashMap<TeamId, Team>,
    matches: HashMap<MatchId, MatchRecord>,
    feedback: HashMap<FeedbackId, Feedback>,
    last_competition_id: i64,
    last_team_id: i64,
    last_match_id: i64,
    last_feedback_id: i64,
}

fn next_id(last: &mut i64) -> i64 {
    *last += 1;
    *last
}

impl Tables {
    fn name_taken(&self, name: &str, except: Option<TeamId>) -> bool {
        self.teams
            .values()
            .any(|t| Some(t.id) != except && t.name.eq_ignore_ascii_case(name))
    }

    fn insert_match(&mut self, new: &NewMatch, now: DateTime<Utc>) -> MatchRecord {
        let id = next_id(&mut self.last_match_id);
        let record = new.clone().into_record(id, now);
        self.matches.insert(id, record.clone());
        record
    }

    fn require_competition(&self, id: CompetitionId) -> StoreResult<()> {
        if self.competitions.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::Corrupt(format!("competition {id} does not exist")))
        }
    }
}

/// Store backed by process memory, used by tests and the `memory` backend
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CompetitionRepository for InMemoryStore {
    async fn insert_competition(
        &self,
        organizer_id: UserId,
        new: &NewCompetition,
        now: DateTime<Utc>,
    ) -> StoreResult<Competition> {
        let mut tables = self.tables.write().await;
        let id = next_id(&mut tables.last_competition_id);

        let competition = Competition {
            id,
            name: new.name.trim().to_string(),
            sport: new.sport.trim().to_string(),
            venue: new.venue.clone(),
            description: new.description.clone(),
            rules: new.rules.clone(),
            start_date: new.start_date,
            end_date: new.end_date,
            registration_deadline: new.registration_deadline,
            max_teams: new.max_teams,
            status: CompetitionStatus::Upcoming,
            organizer_id,
            teams: Vec::new(),
            bracket: None,
            champion: None,
            created_at: now,
            updated_at: now,
        };

        tables.competitions.insert(id, competition.clone());
        Ok(competition)
    }

    async fn get_competition(&self, id: CompetitionId) -> StoreResult<Option<Competition>> {
        Ok(self.tables.read().await.competitions.get(&id).cloned())
    }

    async fn list_competitions(&self, filter: &CompetitionFilter) -> StoreResult<Vec<Competition>> {
        let tables = self.tables.read().await;
        let mut competitions: Vec<Competition> = tables
            .competitions
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        competitions.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(a.id.cmp(&b.id)));
        Ok(competitions)
    }

    async fn save_competition(&self, competition: &Competition) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.competitions.get_mut(&competition.id) {
            Some(stored) => {
                *stored = competition.clone();
                Ok(())
            }
            None => Err(StoreError::Corrupt(format!(
                "competition {} does not exist",
                competition.id
            ))),
        }
    }

    async fn delete_competition(&self, id: CompetitionId) -> StoreResult<bool> {
        Ok(self.tables.write().await.competitions.remove(&id).is_some())
    }
}

#[async_trait]
impl TeamRepository for InMemoryStore {
    async fn insert_team(&self, captain_id: UserId, new: &NewTeam, now: DateTime<Utc>) -> StoreResult<Team> {
        let mut tables = self.tables.write().await;
        let name = new.name.trim();
        if tables.name_taken(name, None) {
            return Err(StoreError::Conflict(format!("Team name '{name}' is already taken")));
        }

        let id = next_id(&mut tables.last_team_id);
        let team = Team {
            id,
            name: name.to_string(),
            captain_id,
            description: new.description.clone(),
            players: vec![TeamPlayer::captain(captain_id)],
            wins: 0,
            losses: 0,
            created_at: now,
        };

        tables.teams.insert(id, team.clone());
        Ok(team)
    }

    async fn get_team(&self, id: TeamId) -> StoreResult<Option<Team>> {
        Ok(self.tables.read().await.teams.get(&id).cloned())
    }

    async fn get_teams(&self, ids: &[TeamId]) -> StoreResult<Vec<Team>> {
        let tables = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.teams.get(id).cloned()).collect())
    }

    async fn list_teams(&self, filter: &TeamFilter) -> StoreResult<Vec<Team>> {
        let tables = self.tables.read().await;
        let mut teams: Vec<Team> = tables.teams.values().filter(|t| filter.matches(t)).cloned().collect();
        teams.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()).then(a.id.cmp(&b.id)));
        Ok(teams)
    }

    async fn save_team(&self, team: &Team) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.name_taken(&team.name, Some(team.id)) {
            return Err(StoreError::Conflict(format!("Team name '{}' is already taken", team.name)));
        }
        match tables.teams.get_mut(&team.id) {
            Some(stored) => {
                stored.name = team.name.clone();
                stored.description = team.description.clone();
                stored.players = team.players.clone();
                Ok(())
            }
            None => Err(StoreError::Corrupt(format!("team {} does not exist", team.id))),
        }
    }

    async fn delete_team(&self, id: TeamId) -> StoreResult<bool> {
        Ok(self.tables.write().await.teams.remove(&id).is_some())
    }
}

#[async_trait]
impl MatchRepository for InMemoryStore {
    async fn insert_match(&self, new: &NewMatch, now: DateTime<Utc>) -> StoreResult<MatchRecord> {
        Ok(self.tables.write().await.insert_match(new, now))
    }

    async fn get_match(&self, id: MatchId) -> StoreResult<Option<MatchRecord>> {
        Ok(self.tables.read().await.matches.get(&id).cloned())
    }

    async fn list_matches(
        &self,
        competition_id: CompetitionId,
        status: Option<MatchStatus>,
    ) -> StoreResult<Vec<MatchRecord>> {
        let tables = self.tables.read().await;
        let mut matches: Vec<MatchRecord> = tables
            .matches
            .values()
            .filter(|m| m.competition_id == competition_id)
            .filter(|m| status.is_none_or(|s| m.status == s))
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            (a.round, a.start_time, a.match_number).cmp(&(b.round, b.start_time, b.match_number))
        });
        Ok(matches)
    }

    async fn find_matches(&self, filter: &MatchFilter) -> StoreResult<Vec<MatchRecord>> {
        let tables = self.tables.read().await;
        let mut matches: Vec<MatchRecord> = tables.matches.values().filter(|m| filter.matches(m)).cloned().collect();
        matches.sort_by_key(|m| (m.competition_id, m.round, m.start_time, m.match_number));
        Ok(matches)
    }

    async fn save_match(&self, record: &MatchRecord) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.matches.get_mut(&record.id) {
            Some(stored) => {
                *stored = record.clone();
                Ok(())
            }
            None => Err(StoreError::Corrupt(format!("match {} does not exist", record.id))),
        }
    }

    async fn delete_match(&self, id: MatchId) -> StoreResult<bool> {
        Ok(self.tables.write().await.matches.remove(&id).is_some())
    }

    async fn delete_matches_for(&self, competition_id: CompetitionId) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.matches.len();
        tables.matches.retain(|_, m| m.competition_id != competition_id);
        Ok((before - tables.matches.len()) as u64)
    }
}

#[async_trait]
impl FeedbackRepository for InMemoryStore {
    async fn insert_feedback(
        &self,
        user_id: UserId,
        new: &NewFeedback,
        now: DateTime<Utc>,
    ) -> StoreResult<Feedback> {
        let mut tables = self.tables.write().await;
        if tables
            .feedback
            .values()
            .any(|f| f.user_id == user_id && f.competition_id == new.competition_id)
        {
            return Err(StoreError::Conflict(
                "Feedback for this competition was already submitted".to_string(),
            ));
        }

        let id = next_id(&mut tables.last_feedback_id);
        let feedback = Feedback {
            id,
            competition_id: new.competition_id,
            user_id,
            rating: new.rating,
            comment: new.comment.trim().to_string(),
            category: new.category,
            status: FeedbackStatus::Pending,
            admin_response: None,
            created_at: now,
            updated_at: now,
        };

        tables.feedback.insert(id, feedback.clone());
        Ok(feedback)
    }

    async fn get_feedback(&self, id: FeedbackId) -> StoreResult<Option<Feedback>> {
        Ok(self.tables.read().await.feedback.get(&id).cloned())
    }

    async fn list_feedback(&self, filter: &FeedbackFilter) -> StoreResult<Vec<Feedback>> {
        let tables = self.tables.read().await;
        let mut feedback: Vec<Feedback> = tables
            .feedback
            .values()
            .filter(|f| filter.matches(f))
            .cloned()
            .collect();
        feedback.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(feedback)
    }

    async fn save_feedback(&self, feedback: &Feedback) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.feedback.get_mut(&feedback.id) {
            Some(stored) => {
                *stored = feedback.clone();
                Ok(())
            }
            None => Err(StoreError::Corrupt(format!("feedback {} does not exist", feedback.id))),
        }
    }

    async fn delete_feedback(&self, id: FeedbackId) -> StoreResult<bool> {
        Ok(self.tables.write().await.feedback.remove(&id).is_some())
    }
}

#[async_trait]
impl TransactionRepository for InMemoryStore {
    async fn commit_bracket(
        &self,
        competition: &Competition,
        matches: &[NewMatch],
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<MatchRecord>> {
        let mut tables = self.tables.write().await;
        tables.require_competition(competition.id)?;

        tables.matches.retain(|_, m| m.competition_id != competition.id);
        let records = matches.iter().map(|new| tables.insert_match(new, now)).collect();
        tables.competitions.insert(competition.id, competition.clone());
        Ok(records)
    }

    async fn commit_result(&self, commit: ResultCommit<'_>, now: DateTime<Utc>) -> StoreResult<Option<MatchRecord>> {
        let mut tables = self.tables.write().await;
        if !tables.matches.contains_key(&commit.record.id) {
            return Err(StoreError::Corrupt(format!("match {} does not exist", commit.record.id)));
        }
        if let Some(competition) = commit.competition {
            tables.require_competition(competition.id)?;
        }

        tables.matches.insert(commit.record.id, commit.record.clone());
        if let Some((winner, loser)) = commit.tally {
            if let Some(team) = tables.teams.get_mut(&winner) {
                team.wins += 1;
            }
            if let Some(team) = tables.teams.get_mut(&loser) {
                team.losses += 1;
            }
        }
        let next = commit.next_match.map(|new| tables.insert_match(new, now));
        if let Some(competition) = commit.competition {
            tables.competitions.insert(competition.id, competition.clone());
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bracket::{SlotPosition, TeamRef}, feedback::FeedbackCategory};
    use chrono::Duration;

    #[tokio::test]
    async fn test_team_names_are_unique() {
        let store = InMemoryStore::new();
        let new = NewTeam {
            name: "Falcons".to_string(),
            description: None,
        };
        let team = store.insert_team(1, &new, Utc::now()).await.unwrap();
        assert_eq!(team.id, 1);

        let dup = NewTeam {
            name: "falcons".to_string(),
            description: None,
        };
        let err = store.insert_team(2, &dup, Utc::now()).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_matches_sorted_by_round_then_start_time() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let a = TeamRef::new(1, "A");
        let b = TeamRef::new(2, "B");

        let late = NewMatch::scheduled(1, SlotPosition::new(1, 1), a.clone(), b.clone(), now + Duration::hours(2));
        let early = NewMatch::scheduled(1, SlotPosition::new(1, 2), a.clone(), b.clone(), now);
        let round2 = NewMatch::scheduled(1, SlotPosition::new(2, 1), a.clone(), b.clone(), now - Duration::hours(1));
        let other = NewMatch::scheduled(2, SlotPosition::new(1, 1), a, b, now);
        for m in [&round2, &late, &early, &other] {
            store.insert_match(m, now).await.unwrap();
        }

        let listed = store.list_matches(1, None).await.unwrap();
        let order: Vec<(u32, u32)> = listed.iter().map(|m| (m.round, m.match_number)).collect();
        assert_eq!(order, vec![(1, 2), (1, 1), (2, 1)]);

        let completed = store.list_matches(1, Some(MatchStatus::Completed)).await.unwrap();
        assert!(completed.is_empty());

        assert_eq!(store.delete_matches_for(1).await.unwrap(), 3);
        assert_eq!(store.list_matches(2, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_one_feedback_per_user_and_competition() {
        let store = InMemoryStore::new();
        let new = NewFeedback {
            competition_id: 1,
            rating: 4,
            comment: "Well run".to_string(),
            category: FeedbackCategory::Organization,
        };
        store.insert_feedback(7, &new, Utc::now()).await.unwrap();
        assert!(matches!(
            store.insert_feedback(7, &new, Utc::now()).await,
            Err(StoreError::Conflict(_))
        ));
        assert!(store.insert_feedback(8, &new, Utc::now()).await.is_ok());
    }

    fn new_competition(start: DateTime<Utc>) -> NewCompetition {
        NewCompetition {
            name: "Cup".to_string(),
            sport: "Chess".to_string(),
            venue: None,
            description: None,
            rules: None,
            start_date: start,
            end_date: start,
            registration_deadline: start,
            max_teams: 4,
        }
    }

    #[tokio::test]
    async fn test_save_team_keeps_tallies_and_unique_names() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let falcons = NewTeam {
            name: "Falcons".to_string(),
            description: None,
        };
        let hawks = NewTeam {
            name: "Hawks".to_string(),
            description: None,
        };
        let mut team = store.insert_team(1, &falcons, now).await.unwrap();
        store.insert_team(2, &hawks, now).await.unwrap();
        assert_eq!(team.players, vec![TeamPlayer::captain(1)]);

        team.wins = 40;
        team.description = Some("Est. 1990".to_string());
        store.save_team(&team).await.unwrap();
        let stored = store.get_team(team.id).await.unwrap().unwrap();
        assert_eq!(stored.wins, 0);
        assert_eq!(stored.description.as_deref(), Some("Est. 1990"));

        team.name = "HAWKS".to_string();
        assert!(matches!(store.save_team(&team).await, Err(StoreError::Conflict(_))));

        let listed = store.list_teams(&TeamFilter { player: Some(2) }).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Hawks");
    }

    #[tokio::test]
    async fn test_commit_result_is_all_or_nothing() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let competition = store.insert_competition(1, &new_competition(now), now).await.unwrap();
        let a = TeamRef::new(1, "A");
        let b = TeamRef::new(2, "B");
        let new = NewMatch::scheduled(competition.id, SlotPosition::new(1, 1), a.clone(), b.clone(), now);
        let mut record = store.insert_match(&new, now).await.unwrap();
        record.status = MatchStatus::Completed;
        record.winner = Some(1);

        let next = NewMatch::scheduled(competition.id, SlotPosition::new(2, 1), a, b, now);
        let mut missing = competition.clone();
        missing.id = 99;
        let commit = ResultCommit {
            record: &record,
            tally: None,
            next_match: Some(&next),
            competition: Some(&missing),
        };
        assert!(store.commit_result(commit, now).await.is_err());
        assert_eq!(store.get_match(record.id).await.unwrap().unwrap().status, MatchStatus::Scheduled);
        assert_eq!(store.list_matches(competition.id, None).await.unwrap().len(), 1);

        let commit = ResultCommit {
            competition: Some(&competition),
            ..commit
        };
        let inserted = store.commit_result(commit, now).await.unwrap().unwrap();
        assert_eq!((inserted.round, inserted.match_number), (2, 1));
        assert_eq!(store.get_match(record.id).await.unwrap().unwrap().winner, Some(1));
    }

    #[tokio::test]
    async fn test_commit_bracket_replaces_matches() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let competition = store.insert_competition(1, &new_competition(now), now).await.unwrap();
        let a = TeamRef::new(1, "A");
        let b = TeamRef::new(2, "B");
        let old = NewMatch::scheduled(competition.id, SlotPosition::new(1, 1), a.clone(), b.clone(), now);
        store.insert_match(&old, now).await.unwrap();

        let mut updated = competition.clone();
        updated.status = CompetitionStatus::Ongoing;
        let fresh = NewMatch::scheduled(competition.id, SlotPosition::new(1, 1), b, a, now);
        let records = store.commit_bracket(&updated, &[fresh], now).await.unwrap();

        let stored = store.list_matches(competition.id, None).await.unwrap();
        assert_eq!(stored, records);
        assert_eq!(stored[0].team1.team.id, 2);
        assert_eq!(
            store.get_competition(competition.id).await.unwrap().unwrap().status,
            CompetitionStatus::Ongoing
        );
    }

    #[tokio::test]
    async fn test_save_unknown_competition_fails() {
        let store = InMemoryStore::new();
        let start = Utc::now();
        let mut competition = store.insert_competition(1, &new_competition(start), start).await.unwrap();
        competition.teams.push(3);
        store.save_competition(&competition).await.unwrap();
        assert_eq!(store.get_competition(1).await.unwrap().unwrap().teams, vec![3]);

        competition.id = 99;
        assert!(store.save_competition(&competition).await.is_err());
    }
}
