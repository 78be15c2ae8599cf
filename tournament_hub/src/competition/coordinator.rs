//! Tournament coordinator.
//!
//! Owns the roster, bracket and match collection of every competition. All
//! bracket and match mutations of one competition run behind that
//! competition's lock, so planning, result reporting and advancement never
//! interleave. Different competitions proceed in parallel. Writes that touch
//! several records go through one storage transaction.
//!
//! Team roster edits share a single lock. When both are needed the
//! competition lock is taken first.

use chrono::{DateTime, Utc};
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex as StdMutex, PoisonError},
};
use tokio::sync::{Mutex, RwLock};

use super::{
    errors::{CoordinatorError, CoordinatorResult},
    models::{
        Competition, CompetitionFilter, CompetitionId, CompetitionStatus, CompetitionUpdate, NewCompetition,
        NewTeam, Team, TeamFilter, TeamPlayer, TeamUpdate,
    },
};
use crate::{
    auth::{Principal, UserId},
    bracket::{self, Bracket, TeamId, TeamRef},
    db::{ResultCommit, Store},
    events::{ChangeEvent, ChangeKind, EventBus, EventTopic},
    matches::{self, MatchFilter, MatchId, MatchRecord, MatchResult, MatchStatus, NewMatch},
};

/// Organizer-created match for competitions run without a generated bracket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualMatch {
    pub competition_id: CompetitionId,
    pub round: u32,
    pub match_number: u32,
    pub team1_id: TeamId,
    pub team2_id: TeamId,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Competition together with the matches scheduled for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledBracket {
    pub competition: Competition,
    pub matches: Vec<MatchRecord>,
}

/// Everything a reported result changed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultReport {
    /// The completed match
    #[serde(rename = "match")]
    pub record: MatchRecord,
    /// Successor match that became playable
    pub next_match: Option<MatchRecord>,
    /// Tournament winner, when the final was reported
    pub champion: Option<TeamRef>,
}

/// Tournament coordinator
pub struct TournamentCoordinator {
    store: Arc<dyn Store>,
    events: EventBus,
    rng: StdMutex<StdRng>,
    /// One entry per competition with work in flight or still open for play.
    /// Entries are dropped once a competition completes or is deleted.
    locks: RwLock<HashMap<CompetitionId, Arc<Mutex<()>>>>,
    roster_lock: Mutex<()>,
}

impl TournamentCoordinator {
    /// Create a coordinator seeded from the OS random source
    pub fn new(store: Arc<dyn Store>, events: EventBus) -> Self {
        Self::with_rng(store, events, StdRng::from_os_rng())
    }

    /// Create a coordinator with a fixed seed for reproducible brackets
    pub fn with_seed(store: Arc<dyn Store>, events: EventBus, seed: u64) -> Self {
        Self::with_rng(store, events, StdRng::seed_from_u64(seed))
    }

    fn with_rng(store: Arc<dyn Store>, events: EventBus, rng: StdRng) -> Self {
        Self {
            store,
            events,
            rng: StdMutex::new(rng),
            locks: RwLock::new(HashMap::new()),
            roster_lock: Mutex::new(()),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Get the lock serializing work on one competition
    async fn competition_lock(&self, id: CompetitionId) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().await.get(&id) {
            return lock.clone();
        }

        self.locks.write().await.entry(id).or_default().clone()
    }

    /// Drop the registry entry of a finished competition.
    ///
    /// Caller holds `lock`. The entry stays while another task holds a clone
    /// of it, so waiters keep serializing on the same mutex.
    async fn release_lock(&self, id: CompetitionId, lock: &Arc<Mutex<()>>) {
        let mut locks = self.locks.write().await;
        if Arc::strong_count(lock) <= 2 {
            locks.remove(&id);
        }
    }

    async fn load_competition(&self, id: CompetitionId) -> CoordinatorResult<Competition> {
        self.store
            .get_competition(id)
            .await?
            .ok_or(CoordinatorError::CompetitionNotFound(id))
    }

    async fn load_match(&self, id: MatchId) -> CoordinatorResult<MatchRecord> {
        self.store
            .get_match(id)
            .await?
            .ok_or(CoordinatorError::MatchNotFound(id))
    }

    fn authorize_manage(principal: &Principal, competition: &Competition, action: &str) -> CoordinatorResult<()> {
        if principal.can_manage(competition.organizer_id) {
            return Ok(());
        }

        log::warn!(
            "User {} ({}) denied {} on competition {}",
            principal.id,
            principal.role,
            action,
            competition.id
        );
        Err(CoordinatorError::Forbidden(format!(
            "Only the organizer or an admin may {action}"
        )))
    }

    fn publish<T: Serialize>(&self, topic: EventTopic, kind: ChangeKind, competition: &Competition, entity: &T) {
        self.events.publish(ChangeEvent::new(
            topic,
            kind,
            competition.id,
            competition.organizer_id,
            entity,
        ));
    }

    // ---- Competitions ----

    /// Create a competition owned by the caller
    ///
    /// # Errors
    ///
    /// * `CoordinatorError::Forbidden` - Caller is neither organizer nor admin
    /// * `CoordinatorError::Validation` - Invalid fields
    pub async fn create_competition(
        &self,
        principal: &Principal,
        new: NewCompetition,
    ) -> CoordinatorResult<Competition> {
        if !principal.can_organize() {
            return Err(CoordinatorError::Forbidden(
                "Only organizers may create competitions".to_string(),
            ));
        }
        new.validate().map_err(CoordinatorError::Validation)?;

        let competition = self.store.insert_competition(principal.id, &new, Utc::now()).await?;
        log::info!(
            "Competition {} '{}' created by user {}",
            competition.id,
            competition.name,
            principal.id
        );

        self.publish(EventTopic::Competition, ChangeKind::Create, &competition, &competition);
        Ok(competition)
    }

    pub async fn get_competition(&self, id: CompetitionId) -> CoordinatorResult<Competition> {
        self.load_competition(id).await
    }

    pub async fn list_competitions(&self, filter: &CompetitionFilter) -> CoordinatorResult<Vec<Competition>> {
        Ok(self.store.list_competitions(filter).await?)
    }

    /// Update competition details
    pub async fn update_competition(
        &self,
        principal: &Principal,
        id: CompetitionId,
        update: CompetitionUpdate,
    ) -> CoordinatorResult<Competition> {
        let lock = self.competition_lock(id).await;
        let _guard = lock.lock().await;

        let mut competition = self.load_competition(id).await?;
        Self::authorize_manage(principal, &competition, "update this competition")?;

        update.apply(&mut competition).map_err(CoordinatorError::Validation)?;
        competition.updated_at = Utc::now();
        self.store.save_competition(&competition).await?;

        self.publish(EventTopic::Competition, ChangeKind::Update, &competition, &competition);
        Ok(competition)
    }

    /// Delete a competition and all its matches
    pub async fn delete_competition(&self, principal: &Principal, id: CompetitionId) -> CoordinatorResult<()> {
        let lock = self.competition_lock(id).await;
        let _guard = lock.lock().await;

        let competition = self.load_competition(id).await?;
        Self::authorize_manage(principal, &competition, "delete this competition")?;

        let removed = self.store.delete_matches_for(id).await?;
        self.store.delete_competition(id).await?;
        log::info!("Competition {} deleted with {} matches", id, removed);

        self.publish(EventTopic::Competition, ChangeKind::Delete, &competition, &id);
        self.release_lock(id, &lock).await;
        Ok(())
    }

    // ---- Teams ----

    /// Create a team captained by the caller
    pub async fn create_team(&self, principal: &Principal, new: NewTeam) -> CoordinatorResult<Team> {
        new.validate().map_err(CoordinatorError::Validation)?;
        let team = self.store.insert_team(principal.id, &new, Utc::now()).await?;
        log::info!("Team {} '{}' created by user {}", team.id, team.name, principal.id);
        Ok(team)
    }

    pub async fn get_team(&self, id: TeamId) -> CoordinatorResult<Team> {
        self.store
            .get_team(id)
            .await?
            .ok_or(CoordinatorError::TeamNotFound(id))
    }

    /// Teams ordered by name, optionally only those `filter.player` plays for
    pub async fn list_teams(&self, filter: &TeamFilter) -> CoordinatorResult<Vec<Team>> {
        Ok(self.store.list_teams(filter).await?)
    }

    fn authorize_team(
        principal: &Principal,
        team: &Team,
        action: &str,
        organizers_allowed: bool,
    ) -> CoordinatorResult<()> {
        let allowed = principal.id == team.captain_id
            || principal.is_admin()
            || (organizers_allowed && principal.can_organize());
        if allowed {
            return Ok(());
        }

        log::warn!("User {} ({}) denied {} on team {}", principal.id, principal.role, action, team.id);
        Err(CoordinatorError::Forbidden(format!(
            "Only the team captain or an admin may {action}"
        )))
    }

    /// Rename a team or change its description (captain or admin).
    ///
    /// Matches already scheduled keep the name they were created with.
    pub async fn update_team(&self, principal: &Principal, id: TeamId, update: TeamUpdate) -> CoordinatorResult<Team> {
        let _roster = self.roster_lock.lock().await;

        let mut team = self.get_team(id).await?;
        Self::authorize_team(principal, &team, "update this team", false)?;

        update.apply(&mut team).map_err(CoordinatorError::Validation)?;
        self.store.save_team(&team).await?;
        log::info!("Team {} updated by user {}", team.id, principal.id);
        Ok(team)
    }

    /// Delete a team (captain or admin)
    ///
    /// # Errors
    ///
    /// * `CoordinatorError::Conflict` - Team is registered for a competition
    ///   that is upcoming or ongoing
    pub async fn delete_team(&self, principal: &Principal, id: TeamId) -> CoordinatorResult<()> {
        let _roster = self.roster_lock.lock().await;

        let team = self.get_team(id).await?;
        Self::authorize_team(principal, &team, "delete this team", false)?;

        let filter = CompetitionFilter {
            team: Some(id),
            ..Default::default()
        };
        let active = self.store.list_competitions(&filter).await?;
        if let Some(competition) = active
            .iter()
            .find(|c| matches!(c.status, CompetitionStatus::Upcoming | CompetitionStatus::Ongoing))
        {
            return Err(CoordinatorError::Conflict(format!(
                "Team '{}' is registered for competition '{}'",
                team.name, competition.name
            )));
        }

        if !self.store.delete_team(id).await? {
            return Err(CoordinatorError::TeamNotFound(id));
        }
        log::info!("Team {} '{}' deleted by user {}", team.id, team.name, principal.id);
        Ok(())
    }

    /// Add a player to a team roster (captain, organizer or admin)
    pub async fn add_player(
        &self,
        principal: &Principal,
        team_id: TeamId,
        player: TeamPlayer,
    ) -> CoordinatorResult<Team> {
        player.validate().map_err(CoordinatorError::Validation)?;
        let _roster = self.roster_lock.lock().await;

        let mut team = self.get_team(team_id).await?;
        Self::authorize_team(principal, &team, "add players", true)?;

        if team.has_player(player.user_id) {
            return Err(CoordinatorError::Validation(format!(
                "User {} is already a member of this team",
                player.user_id
            )));
        }

        log::info!("User {} added to team {} by user {}", player.user_id, team.id, principal.id);
        team.players.push(player);
        self.store.save_team(&team).await?;
        Ok(team)
    }

    /// Remove a player from a team roster (captain, organizer or admin)
    ///
    /// # Errors
    ///
    /// * `CoordinatorError::PlayerNotFound` - User is not on the roster
    /// * `CoordinatorError::Validation` - User is the captain
    pub async fn remove_player(
        &self,
        principal: &Principal,
        team_id: TeamId,
        user_id: UserId,
    ) -> CoordinatorResult<Team> {
        let _roster = self.roster_lock.lock().await;

        let mut team = self.get_team(team_id).await?;
        Self::authorize_team(principal, &team, "remove players", true)?;

        if !team.has_player(user_id) {
            return Err(CoordinatorError::PlayerNotFound { team_id, user_id });
        }
        if user_id == team.captain_id {
            return Err(CoordinatorError::Validation(
                "The captain cannot be removed from the roster".to_string(),
            ));
        }

        team.players.retain(|p| p.user_id != user_id);
        self.store.save_team(&team).await?;
        log::info!("User {} removed from team {} by user {}", user_id, team.id, principal.id);
        Ok(team)
    }

    /// Register a team for a competition
    ///
    /// # Errors
    ///
    /// * `CoordinatorError::TeamNotFound` - Unknown team
    /// * `CoordinatorError::Validation` - Deadline passed, competition full,
    ///   team already registered, or bracket already generated
    pub async fn register_team(
        &self,
        principal: &Principal,
        competition_id: CompetitionId,
        team_id: TeamId,
    ) -> CoordinatorResult<Competition> {
        let lock = self.competition_lock(competition_id).await;
        let _guard = lock.lock().await;
        let _roster = self.roster_lock.lock().await;

        let mut competition = self.load_competition(competition_id).await?;
        let team = self.get_team(team_id).await?;

        let now = Utc::now();
        if competition.has_bracket() {
            return Err(CoordinatorError::Validation(
                "Registration is closed: bracket already generated".to_string(),
            ));
        }
        if competition.status != CompetitionStatus::Upcoming {
            return Err(CoordinatorError::Validation(format!(
                "Registration is closed: competition is {}",
                competition.status
            )));
        }
        if now > competition.registration_deadline {
            return Err(CoordinatorError::Validation(
                "Registration deadline has passed".to_string(),
            ));
        }
        if competition.is_registered(team.id) {
            return Err(CoordinatorError::Validation(format!(
                "Team '{}' is already registered",
                team.name
            )));
        }
        if competition.is_full() {
            return Err(CoordinatorError::Validation(format!(
                "Competition is full ({} teams)",
                competition.max_teams
            )));
        }

        competition.teams.push(team.id);
        competition.updated_at = now;
        self.store.save_competition(&competition).await?;
        log::info!(
            "Team {} registered for competition {} by user {}",
            team.id,
            competition.id,
            principal.id
        );

        self.publish(EventTopic::Competition, ChangeKind::Update, &competition, &competition);
        Ok(competition)
    }

    // ---- Bracket ----

    /// Plan the bracket from the registered roster and schedule round-1 matches
    ///
    /// # Errors
    ///
    /// * `CoordinatorError::Forbidden` - Caller does not manage the competition
    /// * `CoordinatorError::Validation` - Bracket exists, matches exist, or fewer than two teams
    pub async fn create_bracket(
        &self,
        principal: &Principal,
        competition_id: CompetitionId,
    ) -> CoordinatorResult<ScheduledBracket> {
        let lock = self.competition_lock(competition_id).await;
        let _guard = lock.lock().await;

        let mut competition = self.load_competition(competition_id).await?;
        Self::authorize_manage(principal, &competition, "generate the bracket")?;

        if competition.has_bracket() {
            return Err(CoordinatorError::Validation(
                "Bracket already generated; use regenerate".to_string(),
            ));
        }
        if !self.store.list_matches(competition_id, None).await?.is_empty() {
            return Err(CoordinatorError::Validation(
                "Competition already has manually created matches".to_string(),
            ));
        }

        self.plan_and_schedule(&mut competition, &[]).await
    }

    /// Discard the current bracket and plan a new one.
    ///
    /// Only allowed while no match has started or completed.
    pub async fn regenerate_bracket(
        &self,
        principal: &Principal,
        competition_id: CompetitionId,
    ) -> CoordinatorResult<ScheduledBracket> {
        let lock = self.competition_lock(competition_id).await;
        let _guard = lock.lock().await;

        let mut competition = self.load_competition(competition_id).await?;
        Self::authorize_manage(principal, &competition, "regenerate the bracket")?;

        if !competition.has_bracket() {
            return Err(CoordinatorError::BracketNotFound(competition_id));
        }

        let existing = self.store.list_matches(competition_id, None).await?;
        if existing
            .iter()
            .any(|m| matches!(m.status, MatchStatus::InProgress | MatchStatus::Completed))
        {
            return Err(CoordinatorError::Validation(
                "Cannot regenerate after matches have started".to_string(),
            ));
        }

        self.plan_and_schedule(&mut competition, &existing).await
    }

    /// Plan a bracket and store it together with its round-1 matches,
    /// replacing `replaced`. Caller holds the competition lock.
    async fn plan_and_schedule(
        &self,
        competition: &mut Competition,
        replaced: &[MatchRecord],
    ) -> CoordinatorResult<ScheduledBracket> {
        let unique: HashSet<TeamId> = competition.teams.iter().copied().collect();
        if unique.len() != competition.teams.len() {
            return Err(CoordinatorError::Validation(
                "Roster contains duplicate teams".to_string(),
            ));
        }
        if competition.teams.len() < 2 {
            return Err(CoordinatorError::Validation(format!(
                "At least 2 teams are required to generate a bracket, have {}",
                competition.teams.len()
            )));
        }

        let teams = self.store.get_teams(&competition.teams).await?;
        if let Some(missing) = competition
            .teams
            .iter()
            .find(|id| !teams.iter().any(|t| t.id == **id))
        {
            return Err(CoordinatorError::TeamNotFound(*missing));
        }
        let roster: Vec<TeamRef> = teams.iter().map(Team::to_ref).collect();

        let planned = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            bracket::plan(&roster, &mut *rng)?
        };

        let first_round: Vec<NewMatch> = planned
            .playable_slots()
            .filter_map(|slot| {
                let (team1, team2) = (slot.team1.team()?, slot.team2.team()?);
                let new = NewMatch::scheduled(
                    competition.id,
                    slot.position(),
                    team1.clone(),
                    team2.clone(),
                    competition.start_date,
                );
                Some(new.with_venue(competition.venue.clone()))
            })
            .collect();

        log::info!(
            "Bracket for competition {}: {} teams, {} rounds, {} byes, {} matches scheduled",
            competition.id,
            planned.team_count,
            planned.rounds,
            planned.byes,
            first_round.len()
        );

        let now = Utc::now();
        competition.bracket = Some(planned);
        competition.status = CompetitionStatus::Ongoing;
        competition.updated_at = now;
        let scheduled = self.store.commit_bracket(competition, &first_round, now).await?;

        for record in replaced {
            self.publish(EventTopic::Match, ChangeKind::Delete, &*competition, &record.id);
        }
        for record in &scheduled {
            self.publish(EventTopic::Match, ChangeKind::Create, &*competition, record);
        }
        self.publish(EventTopic::Competition, ChangeKind::Update, &*competition, &*competition);

        Ok(ScheduledBracket {
            competition: competition.clone(),
            matches: scheduled,
        })
    }

    pub async fn get_bracket(&self, competition_id: CompetitionId) -> CoordinatorResult<Bracket> {
        self.load_competition(competition_id)
            .await?
            .bracket
            .ok_or(CoordinatorError::BracketNotFound(competition_id))
    }

    // ---- Matches ----

    /// Matches of a competition sorted by `(round, start_time)`
    pub async fn list_matches(
        &self,
        competition_id: CompetitionId,
        status: Option<MatchStatus>,
    ) -> CoordinatorResult<Vec<MatchRecord>> {
        self.load_competition(competition_id).await?;
        Ok(self.store.list_matches(competition_id, status).await?)
    }

    /// Matches across all competitions
    pub async fn find_matches(&self, filter: &MatchFilter) -> CoordinatorResult<Vec<MatchRecord>> {
        Ok(self.store.find_matches(filter).await?)
    }

    pub async fn get_match(&self, id: MatchId) -> CoordinatorResult<MatchRecord> {
        self.load_match(id).await
    }

    /// Create a match by hand for a competition without a generated bracket
    pub async fn create_match(&self, principal: &Principal, manual: ManualMatch) -> CoordinatorResult<MatchRecord> {
        let lock = self.competition_lock(manual.competition_id).await;
        let _guard = lock.lock().await;

        let competition = self.load_competition(manual.competition_id).await?;
        Self::authorize_manage(principal, &competition, "create matches")?;

        if competition.has_bracket() {
            return Err(CoordinatorError::Validation(
                "Matches of a bracket competition are scheduled automatically".to_string(),
            ));
        }
        if manual.round == 0 || manual.match_number == 0 {
            return Err(CoordinatorError::Validation(
                "Round and match number start at 1".to_string(),
            ));
        }
        if manual.team1_id == manual.team2_id {
            return Err(CoordinatorError::Validation(
                "A team cannot play against itself".to_string(),
            ));
        }
        for team_id in [manual.team1_id, manual.team2_id] {
            if !competition.is_registered(team_id) {
                return Err(CoordinatorError::Validation(format!(
                    "Team {team_id} is not registered for this competition"
                )));
            }
        }

        let team1 = self.get_team(manual.team1_id).await?;
        let team2 = self.get_team(manual.team2_id).await?;
        let new = NewMatch {
            competition_id: competition.id,
            round: manual.round,
            match_number: manual.match_number,
            team1: team1.to_ref(),
            team2: team2.to_ref(),
            start_time: manual.start_time,
            venue: manual.venue.or_else(|| competition.venue.clone()),
            notes: manual.notes,
        };

        let record = self.store.insert_match(&new, Utc::now()).await?;
        self.publish(EventTopic::Match, ChangeKind::Create, &competition, &record);
        Ok(record)
    }

    /// Apply a state transition to a match under its competition lock
    async fn transition_match<F>(
        &self,
        principal: &Principal,
        match_id: MatchId,
        action: &str,
        apply: F,
    ) -> CoordinatorResult<MatchRecord>
    where
        F: FnOnce(&mut MatchRecord, DateTime<Utc>) -> Result<(), matches::MatchError>,
    {
        let competition_id = self.load_match(match_id).await?.competition_id;
        let lock = self.competition_lock(competition_id).await;
        let _guard = lock.lock().await;

        let mut record = self.load_match(match_id).await?;
        let competition = self.load_competition(competition_id).await?;
        Self::authorize_manage(principal, &competition, action)?;

        apply(&mut record, Utc::now())?;
        self.store.save_match(&record).await?;

        self.publish(EventTopic::Match, ChangeKind::Update, &competition, &record);
        Ok(record)
    }

    pub async fn start_match(&self, principal: &Principal, match_id: MatchId) -> CoordinatorResult<MatchRecord> {
        self.transition_match(principal, match_id, "start matches", matches::start)
            .await
    }

    /// Cancel a match. A winner that already advanced is not retracted.
    pub async fn cancel_match(&self, principal: &Principal, match_id: MatchId) -> CoordinatorResult<MatchRecord> {
        self.transition_match(principal, match_id, "cancel matches", matches::cancel)
            .await
    }

    /// Record a match result and advance the winner.
    ///
    /// When the successor slot becomes playable its match is scheduled; when
    /// the final is reported the competition is completed.
    ///
    /// # Errors
    ///
    /// * `CoordinatorError::Match` - Match already closed, or winner did not play
    /// * `CoordinatorError::Bracket` - Stored bracket disagrees with the match
    pub async fn report_result(
        &self,
        principal: &Principal,
        match_id: MatchId,
        result: MatchResult,
    ) -> CoordinatorResult<ResultReport> {
        let competition_id = self.load_match(match_id).await?.competition_id;
        let lock = self.competition_lock(competition_id).await;
        let _guard = lock.lock().await;

        let mut record = self.load_match(match_id).await?;
        let mut competition = self.load_competition(competition_id).await?;
        Self::authorize_manage(principal, &competition, "report results")?;

        let now = Utc::now();
        let mut bracket = competition.bracket.clone();
        let outcome = matches::report_result(&mut record, bracket.as_mut(), &result, now).map_err(|e| {
            let err = CoordinatorError::from(e);
            if err.is_internal() {
                log::error!(
                    "Result for match {} ({}) rejected: {}",
                    record.id,
                    record.position(),
                    err
                );
            }
            err
        })?;

        let champion = outcome.champion().cloned();
        let in_bracket = bracket.is_some();
        if in_bracket {
            competition.bracket = bracket;
            if let Some(team) = &champion {
                competition.champion = Some(team.id);
                competition.status = CompetitionStatus::Completed;
            }
            competition.updated_at = now;
        }

        let commit = ResultCommit {
            record: &record,
            tally: record.winner.zip(record.loser().map(|t| t.id)),
            next_match: outcome.next_match.as_ref(),
            competition: in_bracket.then_some(&competition),
        };
        let next_match = self.store.commit_result(commit, now).await?;

        if let Some(team) = &champion {
            log::info!(
                "Competition {} won by team {} '{}'",
                competition.id,
                team.id,
                team.name
            );
            self.release_lock(competition_id, &lock).await;
        }

        self.publish(EventTopic::Match, ChangeKind::Update, &competition, &record);
        if let Some(next) = &next_match {
            self.publish(EventTopic::Match, ChangeKind::Create, &competition, next);
        }
        if champion.is_some() {
            self.publish(EventTopic::Competition, ChangeKind::Update, &competition, &competition);
        }

        Ok(ResultReport {
            record,
            next_match,
            champion,
        })
    }

    /// Delete a match. Bracket slots filled from it are left as they are.
    pub async fn delete_match(&self, principal: &Principal, match_id: MatchId) -> CoordinatorResult<()> {
        let competition_id = self.load_match(match_id).await?.competition_id;
        let lock = self.competition_lock(competition_id).await;
        let _guard = lock.lock().await;

        let competition = self.load_competition(competition_id).await?;
        Self::authorize_manage(principal, &competition, "delete matches")?;

        if !self.store.delete_match(match_id).await? {
            return Err(CoordinatorError::MatchNotFound(match_id));
        }

        self.publish(EventTopic::Match, ChangeKind::Delete, &competition, &match_id);
        Ok(())
    }
}
