//! PostgreSQL storage backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    PgPool, Row,
    postgres::{PgExecutor, PgQueryResult, PgRow},
    types::Json,
};
use std::sync::Arc;

use super::{
    errors::{StoreError, StoreResult},
    repository::{
        CompetitionRepository, FeedbackRepository, MatchRepository, ResultCommit, TeamRepository,
        TransactionRepository,
    },
    timeouts::{DEFAULT_QUERY_TIMEOUT, LONG_OPERATION_TIMEOUT, with_default_timeout, with_timeout},
};
use crate::{
    auth::UserId,
    bracket::{Bracket, TeamId, TeamRef},
    competition::{
        Competition, CompetitionFilter, CompetitionId, NewCompetition, NewTeam, Team, TeamFilter, TeamPlayer,
    },
    feedback::{Feedback, FeedbackFilter, FeedbackId, NewFeedback},
    matches::{MatchFilter, MatchId, MatchRecord, MatchSide, MatchStatus, NewMatch},
};

const COMPETITION_COLUMNS: &str = "id, name, sport, venue, description, rules, start_date, end_date, \
     registration_deadline, max_teams, status, organizer_id, team_ids, bracket, champion_id, \
     created_at, updated_at";

const TEAM_COLUMNS: &str = "id, name, captain_id, description, players, wins, losses, created_at";

const MATCH_COLUMNS: &str = "id, competition_id, round, match_number, team1_id, team1_name, team1_score, \
     team2_id, team2_name, team2_score, winner_id, status, start_time, end_time, venue, notes, \
     created_at, updated_at";

const FEEDBACK_COLUMNS: &str = "id, competition_id, user_id, rating, comment, category, status, \
     admin_response, created_at, updated_at";

/// Store backed by PostgreSQL
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Apply the bundled schema
    pub async fn migrate(&self) -> StoreResult<()> {
        let schema = include_str!("../../migrations/0001_init.sql");
        with_default_timeout(sqlx::raw_sql(schema).execute(self.pool.as_ref())).await?;
        Ok(())
    }
}

fn conflict_on_unique(err: StoreError, message: &str) -> StoreError {
    match err {
        StoreError::Database(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            StoreError::Conflict(message.to_string())
        }
        other => other,
    }
}

fn to_u32(value: i32, column: &str) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {column}: {value}")))
}

fn parse_column<T: std::str::FromStr<Err = String>>(row: &PgRow, column: &str) -> StoreResult<T> {
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(StoreError::Corrupt)
}

fn competition_from_row(row: &PgRow) -> StoreResult<Competition> {
    let bracket: Option<Json<Bracket>> = row.try_get("bracket")?;
    Ok(Competition {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        sport: row.try_get("sport")?,
        venue: row.try_get("venue")?,
        description: row.try_get("description")?,
        rules: row.try_get("rules")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        registration_deadline: row.try_get("registration_deadline")?,
        max_teams: to_u32(row.try_get("max_teams")?, "max_teams")?,
        status: parse_column(row, "status")?,
        organizer_id: row.try_get("organizer_id")?,
        teams: row.try_get("team_ids")?,
        bracket: bracket.map(|Json(b)| b),
        champion: row.try_get("champion_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn team_from_row(row: &PgRow) -> StoreResult<Team> {
    let Json(players): Json<Vec<TeamPlayer>> = row.try_get("players")?;
    Ok(Team {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        captain_id: row.try_get("captain_id")?,
        description: row.try_get("description")?,
        players,
        wins: to_u32(row.try_get("wins")?, "wins")?,
        losses: to_u32(row.try_get("losses")?, "losses")?,
        created_at: row.try_get("created_at")?,
    })
}

fn match_from_row(row: &PgRow) -> StoreResult<MatchRecord> {
    let side = |prefix: &str| -> StoreResult<MatchSide> {
        Ok(MatchSide {
            team: TeamRef::new(
                row.try_get(format!("{prefix}_id").as_str())?,
                row.try_get::<String, _>(format!("{prefix}_name").as_str())?,
            ),
            score: to_u32(row.try_get(format!("{prefix}_score").as_str())?, "score")?,
        })
    };

    Ok(MatchRecord {
        id: row.try_get("id")?,
        competition_id: row.try_get("competition_id")?,
        round: to_u32(row.try_get("round")?, "round")?,
        match_number: to_u32(row.try_get("match_number")?, "match_number")?,
        team1: side("team1")?,
        team2: side("team2")?,
        winner: row.try_get("winner_id")?,
        status: parse_column(row, "status")?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
        venue: row.try_get("venue")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn feedback_from_row(row: &PgRow) -> StoreResult<Feedback> {
    let rating: i16 = row.try_get("rating")?;
    Ok(Feedback {
        id: row.try_get("id")?,
        competition_id: row.try_get("competition_id")?,
        user_id: row.try_get("user_id")?,
        rating: u8::try_from(rating).map_err(|_| StoreError::Corrupt(format!("rating {rating}")))?,
        comment: row.try_get("comment")?,
        category: parse_column(row, "category")?,
        status: parse_column(row, "status")?,
        admin_response: row.try_get("admin_response")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn missing(kind: &str, id: i64) -> StoreError {
    StoreError::Corrupt(format!("{kind} {id} does not exist"))
}

async fn insert_match_row<'e>(
    executor: impl PgExecutor<'e>,
    new: &NewMatch,
    now: DateTime<Utc>,
) -> StoreResult<MatchRecord> {
    let sql = format!(
        "INSERT INTO matches (competition_id, round, match_number, team1_id, team1_name,
                              team2_id, team2_name, start_time, venue, notes, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
         RETURNING {MATCH_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(new.competition_id)
        .bind(new.round as i32)
        .bind(new.match_number as i32)
        .bind(new.team1.id)
        .bind(&new.team1.name)
        .bind(new.team2.id)
        .bind(&new.team2.name)
        .bind(new.start_time)
        .bind(&new.venue)
        .bind(&new.notes)
        .bind(now)
        .fetch_one(executor)
        .await?;

    match_from_row(&row)
}

async fn update_match_row<'e>(
    executor: impl PgExecutor<'e>,
    record: &MatchRecord,
) -> Result<PgQueryResult, sqlx::Error> {
    sqlx::query(
        "UPDATE matches
         SET team1_score = $2, team2_score = $3, winner_id = $4, status = $5,
             start_time = $6, end_time = $7, venue = $8, notes = $9, updated_at = $10
         WHERE id = $1",
    )
    .bind(record.id)
    .bind(record.team1.score as i32)
    .bind(record.team2.score as i32)
    .bind(record.winner)
    .bind(record.status.as_str())
    .bind(record.start_time)
    .bind(record.end_time)
    .bind(&record.venue)
    .bind(&record.notes)
    .bind(record.updated_at)
    .execute(executor)
    .await
}

async fn update_competition_row<'e>(
    executor: impl PgExecutor<'e>,
    competition: &Competition,
) -> Result<PgQueryResult, sqlx::Error> {
    sqlx::query(
        "UPDATE competitions
         SET name = $2, venue = $3, description = $4, rules = $5, start_date = $6,
             end_date = $7, registration_deadline = $8, max_teams = $9, status = $10,
             team_ids = $11, bracket = $12, champion_id = $13, updated_at = $14
         WHERE id = $1",
    )
    .bind(competition.id)
    .bind(&competition.name)
    .bind(&competition.venue)
    .bind(&competition.description)
    .bind(&competition.rules)
    .bind(competition.start_date)
    .bind(competition.end_date)
    .bind(competition.registration_deadline)
    .bind(competition.max_teams as i32)
    .bind(competition.status.as_str())
    .bind(&competition.teams)
    .bind(competition.bracket.as_ref().map(Json))
    .bind(competition.champion)
    .bind(competition.updated_at)
    .execute(executor)
    .await
}

#[async_trait]
impl CompetitionRepository for PgStore {
    async fn insert_competition(
        &self,
        organizer_id: UserId,
        new: &NewCompetition,
        now: DateTime<Utc>,
    ) -> StoreResult<Competition> {
        let sql = format!(
            "INSERT INTO competitions (name, sport, venue, description, rules, start_date, end_date,
                                       registration_deadline, max_teams, organizer_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
             RETURNING {COMPETITION_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(new.name.trim())
                .bind(new.sport.trim())
                .bind(&new.venue)
                .bind(&new.description)
                .bind(&new.rules)
                .bind(new.start_date)
                .bind(new.end_date)
                .bind(new.registration_deadline)
                .bind(new.max_teams as i32)
                .bind(organizer_id)
                .bind(now)
                .fetch_one(self.pool.as_ref()),
        )
        .await?;

        competition_from_row(&row)
    }

    async fn get_competition(&self, id: CompetitionId) -> StoreResult<Option<Competition>> {
        let sql = format!("SELECT {COMPETITION_COLUMNS} FROM competitions WHERE id = $1");
        let row = with_default_timeout(sqlx::query(&sql).bind(id).fetch_optional(self.pool.as_ref())).await?;
        row.as_ref().map(competition_from_row).transpose()
    }

    async fn list_competitions(&self, filter: &CompetitionFilter) -> StoreResult<Vec<Competition>> {
        let sql = format!(
            "SELECT {COMPETITION_COLUMNS} FROM competitions
             WHERE ($1::TEXT IS NULL OR status = $1)
               AND ($2::TEXT IS NULL OR LOWER(sport) = LOWER($2))
               AND ($3::BIGINT IS NULL OR $3 = ANY(team_ids))
             ORDER BY start_date DESC, id ASC"
        );
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(filter.status.map(|s| s.as_str()))
                .bind(filter.sport.as_deref())
                .bind(filter.team)
                .fetch_all(self.pool.as_ref()),
        )
        .await?;

        rows.iter().map(competition_from_row).collect()
    }

    async fn save_competition(&self, competition: &Competition) -> StoreResult<()> {
        let result = with_default_timeout(update_competition_row(self.pool.as_ref(), competition)).await?;
        if result.rows_affected() == 0 {
            return Err(missing("competition", competition.id));
        }
        Ok(())
    }

    async fn delete_competition(&self, id: CompetitionId) -> StoreResult<bool> {
        let result = with_default_timeout(
            sqlx::query("DELETE FROM competitions WHERE id = $1")
                .bind(id)
                .execute(self.pool.as_ref()),
        )
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TeamRepository for PgStore {
    async fn insert_team(&self, captain_id: UserId, new: &NewTeam, now: DateTime<Utc>) -> StoreResult<Team> {
        let name = new.name.trim();
        let sql = format!(
            "INSERT INTO teams (name, captain_id, description, players, created_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {TEAM_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(name)
                .bind(captain_id)
                .bind(&new.description)
                .bind(Json(vec![TeamPlayer::captain(captain_id)]))
                .bind(now)
                .fetch_one(self.pool.as_ref()),
        )
        .await
        .map_err(|e| conflict_on_unique(e, &format!("Team name '{name}' is already taken")))?;

        team_from_row(&row)
    }

    async fn get_team(&self, id: TeamId) -> StoreResult<Option<Team>> {
        let sql = format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1");
        let row = with_default_timeout(sqlx::query(&sql).bind(id).fetch_optional(self.pool.as_ref())).await?;
        row.as_ref().map(team_from_row).transpose()
    }

    async fn get_teams(&self, ids: &[TeamId]) -> StoreResult<Vec<Team>> {
        let sql = format!(
            "SELECT {TEAM_COLUMNS} FROM teams t
             JOIN UNNEST($1::BIGINT[]) WITH ORDINALITY AS ids(id, ord) USING (id)
             ORDER BY ids.ord"
        );
        let rows = with_default_timeout(sqlx::query(&sql).bind(ids).fetch_all(self.pool.as_ref())).await?;
        rows.iter().map(team_from_row).collect()
    }

    async fn list_teams(&self, filter: &TeamFilter) -> StoreResult<Vec<Team>> {
        let sql = format!(
            "SELECT {TEAM_COLUMNS} FROM teams
             WHERE ($1::BIGINT IS NULL
                    OR players @> jsonb_build_array(jsonb_build_object('user_id', $1::BIGINT)))
             ORDER BY LOWER(name), id"
        );
        let rows = with_default_timeout(sqlx::query(&sql).bind(filter.player).fetch_all(self.pool.as_ref())).await?;
        rows.iter().map(team_from_row).collect()
    }

    async fn save_team(&self, team: &Team) -> StoreResult<()> {
        let result = with_default_timeout(
            sqlx::query("UPDATE teams SET name = $2, description = $3, players = $4 WHERE id = $1")
                .bind(team.id)
                .bind(&team.name)
                .bind(&team.description)
                .bind(Json(&team.players))
                .execute(self.pool.as_ref()),
        )
        .await
        .map_err(|e| conflict_on_unique(e, &format!("Team name '{}' is already taken", team.name)))?;

        if result.rows_affected() == 0 {
            return Err(missing("team", team.id));
        }
        Ok(())
    }

    async fn delete_team(&self, id: TeamId) -> StoreResult<bool> {
        let result = with_default_timeout(
            sqlx::query("DELETE FROM teams WHERE id = $1")
                .bind(id)
                .execute(self.pool.as_ref()),
        )
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl MatchRepository for PgStore {
    async fn insert_match(&self, new: &NewMatch, now: DateTime<Utc>) -> StoreResult<MatchRecord> {
        with_timeout(DEFAULT_QUERY_TIMEOUT, insert_match_row(self.pool.as_ref(), new, now)).await
    }

    async fn get_match(&self, id: MatchId) -> StoreResult<Option<MatchRecord>> {
        let sql = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1");
        let row = with_default_timeout(sqlx::query(&sql).bind(id).fetch_optional(self.pool.as_ref())).await?;
        row.as_ref().map(match_from_row).transpose()
    }

    async fn list_matches(
        &self,
        competition_id: CompetitionId,
        status: Option<MatchStatus>,
    ) -> StoreResult<Vec<MatchRecord>> {
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE competition_id = $1 AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY round ASC, start_time ASC, match_number ASC"
        );
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(competition_id)
                .bind(status.map(|s| s.as_str()))
                .fetch_all(self.pool.as_ref()),
        )
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn find_matches(&self, filter: &MatchFilter) -> StoreResult<Vec<MatchRecord>> {
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE ($1::BIGINT IS NULL OR competition_id = $1)
               AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY competition_id ASC, round ASC, start_time ASC, match_number ASC"
        );
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(filter.competition_id)
                .bind(filter.status.map(|s| s.as_str()))
                .fetch_all(self.pool.as_ref()),
        )
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn save_match(&self, record: &MatchRecord) -> StoreResult<()> {
        let result = with_default_timeout(update_match_row(self.pool.as_ref(), record)).await?;
        if result.rows_affected() == 0 {
            return Err(missing("match", record.id));
        }
        Ok(())
    }

    async fn delete_match(&self, id: MatchId) -> StoreResult<bool> {
        let result = with_default_timeout(
            sqlx::query("DELETE FROM matches WHERE id = $1")
                .bind(id)
                .execute(self.pool.as_ref()),
        )
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_matches_for(&self, competition_id: CompetitionId) -> StoreResult<u64> {
        let result = with_default_timeout(
            sqlx::query("DELETE FROM matches WHERE competition_id = $1")
                .bind(competition_id)
                .execute(self.pool.as_ref()),
        )
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl FeedbackRepository for PgStore {
    async fn insert_feedback(
        &self,
        user_id: UserId,
        new: &NewFeedback,
        now: DateTime<Utc>,
    ) -> StoreResult<Feedback> {
        let sql = format!(
            "INSERT INTO feedback (competition_id, user_id, rating, comment, category, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)
             RETURNING {FEEDBACK_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(new.competition_id)
                .bind(user_id)
                .bind(i16::from(new.rating))
                .bind(new.comment.trim())
                .bind(new.category.as_str())
                .bind(now)
                .fetch_one(self.pool.as_ref()),
        )
        .await
        .map_err(|e| conflict_on_unique(e, "Feedback for this competition was already submitted"))?;

        feedback_from_row(&row)
    }

    async fn get_feedback(&self, id: FeedbackId) -> StoreResult<Option<Feedback>> {
        let sql = format!("SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE id = $1");
        let row = with_default_timeout(sqlx::query(&sql).bind(id).fetch_optional(self.pool.as_ref())).await?;
        row.as_ref().map(feedback_from_row).transpose()
    }

    async fn list_feedback(&self, filter: &FeedbackFilter) -> StoreResult<Vec<Feedback>> {
        let sql = format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedback
             WHERE ($1::BIGINT IS NULL OR competition_id = $1)
               AND ($2::TEXT IS NULL OR status = $2)
               AND ($3::TEXT IS NULL OR category = $3)
             ORDER BY created_at DESC, id DESC"
        );
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(filter.competition_id)
                .bind(filter.status.map(|s| s.as_str()))
                .bind(filter.category.map(|c| c.as_str()))
                .fetch_all(self.pool.as_ref()),
        )
        .await?;

        rows.iter().map(feedback_from_row).collect()
    }

    async fn save_feedback(&self, feedback: &Feedback) -> StoreResult<()> {
        with_default_timeout(
            sqlx::query("UPDATE feedback SET status = $2, admin_response = $3, updated_at = $4 WHERE id = $1")
                .bind(feedback.id)
                .bind(feedback.status.as_str())
                .bind(&feedback.admin_response)
                .bind(feedback.updated_at)
                .execute(self.pool.as_ref()),
        )
        .await?;
        Ok(())
    }

    async fn delete_feedback(&self, id: FeedbackId) -> StoreResult<bool> {
        let result = with_default_timeout(
            sqlx::query("DELETE FROM feedback WHERE id = $1")
                .bind(id)
                .execute(self.pool.as_ref()),
        )
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TransactionRepository for PgStore {
    async fn commit_bracket(
        &self,
        competition: &Competition,
        matches: &[NewMatch],
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<MatchRecord>> {
        with_timeout(LONG_OPERATION_TIMEOUT, async {
            let mut tx = self.pool.begin().await?;

            sqlx::query("DELETE FROM matches WHERE competition_id = $1")
                .bind(competition.id)
                .execute(&mut *tx)
                .await?;

            let mut records = Vec::with_capacity(matches.len());
            for new in matches {
                records.push(insert_match_row(&mut *tx, new, now).await?);
            }

            if update_competition_row(&mut *tx, competition).await?.rows_affected() == 0 {
                return Err(missing("competition", competition.id));
            }

            tx.commit().await?;
            Ok::<_, StoreError>(records)
        })
        .await
    }

    async fn commit_result(&self, commit: ResultCommit<'_>, now: DateTime<Utc>) -> StoreResult<Option<MatchRecord>> {
        with_timeout(LONG_OPERATION_TIMEOUT, async {
            let mut tx = self.pool.begin().await?;

            if update_match_row(&mut *tx, commit.record).await?.rows_affected() == 0 {
                return Err(missing("match", commit.record.id));
            }

            if let Some((winner, loser)) = commit.tally {
                sqlx::query("UPDATE teams SET wins = wins + 1 WHERE id = $1")
                    .bind(winner)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query("UPDATE teams SET losses = losses + 1 WHERE id = $1")
                    .bind(loser)
                    .execute(&mut *tx)
                    .await?;
            }

            let next = match commit.next_match {
                Some(new) => Some(insert_match_row(&mut *tx, new, now).await?),
                None => None,
            };

            if let Some(competition) = commit.competition {
                if update_competition_row(&mut *tx, competition).await?.rows_affected() == 0 {
                    return Err(missing("competition", competition.id));
                }
            }

            tx.commit().await?;
            Ok::<_, StoreError>(next)
        })
        .await
    }
}
