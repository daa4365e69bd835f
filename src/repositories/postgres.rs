// src/repositories/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};

use crate::{
    error::AppError,
    models::{
        attempt::{AnswerResult, Attempt, NewAttempt},
        profile::{Profile, ProfileRequest},
        quiz::{Question, Quiz, QuizDraft},
        statistics::{CohortCount, QuizStatistics},
        user::{NewUser, Role, User},
    },
    repositories::{AttemptRepository, QuizRepository, RepoResult, StatisticsRepository, UserRepository},
};

/// Postgres implementation of every repository trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// Row of the 'users' table; `role` is stored as text.
#[derive(FromRow)]
struct UserRow {
    id: i64,
    email: String,
    password: String,
    role: String,
    is_approved: Option<bool>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(AppError::InternalServerError)?;
        Ok(User {
            id: row.id,
            email: row.email,
            password: row.password,
            role,
            is_approved: row.is_approved,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct QuizRow {
    id: i64,
    instructor_id: i64,
    title: String,
    description: Option<String>,
    year_of_study: i32,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    duration: i32,
    questions: Json<Vec<Question>>,
    total_score: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<QuizRow> for Quiz {
    fn from(row: QuizRow) -> Self {
        Quiz {
            id: row.id,
            instructor_id: row.instructor_id,
            title: row.title,
            description: row.description,
            year_of_study: row.year_of_study,
            start_time: row.start_time,
            end_time: row.end_time,
            duration: row.duration,
            questions: row.questions.0,
            total_score: row.total_score,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct AttemptRow {
    id: i64,
    quiz_id: i64,
    user_id: i64,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    is_scored: bool,
    answers: Json<Vec<AnswerResult>>,
    total_score: i32,
    created_at: DateTime<Utc>,
}

impl From<AttemptRow> for Attempt {
    fn from(row: AttemptRow) -> Self {
        Attempt {
            id: row.id,
            quiz_id: row.quiz_id,
            user_id: row.user_id,
            start_time: row.start_time,
            end_time: row.end_time,
            is_scored: row.is_scored,
            answers: row.answers.0,
            total_score: row.total_score,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct StatisticsRow {
    quiz_id: i64,
    total_attempts: i64,
    average_score: f64,
    highest_score: i32,
    lowest_score: i32,
    attempts_by_year: Json<Vec<CohortCount>>,
    last_updated: DateTime<Utc>,
}

impl From<StatisticsRow> for QuizStatistics {
    fn from(row: StatisticsRow) -> Self {
        QuizStatistics {
            quiz_id: row.quiz_id,
            total_attempts: row.total_attempts,
            average_score: row.average_score,
            highest_score: row.highest_score,
            lowest_score: row.lowest_score,
            attempts_by_year: row.attempts_by_year.0,
            last_updated: row.last_updated,
        }
    }
}

fn into_users(rows: Vec<UserRow>) -> RepoResult<Vec<User>> {
    rows.into_iter().map(User::try_from).collect()
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (email, password, role, is_approved)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, password, role, is_approved, created_at, updated_at
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_approved)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::BadRequest("Email already exists".to_string())
            } else {
                tracing::error!("Failed to create user: {:?}", e);
                AppError::from(e)
            }
        })?;

        row.try_into()
    }

    async fn find_user(&self, id: i64) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn list_users(&self, role: Option<Role>) -> RepoResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT * FROM users
            WHERE ($1::TEXT IS NULL OR role = $1)
            ORDER BY id DESC
            "#,
        )
        .bind(role.map(|r| r.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list users: {:?}", e);
            AppError::from(e)
        })?;

        into_users(rows)
    }

    async fn count_users(&self, role: Option<Role>) -> RepoResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE ($1::TEXT IS NULL OR role = $1)")
                .bind(role.map(|r| r.as_str()))
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn set_role(&self, id: i64, role: Role, is_approved: Option<bool>) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users SET role = $1, is_approved = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(role.as_str())
        .bind(is_approved)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn set_approval(&self, id: i64, is_approved: bool) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(
            "UPDATE users SET is_approved = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(is_approved)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn delete_user(&self, id: i64) -> RepoResult<bool> {
        // Profile, attempts, owned quizzes and their statistics go with it (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete user: {:?}", e);
                AppError::from(e)
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_profile(&self, user_id: i64) -> RepoResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    async fn find_profiles(&self, user_ids: &[i64]) -> RepoResult<HashMap<i64, Profile>> {
        let profiles = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = ANY($1)")
            .bind(user_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(profiles.into_iter().map(|p| (p.user_id, p)).collect())
    }

    async fn upsert_profile(&self, user_id: i64, profile: ProfileRequest) -> RepoResult<Profile> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (user_id, first_name, last_name, year_of_study, department, roll_number)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE SET
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                year_of_study = EXCLUDED.year_of_study,
                department = EXCLUDED.department,
                roll_number = EXCLUDED.roll_number,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(profile.year_of_study)
        .bind(&profile.department)
        .bind(&profile.roll_number)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert profile: {:?}", e);
            AppError::from(e)
        })?;

        Ok(profile)
    }
}

#[async_trait]
impl QuizRepository for PgStore {
    async fn create_quiz(&self, instructor_id: i64, draft: QuizDraft) -> RepoResult<Quiz> {
        let row = sqlx::query_as::<_, QuizRow>(
            r#"
            INSERT INTO quizzes
            (instructor_id, title, description, year_of_study, start_time, end_time, duration, questions, total_score)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(instructor_id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.year_of_study)
        .bind(draft.start_time)
        .bind(draft.end_time)
        .bind(draft.duration)
        .bind(Json(&draft.questions))
        .bind(draft.total_score)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create quiz: {:?}", e);
            AppError::from(e)
        })?;

        Ok(row.into())
    }

    async fn find_quiz(&self, id: i64) -> RepoResult<Option<Quiz>> {
        let row = sqlx::query_as::<_, QuizRow>("SELECT * FROM quizzes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Quiz::from))
    }

    async fn update_quiz(&self, id: i64, draft: QuizDraft) -> RepoResult<Option<Quiz>> {
        let row = sqlx::query_as::<_, QuizRow>(
            r#"
            UPDATE quizzes SET
                title = $1, description = $2, year_of_study = $3,
                start_time = $4, end_time = $5, duration = $6,
                questions = $7, total_score = $8, updated_at = NOW()
            WHERE id = $9
            RETURNING *
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.year_of_study)
        .bind(draft.start_time)
        .bind(draft.end_time)
        .bind(draft.duration)
        .bind(Json(&draft.questions))
        .bind(draft.total_score)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update quiz: {:?}", e);
            AppError::from(e)
        })?;

        Ok(row.map(Quiz::from))
    }

    async fn delete_quiz(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_quizzes_by_instructor(&self, instructor_id: i64) -> RepoResult<Vec<Quiz>> {
        let rows = sqlx::query_as::<_, QuizRow>(
            "SELECT * FROM quizzes WHERE instructor_id = $1 ORDER BY start_time, id",
        )
        .bind(instructor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Quiz::from).collect())
    }

    async fn list_quizzes_by_year(&self, year_of_study: i32) -> RepoResult<Vec<Quiz>> {
        let rows = sqlx::query_as::<_, QuizRow>(
            "SELECT * FROM quizzes WHERE year_of_study = $1 ORDER BY start_time, id",
        )
        .bind(year_of_study)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Quiz::from).collect())
    }

    async fn find_quizzes(&self, ids: &[i64]) -> RepoResult<Vec<Quiz>> {
        let rows = sqlx::query_as::<_, QuizRow>("SELECT * FROM quizzes WHERE id = ANY($1) ORDER BY id")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Quiz::from).collect())
    }

    async fn list_all_quizzes(&self) -> RepoResult<Vec<Quiz>> {
        let rows = sqlx::query_as::<_, QuizRow>("SELECT * FROM quizzes ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Quiz::from).collect())
    }
}

#[async_trait]
impl AttemptRepository for PgStore {
    async fn insert_attempt(&self, attempt: NewAttempt) -> RepoResult<Attempt> {
        let row = sqlx::query_as::<_, AttemptRow>(
            r#"
            INSERT INTO quiz_attempts
            (quiz_id, user_id, start_time, end_time, is_scored, answers, total_score, created_at)
            VALUES ($1, $2, $3, $3, $4, $5, $6, $3)
            RETURNING *
            "#,
        )
        .bind(attempt.quiz_id)
        .bind(attempt.user_id)
        .bind(attempt.submitted_at)
        .bind(attempt.is_scored)
        .bind(Json(&attempt.answers))
        .bind(attempt.total_score)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Quiz already attempted".to_string())
            } else {
                tracing::error!("Failed to insert attempt: {:?}", e);
                AppError::from(e)
            }
        })?;

        Ok(row.into())
    }

    async fn find_scored_attempt(&self, quiz_id: i64, user_id: i64) -> RepoResult<Option<Attempt>> {
        let row = sqlx::query_as::<_, AttemptRow>(
            "SELECT * FROM quiz_attempts WHERE quiz_id = $1 AND user_id = $2 AND is_scored",
        )
        .bind(quiz_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Attempt::from))
    }

    async fn find_latest_attempt(&self, quiz_id: i64, user_id: i64) -> RepoResult<Option<Attempt>> {
        let row = sqlx::query_as::<_, AttemptRow>(
            r#"
            SELECT * FROM quiz_attempts
            WHERE quiz_id = $1 AND user_id = $2
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(quiz_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Attempt::from))
    }

    async fn list_scored_attempts_for_quiz(&self, quiz_id: i64) -> RepoResult<Vec<Attempt>> {
        let rows = sqlx::query_as::<_, AttemptRow>(
            "SELECT * FROM quiz_attempts WHERE quiz_id = $1 AND is_scored ORDER BY created_at, id",
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Attempt::from).collect())
    }

    async fn list_scored_attempts_for_user(&self, user_id: i64) -> RepoResult<Vec<Attempt>> {
        let rows = sqlx::query_as::<_, AttemptRow>(
            "SELECT * FROM quiz_attempts WHERE user_id = $1 AND is_scored ORDER BY created_at, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Attempt::from).collect())
    }

    async fn count_scored_attempts(&self, quiz_ids: &[i64]) -> RepoResult<HashMap<i64, i64>> {
        let counts = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT quiz_id, COUNT(*) FROM quiz_attempts
            WHERE quiz_id = ANY($1) AND is_scored
            GROUP BY quiz_id
            "#,
        )
        .bind(quiz_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(counts.into_iter().collect())
    }

    async fn count_all_scored_attempts(&self) -> RepoResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_attempts WHERE is_scored")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl StatisticsRepository for PgStore {
    async fn find_statistics(&self, quiz_id: i64) -> RepoResult<Option<QuizStatistics>> {
        let row = sqlx::query_as::<_, StatisticsRow>("SELECT * FROM quiz_statistics WHERE quiz_id = $1")
            .bind(quiz_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(QuizStatistics::from))
    }

    async fn upsert_statistics(&self, stats: &QuizStatistics) -> RepoResult<QuizStatistics> {
        let row = sqlx::query_as::<_, StatisticsRow>(
            r#"
            INSERT INTO quiz_statistics
            (quiz_id, total_attempts, average_score, highest_score, lowest_score, attempts_by_year, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (quiz_id) DO UPDATE SET
                total_attempts = EXCLUDED.total_attempts,
                average_score = EXCLUDED.average_score,
                highest_score = EXCLUDED.highest_score,
                lowest_score = EXCLUDED.lowest_score,
                attempts_by_year = EXCLUDED.attempts_by_year,
                last_updated = EXCLUDED.last_updated
            RETURNING *
            "#,
        )
        .bind(stats.quiz_id)
        .bind(stats.total_attempts)
        .bind(stats.average_score)
        .bind(stats.highest_score)
        .bind(stats.lowest_score)
        .bind(Json(&stats.attempts_by_year))
        .bind(stats.last_updated)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert quiz statistics: {:?}", e);
            AppError::from(e)
        })?;

        Ok(row.into())
    }

    async fn list_statistics(&self, quiz_ids: Option<&[i64]>) -> RepoResult<Vec<QuizStatistics>> {
        let rows = match quiz_ids {
            Some(ids) => {
                sqlx::query_as::<_, StatisticsRow>(
                    "SELECT * FROM quiz_statistics WHERE quiz_id = ANY($1) ORDER BY quiz_id",
                )
                .bind(ids)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, StatisticsRow>("SELECT * FROM quiz_statistics ORDER BY quiz_id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows.into_iter().map(QuizStatistics::from).collect())
    }
}
