// src/repositories/mod.rs

//! Data-access contracts.
//!
//! Services and handlers only see these traits. `postgres::PgStore`
//! implements them for production and `memory::MemoryStore` for tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        attempt::{Attempt, NewAttempt},
        profile::{Profile, ProfileRequest},
        quiz::{Quiz, QuizDraft},
        statistics::QuizStatistics,
        user::{NewUser, Role, User},
    },
};

pub mod memory;
pub mod postgres;

pub type RepoResult<T> = Result<T, AppError>;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    async fn find_user(&self, id: i64) -> RepoResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn list_users(&self, role: Option<Role>) -> RepoResult<Vec<User>>;
    async fn count_users(&self, role: Option<Role>) -> RepoResult<i64>;
    async fn set_role(&self, id: i64, role: Role, is_approved: Option<bool>) -> RepoResult<Option<User>>;
    async fn set_approval(&self, id: i64, is_approved: bool) -> RepoResult<Option<User>>;
    /// Removes the user together with the profile, attempts, and owned
    /// quizzes (and their statistics). Returns false when nothing was deleted.
    async fn delete_user(&self, id: i64) -> RepoResult<bool>;

    async fn find_profile(&self, user_id: i64) -> RepoResult<Option<Profile>>;
    /// Profiles of the given users, keyed by user id. Users without a profile are absent.
    async fn find_profiles(&self, user_ids: &[i64]) -> RepoResult<HashMap<i64, Profile>>;
    async fn upsert_profile(&self, user_id: i64, profile: ProfileRequest) -> RepoResult<Profile>;
}

#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn create_quiz(&self, instructor_id: i64, draft: QuizDraft) -> RepoResult<Quiz>;
    async fn find_quiz(&self, id: i64) -> RepoResult<Option<Quiz>>;
    async fn update_quiz(&self, id: i64, draft: QuizDraft) -> RepoResult<Option<Quiz>>;
    async fn delete_quiz(&self, id: i64) -> RepoResult<bool>;
    async fn list_quizzes_by_instructor(&self, instructor_id: i64) -> RepoResult<Vec<Quiz>>;
    async fn list_quizzes_by_year(&self, year_of_study: i32) -> RepoResult<Vec<Quiz>>;
    /// Quizzes by id; unknown ids are skipped.
    async fn find_quizzes(&self, ids: &[i64]) -> RepoResult<Vec<Quiz>>;
    async fn list_all_quizzes(&self) -> RepoResult<Vec<Quiz>>;
}

#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Inserts an attempt. A second scored attempt for the same
    /// (quiz, user) is rejected by the store with `Conflict`.
    async fn insert_attempt(&self, attempt: NewAttempt) -> RepoResult<Attempt>;
    async fn find_scored_attempt(&self, quiz_id: i64, user_id: i64) -> RepoResult<Option<Attempt>>;
    /// Most recent attempt of the user for the quiz, scored or not.
    async fn find_latest_attempt(&self, quiz_id: i64, user_id: i64) -> RepoResult<Option<Attempt>>;
    async fn list_scored_attempts_for_quiz(&self, quiz_id: i64) -> RepoResult<Vec<Attempt>>;
    async fn list_scored_attempts_for_user(&self, user_id: i64) -> RepoResult<Vec<Attempt>>;
    /// Scored attempt counts per quiz; quizzes without attempts are absent.
    async fn count_scored_attempts(&self, quiz_ids: &[i64]) -> RepoResult<HashMap<i64, i64>>;
    async fn count_all_scored_attempts(&self) -> RepoResult<i64>;
}

#[async_trait]
pub trait StatisticsRepository: Send + Sync {
    async fn find_statistics(&self, quiz_id: i64) -> RepoResult<Option<QuizStatistics>>;
    /// Replaces the cached row for `stats.quiz_id` in a single write.
    async fn upsert_statistics(&self, stats: &QuizStatistics) -> RepoResult<QuizStatistics>;
    async fn list_statistics(&self, quiz_ids: Option<&[i64]>) -> RepoResult<Vec<QuizStatistics>>;
}

/// Bundle of repository handles shared through `AppState`.
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn UserRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub statistics: Arc<dyn StatisticsRepository>,
}

impl Store {
    /// Uses one backend for every repository.
    pub fn from_backend<B>(backend: B) -> Self
    where
        B: UserRepository + QuizRepository + AttemptRepository + StatisticsRepository + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            users: backend.clone(),
            quizzes: backend.clone(),
            attempts: backend.clone(),
            statistics: backend,
        }
    }
}
