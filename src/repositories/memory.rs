// src/repositories/memory.rs

//! In-memory store used by the test suites.
//!
//! Every operation runs under one lock, so the scored-attempt uniqueness
//! check and the insert are atomic just like the partial unique index in
//! Postgres, and statistics writes replace the row for the quiz.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::{
    error::AppError,
    models::{
        attempt::{Attempt, NewAttempt},
        profile::{Profile, ProfileRequest},
        quiz::{Quiz, QuizDraft},
        statistics::QuizStatistics,
        user::{NewUser, Role, User},
    },
    repositories::{AttemptRepository, QuizRepository, RepoResult, StatisticsRepository, UserRepository},
};

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: BTreeMap<i64, User>,
    /// Keyed by user id.
    profiles: BTreeMap<i64, Profile>,
    quizzes: BTreeMap<i64, Quiz>,
    attempts: Vec<Attempt>,
    statistics: BTreeMap<i64, QuizStatistics>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn remove_quiz(&mut self, quiz_id: i64) -> bool {
        let removed = self.quizzes.remove(&quiz_id).is_some();
        self.attempts.retain(|a| a.quiz_id != quiz_id);
        self.statistics.remove(&quiz_id);
        removed
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut inner = self.inner.lock().await;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(AppError::BadRequest("Email already exists".to_string()));
        }
        let now = Utc::now();
        let id = inner.next_id();
        let created = User {
            id,
            email: user.email,
            password: user.password_hash,
            role: user.role,
            is_approved: user.is_approved,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_user(&self, id: i64) -> RepoResult<Option<User>> {
        Ok(self.inner.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, role: Option<Role>) -> RepoResult<Vec<User>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .values()
            .rev()
            .filter(|u| role.is_none_or(|r| u.role == r))
            .cloned()
            .collect())
    }

    async fn count_users(&self, role: Option<Role>) -> RepoResult<i64> {
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .values()
            .filter(|u| role.is_none_or(|r| u.role == r))
            .count() as i64)
    }

    async fn set_role(&self, id: i64, role: Role, is_approved: Option<bool>) -> RepoResult<Option<User>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.users.get_mut(&id).map(|user| {
            user.role = role;
            user.is_approved = is_approved;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn set_approval(&self, id: i64, is_approved: bool) -> RepoResult<Option<User>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.users.get_mut(&id).map(|user| {
            user.is_approved = Some(is_approved);
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn delete_user(&self, id: i64) -> RepoResult<bool> {
        let mut inner = self.inner.lock().await;
        if inner.users.remove(&id).is_none() {
            return Ok(false);
        }
        inner.profiles.remove(&id);
        inner.attempts.retain(|a| a.user_id != id);
        let owned: Vec<i64> = inner
            .quizzes
            .values()
            .filter(|q| q.instructor_id == id)
            .map(|q| q.id)
            .collect();
        for quiz_id in owned {
            inner.remove_quiz(quiz_id);
        }
        Ok(true)
    }

    async fn find_profile(&self, user_id: i64) -> RepoResult<Option<Profile>> {
        Ok(self.inner.lock().await.profiles.get(&user_id).cloned())
    }

    async fn find_profiles(&self, user_ids: &[i64]) -> RepoResult<HashMap<i64, Profile>> {
        let inner = self.inner.lock().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| inner.profiles.get(id).map(|p| (*id, p.clone())))
            .collect())
    }

    async fn upsert_profile(&self, user_id: i64, profile: ProfileRequest) -> RepoResult<Profile> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let existing = inner.profiles.get(&user_id).map(|p| (p.id, p.created_at));
        let (id, created_at) = match existing {
            Some(kept) => kept,
            None => (inner.next_id(), now),
        };
        let stored = Profile {
            id,
            user_id,
            first_name: profile.first_name,
            last_name: profile.last_name,
            year_of_study: profile.year_of_study,
            department: profile.department,
            roll_number: profile.roll_number,
            created_at,
            updated_at: now,
        };
        inner.profiles.insert(user_id, stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl QuizRepository for MemoryStore {
    async fn create_quiz(&self, instructor_id: i64, draft: QuizDraft) -> RepoResult<Quiz> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let id = inner.next_id();
        let quiz = Quiz {
            id,
            instructor_id,
            title: draft.title,
            description: draft.description,
            year_of_study: draft.year_of_study,
            start_time: draft.start_time,
            end_time: draft.end_time,
            duration: draft.duration,
            questions: draft.questions,
            total_score: draft.total_score,
            created_at: now,
            updated_at: now,
        };
        inner.quizzes.insert(id, quiz.clone());
        Ok(quiz)
    }

    async fn find_quiz(&self, id: i64) -> RepoResult<Option<Quiz>> {
        Ok(self.inner.lock().await.quizzes.get(&id).cloned())
    }

    async fn update_quiz(&self, id: i64, draft: QuizDraft) -> RepoResult<Option<Quiz>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.quizzes.get_mut(&id).map(|quiz| {
            quiz.title = draft.title;
            quiz.description = draft.description;
            quiz.year_of_study = draft.year_of_study;
            quiz.start_time = draft.start_time;
            quiz.end_time = draft.end_time;
            quiz.duration = draft.duration;
            quiz.questions = draft.questions;
            quiz.total_score = draft.total_score;
            quiz.updated_at = Utc::now();
            quiz.clone()
        }))
    }

    async fn delete_quiz(&self, id: i64) -> RepoResult<bool> {
        Ok(self.inner.lock().await.remove_quiz(id))
    }

    async fn list_quizzes_by_instructor(&self, instructor_id: i64) -> RepoResult<Vec<Quiz>> {
        let inner = self.inner.lock().await;
        let mut quizzes: Vec<Quiz> = inner
            .quizzes
            .values()
            .filter(|q| q.instructor_id == instructor_id)
            .cloned()
            .collect();
        quizzes.sort_by_key(|q| (q.start_time, q.id));
        Ok(quizzes)
    }

    async fn list_quizzes_by_year(&self, year_of_study: i32) -> RepoResult<Vec<Quiz>> {
        let inner = self.inner.lock().await;
        let mut quizzes: Vec<Quiz> = inner
            .quizzes
            .values()
            .filter(|q| q.year_of_study == year_of_study)
            .cloned()
            .collect();
        quizzes.sort_by_key(|q| (q.start_time, q.id));
        Ok(quizzes)
    }

    async fn find_quizzes(&self, ids: &[i64]) -> RepoResult<Vec<Quiz>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .quizzes
            .values()
            .filter(|q| ids.contains(&q.id))
            .cloned()
            .collect())
    }

    async fn list_all_quizzes(&self) -> RepoResult<Vec<Quiz>> {
        Ok(self.inner.lock().await.quizzes.values().cloned().collect())
    }
}

#[async_trait]
impl AttemptRepository for MemoryStore {
    async fn insert_attempt(&self, attempt: NewAttempt) -> RepoResult<Attempt> {
        let mut inner = self.inner.lock().await;
        let duplicate = attempt.is_scored
            && inner
                .attempts
                .iter()
                .any(|a| a.is_scored && a.quiz_id == attempt.quiz_id && a.user_id == attempt.user_id);
        if duplicate {
            return Err(AppError::Conflict("Quiz already attempted".to_string()));
        }
        let id = inner.next_id();
        let stored = Attempt {
            id,
            quiz_id: attempt.quiz_id,
            user_id: attempt.user_id,
            start_time: attempt.submitted_at,
            end_time: attempt.submitted_at,
            is_scored: attempt.is_scored,
            answers: attempt.answers,
            total_score: attempt.total_score,
            created_at: attempt.submitted_at,
        };
        inner.attempts.push(stored.clone());
        Ok(stored)
    }

    async fn find_scored_attempt(&self, quiz_id: i64, user_id: i64) -> RepoResult<Option<Attempt>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .attempts
            .iter()
            .find(|a| a.is_scored && a.quiz_id == quiz_id && a.user_id == user_id)
            .cloned())
    }

    async fn find_latest_attempt(&self, quiz_id: i64, user_id: i64) -> RepoResult<Option<Attempt>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .attempts
            .iter()
            .filter(|a| a.quiz_id == quiz_id && a.user_id == user_id)
            .max_by_key(|a| (a.created_at, a.id))
            .cloned())
    }

    async fn list_scored_attempts_for_quiz(&self, quiz_id: i64) -> RepoResult<Vec<Attempt>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .attempts
            .iter()
            .filter(|a| a.is_scored && a.quiz_id == quiz_id)
            .cloned()
            .collect())
    }

    async fn list_scored_attempts_for_user(&self, user_id: i64) -> RepoResult<Vec<Attempt>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .attempts
            .iter()
            .filter(|a| a.is_scored && a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn count_scored_attempts(&self, quiz_ids: &[i64]) -> RepoResult<HashMap<i64, i64>> {
        let inner = self.inner.lock().await;
        let mut counts = HashMap::new();
        for attempt in inner
            .attempts
            .iter()
            .filter(|a| a.is_scored && quiz_ids.contains(&a.quiz_id))
        {
            *counts.entry(attempt.quiz_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn count_all_scored_attempts(&self) -> RepoResult<i64> {
        let inner = self.inner.lock().await;
        Ok(inner.attempts.iter().filter(|a| a.is_scored).count() as i64)
    }
}

#[async_trait]
impl StatisticsRepository for MemoryStore {
    async fn find_statistics(&self, quiz_id: i64) -> RepoResult<Option<QuizStatistics>> {
        Ok(self.inner.lock().await.statistics.get(&quiz_id).cloned())
    }

    async fn upsert_statistics(&self, stats: &QuizStatistics) -> RepoResult<QuizStatistics> {
        let mut inner = self.inner.lock().await;
        inner.statistics.insert(stats.quiz_id, stats.clone());
        Ok(stats.clone())
    }

    async fn list_statistics(&self, quiz_ids: Option<&[i64]>) -> RepoResult<Vec<QuizStatistics>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .statistics
            .values()
            .filter(|s| quiz_ids.is_none_or(|ids| ids.contains(&s.quiz_id)))
            .cloned()
            .collect())
    }
}
