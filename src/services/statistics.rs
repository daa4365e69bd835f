// src/services/statistics.rs

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        attempt::Attempt,
        statistics::{CohortCount, QuizStatistics},
        user::Requester,
    },
    repositories::Store,
};

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Aggregates a quiz's scored attempts.
///
/// `cohorts` maps a user id to the user's year of study; attempts from users
/// missing from the map are counted under `None`, which sorts first.
pub fn compute_statistics(
    quiz_id: i64,
    attempts: &[Attempt],
    cohorts: &HashMap<i64, i32>,
    now: DateTime<Utc>,
) -> QuizStatistics {
    let scored: Vec<&Attempt> = attempts.iter().filter(|a| a.is_scored).collect();

    if scored.is_empty() {
        return QuizStatistics {
            quiz_id,
            total_attempts: 0,
            average_score: 0.0,
            highest_score: 0,
            lowest_score: 0,
            attempts_by_year: Vec::new(),
            last_updated: now,
        };
    }

    let total: i64 = scored.iter().map(|a| i64::from(a.total_score)).sum();
    let highest = scored.iter().map(|a| a.total_score).max().unwrap_or(0);
    let lowest = scored.iter().map(|a| a.total_score).min().unwrap_or(0);

    let mut by_year: BTreeMap<Option<i32>, i64> = BTreeMap::new();
    for attempt in &scored {
        *by_year.entry(cohorts.get(&attempt.user_id).copied()).or_default() += 1;
    }

    QuizStatistics {
        quiz_id,
        total_attempts: scored.len() as i64,
        average_score: round2(total as f64 / scored.len() as f64),
        highest_score: highest,
        lowest_score: lowest,
        attempts_by_year: by_year
            .into_iter()
            .map(|(year_of_study, count)| CohortCount { year_of_study, count })
            .collect(),
        last_updated: now,
    }
}

/// Recomputes and stores the statistics row for a quiz.
pub async fn refresh_statistics(store: &Store, quiz_id: i64, now: DateTime<Utc>) -> Result<QuizStatistics, AppError> {
    let attempts = store.attempts.list_scored_attempts_for_quiz(quiz_id).await?;

    let user_ids: Vec<i64> = attempts.iter().map(|a| a.user_id).collect();
    let cohorts: HashMap<i64, i32> = store
        .users
        .find_profiles(&user_ids)
        .await?
        .into_iter()
        .map(|(user_id, profile)| (user_id, profile.year_of_study))
        .collect();

    let stats = compute_statistics(quiz_id, &attempts, &cohorts, now);
    let stored = store.statistics.upsert_statistics(&stats).await?;
    tracing::debug!(quiz_id, total_attempts = stored.total_attempts, "Statistics refreshed");
    Ok(stored)
}

/// Cached statistics for the requester's own quiz. The cache is rebuilt when
/// missing or when `force_refresh` is set; otherwise it is returned as is.
pub async fn get_statistics(
    store: &Store,
    requester: &Requester,
    quiz_id: i64,
    force_refresh: bool,
    now: DateTime<Utc>,
) -> Result<QuizStatistics, AppError> {
    let quiz = store
        .quizzes
        .find_quiz(quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    if quiz.instructor_id != requester.user_id {
        return Err(AppError::Forbidden(
            "Not authorized to view statistics for this quiz".to_string(),
        ));
    }

    if !force_refresh {
        if let Some(cached) = store.statistics.find_statistics(quiz_id).await? {
            return Ok(cached);
        }
    }

    refresh_statistics(store, quiz_id, now).await
}
