// src/handlers/student.rs

use std::collections::HashMap;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::AppError,
    models::{quiz::QuizPhase, user::Role},
    repositories::Store,
    services::statistics::round2,
    utils::jwt::Claims,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedQuiz {
    pub quiz_id: i64,
    pub title: String,
    pub total_score: i32,
    pub attempt_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledQuiz {
    pub quiz_id: i64,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDashboard {
    pub completed_quizzes: Vec<CompletedQuiz>,
    pub active_quizzes: Vec<ScheduledQuiz>,
    pub upcoming_quizzes: Vec<ScheduledQuiz>,
    pub average_score: f64,
}

/// Completed scored attempts, the cohort's open and upcoming quizzes, and
/// the student's average score.
pub async fn get_dashboard(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let requester = claims.require_role(Role::Student)?;
    let now = Utc::now();

    let profile = store
        .users
        .find_profile(requester.user_id)
        .await?
        .ok_or(AppError::NotFound("Profile not found".to_string()))?;

    let attempts = store.attempts.list_scored_attempts_for_user(requester.user_id).await?;
    let quiz_ids: Vec<i64> = attempts.iter().map(|a| a.quiz_id).collect();
    let titles: HashMap<i64, String> = store
        .quizzes
        .find_quizzes(&quiz_ids)
        .await?
        .into_iter()
        .map(|q| (q.id, q.title))
        .collect();

    let average_score = if attempts.is_empty() {
        0.0
    } else {
        let total: i64 = attempts.iter().map(|a| i64::from(a.total_score)).sum();
        round2(total as f64 / attempts.len() as f64)
    };

    let completed_quizzes = attempts
        .into_iter()
        .filter_map(|a| {
            titles.get(&a.quiz_id).map(|title| CompletedQuiz {
                quiz_id: a.quiz_id,
                title: title.clone(),
                total_score: a.total_score,
                attempt_date: a.created_at,
            })
        })
        .collect();

    let mut active_quizzes = Vec::new();
    let mut upcoming_quizzes = Vec::new();
    for quiz in store.quizzes.list_quizzes_by_year(profile.year_of_study).await? {
        let entry = ScheduledQuiz {
            quiz_id: quiz.id,
            title: quiz.title.clone(),
            start_time: quiz.start_time,
            end_time: quiz.end_time,
        };
        match quiz.phase(now) {
            QuizPhase::Open => active_quizzes.push(entry),
            QuizPhase::NotStarted => upcoming_quizzes.push(entry),
            QuizPhase::Closed => {}
        }
    }

    Ok(Json(StudentDashboard {
        completed_quizzes,
        active_quizzes,
        upcoming_quizzes,
        average_score,
    }))
}
