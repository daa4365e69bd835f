// src/handlers/instructor.rs

use axum::{
    Extension, Json,
    extract::{Query, State, rejection::QueryRejection},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;

use crate::{
    error::AppError,
    handlers::student::ScheduledQuiz,
    models::{
        quiz::{QuizPhase, StatusParams},
        user::Role,
    },
    repositories::Store,
    services::{quiz_service, statistics::round2},
    utils::jwt::Claims,
};

/// The instructor's quizzes with scored-attempt counts. `?status=` defaults to `all`.
pub async fn list_quizzes(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    query: Result<Query<StatusParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = query?;
    let requester = claims.require_role(Role::Instructor)?;
    let quizzes = quiz_service::instructor_quizzes(&store, &requester, params.status, Utc::now()).await?;
    Ok(Json(quizzes))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructorDashboard {
    pub total_quizzes: i64,
    pub active_quizzes: Vec<ScheduledQuiz>,
    pub average_attempts_per_quiz: f64,
    pub average_score_across_quizzes: f64,
}

/// Aggregated from the cached statistics rows; quizzes whose statistics were
/// never requested do not contribute attempts.
pub async fn get_dashboard(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let requester = claims.require_role(Role::Instructor)?;
    let now = Utc::now();

    let quizzes = store.quizzes.list_quizzes_by_instructor(requester.user_id).await?;
    let quiz_ids: Vec<i64> = quizzes.iter().map(|q| q.id).collect();
    let stats = store.statistics.list_statistics(Some(&quiz_ids)).await?;

    let total_quizzes = quizzes.len() as i64;
    let total_attempts: i64 = stats.iter().map(|s| s.total_attempts).sum();

    let average_attempts_per_quiz = if total_quizzes == 0 {
        0.0
    } else {
        round2(total_attempts as f64 / total_quizzes as f64)
    };
    let average_score_across_quizzes = if stats.is_empty() {
        0.0
    } else {
        round2(stats.iter().map(|s| s.average_score).sum::<f64>() / stats.len() as f64)
    };

    let active_quizzes = quizzes
        .into_iter()
        .filter(|q| q.phase(now) == QuizPhase::Open)
        .map(|q| ScheduledQuiz {
            quiz_id: q.id,
            title: q.title,
            start_time: q.start_time,
            end_time: q.end_time,
        })
        .collect();

    Ok(Json(InstructorDashboard {
        total_quizzes,
        active_quizzes,
        average_attempts_per_quiz,
        average_score_across_quizzes,
    }))
}
