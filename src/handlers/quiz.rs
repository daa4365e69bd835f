// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::{Value, json};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        attempt::{InstructorResultRow, SubmitAttemptRequest},
        quiz::{QuizPayload, QuizSummary, StatusParams},
        statistics::StatisticsParams,
        user::Role,
    },
    repositories::Store,
    services::{admission, quiz_service, statistics},
    utils::jwt::Claims,
};

/// Quizzes assigned to the student's cohort. `?status=` defaults to `active`.
pub async fn list_quizzes(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    query: Result<Query<StatusParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = query?;
    let requester = claims.require_role(Role::Student)?;
    let quizzes = quiz_service::assigned_quizzes(&store, &requester, params.status, Utc::now()).await?;
    Ok(Json(quizzes))
}

pub async fn create_quiz(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<QuizPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let requester = claims.require_role(Role::Instructor)?;
    let Json(payload) = payload?;
    payload.validate()?;

    let quiz = quiz_service::create_quiz(&store, &requester, payload).await?;
    Ok((StatusCode::CREATED, Json(QuizSummary::from(&quiz))))
}

/// Quiz for a student about to attempt it. Correct answers are not included.
pub async fn get_quiz(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let requester = claims.require_role(Role::Student)?;
    let quiz = quiz_service::quiz_for_student(&store, &requester, id, Utc::now()).await?;
    Ok(Json(quiz))
}

pub async fn update_quiz(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<QuizPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let requester = claims.require_role(Role::Instructor)?;
    let Json(payload) = payload?;
    payload.validate()?;

    let quiz = quiz_service::update_quiz(&store, &requester, id, payload, Utc::now()).await?;
    Ok(Json(QuizSummary::from(&quiz)))
}

pub async fn delete_quiz(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let requester = claims.require_role(Role::Instructor)?;
    quiz_service::delete_quiz(&store, &requester, id, Utc::now()).await?;
    Ok(Json(json!({ "message": "Quiz deleted" })))
}

pub async fn get_quiz_for_edit(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let requester = claims.require_role(Role::Instructor)?;
    let quiz = quiz_service::quiz_for_edit(&store, &requester, id).await?;
    Ok(Json(quiz))
}

/// Submits answers. Returns 201 with the awarded score.
pub async fn submit_attempt(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<SubmitAttemptRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let requester = claims.require_role(Role::Student)?;
    let Json(payload) = payload?;
    payload.validate()?;

    let receipt = admission::submit_attempt(&store, &requester, id, &payload.answers, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn get_results(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let requester = claims.require_role(Role::Student)?;
    let results = admission::attempt_results(&store, &requester, id, Utc::now()).await?;
    Ok(Json(results))
}

/// Cached statistics; `?refresh=true` recomputes them.
pub async fn get_statistics(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<StatisticsParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let Query(params) = query?;
    let requester = claims.require_role(Role::Instructor)?;
    let stats = statistics::get_statistics(&store, &requester, id, params.force_refresh(), Utc::now()).await?;
    Ok(Json(stats))
}

/// One row per scored attempt, for the quiz's instructor.
pub async fn results_for_instructor(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let requester = claims.require_role(Role::Instructor)?;

    let quiz = store
        .quizzes
        .find_quiz(id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;
    if quiz.instructor_id != requester.user_id {
        return Err(AppError::Forbidden(
            "Not authorized to view this quiz".to_string(),
        ));
    }

    let attempts = store.attempts.list_scored_attempts_for_quiz(id).await?;
    let user_ids: Vec<i64> = attempts.iter().map(|a| a.user_id).collect();
    let profiles = store.users.find_profiles(&user_ids).await?;

    let rows: Vec<InstructorResultRow> = attempts
        .into_iter()
        .map(|attempt| {
            let profile = profiles.get(&attempt.user_id);
            InstructorResultRow {
                usn: profile
                    .map(|p| p.roll_number.clone())
                    .unwrap_or_else(|| "N/A".to_string()),
                student_name: profile
                    .map(|p| p.full_name())
                    .unwrap_or_else(|| "N/A".to_string()),
                score: attempt.total_score,
                year_of_study: profile
                    .map(|p| Value::from(p.year_of_study))
                    .unwrap_or_else(|| Value::from("N/A")),
                attempt_date: attempt.created_at,
            }
        })
        .collect();

    Ok(Json(rows))
}
