// src/handlers/admin.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::AppError,
    handlers::student::CompletedQuiz,
    models::{
        quiz::QuizPhase,
        user::{Role, User},
    },
    repositories::Store,
    services::statistics::round2,
    utils::jwt::Claims,
};

#[derive(Debug, Deserialize)]
pub struct UserListParams {
    pub role: Option<Role>,
}

/// Lists users, optionally filtered by `?role=`.
/// Admin only.
pub async fn list_users(
    State(store): State<Store>,
    query: Result<Query<UserListParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = query?;
    let users = store.users.list_users(params.role).await?;
    Ok(Json(users))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccess {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
    pub is_approved: Option<bool>,
}

impl From<User> for UserAccess {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
            role: user.role,
            is_approved: user.is_approved,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRequest {
    pub is_approved: bool,
}

/// Approves or un-approves an instructor.
pub async fn approve_instructor(
    State(store): State<Store>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ApproveRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let Json(payload) = payload?;

    let user = store
        .users
        .find_user(id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;
    if user.role != Role::Instructor {
        return Err(AppError::BadRequest("User is not an instructor".to_string()));
    }

    let user = store
        .users
        .set_approval(id, payload.is_approved)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = id, is_approved = payload.is_approved, "Instructor approval changed");
    Ok(Json(UserAccess::from(user)))
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

/// Changes a user's role. Moving to Instructor resets approval.
pub async fn change_role(
    State(store): State<Store>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ChangeRoleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let Json(payload) = payload?;

    let user = store
        .users
        .set_role(id, payload.role, payload.role.initial_approval())
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = id, role = %payload.role, "User role changed");
    Ok(Json(UserAccess::from(user)))
}

/// Deletes a user and everything they own.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let requester = claims.requester()?;
    if requester.user_id == id {
        return Err(AppError::BadRequest(
            "Cannot delete your own account".to_string(),
        ));
    }

    if !store.users.delete_user(id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = id, admin_id = requester.user_id, "User deleted");
    Ok(Json(json!({ "message": "User deleted" })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInfo {
    pub user_id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub year_of_study: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProgress {
    pub student: StudentInfo,
    pub attempts: Vec<CompletedQuiz>,
    pub average_score: f64,
    pub total_quizzes_attempted: usize,
}

pub async fn student_progress(
    State(store): State<Store>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let user = store
        .users
        .find_user(id)
        .await?
        .filter(|u| u.role == Role::Student)
        .ok_or(AppError::NotFound("Student not found".to_string()))?;
    let profile = store
        .users
        .find_profile(id)
        .await?
        .ok_or(AppError::NotFound("Profile not found".to_string()))?;

    let attempts = store.attempts.list_scored_attempts_for_user(id).await?;
    let quiz_ids: Vec<i64> = attempts.iter().map(|a| a.quiz_id).collect();
    let titles: HashMap<i64, String> = store
        .quizzes
        .find_quizzes(&quiz_ids)
        .await?
        .into_iter()
        .map(|q| (q.id, q.title))
        .collect();

    let total_quizzes_attempted = attempts.len();
    let average_score = if attempts.is_empty() {
        0.0
    } else {
        let total: i64 = attempts.iter().map(|a| i64::from(a.total_score)).sum();
        round2(total as f64 / total_quizzes_attempted as f64)
    };

    let attempts = attempts
        .into_iter()
        .map(|a| CompletedQuiz {
            title: titles.get(&a.quiz_id).cloned().unwrap_or_default(),
            quiz_id: a.quiz_id,
            total_score: a.total_score,
            attempt_date: a.created_at,
        })
        .collect();

    Ok(Json(StudentProgress {
        student: StudentInfo {
            user_id: user.id,
            email: user.email,
            first_name: profile.first_name,
            last_name: profile.last_name,
            year_of_study: profile.year_of_study,
        },
        attempts,
        average_score,
        total_quizzes_attempted,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructorDetail {
    pub id: i64,
    pub email: String,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDetail {
    pub id: i64,
    pub email: String,
    pub year_of_study: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStatistics {
    pub total_users: i64,
    pub student_count: i64,
    pub instructor_count: i64,
    pub admin_count: i64,
    pub total_quizzes: i64,
    pub active_quizzes: i64,
    pub total_completions: i64,
    pub average_score: f64,
    pub instructor_details: Vec<InstructorDetail>,
    pub student_details: Vec<StudentDetail>,
}

/// Platform-wide counts. The average score is taken over the cached
/// per-quiz statistics.
pub async fn platform_statistics(State(store): State<Store>) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();

    let instructors = store.users.list_users(Some(Role::Instructor)).await?;
    let students = store.users.list_users(Some(Role::Student)).await?;
    let admin_count = store.users.count_users(Some(Role::Admin)).await?;

    let student_ids: Vec<i64> = students.iter().map(|u| u.id).collect();
    let profiles = store.users.find_profiles(&student_ids).await?;

    let quizzes = store.quizzes.list_all_quizzes().await?;
    let active_quizzes = quizzes
        .iter()
        .filter(|q| q.phase(now) == QuizPhase::Open)
        .count() as i64;

    let stats = store.statistics.list_statistics(None).await?;
    let average_score = if stats.is_empty() {
        0.0
    } else {
        round2(stats.iter().map(|s| s.average_score).sum::<f64>() / stats.len() as f64)
    };

    Ok(Json(PlatformStatistics {
        total_users: students.len() as i64 + instructors.len() as i64 + admin_count,
        student_count: students.len() as i64,
        instructor_count: instructors.len() as i64,
        admin_count,
        total_quizzes: quizzes.len() as i64,
        active_quizzes,
        total_completions: store.attempts.count_all_scored_attempts().await?,
        average_score,
        instructor_details: instructors
            .into_iter()
            .map(|u| InstructorDetail {
                id: u.id,
                email: u.email,
                status: if u.is_approved == Some(true) {
                    "approved"
                } else {
                    "Not approved"
                },
            })
            .collect(),
        student_details: students
            .into_iter()
            .map(|u| StudentDetail {
                year_of_study: profiles.get(&u.id).map(|p| p.year_of_study),
                id: u.id,
                email: u.email,
            })
            .collect(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalNotification {
    pub user_id: i64,
    pub email: String,
    pub requested_role: Role,
    pub created_at: DateTime<Utc>,
}

/// Instructors waiting for approval.
pub async fn pending_instructors(State(store): State<Store>) -> Result<impl IntoResponse, AppError> {
    let notifications: Vec<ApprovalNotification> = store
        .users
        .list_users(Some(Role::Instructor))
        .await?
        .into_iter()
        .filter(|u| u.is_approved == Some(false))
        .map(|u| ApprovalNotification {
            user_id: u.id,
            email: u.email,
            requested_role: Role::Instructor,
            created_at: u.created_at,
        })
        .collect();

    Ok(Json(notifications))
}
