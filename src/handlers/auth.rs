// src/handlers/auth.rs

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, NewUser, RegisterRequest, Role, UserSummary},
    repositories::Store,
    utils::{
        hash::{hash_password_async, verify_password_async},
        jwt::sign_jwt,
    },
};

/// Registers a new student or instructor.
///
/// Instructors start unapproved. Returns 201 with the new user's id.
pub async fn register(
    State(store): State<Store>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let role = payload.role.unwrap_or(Role::Student);
    if role == Role::Admin {
        return Err(AppError::BadRequest("Invalid role".to_string()));
    }

    let email = payload.email.trim().to_lowercase();
    if store.users.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::BadRequest("Email already exists".to_string()));
    }

    let password_hash = hash_password_async(payload.password).await?;

    let user = store
        .users
        .create_user(NewUser {
            email,
            password_hash,
            role,
            is_approved: role.initial_approval(),
        })
        .await?;

    tracing::info!(user_id = user.id, role = %user.role, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "userId": user.id,
            "email": user.email,
            "role": user.role,
        })),
    ))
}

/// Authenticates a user and returns a JWT token.
pub async fn login(
    State(store): State<Store>,
    State(config): State<Config>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let email = payload.email.trim().to_lowercase();
    let user = store
        .users
        .find_user_by_email(&email)
        .await?
        .ok_or(AppError::AuthError("Invalid credentials".to_string()))?;

    if !verify_password_async(payload.password, user.password.clone()).await? {
        tracing::debug!(user_id = user.id, "Login rejected");
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    let token = sign_jwt(user.id, user.role, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "token": token,
        "user": UserSummary::from(&user),
    })))
}
