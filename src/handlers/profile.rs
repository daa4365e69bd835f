// src/handlers/profile.rs

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::{profile::ProfileRequest, user::UserSummary},
    repositories::Store,
    utils::jwt::Claims,
};

/// Current user and their profile (`null` until one is saved).
pub async fn get_profile(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let requester = claims.requester()?;

    let user = store
        .users
        .find_user(requester.user_id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;
    let profile = store.users.find_profile(requester.user_id).await?;

    Ok(Json(json!({
        "user": UserSummary::from(&user),
        "profile": profile,
    })))
}

/// Creates or replaces the caller's profile.
pub async fn update_profile(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<ProfileRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let requester = claims.requester()?;
    let Json(payload) = payload?;
    let payload = payload.trimmed();
    payload.validate()?;

    if store.users.find_user(requester.user_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let profile = store.users.upsert_profile(requester.user_id, payload).await?;

    Ok(Json(json!({ "profile": profile })))
}

/// Public user count.
pub async fn count_users(State(store): State<Store>) -> Result<impl IntoResponse, AppError> {
    let total = store.users.count_users(None).await?;
    Ok(Json(json!({ "totalUsers": total })))
}
