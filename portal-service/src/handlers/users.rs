//! Profile self-service and admin user management handlers.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use service_core::error::AppError;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::{
    middleware::{CurrentAdmin, CurrentIdentity},
    models::{UserResponse, UserRole},
    utils::{Password, ValidatedJson},
    AppState,
};

/// All users, newest first.
///
/// GET /admin/users
pub async fn list_users(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> Result<impl IntoResponse, AppError> {
    let users = state.users.list_all().await?;
    let sanitized: Vec<UserResponse> = users.into_iter().map(|u| u.sanitized()).collect();
    Ok(Json(sanitized))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
}

/// Update the caller's own profile.
///
/// PATCH /users/me
pub async fn update_me(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.profiles.resolve(&identity).await?;
    state
        .users
        .update_full_name(user.user_id, req.full_name.trim())
        .await?;

    let updated = state
        .users
        .find_by_id(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;
    Ok(Json(updated.sanitized()))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub new_password: String,
}

/// Change the caller's password through the identity provider.
///
/// POST /users/me/password
pub async fn change_password(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .identity
        .change_password(
            identity.identity_id,
            &Password::new(req.current_password),
            &Password::new(req.new_password),
        )
        .await?;

    Ok(Json(json!({ "message": "Password updated successfully" })))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyDiscordRequest {
    #[validate(length(min = 1, message = "Discord username is required"))]
    pub discord_username: String,
}

/// Store the caller's Discord handle and verify it with the role service.
///
/// POST /users/me/discord
pub async fn verify_discord(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    ValidatedJson(req): ValidatedJson<VerifyDiscordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.profiles.resolve(&identity).await?;
    let username = req.discord_username.trim();

    state
        .users
        .set_discord_username(user.user_id, username)
        .await?;

    // Verified only after the external role assignment succeeds.
    state.discord.assign_member_role(username).await?;
    state.users.set_discord_verified(user.user_id, true).await?;

    let updated = state
        .users
        .find_by_id(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;
    Ok(Json(updated.sanitized()))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1, message = "Role is required"))]
    pub role: String,
}

/// Change a user's role.
///
/// PATCH /admin/users/{user_id}/role
pub async fn update_role(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(user_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role = UserRole::from_str(&req.role)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

    state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    state.users.set_role(user_id, role).await?;

    let updated = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;
    Ok(Json(updated.sanitized()))
}
