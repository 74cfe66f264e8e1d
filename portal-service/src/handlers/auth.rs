//! Sign-in, sign-out and current-profile handlers.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use service_core::error::AppError;
use validator::Validate;

use crate::{
    middleware::CurrentIdentity,
    utils::{Password, ValidatedJson},
    AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login with email and password.
///
/// POST /auth/login
///
/// First authenticated access lazily provisions the caller's profile row.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .identity
        .authenticate(&req.email, &Password::new(req.password))
        .await?;

    let identity = state.identity.verify_session(&session.access_token).await?;
    let user = state.profiles.resolve(&identity).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "user": user.sanitized(),
            "session": session,
        })),
    ))
}

/// End the current session.
///
/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    _caller: CurrentIdentity,
) -> Result<impl IntoResponse, AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or_default();

    state.identity.end_session(token).await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Signed out successfully" })),
    ))
}

/// Current caller's profile.
///
/// GET /auth/me
pub async fn me(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<impl IntoResponse, AppError> {
    let user = state.profiles.resolve(&identity).await?;
    Ok(Json(user.sanitized()))
}
