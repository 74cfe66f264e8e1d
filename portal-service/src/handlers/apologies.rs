//! Apology handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    middleware::{CurrentAdmin, CurrentIdentity},
    utils::ValidatedJson,
    AppState,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApologyRequest {
    pub activity_date: NaiveDate,
    #[validate(length(min = 1, message = "Reason is required"))]
    pub reason: String,
}

/// Submit an absence apology.
///
/// POST /apologies
pub async fn submit_apology(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    ValidatedJson(req): ValidatedJson<SubmitApologyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.profiles.resolve(&identity).await?;

    let apology = state
        .requests
        .submit_apology(user.user_id, req.activity_date, &req.reason)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "apology": apology })),
    ))
}

/// The caller's own apologies, newest first.
///
/// GET /apologies/me
pub async fn list_my_apologies(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<impl IntoResponse, AppError> {
    let apologies = state
        .requests
        .list_apologies_for_user(identity.identity_id)
        .await?;
    Ok(Json(apologies))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DecideApologyRequest {
    pub apology_id: Uuid,
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
    pub admin_notes: Option<String>,
}

/// Decide a pending apology. Notes stay optional, even for rejection.
///
/// POST /apologies/decide
pub async fn decide_apology(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    ValidatedJson(req): ValidatedJson<DecideApologyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let apology = state
        .requests
        .decide_apology(req.apology_id, &req.status, req.admin_notes.as_deref())
        .await?;

    Ok(Json(json!({ "success": true, "apology": apology })))
}

/// Pending apologies with their owners, newest first.
///
/// GET /admin/apologies
pub async fn list_pending_apologies(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> Result<impl IntoResponse, AppError> {
    let apologies = state.requests.list_pending_apologies().await?;
    Ok(Json(apologies))
}
