//! Drive access request handlers.

use axum::{extract::State, response::IntoResponse, Json};
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
pub struct SubmitDriveRequest {
    pub user_id: Uuid,
    #[validate(email)]
    pub user_email: String,
    #[validate(length(min = 1, message = "Reason is required"))]
    pub reason: String,
}

/// Submit a drive access request.
///
/// POST /drive-access/request
pub async fn submit_request(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    ValidatedJson(req): ValidatedJson<SubmitDriveRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.user_id != identity.identity_id {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Cannot submit a request for another user"
        )));
    }

    // Make sure the profile row exists before the request references it.
    state.profiles.resolve(&identity).await?;

    let request = state
        .requests
        .submit_drive_request(req.user_id, &req.user_email, &req.reason)
        .await?;

    Ok(Json(json!({ "success": true, "request": request })))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DecideDriveRequest {
    pub request_id: Uuid,
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
    pub admin_notes: Option<String>,
    /// Retained for wire compatibility; the recorded approver is always the
    /// authenticated admin.
    pub admin_id: Uuid,
}

/// Decide a pending drive access request.
///
/// POST /drive-access/decide
pub async fn decide_request(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    ValidatedJson(req): ValidatedJson<DecideDriveRequest>,
) -> Result<impl IntoResponse, AppError> {
    let decided = state
        .requests
        .decide_drive_request(
            req.request_id,
            &req.status,
            req.admin_notes.as_deref(),
            &admin,
        )
        .await?;

    Ok(Json(json!({ "success": true, "request": decided })))
}

/// The caller's own requests, newest first.
///
/// GET /drive-access/requests/me
pub async fn list_my_requests(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<impl IntoResponse, AppError> {
    let requests = state
        .requests
        .list_drive_requests_for_user(identity.identity_id)
        .await?;
    Ok(Json(requests))
}

/// All requests with their owners, newest first.
///
/// GET /admin/drive-access/requests
pub async fn list_all_requests(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> Result<impl IntoResponse, AppError> {
    let requests = state.requests.list_all_drive_requests().await?;
    Ok(Json(requests))
}
