//! Invitation handlers: creation (admin), details lookup, redemption.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use service_core::error::AppError;
use validator::Validate;

use crate::{
    middleware::CurrentAdmin,
    models::UserResponse,
    services::InvitationDetails,
    utils::ValidatedJson,
    AppState,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitationRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitationResponse {
    pub user: UserResponse,
    pub invite_token: String,
    pub invite_url: String,
}

/// Create a new invitation.
///
/// POST /admin/invitations
pub async fn create_invitation(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    ValidatedJson(req): ValidatedJson<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<CreateInvitationResponse>), AppError> {
    let created = state.invitations.create(&req.email, &req.full_name).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateInvitationResponse {
            user: created.user.sanitized(),
            invite_token: created.token,
            invite_url: created.invite_url,
        }),
    ))
}

/// Look up an unredeemed invitation for the activation page.
///
/// GET /invitations/{token}
pub async fn get_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<InvitationDetails>, AppError> {
    let details = state.invitations.details(&token).await?;
    Ok(Json(details))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RedeemInvitationRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
    pub password: String,
    pub confirm_password: String,
}

/// Redeem an invitation token and activate the account.
///
/// POST /invitations/redeem
pub async fn redeem_invitation(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RedeemInvitationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .invitations
        .redeem(&req.token, &req.password, &req.confirm_password)
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "user": user.sanitized() })),
    ))
}
