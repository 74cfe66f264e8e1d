use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::{
    models::{User, UserRole},
    services::Identity,
    AppState,
};

/// Middleware gating admin-only routes.
///
/// Runs after `auth_middleware`; routes the caller through the authorization
/// guard and stores the resolved admin profile in request extensions. No
/// handler behind this layer executes for a non-admin caller.
pub async fn admin_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = req
        .extensions()
        .get::<Identity>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Authentication required")))?;

    let admin = state.authz.require_role(&identity, UserRole::Admin).await?;

    req.extensions_mut().insert(admin);

    Ok(next.run(req).await)
}

/// Extractor for the acting admin in handlers behind the admin gate.
pub struct CurrentAdmin(pub User);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let admin = parts.extensions.get::<User>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Admin profile missing from request extensions"
            ))
        })?;

        Ok(CurrentAdmin(admin.clone()))
    }
}
