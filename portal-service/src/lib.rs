pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;

use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::rate_limit::{ip_rate_limit_middleware, IpRateLimiter};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::PortalConfig;
use crate::repositories::{HealthProbe, UserRepository};
use crate::services::{
    AccessRequestService, AuthzService, DiscordVerifier, IdentityProvider, InvitationService,
    ProfileResolver,
};

#[derive(Clone)]
pub struct AppState {
    pub config: PortalConfig,
    pub store_health: Arc<dyn HealthProbe>,
    pub users: Arc<dyn UserRepository>,
    pub identity: Arc<dyn IdentityProvider>,
    pub profiles: ProfileResolver,
    pub authz: AuthzService,
    pub invitations: InvitationService,
    pub requests: AccessRequestService,
    pub discord: DiscordVerifier,
    pub login_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    // Admin routes: auth, then the role gate, then the handler.
    let admin_routes = Router::new()
        .route(
            "/drive-access/decide",
            post(handlers::drive_access::decide_request),
        )
        .route(
            "/admin/drive-access/requests",
            get(handlers::drive_access::list_all_requests),
        )
        .route("/apologies/decide", post(handlers::apologies::decide_apology))
        .route(
            "/admin/apologies",
            get(handlers::apologies::list_pending_apologies),
        )
        .route(
            "/admin/invitations",
            post(handlers::invitations::create_invitation),
        )
        .route("/admin/users", get(handlers::users::list_users))
        .route(
            "/admin/users/:user_id/role",
            patch(handlers::users::update_role),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::admin_middleware,
        ))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    // Routes for any authenticated member.
    let member_routes = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me))
        .route(
            "/drive-access/request",
            post(handlers::drive_access::submit_request),
        )
        .route(
            "/drive-access/requests/me",
            get(handlers::drive_access::list_my_requests),
        )
        .route("/apologies", post(handlers::apologies::submit_apology))
        .route("/apologies/me", get(handlers::apologies::list_my_apologies))
        .route("/users/me", patch(handlers::users::update_me))
        .route("/users/me/password", post(handlers::users::change_password))
        .route("/users/me/discord", post(handlers::users::verify_discord))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    // Login gets its own tighter rate limit.
    let login_limiter = state.login_rate_limiter.clone();
    let login_route = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(login_limiter, ip_rate_limit_middleware));

    let ip_limiter = state.ip_rate_limiter.clone();

    let app = Router::new()
        .route("/health", get(health_check))
        .route(
            "/invitations/:token",
            get(handlers::invitations::get_invitation),
        )
        .route(
            "/invitations/redeem",
            post(handlers::invitations::redeem_invitation),
        )
        .merge(login_route)
        .merge(member_routes)
        .merge(admin_routes)
        .with_state(state.clone())
        // Global IP rate limiting
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        // Add tracing layer
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        // Add CORS layer
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .map(|o| {
                            o.parse::<axum::http::HeaderValue>().unwrap_or_else(|e| {
                                tracing::error!(
                                    "Invalid CORS origin '{}': {}. Using fallback.",
                                    o,
                                    e
                                );
                                axum::http::HeaderValue::from_static("*")
                            })
                        })
                        .collect::<Vec<axum::http::HeaderValue>>(),
                )
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PATCH,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                ]),
        );

    Ok(app)
}

/// Service health check
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store_health.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Store health check failed");
        e
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "store": "up"
        }
    })))
}
