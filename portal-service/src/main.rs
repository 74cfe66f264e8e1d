use portal_service::{
    build_router,
    config::PortalConfig,
    db,
    repositories::PgStore,
    services::{
        AccessRequestService, AuthzService, DiscordVerifier, InvitationService, JwtService,
        Notifier, PgIdentityProvider, ProfileResolver,
    },
    AppState,
};
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use service_core::observability::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = PortalConfig::from_env()?;

    // Initialize tracing/logging using shared logic
    init_tracing(&config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting portal service"
    );

    // Initialize database connection
    tracing::info!("Initializing database connection");
    let pool = db::create_pool(&config.database)
        .await
        .map_err(|e| service_core::error::AppError::DatabaseError(anyhow::anyhow!(e)))?;

    db::run_migrations(&pool)
        .await
        .map_err(|e| service_core::error::AppError::DatabaseError(anyhow::anyhow!(e)))?;
    tracing::info!("Database initialized successfully");

    let store = Arc::new(PgStore::new(pool.clone()));

    // Initialize JWT service
    let jwt = JwtService::new(&config.jwt)?;
    tracing::info!("JWT service initialized");

    // Identity provider backed by the identity_accounts table
    let identity = Arc::new(PgIdentityProvider::new(pool, jwt));

    // Notification sink worker
    let shutdown_token = CancellationToken::new();
    let notifier = Notifier::spawn(config.notifier.clone(), shutdown_token.clone());
    tracing::info!("Notification worker initialized");

    // Initialize rate limiters using shared logic
    let login_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.login_attempts,
        config.rate_limit.login_window_seconds,
    );
    let ip_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.global_ip_limit,
        config.rate_limit.global_ip_window_seconds,
    );
    tracing::info!("Rate limiters initialized: Login and Global IP");

    // Initialize services
    let profiles = ProfileResolver::new(store.clone());
    let authz = AuthzService::new(profiles.clone());
    let invitations = InvitationService::new(
        store.clone(),
        identity.clone(),
        config.invitations.base_url.clone(),
    );
    let requests =
        AccessRequestService::new(store.clone(), store.clone(), store.clone(), notifier);
    let discord = DiscordVerifier::new(config.discord.clone());

    // Create application state
    let state = AppState {
        config: config.clone(),
        store_health: store.clone(),
        users: store,
        identity,
        profiles,
        authz,
        invitations,
        requests,
        discord,
        login_rate_limiter,
        ip_rate_limiter,
    };

    // Build application router
    let app = build_router(state).await?;

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    shutdown_token.cancel();
    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
