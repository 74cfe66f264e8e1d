//! Test helper module for portal-service integration tests.
//!
//! Spins the router up over the in-memory store and identity provider, with
//! notifications captured on a channel instead of a webhook.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use portal_service::{
    build_router,
    config::{
        DatabaseConfig, DiscordConfig, Environment, InvitationConfig, JwtConfig, NotifierConfig,
        PortalConfig, RateLimitConfig, SecurityConfig,
    },
    models::{User, UserRole},
    repositories::{MemoryStore, UserRepository},
    services::{
        AccessRequestService, AuthzService, DiscordVerifier, IdentityProvider, InvitationService,
        JwtService, MemoryIdentityProvider, Notifier, PortalEvent, ProfileResolver,
    },
    utils::Password,
    AppState,
};
use serde_json::Value;
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::util::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Test application routing requests through the full middleware stack.
pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub identity: Arc<MemoryIdentityProvider>,
    pub events: mpsc::Receiver<PortalEvent>,
}

fn test_config() -> PortalConfig {
    PortalConfig {
        common: service_core::config::Config { port: 8080 },
        environment: Environment::Dev,
        service_name: "portal-service".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            session_expiry_hours: 12,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        invitations: InvitationConfig {
            base_url: "http://localhost:3000".to_string(),
        },
        notifier: NotifierConfig {
            webhook_url: None,
            queue_size: 16,
            timeout_seconds: 1,
            retry_max_elapsed_seconds: 1,
            footer: "Portal Admin Panel".to_string(),
        },
        discord: DiscordConfig {
            role_endpoint: None,
            role_token: None,
        },
        rate_limit: RateLimitConfig {
            login_attempts: 100,
            login_window_seconds: 60,
            global_ip_limit: 1000,
            global_ip_window_seconds: 60,
        },
    }
}

impl TestApp {
    /// Spawn the test application over in-memory backends.
    pub async fn spawn() -> Self {
        let config = test_config();

        let store = Arc::new(MemoryStore::new());
        let jwt = JwtService::new(&config.jwt).expect("Failed to create JWT service");
        let identity = Arc::new(MemoryIdentityProvider::new(jwt));
        let (notifier, events) = Notifier::capture(config.notifier.queue_size);

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

        let state = AppState {
            config: config.clone(),
            store_health: store.clone(),
            users: store.clone(),
            identity: identity.clone(),
            profiles,
            authz,
            invitations,
            requests,
            discord,
            login_rate_limiter: create_ip_rate_limiter(
                config.rate_limit.login_attempts,
                config.rate_limit.login_window_seconds,
            ),
            ip_rate_limiter: create_ip_rate_limiter(
                config.rate_limit.global_ip_limit,
                config.rate_limit.global_ip_window_seconds,
            ),
        };

        let app = build_router(state).await.expect("Failed to build router");

        Self {
            app,
            store,
            identity,
            events,
        }
    }

    /// Seed an active user together with its identity account.
    pub async fn seed_user(&self, email: &str, name: &str, role: UserRole, password: &str) -> User {
        let user_id = Uuid::new_v4();
        let mut user = User::provisioned(user_id, email.to_string(), name.to_string());
        user.role = role.as_str().to_string();

        UserRepository::insert(self.store.as_ref(), &user)
            .await
            .expect("Failed to seed user");
        self.identity
            .create_account(user_id, email, name, &Password::new(password.to_string()))
            .await
            .expect("Failed to seed identity account");

        user
    }

    /// Log in and return the bearer token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .post(
                "/auth/login",
                serde_json::json!({ "email": email, "password": password }),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["session"]["access_token"]
            .as_str()
            .expect("missing access token")
            .to_string()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None, token).await
    }

    pub async fn post(&self, uri: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body), token).await
    }

    pub async fn patch(&self, uri: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(body), token).await
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, value)
    }
}
