//! Identity gateway: wraps the identity provider holding member credentials.
//!
//! The portal only depends on the `IdentityProvider` seam; credential storage
//! and session issuance live behind it.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use service_core::error::AppError;
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::utils::{hash_password, verify_password, Password, PasswordHashString};

use super::JwtService;

/// An authenticated caller as reported by the identity provider.
#[derive(Debug, Clone)]
pub struct Identity {
    pub identity_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
}

/// An established session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl Session {
    fn bearer(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a credential account bound to a portal user id and email.
    ///
    /// Succeeds silently when the same email+id account already exists, so a
    /// failed invitation redemption can be retried until it converges.
    async fn create_account(
        &self,
        identity_id: Uuid,
        email: &str,
        full_name: &str,
        password: &Password,
    ) -> Result<(), AppError>;

    /// Verify credentials and establish a session.
    async fn authenticate(&self, email: &str, password: &Password) -> Result<Session, AppError>;

    /// Resolve the identity behind a session token.
    async fn verify_session(&self, token: &str) -> Result<Identity, AppError>;

    /// End a session. Sessions are stateless tokens; the client discards the
    /// token and this call only records the sign-out.
    async fn end_session(&self, token: &str) -> Result<(), AppError>;

    async fn change_password(
        &self,
        identity_id: Uuid,
        current: &Password,
        new: &Password,
    ) -> Result<(), AppError>;
}

#[derive(Debug, Clone, FromRow)]
struct IdentityAccount {
    identity_id: Uuid,
    email: String,
    password_hash: String,
    full_name: Option<String>,
}

/// Identity provider backed by the `identity_accounts` table.
#[derive(Clone)]
pub struct PgIdentityProvider {
    pool: PgPool,
    jwt: JwtService,
}

impl PgIdentityProvider {
    pub fn new(pool: PgPool, jwt: JwtService) -> Self {
        Self { pool, jwt }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<IdentityAccount>, AppError> {
        sqlx::query_as::<_, IdentityAccount>(
            "SELECT * FROM identity_accounts WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn find_by_id(&self, identity_id: Uuid) -> Result<Option<IdentityAccount>, AppError> {
        sqlx::query_as::<_, IdentityAccount>(
            "SELECT * FROM identity_accounts WHERE identity_id = $1",
        )
        .bind(identity_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }
}

#[async_trait]
impl IdentityProvider for PgIdentityProvider {
    async fn create_account(
        &self,
        identity_id: Uuid,
        email: &str,
        full_name: &str,
        password: &Password,
    ) -> Result<(), AppError> {
        if let Some(account) = self.find_by_email(email).await? {
            if account.identity_id == identity_id {
                return Ok(());
            }
            return Err(AppError::Conflict(anyhow::anyhow!(
                "An account with this email already exists"
            )));
        }

        let password_hash = hash_password(password).map_err(AppError::InternalError)?;

        sqlx::query(
            r#"
            INSERT INTO identity_accounts (identity_id, email, password_hash, full_name, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(identity_id)
        .bind(email)
        .bind(password_hash.as_str())
        .bind(full_name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn authenticate(&self, email: &str, password: &Password) -> Result<Session, AppError> {
        let account = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Invalid email or password")))?;

        verify_password(
            password,
            &PasswordHashString::new(account.password_hash.clone()),
        )
        .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid email or password")))?;

        let (token, expires_in) = self
            .jwt
            .issue_session_token(
                account.identity_id,
                &account.email,
                account.full_name.as_deref(),
            )
            .map_err(AppError::InternalError)?;

        Ok(Session::bearer(token, expires_in))
    }

    async fn verify_session(&self, token: &str) -> Result<Identity, AppError> {
        let claims = self
            .jwt
            .validate_session_token(token)
            .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid or expired session")))?;

        let identity_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid session subject")))?;

        Ok(Identity {
            identity_id,
            email: claims.email,
            full_name: claims.name,
        })
    }

    async fn end_session(&self, _token: &str) -> Result<(), AppError> {
        tracing::debug!("Session ended; stateless token left to expire");
        Ok(())
    }

    async fn change_password(
        &self,
        identity_id: Uuid,
        current: &Password,
        new: &Password,
    ) -> Result<(), AppError> {
        let account = self
            .find_by_id(identity_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Account not found")))?;

        verify_password(
            current,
            &PasswordHashString::new(account.password_hash.clone()),
        )
        .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Current password is incorrect")))?;

        let password_hash = hash_password(new).map_err(AppError::InternalError)?;

        sqlx::query("UPDATE identity_accounts SET password_hash = $1 WHERE identity_id = $2")
            .bind(password_hash.as_str())
            .bind(identity_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct MemoryAccount {
    identity_id: Uuid,
    email: String,
    full_name: Option<String>,
    password_hash: String,
}

/// In-memory identity provider for the test harness.
#[derive(Clone)]
pub struct MemoryIdentityProvider {
    accounts: Arc<RwLock<HashMap<Uuid, MemoryAccount>>>,
    jwt: JwtService,
}

impl MemoryIdentityProvider {
    pub fn new(jwt: JwtService) -> Self {
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
            jwt,
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn create_account(
        &self,
        identity_id: Uuid,
        email: &str,
        full_name: &str,
        password: &Password,
    ) -> Result<(), AppError> {
        let mut accounts = self.accounts.write().await;
        if let Some(account) = accounts
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email))
        {
            if account.identity_id == identity_id {
                return Ok(());
            }
            return Err(AppError::Conflict(anyhow::anyhow!(
                "An account with this email already exists"
            )));
        }

        let password_hash = hash_password(password).map_err(AppError::InternalError)?;
        accounts.insert(
            identity_id,
            MemoryAccount {
                identity_id,
                email: email.to_string(),
                full_name: Some(full_name.to_string()),
                password_hash: password_hash.into_string(),
            },
        );
        Ok(())
    }

    async fn authenticate(&self, email: &str, password: &Password) -> Result<Session, AppError> {
        let account = self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned()
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Invalid email or password")))?;

        verify_password(
            password,
            &PasswordHashString::new(account.password_hash.clone()),
        )
        .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid email or password")))?;

        let (token, expires_in) = self
            .jwt
            .issue_session_token(
                account.identity_id,
                &account.email,
                account.full_name.as_deref(),
            )
            .map_err(AppError::InternalError)?;

        Ok(Session::bearer(token, expires_in))
    }

    async fn verify_session(&self, token: &str) -> Result<Identity, AppError> {
        let claims = self
            .jwt
            .validate_session_token(token)
            .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid or expired session")))?;

        let identity_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid session subject")))?;

        Ok(Identity {
            identity_id,
            email: claims.email,
            full_name: claims.name,
        })
    }

    async fn end_session(&self, _token: &str) -> Result<(), AppError> {
        Ok(())
    }

    async fn change_password(
        &self,
        identity_id: Uuid,
        current: &Password,
        new: &Password,
    ) -> Result<(), AppError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(&identity_id)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Account not found")))?;

        verify_password(
            current,
            &PasswordHashString::new(account.password_hash.clone()),
        )
        .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Current password is incorrect")))?;

        account.password_hash = hash_password(new).map_err(AppError::InternalError)?.into_string();
        Ok(())
    }
}
