//! PostgreSQL repository implementations.

use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::models::{
    Apology, ApologyWithOwner, DriveAccessRequest, DriveAccessRequestWithOwner, RequestStatus,
    User, UserRole,
};

use super::{ApologyRepository, DriveRequestRepository, HealthProbe, UserRepository};

/// Repository backend over a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl HealthProbe for PgStore {
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!("Database health check failed: {}", e))
            })?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn find_by_invitation_token(&self, token: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE invitation_token = $1 AND invitation_accepted = FALSE",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn insert(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                user_id, email, full_name, role, invitation_token, invitation_accepted,
                drive_access_granted, discord_username, discord_verified, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.role)
        .bind(&user.invitation_token)
        .bind(user.invitation_accepted)
        .bind(user.drive_access_granted)
        .bind(&user.discord_username)
        .bind(user.discord_verified)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn accept_invitation(&self, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET invitation_accepted = TRUE, invitation_token = NULL, updated_at = now()
            WHERE user_id = $1 AND invitation_accepted = FALSE
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_full_name(&self, user_id: Uuid, full_name: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET full_name = $1, updated_at = now() WHERE user_id = $2")
            .bind(full_name)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn set_role(&self, user_id: Uuid, role: UserRole) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET role = $1, updated_at = now() WHERE user_id = $2")
            .bind(role.as_str())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn set_drive_access(&self, user_id: Uuid, granted: bool) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE users SET drive_access_granted = $1, updated_at = now() WHERE user_id = $2",
        )
        .bind(granted)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn set_discord_username(&self, user_id: Uuid, username: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE users SET discord_username = $1, updated_at = now() WHERE user_id = $2",
        )
        .bind(username)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn set_discord_verified(&self, user_id: Uuid, verified: bool) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE users SET discord_verified = $1, updated_at = now() WHERE user_id = $2",
        )
        .bind(verified)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }
}

#[async_trait]
impl DriveRequestRepository for PgStore {
    async fn find_by_id(&self, request_id: Uuid) -> Result<Option<DriveAccessRequest>, AppError> {
        sqlx::query_as::<_, DriveAccessRequest>(
            "SELECT * FROM drive_access_requests WHERE request_id = $1",
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn find_with_owner(
        &self,
        request_id: Uuid,
    ) -> Result<Option<DriveAccessRequestWithOwner>, AppError> {
        sqlx::query_as::<_, DriveAccessRequestWithOwner>(
            r#"
            SELECT r.*, u.full_name, u.email
            FROM drive_access_requests r
            JOIN users u ON u.user_id = r.user_id
            WHERE r.request_id = $1
            "#,
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn find_pending_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<DriveAccessRequest>, AppError> {
        sqlx::query_as::<_, DriveAccessRequest>(
            "SELECT * FROM drive_access_requests WHERE user_id = $1 AND status = 'pending'",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn insert(&self, request: &DriveAccessRequest) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO drive_access_requests (
                request_id, user_id, user_email, reason, status, admin_notes,
                approved_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(request.request_id)
        .bind(request.user_id)
        .bind(&request.user_email)
        .bind(&request.reason)
        .bind(&request.status)
        .bind(&request.admin_notes)
        .bind(request.approved_by)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn transition_status(
        &self,
        request_id: Uuid,
        status: RequestStatus,
        admin_notes: Option<&str>,
        approved_by: Uuid,
    ) -> Result<Option<DriveAccessRequestWithOwner>, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE drive_access_requests
            SET status = $2, admin_notes = $3, approved_by = $4, updated_at = now()
            WHERE request_id = $1 AND status = 'pending'
            "#,
        )
        .bind(request_id)
        .bind(status.as_str())
        .bind(admin_notes)
        .bind(approved_by)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_with_owner(request_id).await
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<DriveAccessRequest>, AppError> {
        sqlx::query_as::<_, DriveAccessRequest>(
            "SELECT * FROM drive_access_requests WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn list_all(&self) -> Result<Vec<DriveAccessRequestWithOwner>, AppError> {
        sqlx::query_as::<_, DriveAccessRequestWithOwner>(
            r#"
            SELECT r.*, u.full_name, u.email
            FROM drive_access_requests r
            JOIN users u ON u.user_id = r.user_id
            ORDER BY r.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }
}

#[async_trait]
impl ApologyRepository for PgStore {
    async fn find_by_id(&self, apology_id: Uuid) -> Result<Option<Apology>, AppError> {
        sqlx::query_as::<_, Apology>("SELECT * FROM apologies WHERE apology_id = $1")
            .bind(apology_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn insert(&self, apology: &Apology) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO apologies (
                apology_id, user_id, activity_date, reason, status, admin_notes,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(apology.apology_id)
        .bind(apology.user_id)
        .bind(apology.activity_date)
        .bind(&apology.reason)
        .bind(&apology.status)
        .bind(&apology.admin_notes)
        .bind(apology.created_at)
        .bind(apology.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    async fn transition_status(
        &self,
        apology_id: Uuid,
        status: RequestStatus,
        admin_notes: Option<&str>,
    ) -> Result<Option<Apology>, AppError> {
        sqlx::query_as::<_, Apology>(
            r#"
            UPDATE apologies
            SET status = $2, admin_notes = $3, updated_at = now()
            WHERE apology_id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(apology_id)
        .bind(status.as_str())
        .bind(admin_notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Apology>, AppError> {
        sqlx::query_as::<_, Apology>(
            "SELECT * FROM apologies WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    async fn list_pending(&self) -> Result<Vec<ApologyWithOwner>, AppError> {
        sqlx::query_as::<_, ApologyWithOwner>(
            r#"
            SELECT a.*, u.full_name, u.email
            FROM apologies a
            JOIN users u ON u.user_id = a.user_id
            WHERE a.status = 'pending'
            ORDER BY a.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }
}
