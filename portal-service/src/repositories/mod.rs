//! Repository seams over the relational store.
//!
//! All shared mutable state (users, drive access requests, apologies) is
//! reached through these traits; the Postgres implementation hardens status
//! transitions with conditional updates, the in-memory implementation backs
//! the test harness.

use async_trait::async_trait;
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{
    Apology, ApologyWithOwner, DriveAccessRequest, DriveAccessRequestWithOwner, RequestStatus,
    User, UserRole,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Invitation lookup only matches rows that have not been activated yet.
    async fn find_by_invitation_token(&self, token: &str) -> Result<Option<User>, AppError>;

    async fn insert(&self, user: &User) -> Result<(), AppError>;

    /// All users, newest first.
    async fn list_all(&self) -> Result<Vec<User>, AppError>;

    /// Flip `invitation_accepted` and clear the token in one conditional
    /// update. Returns false when no un-activated row matched.
    async fn accept_invitation(&self, user_id: Uuid) -> Result<bool, AppError>;

    async fn update_full_name(&self, user_id: Uuid, full_name: &str) -> Result<(), AppError>;

    async fn set_role(&self, user_id: Uuid, role: UserRole) -> Result<(), AppError>;

    async fn set_drive_access(&self, user_id: Uuid, granted: bool) -> Result<(), AppError>;

    async fn set_discord_username(&self, user_id: Uuid, username: &str) -> Result<(), AppError>;

    async fn set_discord_verified(&self, user_id: Uuid, verified: bool) -> Result<(), AppError>;
}

#[async_trait]
pub trait DriveRequestRepository: Send + Sync {
    async fn find_by_id(&self, request_id: Uuid) -> Result<Option<DriveAccessRequest>, AppError>;

    async fn find_with_owner(
        &self,
        request_id: Uuid,
    ) -> Result<Option<DriveAccessRequestWithOwner>, AppError>;

    async fn find_pending_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<DriveAccessRequest>, AppError>;

    async fn insert(&self, request: &DriveAccessRequest) -> Result<(), AppError>;

    /// Conditional transition out of `pending`. Returns the joined row when
    /// the update applied, `None` when the request was already terminal.
    async fn transition_status(
        &self,
        request_id: Uuid,
        status: RequestStatus,
        admin_notes: Option<&str>,
        approved_by: Uuid,
    ) -> Result<Option<DriveAccessRequestWithOwner>, AppError>;

    /// Requests owned by a user, newest first.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<DriveAccessRequest>, AppError>;

    /// All requests with their owners, newest first.
    async fn list_all(&self) -> Result<Vec<DriveAccessRequestWithOwner>, AppError>;
}

#[async_trait]
pub trait ApologyRepository: Send + Sync {
    async fn find_by_id(&self, apology_id: Uuid) -> Result<Option<Apology>, AppError>;

    async fn insert(&self, apology: &Apology) -> Result<(), AppError>;

    /// Conditional transition out of `pending`. Returns the updated row when
    /// the update applied, `None` when the apology was already terminal.
    async fn transition_status(
        &self,
        apology_id: Uuid,
        status: RequestStatus,
        admin_notes: Option<&str>,
    ) -> Result<Option<Apology>, AppError>;

    /// Apologies owned by a user, newest first.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Apology>, AppError>;

    /// Pending apologies with their owners, newest first.
    async fn list_pending(&self) -> Result<Vec<ApologyWithOwner>, AppError>;
}

/// Liveness probe for the backing store.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;
}
