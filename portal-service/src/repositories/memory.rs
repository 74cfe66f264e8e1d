//! In-memory repository backend.
//!
//! Backs the integration test harness; mirrors the conditional-update
//! semantics of the Postgres backend.

use async_trait::async_trait;
use chrono::Utc;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    Apology, ApologyWithOwner, DriveAccessRequest, DriveAccessRequestWithOwner, RequestStatus,
    User, UserRole,
};

use super::{ApologyRepository, DriveRequestRepository, HealthProbe, UserRepository};

#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    requests: Arc<RwLock<HashMap<Uuid, DriveAccessRequest>>>,
    apologies: Arc<RwLock<HashMap<Uuid, Apology>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn owner(&self, user_id: Uuid) -> Result<User, AppError> {
        self.users
            .read()
            .await
            .get(&user_id)
            .cloned()
            .ok_or_else(|| AppError::DatabaseError(anyhow::anyhow!("Missing owner row")))
    }
}

#[async_trait]
impl HealthProbe for MemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_invitation_token(&self, token: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| !u.invitation_accepted && u.invitation_token.as_deref() == Some(token))
            .cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "duplicate key value violates unique constraint \"users_email_key\""
            )));
        }
        users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<User>, AppError> {
        let mut all: Vec<User> = self.users.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn accept_invitation(&self, user_id: Uuid) -> Result<bool, AppError> {
        let mut users = self.users.write().await;
        match users.get_mut(&user_id) {
            Some(user) if !user.invitation_accepted => {
                user.invitation_accepted = true;
                user.invitation_token = None;
                user.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_full_name(&self, user_id: Uuid, full_name: &str) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        if let Some(user) = users.get_mut(&user_id) {
            user.full_name = full_name.to_string();
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_role(&self, user_id: Uuid, role: UserRole) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        if let Some(user) = users.get_mut(&user_id) {
            user.role = role.as_str().to_string();
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_drive_access(&self, user_id: Uuid, granted: bool) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        if let Some(user) = users.get_mut(&user_id) {
            user.drive_access_granted = granted;
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_discord_username(&self, user_id: Uuid, username: &str) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        if let Some(user) = users.get_mut(&user_id) {
            user.discord_username = Some(username.to_string());
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_discord_verified(&self, user_id: Uuid, verified: bool) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        if let Some(user) = users.get_mut(&user_id) {
            user.discord_verified = verified;
            user.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[async_trait]
impl DriveRequestRepository for MemoryStore {
    async fn find_by_id(&self, request_id: Uuid) -> Result<Option<DriveAccessRequest>, AppError> {
        Ok(self.requests.read().await.get(&request_id).cloned())
    }

    async fn find_with_owner(
        &self,
        request_id: Uuid,
    ) -> Result<Option<DriveAccessRequestWithOwner>, AppError> {
        let request = match self.requests.read().await.get(&request_id).cloned() {
            Some(request) => request,
            None => return Ok(None),
        };
        let owner = self.owner(request.user_id).await?;
        Ok(Some(DriveAccessRequestWithOwner {
            request,
            full_name: owner.full_name,
            email: owner.email,
        }))
    }

    async fn find_pending_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<DriveAccessRequest>, AppError> {
        Ok(self
            .requests
            .read()
            .await
            .values()
            .find(|r| r.user_id == user_id && r.is_pending())
            .cloned())
    }

    async fn insert(&self, request: &DriveAccessRequest) -> Result<(), AppError> {
        self.requests
            .write()
            .await
            .insert(request.request_id, request.clone());
        Ok(())
    }

    async fn transition_status(
        &self,
        request_id: Uuid,
        status: RequestStatus,
        admin_notes: Option<&str>,
        approved_by: Uuid,
    ) -> Result<Option<DriveAccessRequestWithOwner>, AppError> {
        {
            let mut requests = self.requests.write().await;
            match requests.get_mut(&request_id) {
                Some(request) if request.is_pending() => {
                    request.status = status.as_str().to_string();
                    request.admin_notes = admin_notes.map(str::to_string);
                    request.approved_by = Some(approved_by);
                    request.updated_at = Utc::now();
                }
                _ => return Ok(None),
            }
        }
        self.find_with_owner(request_id).await
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<DriveAccessRequest>, AppError> {
        let mut own: Vec<DriveAccessRequest> = self
            .requests
            .read()
            .await
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        own.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(own)
    }

    async fn list_all(&self) -> Result<Vec<DriveAccessRequestWithOwner>, AppError> {
        let mut rows: Vec<DriveAccessRequest> =
            self.requests.read().await.values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut joined = Vec::with_capacity(rows.len());
        for request in rows {
            let owner = self.owner(request.user_id).await?;
            joined.push(DriveAccessRequestWithOwner {
                request,
                full_name: owner.full_name,
                email: owner.email,
            });
        }
        Ok(joined)
    }
}

#[async_trait]
impl ApologyRepository for MemoryStore {
    async fn find_by_id(&self, apology_id: Uuid) -> Result<Option<Apology>, AppError> {
        Ok(self.apologies.read().await.get(&apology_id).cloned())
    }

    async fn insert(&self, apology: &Apology) -> Result<(), AppError> {
        self.apologies
            .write()
            .await
            .insert(apology.apology_id, apology.clone());
        Ok(())
    }

    async fn transition_status(
        &self,
        apology_id: Uuid,
        status: RequestStatus,
        admin_notes: Option<&str>,
    ) -> Result<Option<Apology>, AppError> {
        let mut apologies = self.apologies.write().await;
        match apologies.get_mut(&apology_id) {
            Some(apology) if apology.is_pending() => {
                apology.status = status.as_str().to_string();
                apology.admin_notes = admin_notes.map(str::to_string);
                apology.updated_at = Utc::now();
                Ok(Some(apology.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Apology>, AppError> {
        let mut own: Vec<Apology> = self
            .apologies
            .read()
            .await
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        own.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(own)
    }

    async fn list_pending(&self) -> Result<Vec<ApologyWithOwner>, AppError> {
        let mut rows: Vec<Apology> = self
            .apologies
            .read()
            .await
            .values()
            .filter(|a| a.is_pending())
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut joined = Vec::with_capacity(rows.len());
        for apology in rows {
            let owner = self.owner(apology.user_id).await?;
            joined.push(ApologyWithOwner {
                apology,
                full_name: owner.full_name,
                email: owner.email,
            });
        }
        Ok(joined)
    }
}
