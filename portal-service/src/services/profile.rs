//! Profile resolver: maps an authenticated identity to a portal user row.

use service_core::error::AppError;
use std::sync::Arc;

use crate::models::User;
use crate::repositories::UserRepository;

use super::Identity;

/// Resolves profiles, lazily provisioning one on first authenticated access.
#[derive(Clone)]
pub struct ProfileResolver {
    users: Arc<dyn UserRepository>,
}

impl ProfileResolver {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Look up the caller's profile, creating it if no row exists.
    ///
    /// Provisioning only happens on a clean miss; a store error propagates
    /// without creating anything. Concurrent first logins may race on the
    /// insert; the re-read converges both callers on the stored row.
    pub async fn resolve(&self, identity: &Identity) -> Result<User, AppError> {
        if let Some(user) = self.users.find_by_id(identity.identity_id).await? {
            return Ok(user);
        }

        let full_name = identity
            .full_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| identity.email.clone());

        let user = User::provisioned(identity.identity_id, identity.email.clone(), full_name);
        self.users.insert(&user).await?;

        tracing::info!(
            user_id = %user.user_id,
            "Provisioned profile for authenticated identity"
        );

        self.users
            .find_by_id(identity.identity_id)
            .await?
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!("Provisioned profile missing on re-read"))
            })
    }
}
