//! Authorization guard for role-gated operations.

use service_core::error::AppError;

use crate::models::{User, UserRole};

use super::{Identity, ProfileResolver};

/// Central role check; every admin-only operation routes through it.
#[derive(Clone)]
pub struct AuthzService {
    profiles: ProfileResolver,
}

impl AuthzService {
    pub fn new(profiles: ProfileResolver) -> Self {
        Self { profiles }
    }

    /// Resolve the caller's profile and require a role.
    ///
    /// Runs before any protected mutation, so a refused caller cannot leave
    /// partial writes behind.
    pub async fn require_role(
        &self,
        identity: &Identity,
        role: UserRole,
    ) -> Result<User, AppError> {
        let user = self.profiles.resolve(identity).await?;
        if user.role != role.as_str() {
            tracing::warn!(
                user_id = %user.user_id,
                required = role.as_str(),
                actual = %user.role,
                "Refused role-gated operation"
            );
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "This action requires the {} role",
                role.as_str()
            )));
        }
        Ok(user)
    }
}
