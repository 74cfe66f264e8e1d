//! Invitation manager: issues single-use activation tokens and redeems them
//! into active accounts.

use serde::Serialize;
use service_core::error::AppError;
use std::sync::Arc;

use crate::models::User;
use crate::repositories::UserRepository;
use crate::utils::{generate_invitation_token, Password};

use super::IdentityProvider;

const MIN_PASSWORD_LENGTH: usize = 6;

/// A freshly created invitation.
#[derive(Debug, Clone)]
pub struct CreatedInvitation {
    pub user: User,
    pub token: String,
    pub invite_url: String,
}

/// Pre-redemption details shown on the activation page.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationDetails {
    pub email: String,
    pub full_name: String,
}

#[derive(Clone)]
pub struct InvitationService {
    users: Arc<dyn UserRepository>,
    identity: Arc<dyn IdentityProvider>,
    invite_base_url: String,
}

impl InvitationService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        identity: Arc<dyn IdentityProvider>,
        invite_base_url: String,
    ) -> Self {
        Self {
            users,
            identity,
            invite_base_url,
        }
    }

    /// Create an invitation: a student row holding a single-use token.
    pub async fn create(&self, email: &str, full_name: &str) -> Result<CreatedInvitation, AppError> {
        let email = email.trim();
        let full_name = full_name.trim();
        if email.is_empty() || full_name.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Email and full name are required"
            )));
        }

        if self.users.find_by_email(email).await?.is_some() {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "A user with this email already exists"
            )));
        }

        let token = generate_invitation_token();
        let user = User::invited(email.to_string(), full_name.to_string(), token.clone());
        self.users.insert(&user).await?;

        let invite_url = format!(
            "{}/invite/{}",
            self.invite_base_url.trim_end_matches('/'),
            token
        );

        tracing::info!(user_id = %user.user_id, email = %user.email, "Invitation created");

        Ok(CreatedInvitation {
            user,
            token,
            invite_url,
        })
    }

    /// Look up an unredeemed invitation for display.
    pub async fn details(&self, token: &str) -> Result<InvitationDetails, AppError> {
        let user = self
            .users
            .find_by_invitation_token(token)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Invalid or expired invitation token"))
            })?;

        Ok(InvitationDetails {
            email: user.email,
            full_name: user.full_name,
        })
    }

    /// Redeem a token: create the identity account, then activate the row.
    ///
    /// The token matches only rows with `invitation_accepted = false`, so a
    /// consumed token can never be replayed.
    pub async fn redeem(
        &self,
        token: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<User, AppError> {
        let user = self
            .users
            .find_by_invitation_token(token)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Invalid or expired invitation token"))
            })?;

        if password != confirm_password {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Passwords do not match"
            )));
        }
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            )));
        }

        // The identity account shares the row's UUID so profile lookups by
        // identity converge on the invited row.
        self.identity
            .create_account(
                user.user_id,
                &user.email,
                &user.full_name,
                &Password::new(password.to_string()),
            )
            .await?;

        let flipped = match self.users.accept_invitation(user.user_id).await {
            Ok(flipped) => flipped,
            Err(err) => {
                // Identity account exists but the row still carries the
                // token; redeeming the same token again reconciles.
                tracing::error!(
                    user_id = %user.user_id,
                    "Activation flags not updated after account creation"
                );
                return Err(err);
            }
        };

        if !flipped {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Invalid or expired invitation token"
            )));
        }

        tracing::info!(user_id = %user.user_id, "Invitation redeemed");

        self.users.find_by_id(user.user_id).await?.ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("Activated user missing on re-read"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::repositories::MemoryStore;
    use crate::services::{JwtService, MemoryIdentityProvider};

    fn service() -> (InvitationService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let jwt = JwtService::new(&JwtConfig {
            secret: "test-secret-test-secret-test-secret-42".to_string(),
            session_expiry_hours: 12,
        })
        .unwrap();
        let identity = Arc::new(MemoryIdentityProvider::new(jwt));
        let invitations = InvitationService::new(
            store.clone(),
            identity,
            "http://localhost:3000".to_string(),
        );
        (invitations, store)
    }

    #[tokio::test]
    async fn test_create_rejects_blank_fields() {
        let (invitations, _) = service();
        assert!(matches!(
            invitations.create("", "Someone").await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            invitations.create("a@example.com", "  ").await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_redeem_is_single_use() {
        let (invitations, _) = service();
        let created = invitations
            .create("new@example.com", "New Member")
            .await
            .unwrap();

        let user = invitations
            .redeem(&created.token, "hunter22", "hunter22")
            .await
            .unwrap();
        assert!(user.invitation_accepted);
        assert!(user.invitation_token.is_none());

        let second = invitations.redeem(&created.token, "hunter22", "hunter22").await;
        assert!(matches!(second, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_redeem_validates_password() {
        let (invitations, _) = service();
        let created = invitations
            .create("pw@example.com", "Pw Member")
            .await
            .unwrap();

        assert!(matches!(
            invitations.redeem(&created.token, "hunter22", "different").await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            invitations.redeem(&created.token, "short", "short").await,
            Err(AppError::BadRequest(_))
        ));
    }
}
