//! Client for the external Discord role-assignment endpoint.

use service_core::error::AppError;
use std::time::Duration;

use crate::config::DiscordConfig;

/// Calls the community's role service to verify a member's Discord handle.
#[derive(Clone)]
pub struct DiscordVerifier {
    client: reqwest::Client,
    config: DiscordConfig,
}

impl DiscordVerifier {
    pub fn new(config: DiscordConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    /// Ask the external service to grant the member role for a handle.
    ///
    /// Failure surfaces to the caller; the verified flag is only set after a
    /// successful call.
    pub async fn assign_member_role(&self, username: &str) -> Result<(), AppError> {
        let endpoint = self.config.role_endpoint.as_deref().ok_or_else(|| {
            AppError::DependencyError(anyhow::anyhow!("Discord verification is not configured"))
        })?;

        let mut request = self.client.get(endpoint).query(&[("username", username)]);
        if let Some(token) = self.config.role_token.as_deref() {
            request = request.query(&[("token", token)]);
        }

        let response = request.send().await.map_err(|e| {
            AppError::DependencyError(anyhow::anyhow!("Discord role service unreachable: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(AppError::DependencyError(anyhow::anyhow!(
                "Discord role service returned status {}",
                response.status()
            )));
        }

        Ok(())
    }
}
