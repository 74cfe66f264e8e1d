use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;

/// JWT service for session token generation and validation
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_expiry_hours: i64,
}

/// Claims for session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (identity ID)
    pub sub: String,
    /// Email
    pub email: String,
    /// Display name supplied by the identity provider
    pub name: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// JWT ID
    pub jti: String,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        if config.secret.len() < 32 {
            return Err(anyhow::anyhow!("JWT secret must be at least 32 bytes"));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            session_expiry_hours: config.session_expiry_hours,
        })
    }

    /// Generate a session token for an authenticated identity.
    ///
    /// Returns the token and its lifetime in seconds.
    pub fn issue_session_token(
        &self,
        identity_id: Uuid,
        email: &str,
        name: Option<&str>,
    ) -> Result<(String, i64), anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.session_expiry_hours);

        let claims = SessionClaims {
            sub: identity_id.to_string(),
            email: email.to_string(),
            name: name.map(str::to_string),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode session token: {}", e))?;

        Ok((token, (exp - now).num_seconds()))
    }

    /// Validate a session token and return its claims.
    pub fn validate_session_token(&self, token: &str) -> Result<SessionClaims, anyhow::Error> {
        let data = decode::<SessionClaims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| anyhow::anyhow!("Invalid session token: {}", e))?;

        Ok(data.claims)
    }
}
