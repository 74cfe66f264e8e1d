//! User model - portal member accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Member roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Admin => "admin",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(UserRole::Student),
            "admin" => Ok(UserRole::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// User entity.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub invitation_token: Option<String>,
    pub invitation_accepted: bool,
    pub drive_access_granted: bool,
    pub discord_username: Option<String>,
    pub discord_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a user row awaiting invitation redemption.
    pub fn invited(email: String, full_name: String, invitation_token: String) -> Self {
        let now = Utc::now();
        Self {
            user_id: Uuid::new_v4(),
            email,
            full_name,
            role: UserRole::Student.as_str().to_string(),
            invitation_token: Some(invitation_token),
            invitation_accepted: false,
            drive_access_granted: false,
            discord_username: None,
            discord_verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create an active user row provisioned from an authenticated identity.
    ///
    /// The row is keyed by the identity's stable id so later lookups converge.
    pub fn provisioned(user_id: Uuid, email: String, full_name: String) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            email,
            full_name,
            role: UserRole::Student.as_str().to_string(),
            invitation_token: None,
            invitation_accepted: true,
            drive_access_granted: false,
            discord_username: None,
            discord_verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin.as_str()
    }

    /// Convert to sanitized response (no invitation token).
    pub fn sanitized(&self) -> UserResponse {
        UserResponse::from(self.clone())
    }
}

/// User response for API (without the single-use token).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub invitation_accepted: bool,
    pub drive_access_granted: bool,
    pub discord_username: Option<String>,
    pub discord_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            user_id: u.user_id,
            email: u.email,
            full_name: u.full_name,
            role: u.role,
            invitation_accepted: u.invitation_accepted,
            drive_access_granted: u.drive_access_granted,
            discord_username: u.discord_username,
            discord_verified: u.discord_verified,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}
