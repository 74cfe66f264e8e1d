//! Drive access request model - the portal's main approval workflow.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::RequestStatus;

/// Drive access request entity.
///
/// The contact email is captured at submission time and may diverge from the
/// owner's current email.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DriveAccessRequest {
    pub request_id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub reason: String,
    pub status: String,
    pub admin_notes: Option<String>,
    pub approved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DriveAccessRequest {
    /// Create a new pending request.
    pub fn new(user_id: Uuid, user_email: String, reason: String) -> Self {
        let now = Utc::now();
        Self {
            request_id: Uuid::new_v4(),
            user_id,
            user_email,
            reason,
            status: RequestStatus::Pending.as_str().to_string(),
            admin_notes: None,
            approved_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending.as_str()
    }
}

/// Drive access request joined with its owner, for admin views and decisions.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DriveAccessRequestWithOwner {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub request: DriveAccessRequest,
    pub full_name: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_is_pending() {
        let request = DriveAccessRequest::new(
            Uuid::new_v4(),
            "member@example.com".to_string(),
            "need textbook".to_string(),
        );
        assert!(request.is_pending());
        assert!(request.admin_notes.is_none());
        assert!(request.approved_by.is_none());
    }
}
