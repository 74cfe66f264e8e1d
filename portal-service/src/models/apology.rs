//! Apology model - absence justifications routed through the approval flow.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::RequestStatus;

/// Apology entity.
///
/// Unlike drive access requests there is no duplicate-pending restriction and
/// no recorded approver.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Apology {
    pub apology_id: Uuid,
    pub user_id: Uuid,
    pub activity_date: NaiveDate,
    pub reason: String,
    pub status: String,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Apology {
    /// Create a new pending apology.
    pub fn new(user_id: Uuid, activity_date: NaiveDate, reason: String) -> Self {
        let now = Utc::now();
        Self {
            apology_id: Uuid::new_v4(),
            user_id,
            activity_date,
            reason,
            status: RequestStatus::Pending.as_str().to_string(),
            admin_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending.as_str()
    }
}

/// Apology joined with its owner, for the admin review queue.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ApologyWithOwner {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub apology: Apology,
    pub full_name: String,
    pub email: String,
}
