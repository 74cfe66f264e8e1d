//! Access request engine: the drive-access and apology state machines.
//!
//! Both machines move `pending -> approved | rejected` exactly once. The
//! drive-access machine additionally refuses duplicate pending submissions,
//! requires notes on rejection, records the approver, grants the drive flag
//! on approval, and emits webhook notifications; the apology machine does
//! none of those.

use chrono::NaiveDate;
use service_core::error::AppError;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{
    Apology, ApologyWithOwner, DriveAccessRequest, DriveAccessRequestWithOwner, RequestStatus,
    User,
};
use crate::repositories::{ApologyRepository, DriveRequestRepository, UserRepository};

use super::{Notifier, PortalEvent};

#[derive(Clone)]
pub struct AccessRequestService {
    users: Arc<dyn UserRepository>,
    drive_requests: Arc<dyn DriveRequestRepository>,
    apologies: Arc<dyn ApologyRepository>,
    notifier: Notifier,
}

impl AccessRequestService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        drive_requests: Arc<dyn DriveRequestRepository>,
        apologies: Arc<dyn ApologyRepository>,
        notifier: Notifier,
    ) -> Self {
        Self {
            users,
            drive_requests,
            apologies,
            notifier,
        }
    }

    /// Parse a decision field; only terminal statuses are valid decisions.
    fn parse_decision(status: &str) -> Result<RequestStatus, AppError> {
        let decision = RequestStatus::from_str(status)
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;
        if !decision.is_terminal() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Decision must be approved or rejected"
            )));
        }
        Ok(decision)
    }

    // ==================== Drive access ====================

    /// Submit a drive access request.
    ///
    /// At most one pending request per user; a rejected request does not
    /// block resubmission.
    pub async fn submit_drive_request(
        &self,
        user_id: Uuid,
        user_email: &str,
        reason: &str,
    ) -> Result<DriveAccessRequest, AppError> {
        if self
            .drive_requests
            .find_pending_by_user(user_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "You already have a pending request"
            )));
        }

        let request =
            DriveAccessRequest::new(user_id, user_email.to_string(), reason.trim().to_string());
        self.drive_requests.insert(&request).await?;

        // Owner lookup feeds the notification only; a miss must not fail the
        // submission that already persisted.
        let full_name = self
            .users
            .find_by_id(user_id)
            .await
            .ok()
            .flatten()
            .map(|u| u.full_name)
            .unwrap_or_else(|| "Unknown".to_string());

        self.notifier.emit(PortalEvent::DriveRequestSubmitted {
            request_id: request.request_id,
            full_name,
            user_email: request.user_email.clone(),
            reason: request.reason.clone(),
        });

        tracing::info!(request_id = %request.request_id, user_id = %user_id, "Drive access requested");

        Ok(request)
    }

    /// Decide a pending drive access request.
    ///
    /// Approval also grants the owner's drive access flag. Deciding an
    /// already-terminal request returns the stored row unchanged with no
    /// side effects.
    pub async fn decide_drive_request(
        &self,
        request_id: Uuid,
        status: &str,
        admin_notes: Option<&str>,
        admin: &User,
    ) -> Result<DriveAccessRequestWithOwner, AppError> {
        let decision = Self::parse_decision(status)?;

        let existing = self
            .drive_requests
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Drive access request not found")))?;

        if !existing.is_pending() {
            return self.already_decided(request_id).await;
        }

        let notes = admin_notes.map(str::trim).filter(|n| !n.is_empty());
        if decision == RequestStatus::Rejected && notes.is_none() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "A reason for rejection is required"
            )));
        }

        let updated = match self
            .drive_requests
            .transition_status(request_id, decision, notes, admin.user_id)
            .await?
        {
            Some(row) => row,
            // Another admin decided first; same answer as already-terminal.
            None => return self.already_decided(request_id).await,
        };

        if decision == RequestStatus::Approved {
            self.users
                .set_drive_access(updated.request.user_id, true)
                .await?;
        }

        self.notifier.emit(PortalEvent::DriveRequestDecided {
            request_id,
            full_name: updated.full_name.clone(),
            user_email: updated.request.user_email.clone(),
            status: decision,
            admin_notes: updated.request.admin_notes.clone(),
        });

        tracing::info!(
            request_id = %request_id,
            status = decision.as_str(),
            admin_id = %admin.user_id,
            "Drive access request decided"
        );

        Ok(updated)
    }

    async fn already_decided(
        &self,
        request_id: Uuid,
    ) -> Result<DriveAccessRequestWithOwner, AppError> {
        self.drive_requests
            .find_with_owner(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Drive access request not found")))
    }

    /// Requests owned by a user, newest first.
    pub async fn list_drive_requests_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<DriveAccessRequest>, AppError> {
        self.drive_requests.list_by_user(user_id).await
    }

    /// All requests with their owners, newest first (admin view).
    pub async fn list_all_drive_requests(
        &self,
    ) -> Result<Vec<DriveAccessRequestWithOwner>, AppError> {
        self.drive_requests.list_all().await
    }

    // ==================== Apologies ====================

    /// Submit an absence apology. Multiple pending apologies may coexist.
    pub async fn submit_apology(
        &self,
        user_id: Uuid,
        activity_date: NaiveDate,
        reason: &str,
    ) -> Result<Apology, AppError> {
        let apology = Apology::new(user_id, activity_date, reason.trim().to_string());
        self.apologies.insert(&apology).await?;

        tracing::info!(apology_id = %apology.apology_id, user_id = %user_id, "Apology submitted");

        Ok(apology)
    }

    /// Decide a pending apology. Notes are optional even on rejection, and no
    /// approver is recorded; apology decisions are not wired to the sink.
    pub async fn decide_apology(
        &self,
        apology_id: Uuid,
        status: &str,
        admin_notes: Option<&str>,
    ) -> Result<Apology, AppError> {
        let decision = Self::parse_decision(status)?;

        let existing = self
            .apologies
            .find_by_id(apology_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Apology not found")))?;

        if !existing.is_pending() {
            return Ok(existing);
        }

        let notes = admin_notes.map(str::trim).filter(|n| !n.is_empty());

        match self
            .apologies
            .transition_status(apology_id, decision, notes)
            .await?
        {
            Some(apology) => {
                tracing::info!(
                    apology_id = %apology_id,
                    status = decision.as_str(),
                    "Apology decided"
                );
                Ok(apology)
            }
            None => self
                .apologies
                .find_by_id(apology_id)
                .await?
                .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Apology not found"))),
        }
    }

    /// Apologies owned by a user, newest first.
    pub async fn list_apologies_for_user(&self, user_id: Uuid) -> Result<Vec<Apology>, AppError> {
        self.apologies.list_by_user(user_id).await
    }

    /// Pending apologies with their owners, newest first (admin queue).
    pub async fn list_pending_apologies(&self) -> Result<Vec<ApologyWithOwner>, AppError> {
        self.apologies.list_pending().await
    }
}
