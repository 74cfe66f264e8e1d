//! Best-effort notification sink.
//!
//! Events are queued onto a bounded channel and delivered to the configured
//! webhook by a background worker with retry-then-drop semantics. Nothing in
//! this module can fail the workflow that emitted an event.

use backoff::future::retry;
use backoff::ExponentialBackoff;
use chrono::Utc;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::NotifierConfig;
use crate::models::RequestStatus;

const COLOR_SUBMITTED: u32 = 0x3498db;
const COLOR_APPROVED: u32 = 0x27ae60;
const COLOR_REJECTED: u32 = 0xe74c3c;

/// Outbound portal events delivered to the webhook channel.
#[derive(Debug, Clone)]
pub enum PortalEvent {
    DriveRequestSubmitted {
        request_id: Uuid,
        full_name: String,
        user_email: String,
        reason: String,
    },
    DriveRequestDecided {
        request_id: Uuid,
        full_name: String,
        user_email: String,
        status: RequestStatus,
        admin_notes: Option<String>,
    },
}

/// Queue handle for emitting events.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<PortalEvent>,
}

impl Notifier {
    /// Spawn the delivery worker and return the queue handle.
    pub fn spawn(config: NotifierConfig, shutdown: CancellationToken) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_size.max(1));

        let worker = DeliveryWorker::new(config, rx, shutdown);
        tokio::spawn(worker.run());

        Self { tx }
    }

    /// Create a notifier whose events land on the returned receiver instead
    /// of a webhook. Used by the test harness.
    pub fn capture(queue_size: usize) -> (Self, mpsc::Receiver<PortalEvent>) {
        let (tx, rx) = mpsc::channel(queue_size.max(1));
        (Self { tx }, rx)
    }

    /// Queue an event. A full or closed queue drops the event.
    pub fn emit(&self, event: PortalEvent) {
        if let Err(err) = self.tx.try_send(event) {
            tracing::warn!(error = %err, "Notification queue rejected event, dropping");
        }
    }
}

struct DeliveryWorker {
    client: reqwest::Client,
    config: NotifierConfig,
    rx: mpsc::Receiver<PortalEvent>,
    shutdown: CancellationToken,
}

impl DeliveryWorker {
    fn new(
        config: NotifierConfig,
        rx: mpsc::Receiver<PortalEvent>,
        shutdown: CancellationToken,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()
            .unwrap_or_default();

        Self {
            client,
            config,
            rx,
            shutdown,
        }
    }

    async fn run(mut self) {
        tracing::info!(
            webhook_configured = self.config.webhook_url.is_some(),
            "Notification worker started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Notification worker shutting down");
                    break;
                }
                event = self.rx.recv() => {
                    match event {
                        Some(event) => self.deliver(event).await,
                        None => break,
                    }
                }
            }
        }
    }

    async fn deliver(&self, event: PortalEvent) {
        let Some(url) = self.config.webhook_url.clone() else {
            tracing::debug!("No webhook configured, dropping notification");
            return;
        };

        let payload = embed_payload(&event, &self.config.footer);

        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(
                self.config.retry_max_elapsed_seconds.max(1),
            )),
            ..Default::default()
        };

        let result = retry(backoff, || async {
            self.post(&url, &payload)
                .await
                .map_err(backoff::Error::transient)
        })
        .await;

        if let Err(err) = result {
            tracing::warn!(error = %err, "Dropping notification after retries");
        }
    }

    async fn post(&self, url: &str, payload: &serde_json::Value) -> Result<(), anyhow::Error> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Webhook unreachable: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Webhook returned status {}",
                response.status()
            ));
        }
        Ok(())
    }
}

fn embed_payload(event: &PortalEvent, footer: &str) -> serde_json::Value {
    let embed = match event {
        PortalEvent::DriveRequestSubmitted {
            request_id,
            full_name,
            user_email,
            reason,
        } => json!({
            "title": "New Shared Drive Access Request",
            "color": COLOR_SUBMITTED,
            "fields": [
                { "name": "User", "value": full_name, "inline": true },
                { "name": "Email", "value": user_email, "inline": true },
                { "name": "Reason", "value": reason, "inline": false },
                { "name": "Request ID", "value": request_id.to_string(), "inline": true },
            ],
            "timestamp": Utc::now().to_rfc3339(),
            "footer": { "text": footer },
        }),
        PortalEvent::DriveRequestDecided {
            request_id: _,
            full_name,
            user_email,
            status,
            admin_notes,
        } => {
            let (title, color) = match status {
                RequestStatus::Approved => ("Drive Access Request Approved", COLOR_APPROVED),
                RequestStatus::Rejected => ("Drive Access Request Rejected", COLOR_REJECTED),
                RequestStatus::Pending => ("Drive Access Request Updated", COLOR_SUBMITTED),
            };
            json!({
                "title": title,
                "color": color,
                "fields": [
                    { "name": "User", "value": full_name, "inline": true },
                    { "name": "Email", "value": user_email, "inline": true },
                    {
                        "name": "Admin Notes",
                        "value": admin_notes.as_deref().unwrap_or("No notes provided"),
                        "inline": false
                    },
                ],
                "timestamp": Utc::now().to_rfc3339(),
                "footer": { "text": footer },
            })
        }
    };

    json!({ "embeds": [embed] })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submitted_embed_is_blue() {
        let event = PortalEvent::DriveRequestSubmitted {
            request_id: Uuid::new_v4(),
            full_name: "Member".to_string(),
            user_email: "member@example.com".to_string(),
            reason: "need textbook".to_string(),
        };
        let payload = embed_payload(&event, "Portal");
        assert_eq!(payload["embeds"][0]["color"], COLOR_SUBMITTED);
        assert_eq!(payload["embeds"][0]["fields"][2]["value"], "need textbook");
    }

    #[test]
    fn test_decision_embed_colors() {
        for (status, color) in [
            (RequestStatus::Approved, COLOR_APPROVED),
            (RequestStatus::Rejected, COLOR_REJECTED),
        ] {
            let event = PortalEvent::DriveRequestDecided {
                request_id: Uuid::new_v4(),
                full_name: "Member".to_string(),
                user_email: "member@example.com".to_string(),
                status,
                admin_notes: None,
            };
            let payload = embed_payload(&event, "Portal");
            assert_eq!(payload["embeds"][0]["color"], color);
            assert_eq!(
                payload["embeds"][0]["fields"][2]["value"],
                "No notes provided"
            );
        }
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let (notifier, mut rx) = Notifier::capture(1);
        let event = PortalEvent::DriveRequestSubmitted {
            request_id: Uuid::new_v4(),
            full_name: "Member".to_string(),
            user_email: "member@example.com".to_string(),
            reason: "r".to_string(),
        };

        notifier.emit(event.clone());
        notifier.emit(event);

        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }
}
