//! Delivery boundary: hand one rendered notification to a transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reminder_core::config::SenderConfig;
use reminder_core::Notification;
use tracing::info;

use crate::error::SendError;

#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Deliver one notification. Failures are values, never panics.
    async fn deliver(&self, notification: &Notification) -> Result<(), SendError>;
}

/// Build the sender named in config.
pub fn from_config(config: &SenderConfig) -> Result<Arc<dyn NotificationSender>, SendError> {
    match config {
        SenderConfig::Log => Ok(Arc::new(LogSender)),
        SenderConfig::Webhook { url, timeout_secs } => Ok(Arc::new(WebhookSender::new(
            url.clone(),
            Duration::from_secs(*timeout_secs),
        )?)),
    }
}

// ---------------------------------------------------------------------------
// LogSender
// ---------------------------------------------------------------------------

/// Writes the notification to the log and reports success.
pub struct LogSender;

#[async_trait]
impl NotificationSender for LogSender {
    async fn deliver(&self, notification: &Notification) -> Result<(), SendError> {
        info!(
            reminder = %notification.reminder_id,
            stage = %notification.stage,
            to = %notification.to,
            subject = %notification.subject,
            "{}",
            notification.body
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// WebhookSender
// ---------------------------------------------------------------------------

/// POSTs the notification as JSON to an outbound relay.
///
/// Any 2xx response counts as delivered.
pub struct WebhookSender {
    client: reqwest::Client,
    url: String,
}

impl WebhookSender {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SendError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl NotificationSender for WebhookSender {
    async fn deliver(&self, notification: &Notification) -> Result<(), SendError> {
        let resp = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(SendError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use reminder_core::Stage;
    use uuid::Uuid;

    fn notification() -> Notification {
        Notification {
            reminder_id: Uuid::new_v4(),
            stage: Stage::OneDay,
            to: "ada@example.com".into(),
            name: "Ada".into(),
            subject: "Dentist".into(),
            body: "Hi Ada! We just wanted to remind you, that Dentist happens tomorrow, on March 11, 2024!".into(),
        }
    }

    #[tokio::test]
    async fn webhook_posts_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/notify")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "to": "ada@example.com",
                "subject": "Dentist",
                "stage": "one_day",
            })))
            .with_status(202)
            .create_async()
            .await;

        let sender =
            WebhookSender::new(format!("{}/notify", server.url()), Duration::from_secs(5)).unwrap();
        sender.deliver(&notification()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn webhook_non_success_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/notify")
            .with_status(503)
            .with_body("relay down")
            .create_async()
            .await;

        let sender =
            WebhookSender::new(format!("{}/notify", server.url()), Duration::from_secs(5)).unwrap();
        match sender.deliver(&notification()).await {
            Err(SendError::Rejected { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "relay down");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn webhook_unreachable_is_transport_error() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let sender = WebhookSender::new("http://127.0.0.1:9/notify", Duration::from_secs(2)).unwrap();
        assert!(matches!(
            sender.deliver(&notification()).await,
            Err(SendError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn log_sender_always_succeeds() {
        assert!(LogSender.deliver(&notification()).await.is_ok());
    }

    #[test]
    fn from_config_builds_each_kind() {
        assert!(from_config(&SenderConfig::Log).is_ok());
        assert!(from_config(&SenderConfig::Webhook {
            url: "http://localhost:1/notify".into(),
            timeout_secs: 1,
        })
        .is_ok());
    }
}
