use std::time::Duration;

use reminder_core::ReminderError;
use thiserror::Error;

/// Failure reported by a [`crate::sender::NotificationSender`].
#[derive(Debug, Error)]
pub enum SendError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("relay rejected notification: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Why one reminder could not be processed in a pass.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("target date missing or unreadable; reminder kept for inspection")]
    MalformedDate,

    /// The stored row itself could not be decoded.
    #[error("stored record unreadable; kept for inspection: {0}")]
    Unreadable(String),

    #[error("could not render notification: {0}")]
    Render(#[source] ReminderError),

    #[error("delivery failed: {0}")]
    Delivery(#[from] SendError),

    #[error("delivery timed out after {0:?}")]
    DeliveryTimeout(Duration),

    #[error("store error: {0}")]
    Store(#[from] ReminderError),

    /// The notification went out but the sent-flag was not persisted; the
    /// next pass will send it again.
    #[error("notification sent but progress not saved: {0}")]
    PersistAfterSend(#[source] ReminderError),

    #[error("rollover failed: {0}")]
    Rollover(#[source] ReminderError),

    #[error("task failed: {0}")]
    Task(String),
}

impl DispatchError {
    /// Stable short name used in reports and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedDate => "malformed_date",
            Self::Unreadable(_) => "malformed",
            Self::Render(_) => "render",
            Self::Delivery(_) => "delivery",
            Self::DeliveryTimeout(_) => "delivery_timeout",
            Self::Store(_) => "store",
            Self::PersistAfterSend(_) => "persist_after_send",
            Self::Rollover(_) => "rollover",
            Self::Task(_) => "task",
        }
    }

    /// Re-tag a store failure that happened after a successful delivery.
    pub(crate) fn after_send(self) -> Self {
        match self {
            Self::Store(e) => Self::PersistAfterSend(e),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn after_send_retags_store_errors_only() {
        let e = DispatchError::Store(ReminderError::Store("disk full".into())).after_send();
        assert_eq!(e.kind(), "persist_after_send");
        assert!(e.to_string().contains("disk full"));

        let e = DispatchError::Task("join".into()).after_send();
        assert_eq!(e.kind(), "task");
    }

    #[test]
    fn send_error_messages() {
        let e = SendError::Rejected {
            status: 503,
            body: "busy".into(),
        };
        assert_eq!(e.to_string(), "relay rejected notification: HTTP 503: busy");
        let d: DispatchError = e.into();
        assert_eq!(d.kind(), "delivery");
    }
}
