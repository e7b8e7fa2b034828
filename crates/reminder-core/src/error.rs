use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("owner not found: {0}")]
    OwnerNotFound(String),

    #[error("validation failed for '{field}': {reason}")]
    Validation { field: String, reason: String },

    #[error("date out of range: {0}")]
    DateOutOfRange(String),

    #[error("invalid utc offset: {0} minutes")]
    InvalidOffset(i32),

    #[error("store error: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ReminderError {
    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReminderError>;
