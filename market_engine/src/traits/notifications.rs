use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    #[error("Could not deliver notification. {0}")]
    DeliveryFailed(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for NotificationError {
    fn from(e: sqlx::Error) -> Self {
        NotificationError::DatabaseError(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient_id: i64,
    pub title: String,
    pub message: String,
    pub metadata: Value,
}

impl Notification {
    pub fn new<S1: Into<String>, S2: Into<String>>(recipient_id: i64, title: S1, message: S2) -> Self {
        Self { recipient_id, title: title.into(), message: message.into(), metadata: Value::Null }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Fire-and-forget, at-least-once delivery of a notification to a user.
///
/// Notifications are sent from spawned event handler jobs, so the future must be `Send`.
pub trait NotificationDispatcher: Clone + Send + Sync + 'static {
    fn notify(&self, notification: Notification) -> impl Future<Output = Result<(), NotificationError>> + Send;
}
