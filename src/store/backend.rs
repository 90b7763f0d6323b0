//! Storage traits for user profiles and notification records.
//!
//! Both stores are owned by other systems: the notifier only reads profiles
//! and only appends notification records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store is temporarily unavailable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// User profile as seen by the notifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: Option<String>,
    pub device_token: Option<String>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_device_token(mut self, token: impl Into<String>) -> Self {
        self.device_token = Some(token.into());
        self
    }

    /// Non-blank display name, if any
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.trim().is_empty())
    }

    /// Non-blank device token, if any
    pub fn token(&self) -> Option<&str> {
        self.device_token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Notification record to append. The store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: String,
    pub title: String,
    pub body: String,
    pub icon: String,
}

/// Persisted notification record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredNotification {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub body: String,
    pub icon: String,
    /// Server-side creation time
    pub timestamp: DateTime<Utc>,
    pub is_unread: bool,
}

impl StoredNotification {
    /// Build a fresh unread record stamped with the current time
    pub fn unread(notification: NewNotification) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: notification.user_id,
            title: notification.title,
            body: notification.body,
            icon: notification.icon,
            timestamp: Utc::now(),
            is_unread: true,
        }
    }
}

/// Read-only lookup of user profiles.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Backend name for health reporting
    fn backend_name(&self) -> &'static str;

    /// Fetch a profile by id. `Ok(None)` when the user does not exist.
    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;
}

/// Append-only notification store.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Backend name for health reporting
    fn backend_name(&self) -> &'static str;

    /// Append an unread notification record
    async fn append(&self, notification: NewNotification)
        -> Result<StoredNotification, StoreError>;

    /// Records addressed to a user, newest first
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<StoredNotification>, StoreError>;
}
