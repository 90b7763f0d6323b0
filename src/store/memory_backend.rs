//! In-memory stores using DashMap.
//!
//! Data is lost on restart. Used in development and tests.

use async_trait::async_trait;
use dashmap::DashMap;

use super::backend::{
    NewNotification, NotificationStore, StoreError, StoredNotification, UserDirectory, UserProfile,
};

/// In-memory user profile directory.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: DashMap<String, UserProfile>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a profile
    pub fn upsert(&self, profile: UserProfile) {
        self.users.insert(profile.id.clone(), profile);
    }

    pub fn remove(&self, user_id: &str) -> Option<UserProfile> {
        self.users.remove(user_id).map(|(_, profile)| profile)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.users.get(user_id).map(|entry| entry.value().clone()))
    }
}

/// In-memory append-only notification store.
#[derive(Default)]
pub struct MemoryNotificationStore {
    /// Per-user records in insertion order
    records: DashMap<String, Vec<StoredNotification>>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored records
    pub fn total(&self) -> usize {
        self.records.iter().map(|entry| entry.value().len()).sum()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn append(
        &self,
        notification: NewNotification,
    ) -> Result<StoredNotification, StoreError> {
        let record = StoredNotification::unread(notification);
        self.records
            .entry(record.user_id.clone())
            .or_default()
            .push(record.clone());

        tracing::trace!(
            user_id = %record.user_id,
            notification_id = %record.id,
            "Notification stored in memory"
        );

        Ok(record)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<StoredNotification>, StoreError> {
        Ok(self
            .records
            .get(user_id)
            .map(|entry| entry.value().iter().rev().cloned().collect())
            .unwrap_or_default())
    }
}
