//! PostgreSQL-backed stores.
//!
//! Table structure (see `sql/schema.sql`):
//! - `users` - profile directory, read-only from this service
//! - `notifications` - append-only notification records

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::backend::{
    NewNotification, NotificationStore, StoreError, StoredNotification, UserDirectory, UserProfile,
};

/// Profile lookups against the `users` table.
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let row: Option<(String, Option<String>, Option<String>)> = sqlx::query_as(
            r#"
            SELECT id, name, device_token
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, name, device_token)| UserProfile {
            id,
            name,
            device_token,
        }))
    }
}

/// Append-only writes to the `notifications` table.
pub struct PostgresNotificationStore {
    pool: PgPool,
}

impl PostgresNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PostgresNotificationStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn append(
        &self,
        notification: NewNotification,
    ) -> Result<StoredNotification, StoreError> {
        let id = Uuid::new_v4();

        // created_at is assigned by the database clock
        let (created_at,): (DateTime<Utc>,) = sqlx::query_as(
            r#"
            INSERT INTO notifications (id, user_id, title, body, icon, created_at, is_unread)
            VALUES ($1, $2, $3, $4, $5, NOW(), TRUE)
            RETURNING created_at
            "#,
        )
        .bind(id)
        .bind(&notification.user_id)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(&notification.icon)
        .fetch_one(&self.pool)
        .await?;

        tracing::trace!(
            user_id = %notification.user_id,
            notification_id = %id,
            "Notification stored in PostgreSQL"
        );

        Ok(StoredNotification {
            id,
            user_id: notification.user_id,
            title: notification.title,
            body: notification.body,
            icon: notification.icon,
            timestamp: created_at,
            is_unread: true,
        })
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<StoredNotification>, StoreError> {
        let rows: Vec<(Uuid, String, String, String, String, DateTime<Utc>, bool)> =
            sqlx::query_as(
                r#"
                SELECT id, user_id, title, body, icon, created_at, is_unread
                FROM notifications
                WHERE user_id = $1
                ORDER BY created_at DESC
                "#,
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, user_id, title, body, icon, timestamp, is_unread)| StoredNotification {
                    id,
                    user_id,
                    title,
                    body,
                    icon,
                    timestamp,
                    is_unread,
                },
            )
            .collect())
    }
}
