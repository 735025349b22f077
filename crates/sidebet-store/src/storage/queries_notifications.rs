//! Notification queries.

use sidebet_core::db::unix_timestamp;
use sidebet_core::model::Notification;
use sqlx::{Sqlite, Transaction};

use super::db::{Database, DatabaseError};
use super::models::NotificationRow;

/// Parameters for creating a notification.
#[derive(Debug, Clone)]
pub struct NewNotificationParams {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub message: String,
    pub link: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl Database {
    pub(crate) async fn insert_notification_tx(
        tx: &mut Transaction<'_, Sqlite>,
        params: &NewNotificationParams,
        now: i64,
    ) -> Result<(), DatabaseError> {
        let metadata = params
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| DatabaseError::Query(format!("Metadata encoding failed: {e}")))?;

        sqlx::query(
            r"
            INSERT INTO notifications (id, user_id, kind, message, read, link, metadata, created_at)
            VALUES (?, ?, ?, ?, 0, ?, ?, ?)
            ",
        )
        .bind(&params.id)
        .bind(&params.user_id)
        .bind(&params.kind)
        .bind(&params.message)
        .bind(&params.link)
        .bind(metadata)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Insert a single notification outside any larger transaction.
    pub async fn insert_notification(
        &self,
        params: &NewNotificationParams,
    ) -> Result<(), DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;
        Self::insert_notification_tx(&mut tx, params, now).await?;
        tx.commit().await?;
        Ok(())
    }

    /// List a user's notifications, newest first.
    pub async fn list_notifications(
        &self,
        user_id: &str,
    ) -> Result<Vec<Notification>, DatabaseError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(NotificationRow::into_notification).collect()
    }

    /// Count a user's unread notifications.
    pub async fn unread_notification_count(&self, user_id: &str) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND read = 0",
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await?;
        Ok(count)
    }

    /// Mark one notification read.
    pub async fn mark_notification_read(&self, id: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE notifications SET read = 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Notification {id}")));
        }
        Ok(())
    }

    /// Mark all of a user's notifications read.
    pub async fn mark_all_notifications_read(&self, user_id: &str) -> Result<u64, DatabaseError> {
        let result = sqlx::query("UPDATE notifications SET read = 1 WHERE user_id = ? AND read = 0")
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete all of a user's notifications.
    pub async fn delete_all_notifications(&self, user_id: &str) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }
}
