//! Queued to-device messages.

use sqlx::{postgres::PgPool, postgres::PgRow, Row};
use tracing::info;

use super::DbError;
use crate::whoami::Identity;

/// A to-device message the proxy queued but never delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceMessage {
    /// Insertion position; delivery order is ascending position.
    pub position: i64,
    pub event_type: String,
    pub sender: String,
    /// The event as the proxy stored it: serialized JSON, used verbatim.
    pub message: String,
}

impl<'r> sqlx::FromRow<'r, PgRow> for DeviceMessage {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            position: row.try_get("position")?,
            event_type: row.try_get("event_type")?,
            sender: row.try_get("sender")?,
            message: row.try_get("message")?,
        })
    }
}

/// Handle for `syncv3_to_device_messages`.
#[derive(Clone)]
pub struct ToDeviceStore {
    pool: PgPool,
}

impl ToDeviceStore {
    /// Create a new to-device store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Read every queued message for the device, in ascending position order.
    ///
    /// Returns an empty vector when nothing is queued. A row that fails to
    /// decode fails the whole read; no partial list is returned.
    pub async fn messages_for(&self, identity: &Identity) -> Result<Vec<DeviceMessage>, DbError> {
        let messages = sqlx::query_as::<_, DeviceMessage>(
            r#"
            SELECT position, event_type, sender, message
            FROM syncv3_to_device_messages
            WHERE user_id = $1 AND device_id = $2
            ORDER BY position ASC
            "#,
        )
        .bind(&identity.user_id)
        .bind(&identity.device_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from_fetch)?;

        info!(
            user_id = %identity.user_id,
            device_id = %identity.device_id,
            count = messages.len(),
            "Extracted to-device messages"
        );

        Ok(messages)
    }
}
