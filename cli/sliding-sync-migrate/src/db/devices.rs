//! Proxy-side device state.
//!
//! The proxy keeps one sync loop row per device in `syncv3_sync2_devices` and
//! the device's access token in `syncv3_sync2_tokens`. Removing both stops the
//! proxy from polling the homeserver on the device's behalf.

use sqlx::postgres::PgPool;
use tracing::{debug, info};

use super::DbError;
use crate::whoami::Identity;

/// Rows removed by [`DeviceStore::erase`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErasedRows {
    pub devices: u64,
    pub tokens: u64,
}

/// Handle for the proxy's per-device tables.
#[derive(Clone)]
pub struct DeviceStore {
    pool: PgPool,
}

impl DeviceStore {
    /// Create a new device store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete the device's sync loop and token rows atomically.
    ///
    /// Both deletes run in one transaction. If either fails, or the commit
    /// fails, the transaction is dropped uncommitted and rolled back, so
    /// neither delete is visible. Zero matching rows is not an error.
    pub async fn erase(&self, identity: &Identity) -> Result<ErasedRows, DbError> {
        let mut tx = self.pool.begin().await.map_err(DbError::Query)?;

        let devices = sqlx::query(
            r#"
            DELETE FROM syncv3_sync2_devices
            WHERE user_id = $1 AND device_id = $2
            "#,
        )
        .bind(&identity.user_id)
        .bind(&identity.device_id)
        .execute(&mut *tx)
        .await
        .map_err(DbError::Query)?
        .rows_affected();

        debug!(rows = devices, "Deleted sync loop rows");

        let tokens = sqlx::query(
            r#"
            DELETE FROM syncv3_sync2_tokens
            WHERE user_id = $1 AND device_id = $2
            "#,
        )
        .bind(&identity.user_id)
        .bind(&identity.device_id)
        .execute(&mut *tx)
        .await
        .map_err(DbError::Query)?
        .rows_affected();

        debug!(rows = tokens, "Deleted token rows");

        tx.commit().await.map_err(DbError::Query)?;

        info!(
            user_id = %identity.user_id,
            device_id = %identity.device_id,
            devices,
            tokens,
            "Erased proxy device state"
        );

        Ok(ErasedRows { devices, tokens })
    }
}
