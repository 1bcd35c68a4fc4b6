//! Access to the sliding-sync proxy's Postgres database.
//!
//! This module provides:
//! - Connection setup for the proxy database
//! - Device state removal (sync loop row + token row, one transaction)
//! - Extraction of queued to-device messages in delivery order
//!
//! The tables are owned by the proxy; nothing here creates or migrates them.

mod devices;
mod error;
mod to_device;

pub use devices::{DeviceStore, ErasedRows};
pub use error::DbError;
pub use to_device::{DeviceMessage, ToDeviceStore};

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::debug;

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL.
    pub database_url: String,

    /// Connection acquire timeout.
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/syncv3".to_string(),
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// Database connection wrapper.
///
/// Each step opens its own handle and closes it before returning, so the
/// pool never holds more than one connection.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to the proxy database.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        debug!("Connecting to proxy database");

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .min_connections(0)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await
            .map_err(DbError::Connect)?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a device state handle.
    pub fn device_store(&self) -> DeviceStore {
        DeviceStore::new(self.pool.clone())
    }

    /// Get a to-device message handle.
    pub fn to_device_store(&self) -> ToDeviceStore {
        ToDeviceStore::new(self.pool.clone())
    }

    /// Close every connection held by this handle.
    pub async fn close(self) {
        self.pool.close().await;
    }
}
