//! # sliding-sync-migrate
//!
//! One-shot migration off the sliding-sync proxy for a single device.
//!
//! The tool runs four steps strictly in order and stops at the first failure:
//!
//! 1. Resolve the user and device behind an access token (`/account/whoami`).
//! 2. Delete the proxy's sync loop state for that device, in one transaction.
//! 3. Read the device's queued to-device messages, oldest first.
//! 4. Write an Element Desktop console script that replays those messages.
//!
//! The binary (`syncv3-migrate`) is a thin wrapper over [`pipeline::run`].

pub mod config;
pub mod db;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod script;
pub mod whoami;

pub use config::{AccessToken, Cli, Settings};
pub use db::{Database, DbConfig, DbError, DeviceMessage, ErasedRows};
pub use error::{ErrorKind, MigrateError};
pub use pipeline::MigrationReport;
pub use script::{ReplayScript, ScriptError};
pub use whoami::{Identity, WhoamiClient, WhoamiError};
