//! The migration run: resolve, erase, extract, emit.
//!
//! Each step must succeed before the next one starts. The first error ends
//! the run; nothing is retried and nothing already done is undone. The output
//! file is only written once every message has been read.

use std::path::PathBuf;

use tracing::{info, instrument};

use crate::config::{Cli, Settings};
use crate::db::{Database, DbConfig, DeviceMessage, ErasedRows};
use crate::error::MigrateError;
use crate::output::{print_info, print_step, print_success};
use crate::script::{progress_label, ReplayScript};
use crate::whoami::{Identity, WhoamiClient};

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub identity: Identity,
    pub erased: ErasedRows,
    pub messages: usize,
    pub output_path: PathBuf,
}

/// Validate parsed arguments, then run the migration.
///
/// Missing inputs are rejected before any network or database access.
pub async fn run_cli(cli: Cli) -> Result<MigrationReport, MigrateError> {
    let settings = cli.into_settings()?;
    run(&settings).await
}

/// Run all four steps for the device behind `settings.access_token`.
pub async fn run(settings: &Settings) -> Result<MigrationReport, MigrateError> {
    print_info(&format!("Homeserver URL: {}", settings.homeserver));

    print_step("Identifying user and device IDs...");
    let identity = resolve_identity(settings).await?;
    print_info(&format!("User ID: {}", identity.user_id));
    print_info(&format!("Device ID: {}", identity.device_id));

    print_step("Cleaning up sync loop in proxy...");
    let erased = erase_device_state(&settings.database, &identity).await?;
    print_info(&erased_summary(&erased));

    print_step("Extracting to-device messages...");
    let messages = extract_messages(&settings.database, &identity).await?;
    print_info(&format!("Got {} messages to re-send.", messages.len()));

    let script = build_script(&messages);

    print_step("Writing JS file for Element Desktop...");
    script.write_to(&settings.output_path)?;

    print_success(
        "Done! You can start your sliding sync proxy now. \
         You will need to manually copy/paste the Element Desktop JS file.",
    );

    Ok(MigrationReport {
        identity,
        erased,
        messages: script.len(),
        output_path: settings.output_path.clone(),
    })
}

/// Look up the user and device behind the access token.
#[instrument(skip_all, fields(homeserver = %settings.homeserver))]
pub async fn resolve_identity(settings: &Settings) -> Result<Identity, MigrateError> {
    let client = WhoamiClient::new(
        &settings.homeserver,
        &settings.access_token,
        settings.request_timeout,
    )?;
    let identity = client.whoami().await?;

    info!(user_id = %identity.user_id, device_id = %identity.device_id, "Resolved identity");
    Ok(identity)
}

/// Remove the proxy's sync loop and token for the device.
#[instrument(skip_all, fields(user_id = %identity.user_id, device_id = %identity.device_id))]
pub async fn erase_device_state(
    config: &DbConfig,
    identity: &Identity,
) -> Result<ErasedRows, MigrateError> {
    let db = Database::connect(config).await?;
    let result = db.device_store().erase(identity).await;
    db.close().await;

    Ok(result?)
}

/// Read the device's queued to-device messages, oldest first.
#[instrument(skip_all, fields(user_id = %identity.user_id, device_id = %identity.device_id))]
pub async fn extract_messages(
    config: &DbConfig,
    identity: &Identity,
) -> Result<Vec<DeviceMessage>, MigrateError> {
    let db = Database::connect(config).await?;
    let result = db.to_device_store().messages_for(identity).await;
    db.close().await;

    Ok(result?)
}

/// Render the replay script, reporting each message as it is added.
pub fn build_script(messages: &[DeviceMessage]) -> ReplayScript {
    ReplayScript::render(messages, |message, number, total| {
        println!("Copying {}... OK", progress_label(message, number, total));
        info!(position = message.position, number, total, "Added message to script");
    })
}

/// Operator summary of what the eraser removed.
pub fn erased_summary(erased: &ErasedRows) -> String {
    format!(
        "Removed {} sync loop row(s) and {} token row(s)",
        erased.devices, erased.tokens
    )
}
