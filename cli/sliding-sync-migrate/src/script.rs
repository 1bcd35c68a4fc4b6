//! Element Desktop replay script.
//!
//! The script is pasted into Element Desktop's developer console. For every
//! queued message it logs a progress line and feeds the message to the
//! client's sync processing as a synthetic sync response holding exactly that
//! one to-device event.

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::db::DeviceMessage;
use crate::error::ErrorKind;

/// First line of every script.
pub const HEADER: &str = "// Copy and paste this whole file into your Element Desktop JS Console\n";

const REPLAY_PREFIX: &str =
    "await mxMatrixClientPeg.get().syncApi.processSyncResponse({}, {\"to_device\": {\"events\": [";
const REPLAY_SUFFIX: &str = "]}});\n";

/// Output file errors.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to create temporary file next to {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to move script into place at {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScriptError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Io
    }
}

/// Console script replaying a device's queued to-device messages in order.
#[derive(Debug, Clone)]
pub struct ReplayScript {
    text: String,
    messages: usize,
}

impl Default for ReplayScript {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayScript {
    /// Start a script containing only the header comment.
    pub fn new() -> Self {
        Self {
            text: HEADER.to_string(),
            messages: 0,
        }
    }

    /// Render a complete script for `messages`, keeping their order.
    ///
    /// `on_message` sees each message with its 1-based number and the total,
    /// after its statements have been appended.
    pub fn render<F>(messages: &[DeviceMessage], mut on_message: F) -> Self
    where
        F: FnMut(&DeviceMessage, usize, usize),
    {
        let total = messages.len();
        let mut script = Self::new();
        for (index, message) in messages.iter().enumerate() {
            let number = index + 1;
            script.push(message, number, total);
            on_message(message, number, total);
        }
        script
    }

    /// Append the log and replay statements for one message.
    ///
    /// `number` is the 1-based position of the message among `total`.
    pub fn push(&mut self, message: &DeviceMessage, number: usize, total: usize) {
        self.text.push_str(&log_statement(message, number, total));
        self.text.push_str(&replay_statement(message));
        self.messages += 1;
    }

    /// Number of messages in the script.
    pub fn len(&self) -> usize {
        self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages == 0
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Write the script to `path`, replacing any existing file.
    ///
    /// The text goes to a temporary file in the same directory which is then
    /// renamed over `path`, so the target is either untouched or complete.
    pub fn write_to(&self, path: &Path) -> Result<(), ScriptError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = tempfile::Builder::new()
            .prefix(".syncv3-migrate-")
            .suffix(".js.tmp")
            .tempfile_in(dir)
            .map_err(|source| ScriptError::Create {
                path: path.to_path_buf(),
                source,
            })?;

        file.write_all(self.text.as_bytes())
            .and_then(|()| file.as_file().sync_all())
            .map_err(|source| ScriptError::Write {
                path: path.to_path_buf(),
                source,
            })?;

        file.persist(path).map_err(|err| ScriptError::Persist {
            path: path.to_path_buf(),
            source: err.error,
        })?;

        debug!(path = %path.display(), bytes = self.text.len(), "Wrote replay script");
        Ok(())
    }
}

/// Human readable progress text for one message.
pub fn progress_label(message: &DeviceMessage, number: usize, total: usize) -> String {
    format!(
        "{} message from {} ({}/{})",
        message.event_type, message.sender, number, total
    )
}

/// `console.log` statement announcing a message.
///
/// The text is emitted as a JSON string literal, which is also a valid
/// JavaScript string literal, so quotes in senders or event types are safe.
pub fn log_statement(message: &DeviceMessage, number: usize, total: usize) -> String {
    let text = format!("Importing {}", progress_label(message, number, total));
    let literal = serde_json::Value::String(text).to_string();
    format!("console.log({literal});\n")
}

/// Statement feeding one raw to-device event into the client's sync processing.
pub fn replay_statement(message: &DeviceMessage) -> String {
    let mut statement =
        String::with_capacity(REPLAY_PREFIX.len() + message.message.len() + REPLAY_SUFFIX.len());
    statement.push_str(REPLAY_PREFIX);
    statement.push_str(&message.message);
    statement.push_str(REPLAY_SUFFIX);
    statement
}
