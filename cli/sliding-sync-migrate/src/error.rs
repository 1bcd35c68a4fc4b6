//! Error handling and display for the migration.

use colored::Colorize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::db::DbError;
use crate::script::ScriptError;
use crate::whoami::WhoamiError;

/// Exit code for missing inputs or an unusable command line.
pub const EXIT_USAGE: i32 = 1;

/// Broad category of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing inputs, rejected credentials, unusable identity fields.
    Validation,
    /// HTTP or database transport failures.
    Connection,
    /// Malformed JSON or unreadable rows.
    Decode,
    /// Output file creation or write failures.
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Connection => "connection",
            Self::Decode => "decode",
            Self::Io => "io",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed migration run, tagged with the step that failed.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Identity(#[from] WhoamiError),

    #[error("{0}")]
    Store(#[from] DbError),

    #[error("{0}")]
    Output(#[from] ScriptError),
}

impl MigrateError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => EXIT_USAGE,
            Self::Identity(_) => 2,
            Self::Store(_) => 3,
            Self::Output(_) => 5,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(err) => err.kind(),
            Self::Identity(err) => err.kind(),
            Self::Store(err) => err.kind(),
            Self::Output(err) => err.kind(),
        }
    }
}

/// Report a failed run: a structured event on stderr, then the message on stdout.
pub fn report_failure(err: &MigrateError) {
    tracing::error!(
        kind = %err.kind(),
        exit_code = err.exit_code(),
        error = %err,
        "Migration failed"
    );
    print_error(err);
}

/// Text of a command line parse error, without terminal styling.
pub fn usage_error_text(err: &clap::Error) -> String {
    err.render().to_string()
}

/// Print a command line parse error to stdout with the other errors.
pub fn print_usage_error(err: &clap::Error) {
    print!("{}", usage_error_text(err));
}

/// Print an error in a user-friendly format.
///
/// Errors go to stdout alongside the progress output.
pub fn print_error(err: &MigrateError) {
    for line in err.to_string().lines() {
        println!("{} {}", "Error:".red().bold(), line);
    }

    let hint = match err {
        MigrateError::Config(ConfigError::Missing(_)) => {
            Some("Pass -accessToken and -elementDesktopJs, and export SYNCV3_SERVER and SYNCV3_DB.")
        }
        MigrateError::Identity(WhoamiError::Rejected {
            status: 401 | 403, ..
        }) => {
            Some("The access token is invalid or logged out. Use a token for a live session.")
        }
        MigrateError::Identity(WhoamiError::Transport(_)) => {
            Some("Check SYNCV3_SERVER and your network connection.")
        }
        MigrateError::Store(DbError::Connect(_)) => {
            Some("Check SYNCV3_DB points at the proxy's Postgres database.")
        }
        _ => None,
    };

    if let Some(hint) = hint {
        println!("\n{}", format!("Hint: {hint}").yellow());
    }
}
