//! Command line and environment configuration.
//!
//! Handles:
//! - Access token and output path flags
//! - Homeserver URL and proxy database from `SYNCV3_SERVER` / `SYNCV3_DB`
//! - Validation of the four required inputs, reported all at once

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::db::DbConfig;
use crate::error::ErrorKind;

/// Long flags that may be spelled with a single dash (`-accessToken`).
const LONG_FLAGS: &[&str] = &[
    "accessToken",
    "elementDesktopJs",
    "server",
    "db",
    "timeout-secs",
    "log-level",
];

/// Clean up a device's sliding-sync proxy state and export its queued
/// to-device messages as an Element Desktop console script.
#[derive(Debug, Parser)]
#[command(name = "syncv3-migrate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Matrix access token of the device being migrated.
    #[arg(long = "accessToken", value_name = "TOKEN")]
    pub access_token: Option<String>,

    /// Output file for Element Desktop's JS console.
    #[arg(long = "elementDesktopJs", value_name = "PATH")]
    pub element_desktop_js: Option<PathBuf>,

    /// Homeserver base URL.
    #[arg(long, env = "SYNCV3_SERVER", value_name = "URL")]
    pub server: Option<String>,

    /// Connection string of the proxy's Postgres database.
    #[arg(long, env = "SYNCV3_DB", value_name = "DSN", hide_env_values = true)]
    pub db: Option<String>,

    /// Give up on the whoami request after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, env = "SYNCV3_MIGRATE_LOG", default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Parse arguments, accepting single-dash long flags.
    pub fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_args(args))
    }

    /// Check that every required input is present and build the run settings.
    pub fn into_settings(self) -> Result<Settings, ConfigError> {
        let access_token = non_empty(self.access_token);
        let output_path = self
            .element_desktop_js
            .filter(|path| !path.as_os_str().is_empty());
        let homeserver = non_empty(self.server);
        let database_url = non_empty(self.db);

        let mut missing = Vec::new();
        if access_token.is_none() {
            missing.push(MissingInput::AccessToken);
        }
        if output_path.is_none() {
            missing.push(MissingInput::OutputPath);
        }
        if homeserver.is_none() {
            missing.push(MissingInput::Homeserver);
        }
        if database_url.is_none() {
            missing.push(MissingInput::Database);
        }

        match (access_token, output_path, homeserver, database_url) {
            (Some(token), Some(output_path), Some(homeserver), Some(database_url)) => {
                Ok(Settings {
                    access_token: AccessToken::new(token),
                    output_path,
                    homeserver,
                    database: DbConfig {
                        database_url,
                        ..Default::default()
                    },
                    request_timeout: self.timeout_secs.map(Duration::from_secs),
                })
            }
            _ => Err(ConfigError::Missing(missing)),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Rewrite `-accessToken` style flags into the `--accessToken` form clap expects.
///
/// Only names listed in [`LONG_FLAGS`] are touched, and nothing after a bare `--`.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut out = Vec::new();
    let mut passthrough = false;

    for arg in args.into_iter().map(Into::into) {
        if passthrough {
            out.push(arg);
            continue;
        }
        if arg == "--" {
            passthrough = true;
            out.push(arg);
            continue;
        }

        let rewritten = arg.to_str().and_then(|s| {
            let rest = s.strip_prefix('-')?;
            if rest.starts_with('-') {
                return None;
            }
            let name = rest.split_once('=').map_or(rest, |(name, _)| name);
            LONG_FLAGS
                .contains(&name)
                .then(|| OsString::from(format!("-{s}")))
        });
        out.push(rewritten.unwrap_or(arg));
    }

    out
}

/// Validated inputs for one migration run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub access_token: AccessToken,
    pub output_path: PathBuf,
    pub homeserver: String,
    pub database: DbConfig,
    pub request_timeout: Option<Duration>,
}

/// Bearer token for the homeserver. Never printed.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// A required input that was not supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingInput {
    AccessToken,
    OutputPath,
    Homeserver,
    Database,
}

impl fmt::Display for MissingInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessToken => f.write_str("Missing -accessToken command line flag"),
            Self::OutputPath => f.write_str("Missing -elementDesktopJs command line flag"),
            Self::Homeserver => f.write_str("Missing SYNCV3_SERVER environment variable"),
            Self::Database => f.write_str("Missing SYNCV3_DB environment variable"),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{}", join_missing(.0))]
    Missing(Vec<MissingInput>),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

fn join_missing(missing: &[MissingInput]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["syncv3-migrate"];
        argv.extend_from_slice(args);
        Cli::try_parse_args(argv).unwrap()
    }

    #[test]
    fn test_normalize_single_dash_long_flags() {
        let args = normalize_args([
            "syncv3-migrate",
            "-accessToken",
            "syt_abc",
            "-elementDesktopJs=out.js",
            "--server",
            "https://hs",
        ]);
        assert_eq!(
            args,
            vec![
                "syncv3-migrate",
                "--accessToken",
                "syt_abc",
                "--elementDesktopJs=out.js",
                "--server",
                "https://hs",
            ]
        );
    }

    #[test]
    fn test_normalize_leaves_unknown_and_passthrough_alone() {
        let args = normalize_args(["bin", "-h", "-V", "--", "-accessToken"]);
        assert_eq!(args, vec!["bin", "-h", "-V", "--", "-accessToken"]);
    }

    #[test]
    fn test_go_style_flags_parse() {
        let parsed = cli(&[
            "-accessToken",
            "syt_abc",
            "-elementDesktopJs",
            "replay.js",
            "-server",
            "https://matrix.example.org",
            "-db",
            "postgres://proxy@localhost/syncv3",
        ]);
        let settings = parsed.into_settings().unwrap();
        assert_eq!(settings.access_token.expose(), "syt_abc");
        assert_eq!(settings.output_path, PathBuf::from("replay.js"));
        assert_eq!(settings.homeserver, "https://matrix.example.org");
        assert_eq!(
            settings.database.database_url,
            "postgres://proxy@localhost/syncv3"
        );
        assert!(settings.request_timeout.is_none());
    }

    #[rstest]
    #[case::token(&["-elementDesktopJs", "o.js", "-server", "s", "-db", "d"], vec![MissingInput::AccessToken])]
    #[case::output(&["-accessToken", "t", "-server", "s", "-db", "d"], vec![MissingInput::OutputPath])]
    #[case::server(&["-accessToken", "t", "-elementDesktopJs", "o.js", "-db", "d"], vec![MissingInput::Homeserver])]
    #[case::db(&["-accessToken", "t", "-elementDesktopJs", "o.js", "-server", "s"], vec![MissingInput::Database])]
    #[case::empty_token(&["-accessToken", "", "-elementDesktopJs", "o.js", "-server", "s", "-db", "d"], vec![MissingInput::AccessToken])]
    fn test_missing_input_reported(#[case] args: &[&str], #[case] expected: Vec<MissingInput>) {
        // Flags are passed explicitly so a SYNCV3_* variable in the test
        // environment does not mask the missing one.
        let mut parsed = cli(args);
        if !args.contains(&"-server") {
            parsed.server = None;
        }
        if !args.contains(&"-db") {
            parsed.db = None;
        }

        match parsed.into_settings() {
            Err(ConfigError::Missing(missing)) => assert_eq!(missing, expected),
            other => panic!("expected missing input error, got {other:?}"),
        }
    }

    #[test]
    fn test_all_missing_reported_together() {
        let parsed = Cli {
            access_token: None,
            element_desktop_js: None,
            server: None,
            db: None,
            timeout_secs: None,
            log_level: "warn".to_string(),
        };
        let err = parsed.into_settings().unwrap_err();
        let message = err.to_string();
        assert_eq!(message.lines().count(), 4);
        assert!(message.contains("-accessToken"));
        assert!(message.contains("-elementDesktopJs"));
        assert!(message.contains("SYNCV3_SERVER"));
        assert!(message.contains("SYNCV3_DB"));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_timeout_flag() {
        let parsed = cli(&[
            "-accessToken",
            "t",
            "-elementDesktopJs",
            "o.js",
            "-server",
            "s",
            "-db",
            "d",
            "-timeout-secs",
            "30",
        ]);
        let settings = parsed.into_settings().unwrap();
        assert_eq!(settings.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("syt_secret");
        assert!(!format!("{token:?}").contains("syt_secret"));
    }
}
