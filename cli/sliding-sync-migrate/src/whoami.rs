//! Identity resolution against the homeserver's `/account/whoami` endpoint.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::config::AccessToken;
use crate::error::ErrorKind;

/// Client-server API path of the identity endpoint.
pub const WHOAMI_PATH: &str = "/_matrix/client/v3/account/whoami";

/// The user and device an access token belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub device_id: String,
}

impl Identity {
    /// Build an identity, rejecting empty ids.
    pub fn new(
        user_id: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Result<Self, WhoamiError> {
        let user_id = user_id.into();
        let device_id = device_id.into();

        if user_id.is_empty() || device_id.is_empty() {
            return Err(WhoamiError::EmptyField { user_id, device_id });
        }

        Ok(Self { user_id, device_id })
    }
}

/// Identity resolution errors.
#[derive(Debug, Error)]
pub enum WhoamiError {
    #[error("access token cannot be sent as an HTTP header")]
    InvalidToken,

    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("whoami request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("{}{}", describe_status(.status), describe_matrix_error(.errcode, .message))]
    Rejected {
        status: u16,
        errcode: Option<String>,
        message: Option<String>,
    },

    #[error("whoami response is not a JSON object: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("whoami response has no `{0}` field")]
    MissingField(&'static str),

    #[error("whoami response field `{field}` is {found}, expected a string")]
    WrongType {
        field: &'static str,
        found: &'static str,
    },

    #[error("User or Device ID is empty (user ID: {user_id:?}, device ID: {device_id:?})")]
    EmptyField { user_id: String, device_id: String },
}

impl WhoamiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Client(_) | Self::Transport(_) => ErrorKind::Connection,
            Self::Rejected { status, .. } if *status >= 500 => ErrorKind::Connection,
            Self::Decode(_) => ErrorKind::Decode,
            Self::InvalidToken
            | Self::Rejected { .. }
            | Self::MissingField(_)
            | Self::WrongType { .. }
            | Self::EmptyField { .. } => ErrorKind::Validation,
        }
    }
}

fn describe_status(status: &u16) -> String {
    match *status {
        401 | 403 => format!("homeserver rejected the access token (HTTP {status})"),
        _ => format!("whoami returned HTTP {status}"),
    }
}

fn describe_matrix_error(errcode: &Option<String>, message: &Option<String>) -> String {
    match (errcode, message) {
        (Some(code), Some(message)) => format!(": {code}: {message}"),
        (Some(code), None) => format!(": {code}"),
        (None, Some(message)) => format!(": {message}"),
        (None, None) => String::new(),
    }
}

/// Standard Matrix error body.
#[derive(Debug, Default, Deserialize)]
struct MatrixErrorResponse {
    #[serde(default)]
    errcode: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client bound to one homeserver and one access token.
#[derive(Debug, Clone)]
pub struct WhoamiClient {
    client: reqwest::Client,
    base_url: String,
}

impl WhoamiClient {
    /// Create a client that sends `token` as a bearer credential.
    pub fn new(
        homeserver: &str,
        token: &AccessToken,
        timeout: Option<Duration>,
    ) -> Result<Self, WhoamiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
            .map_err(|_| WhoamiError::InvalidToken)?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(WhoamiError::Client)?;

        Ok(Self {
            client,
            base_url: homeserver.trim_end_matches('/').to_string(),
        })
    }

    /// Build a URL for an endpoint.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Ask the homeserver who the token belongs to.
    pub async fn whoami(&self) -> Result<Identity, WhoamiError> {
        let url = self.url(WHOAMI_PATH);
        debug!(%url, "Requesting identity");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(WhoamiError::Transport)?;

        let status = response.status();
        let body = response.bytes().await.map_err(WhoamiError::Transport)?;

        if !status.is_success() {
            let error: MatrixErrorResponse = serde_json::from_slice(&body).unwrap_or_default();
            return Err(WhoamiError::Rejected {
                status: status.as_u16(),
                errcode: error.errcode,
                message: error.error,
            });
        }

        identity_from_body(&body)
    }
}

/// Extract the identity from a whoami response body.
///
/// The body is read as a generic JSON object; `user_id` and `device_id` must
/// be present, string-typed and non-empty.
pub fn identity_from_body(body: &[u8]) -> Result<Identity, WhoamiError> {
    let fields: Map<String, Value> = serde_json::from_slice(body).map_err(WhoamiError::Decode)?;

    let user_id = string_field(&fields, "user_id")?;
    let device_id = string_field(&fields, "device_id")?;

    Identity::new(user_id, device_id)
}

fn string_field<'a>(
    fields: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, WhoamiError> {
    match fields.get(field) {
        Some(Value::String(value)) => Ok(value.as_str()),
        Some(other) => Err(WhoamiError::WrongType {
            field,
            found: json_type_name(other),
        }),
        None => Err(WhoamiError::MissingField(field)),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
