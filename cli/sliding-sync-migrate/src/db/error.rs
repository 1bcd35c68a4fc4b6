//! Database error types.

use thiserror::Error;

use crate::error::ErrorKind;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to connect to the database.
    #[error("failed to connect to proxy database: {0}")]
    Connect(#[source] sqlx::Error),

    /// Failed to execute a statement or query.
    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// A row did not have the expected shape.
    #[error("failed to read row: {0}")]
    Decode(#[source] sqlx::Error),
}

impl DbError {
    /// Classify an error returned while fetching rows.
    pub(crate) fn from_fetch(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::Decode(_) => Self::Decode(err),
            other => Self::Query(other),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connect(_) | Self::Query(_) => ErrorKind::Connection,
            Self::Decode(_) => ErrorKind::Decode,
        }
    }
}
