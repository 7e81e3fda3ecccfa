//! Unified error types for hamclub.
//!
//! Display strings carry a stable code prefix so the command layer can
//! surface them to users unchanged.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the cache, the guild store and the command tools.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., non-text upload).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Derived data was attached to a URL that has no cache entry.
    #[error("NOT_CACHED: {0} is not in the cache")]
    NotCached(String),

    /// A stored record could not be decoded or rendered.
    #[error("INVALID_RECORD: {0}")]
    InvalidRecord(String),

    /// The guild already holds the maximum number of records.
    #[error("RECORD_LIMIT: at most {0} records may be stored")]
    RecordLimit(usize),

    /// Database operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Transport failure or non-success HTTP status.
    #[error("FETCH_ERROR: {0}")]
    HttpError(String),
}

impl Error {
    /// True for the errors produced while fetching remote content.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidUrl(_) | Error::FetchTimeout(_) | Error::FetchTooLarge(_) | Error::HttpError(_)
        )
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidRecord(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::InvalidRecord(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::NotCached(_) => -32001,
            Error::Database(_) | Error::MigrationFailed(_) => -32002,
            Error::InvalidUrl(_) => -32003,
            Error::InvalidRecord(_) => -32004,
            Error::RecordLimit(_) => -32005,
            Error::FetchTimeout(_) => -32006,
            Error::FetchTooLarge(_) => -32007,
            Error::HttpError(_) => -32008,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
