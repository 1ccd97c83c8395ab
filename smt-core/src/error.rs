// SPDX-License-Identifier: MIT
//
// SMT Data Interaction Client

//! Error types for the SMT client
//!
//! Provides a unified error taxonomy using `thiserror` for ergonomic error handling.
//! Local failures (bad parameters, malformed ids, empty batches) are raised before
//! any request leaves the process; the rest originate on the platform or the wire.

pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for SMT client operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A request field has the wrong shape
    #[error("Invalid parameter '{field}': expected {expected}")]
    InvalidParameter {
        field: &'static str,
        expected: &'static str,
    },

    /// Composite tag id is missing `tagName` or `parentObjectId`
    #[error("Malformed tag identifier: {0}")]
    MalformedIdentifier(String),

    /// No tag in a set-data call carries pending samples
    #[error("No data to send")]
    NoDataToSend,

    /// Platform reports the data source as inactive
    #[error("Data source is not active")]
    SourceInactive,

    /// Platform error envelope carried a non-zero code
    #[error("Server returned an error: error_id: {code} {message}")]
    Server { code: i64, message: String },

    /// Network, HTTP status or response decoding failure
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    /// Configuration validation failed
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Underlying cause of a [`Error::Transport`]
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection, timeout, non-2xx status or undecodable body
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Body is JSON but lacks the expected envelope
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid(field: &'static str, expected: &'static str) -> Self {
        Error::InvalidParameter { field, expected }
    }

    /// True when the failure was detected before any network round-trip
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::InvalidParameter { .. }
                | Error::MalformedIdentifier(_)
                | Error::NoDataToSend
                | Error::Config(_)
        )
    }

    /// Platform error code, if this error came from the server envelope
    pub fn server_code(&self) -> Option<i64> {
        match self {
            Error::Server { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Check if the request timed out on the wire
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport(TransportError::Http(e)) if e.is_timeout())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(TransportError::Http(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Transport(TransportError::Decode(e))
    }
}
