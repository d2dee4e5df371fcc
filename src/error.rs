//! Error types for slotload
//!
//! Two layers of errors live here:
//! - [`Error`] is returned from fallible public operations (configuration, composite
//!   construction, request parsing).
//! - [`FetchError`] is the closed taxonomy of fetch failures reported by the engine. It is
//!   never returned from slot operations; it travels inside task results and events and
//!   is inspected by the retry policy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for slotload operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for slotload
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "event_capacity")
        key: Option<String>,
    },

    /// A composite task was constructed without any member tasks
    #[error("composite task requires at least one fetch task")]
    EmptyTaskSet,

    /// A request URL could not be parsed
    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// I/O error (reading configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure reported by a fetch task
///
/// The first four variants are connectivity-class failures and are the only ones the
/// auto-retry policy acts on. Everything else is surfaced to observers and left alone.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FetchError {
    /// The device has no network connection
    #[error("not connected to the internet")]
    NotConnected,

    /// The request timed out
    #[error("request timed out")]
    TimedOut,

    /// The remote host could not be reached
    #[error("cannot connect to host")]
    CannotConnectToHost,

    /// The connection dropped mid-transfer
    #[error("network connection lost")]
    ConnectionLost,

    /// The payload arrived but could not be decoded
    #[error("decoding failed: {0}")]
    Decoding(String),

    /// The task was cancelled before it completed
    #[error("fetch cancelled")]
    Cancelled,

    /// Any other engine failure
    #[error("engine error: {0}")]
    Engine(String),
}

impl FetchError {
    /// Returns true for connectivity-class failures
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            FetchError::NotConnected
                | FetchError::TimedOut
                | FetchError::CannotConnectToHost
                | FetchError::ConnectionLost
        )
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::TimedOut => FetchError::TimedOut,
            ErrorKind::NotConnected => FetchError::NotConnected,
            ErrorKind::ConnectionRefused | ErrorKind::HostUnreachable => {
                FetchError::CannotConnectToHost
            }
            ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe => {
                FetchError::ConnectionLost
            }
            ErrorKind::InvalidData => FetchError::Decoding(err.to_string()),
            _ => FetchError::Engine(err.to_string()),
        }
    }
}
