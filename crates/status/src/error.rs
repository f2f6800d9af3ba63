//! crates/status/src/error.rs
//! Error type for status delivery attempts.

use thiserror::Error;

/// Result type for status reporting calls.
pub type StatusResult<T> = Result<T, StatusError>;

/// A status notification that did not reach the tracking service.
#[derive(Debug, Error)]
pub enum StatusError {
    /// The service answered with a non-success status.
    #[error("tracking service answered HTTP {status} to {method}")]
    Rejected {
        /// RPC method that was being delivered.
        method: &'static str,
        /// HTTP status the service answered with.
        status: u16,
    },
    /// The request never completed (DNS, connect, timeout, ...).
    #[error("failed to deliver {method}: {detail}")]
    Transport {
        /// RPC method that was being delivered.
        method: &'static str,
        /// Transport-level diagnostic.
        detail: String,
    },
}
