//! crates/daemon/src/error.rs
//! Frontend failures and their exit codes.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Result type for daemon orchestration.
pub type DaemonResult<T> = Result<T, DaemonError>;

/// Exit code for usage and configuration failures.
pub const EXIT_CONFIG: i32 = 1;
/// Exit code for socket-level failures (bind, accept).
pub const EXIT_SOCKET: i32 = 10;

/// Unrecoverable serving-frontend failures.
///
/// Session-level trouble never lands here; a failed session is logged and
/// the frontend keeps serving.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// The `--port` specification did not parse.
    #[error("invalid port specification '{spec}': {detail}")]
    InvalidPort {
        /// The specification as given.
        spec: String,
        /// What was wrong with it.
        detail: String,
    },
    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The requested address.
        addr: SocketAddr,
        /// The underlying failure.
        #[source]
        source: io::Error,
    },
    /// The listener stopped accepting connections.
    #[error("failed to accept connection: {source}")]
    Accept {
        /// The underlying failure.
        #[source]
        source: io::Error,
    },
    /// Any other I/O failure during orchestration.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl DaemonError {
    /// The process exit code this failure maps to.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidPort { .. } => EXIT_CONFIG,
            Self::Bind { .. } | Self::Accept { .. } | Self::Io(_) => EXIT_SOCKET,
        }
    }
}
