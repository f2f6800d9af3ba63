//! crates/transport/src/directory.rs
//! Blocking RPC client for the external directory service.

use std::error::Error as _;
use std::io;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Result type for directory lookups.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Storage roots the directory service answers with for one identity.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct BranchRoots {
    /// Root of the user-writable hosted area.
    pub hosted_root: String,
    /// Root of the read-optimised mirrored area.
    pub mirrored_root: String,
}

/// Failures of a directory lookup.
///
/// `Timeout` and `MalformedResponse` are deliberately separate variants:
/// a slow endpoint is worth retrying, an endpoint answering garbage is not,
/// and callers must be able to tell the two apart.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The endpoint did not answer within the configured deadline.
    #[error("directory lookup timed out: {detail}")]
    Timeout {
        /// Transport-level diagnostic.
        detail: String,
    },
    /// The request failed below HTTP (DNS, connect, reset, ...).
    #[error("directory lookup failed: {detail}")]
    Transport {
        /// Transport-level diagnostic.
        detail: String,
    },
    /// The endpoint answered with a non-success status.
    #[error("directory service answered HTTP {status}")]
    Rejected {
        /// The HTTP status.
        status: u16,
    },
    /// The endpoint answered 2xx but the payload did not parse.
    #[error("malformed directory response: {detail}")]
    MalformedResponse {
        /// Parse diagnostic.
        detail: String,
    },
}

/// Resolves a branch identity to its storage roots.
///
/// Implementations block; a connectivity failure must propagate as an error
/// rather than being defaulted, since a wrong root would silently mirror
/// into the wrong place.
pub trait DirectoryService: Send + Sync {
    /// Looks up the hosted and mirrored roots for `(user_id, unique_name)`.
    fn resolve_branch_roots(&self, user_id: u64, unique_name: &str)
    -> DirectoryResult<BranchRoots>;
}

/// Production client POSTing `resolveBranchRoots` envelopes to the
/// configured endpoint.
pub struct HttpDirectoryClient {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpDirectoryClient {
    /// Creates a client for `endpoint` with a fixed per-request `timeout`.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            endpoint: endpoint.into(),
        }
    }
}

impl DirectoryService for HttpDirectoryClient {
    fn resolve_branch_roots(
        &self,
        user_id: u64,
        unique_name: &str,
    ) -> DirectoryResult<BranchRoots> {
        let body = json!({
            "method": "resolveBranchRoots",
            "params": [user_id, unique_name],
        });
        let response = match self.agent.post(&self.endpoint).send_json(body) {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(DirectoryError::Rejected { status });
            }
            Err(ureq::Error::Transport(transport)) => {
                let detail = transport.to_string();
                return Err(if transport_is_timeout(&transport) {
                    DirectoryError::Timeout { detail }
                } else {
                    DirectoryError::Transport { detail }
                });
            }
        };
        let payload = response
            .into_string()
            .map_err(|error| DirectoryError::Transport {
                detail: error.to_string(),
            })?;
        serde_json::from_str(&payload).map_err(|error| DirectoryError::MalformedResponse {
            detail: error.to_string(),
        })
    }
}

/// Walks the source chain looking for an I/O timeout.
fn transport_is_timeout(transport: &ureq::Transport) -> bool {
    let mut source = transport.source();
    while let Some(error) = source {
        if let Some(io_error) = error.downcast_ref::<io::Error>() {
            if matches!(
                io_error.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            ) {
                return true;
            }
        }
        source = error.source();
    }
    transport.to_string().contains("timed out")
}
