//! crates/vcs/src/error.rs
//! Structured error values returned by the branch store backend.

use std::io;

use thiserror::Error;

/// Result type for branch store operations.
pub type BranchResult<T> = Result<T, BranchError>;

/// Errors produced by branch opening, reading, and mirroring primitives.
///
/// The enum is closed on purpose: the mirror engine classifies failures by
/// pattern-matching these variants, so every new failure mode must be added
/// here rather than smuggled through a stringly-typed catch-all.
#[derive(Debug, Error)]
pub enum BranchError {
    /// The remote source demanded credentials (HTTP 401 or 403).
    #[error("authentication required (HTTP {status})")]
    AuthRequired {
        /// Status code the remote answered with.
        status: u16,
    },
    /// A connection-level failure while talking to a remote source.
    #[error("socket error: {detail}")]
    Socket {
        /// Human-readable transport diagnostic.
        detail: String,
    },
    /// The branch predates the minimum format this subsystem mirrors.
    #[error("unsupported legacy format: {marker}")]
    LegacyFormat {
        /// The offending marker line, verbatim.
        marker: String,
    },
    /// A well-formed format marker naming a format we do not know.
    #[error("unknown format: {detail}")]
    UnknownFormat {
        /// The unrecognised marker line, verbatim.
        detail: String,
    },
    /// The location exists but holds no recognisable branch store.
    #[error("not a branch: {location}")]
    NotABranch {
        /// Location that failed to open.
        location: String,
    },
    /// SFTP sources are not mirrored; the owner must register another URL.
    #[error("sftp transport is not available")]
    SftpUnsupported,
    /// A control directory with no branch section inside it.
    ///
    /// Distinct from [`BranchError::NotABranch`]: the store metadata is
    /// present and valid, there is just no branch to operate on.
    #[error("no branch present at {location}")]
    NoBranchPresent {
        /// Location of the bare control directory.
        location: String,
    },
    /// The branch's format has no notion of stacking at all.
    #[error("branch format does not support stacking")]
    StackingUnsupported,
    /// Any other backend failure, passed through verbatim.
    #[error("{message}")]
    Backend {
        /// The backend's own diagnostic.
        message: String,
    },
    /// Local filesystem failure underneath the branch store.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl BranchError {
    /// Shorthand for a passthrough backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}
