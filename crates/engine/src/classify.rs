//! crates/engine/src/classify.rs
//! The failure taxonomy: backend errors to user-visible categories.
//!
//! The tracking service is the single source of truth for "why did my branch
//! fail to mirror", and these messages are its entire vocabulary. Downstream
//! tooling parses them, so the mapping below is stable: changing a string
//! here is a breaking interface change.

use vcs::BranchError;

/// Closed set of user-visible failure categories.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FailureCategory {
    /// The source demanded credentials the mirror does not have.
    AuthRequired,
    /// Connection-level failure talking to the source.
    Socket,
    /// Source predates the minimum supported format.
    LegacyFormat,
    /// The source location does not hold a branch.
    NotABranch,
    /// Well-formed but unrecognised format marker.
    UnknownFormat,
    /// SFTP source registered where only HTTP is mirrored.
    SftpUnsupported,
    /// The per-job deadline expired.
    Timeout,
    /// Everything else, passed through from the backend.
    Backend,
}

/// A classified failure: category plus the message reported downstream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifiedFailure {
    /// Which taxonomy row this failure landed in.
    pub category: FailureCategory,
    /// The message delivered via `mirrorFailed`, verbatim.
    pub message: String,
}

impl ClassifiedFailure {
    fn new(category: FailureCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

/// Maps one backend error to its fixed category and message.
pub fn classify(error: &BranchError) -> ClassifiedFailure {
    match error {
        BranchError::AuthRequired { .. } => ClassifiedFailure::new(
            FailureCategory::AuthRequired,
            "private branch, authentication required",
        ),
        BranchError::Socket { detail } => {
            ClassifiedFailure::new(FailureCategory::Socket, format!("socket error: {detail}"))
        }
        BranchError::LegacyFormat { .. } => {
            ClassifiedFailure::new(FailureCategory::LegacyFormat, "unsupported legacy format")
        }
        BranchError::UnknownFormat { detail } => ClassifiedFailure::new(
            FailureCategory::UnknownFormat,
            format!("unknown format: {detail}"),
        ),
        // Covers both a corrupt format marker and a plain directory that was
        // never a branch: either way the underlying "not a branch" message
        // passes through.
        BranchError::NotABranch { .. } => {
            ClassifiedFailure::new(FailureCategory::NotABranch, error.to_string())
        }
        BranchError::SftpUnsupported => ClassifiedFailure::new(
            FailureCategory::SftpUnsupported,
            "SFTP mirroring unsupported, register an HTTP location",
        ),
        BranchError::NoBranchPresent { .. }
        | BranchError::StackingUnsupported
        | BranchError::Backend { .. }
        | BranchError::Io(_) => {
            ClassifiedFailure::new(FailureCategory::Backend, error.to_string())
        }
    }
}
