//! crates/scheduler/src/error.rs
//! Process-level failures and their exit codes.

use std::io;

use thiserror::Error;

use crate::lock::LockError;

/// Exit codes of the puller binary.
///
/// Job failures never appear here: a run that mirrored nothing successfully
/// still exits [`ExitCode::Success`], because per-branch outcomes belong to
/// the tracking service, not the process status.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitCode {
    /// The batch ran (individual jobs may still have failed).
    Success,
    /// Usage, configuration, or environment failure before any work.
    Config,
    /// The run lock is held by another scheduler.
    LockHeld,
}

impl ExitCode {
    /// The numeric process exit code.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Config => 1,
            Self::LockHeld => 2,
        }
    }
}

/// Fatal scheduler failures (everything per-job is handled in the engine).
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The job stream could not be read.
    #[error("failed to read job stream {path}: {source}")]
    JobStream {
        /// The stream path as given on the command line.
        path: String,
        /// The underlying failure.
        #[source]
        source: io::Error,
    },
    /// Lock acquisition failed.
    #[error(transparent)]
    Lock(#[from] LockError),
}

impl SchedulerError {
    /// The exit code this failure maps to.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::JobStream { .. } | Self::Lock(LockError::Io { .. }) => ExitCode::Config,
            Self::Lock(LockError::Held { .. }) => ExitCode::LockHeld,
        }
    }
}
