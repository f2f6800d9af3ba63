#![deny(unsafe_code)]

//! Shared test doubles and fixtures for the branchmirror workspace.
//!
//! Everything here exists so the mirroring crates can test their contracts
//! without a network or a tracking service: a reporter that records calls in
//! order, a reporter that always fails delivery, a branch opener scripted to
//! fail with a chosen backend error, and branch fixture builders.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use status::{StatusReporter, StatusResult};
use vcs::{
    Branch, BranchError, BranchOpener, BranchResult, DefaultOpener, FormatDescriptor, LocalBranch,
    Revision, RevisionId,
};

/// One recorded status call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// `startMirroring(branch_id)`
    Start(u64),
    /// `mirrorComplete(branch_id, last_revision)`
    Complete(u64, String),
    /// `mirrorFailed(branch_id, reason)`
    Failed(u64, String),
}

/// Reporter that records every call, in order, across threads.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<Event>>,
}

impl RecordingReporter {
    /// The calls recorded so far, in delivery order.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("reporter lock poisoned").clone()
    }

    fn record(&self, event: Event) {
        self.events.lock().expect("reporter lock poisoned").push(event);
    }
}

impl StatusReporter for RecordingReporter {
    fn start_mirroring(&self, branch_id: u64) -> StatusResult<()> {
        self.record(Event::Start(branch_id));
        Ok(())
    }

    fn mirror_complete(&self, branch_id: u64, last_revision: &str) -> StatusResult<()> {
        self.record(Event::Complete(branch_id, last_revision.to_owned()));
        Ok(())
    }

    fn mirror_failed(&self, branch_id: u64, reason: &str) -> StatusResult<()> {
        self.record(Event::Failed(branch_id, reason.to_owned()));
        Ok(())
    }
}

/// Reporter whose every delivery fails, for exercising the warn-and-continue
/// path.
pub struct FailingReporter;

impl StatusReporter for FailingReporter {
    fn start_mirroring(&self, _branch_id: u64) -> StatusResult<()> {
        Err(undeliverable("startMirroring"))
    }

    fn mirror_complete(&self, _branch_id: u64, _last_revision: &str) -> StatusResult<()> {
        Err(undeliverable("mirrorComplete"))
    }

    fn mirror_failed(&self, _branch_id: u64, _reason: &str) -> StatusResult<()> {
        Err(undeliverable("mirrorFailed"))
    }
}

fn undeliverable(method: &'static str) -> status::StatusError {
    status::StatusError::Transport {
        method,
        detail: "test reporter drops everything".to_owned(),
    }
}

/// Opener scripted to fail every open with a copy of the given error.
pub struct ScriptedOpener {
    make_error: Box<dyn Fn() -> BranchError + Send + Sync>,
}

impl ScriptedOpener {
    /// An opener that always fails with (a fresh copy of) `error`.
    #[must_use]
    pub fn failing(error: BranchError) -> Self {
        let template = Arc::new(error);
        Self {
            make_error: Box::new(move || clone_error(&template)),
        }
    }
}

impl BranchOpener for ScriptedOpener {
    fn open_branch(&self, _location: &str) -> BranchResult<Box<dyn Branch>> {
        Err((self.make_error)())
    }
}

// BranchError is not Clone (it can carry io::Error), so the scripted opener
// rebuilds the variants tests actually use.
fn clone_error(error: &BranchError) -> BranchError {
    match error {
        BranchError::AuthRequired { status } => BranchError::AuthRequired { status: *status },
        BranchError::Socket { detail } => BranchError::Socket {
            detail: detail.clone(),
        },
        BranchError::LegacyFormat { marker } => BranchError::LegacyFormat {
            marker: marker.clone(),
        },
        BranchError::UnknownFormat { detail } => BranchError::UnknownFormat {
            detail: detail.clone(),
        },
        BranchError::NotABranch { location } => BranchError::NotABranch {
            location: location.clone(),
        },
        BranchError::SftpUnsupported => BranchError::SftpUnsupported,
        BranchError::NoBranchPresent { location } => BranchError::NoBranchPresent {
            location: location.clone(),
        },
        BranchError::StackingUnsupported => BranchError::StackingUnsupported,
        BranchError::Backend { message } => BranchError::Backend {
            message: message.clone(),
        },
        BranchError::Io(io_error) => {
            BranchError::Io(std::io::Error::new(io_error.kind(), io_error.to_string()))
        }
    }
}

/// A production opener with a short test-friendly timeout.
#[must_use]
pub fn local_opener() -> Arc<dyn BranchOpener> {
    Arc::new(DefaultOpener::new(Duration::from_secs(5)))
}

/// Creates a branch at `path` with a linear history of the given ids, the
/// last one becoming the tip.
pub fn branch_with_history(path: &Path, ids: &[&str]) -> LocalBranch {
    let branch = LocalBranch::create(path, &FormatDescriptor::current())
        .expect("fixture branch creation failed");
    let mut parent: Option<&str> = None;
    for id in ids {
        branch
            .add_revision(&Revision {
                id: RevisionId::new(*id),
                parent: parent.map(RevisionId::new),
            })
            .expect("fixture revision append failed");
        parent = Some(id);
    }
    if let Some(tip) = ids.last() {
        branch
            .set_last_revision(&RevisionId::new(*tip))
            .expect("fixture tip update failed");
    }
    branch
}
