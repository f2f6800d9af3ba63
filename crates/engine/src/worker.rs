//! crates/engine/src/worker.rs
//! One branch, one worker, one terminal report.

use std::path::PathBuf;
use std::sync::Arc;

use status::StatusReporter;
use vcs::{
    Branch, BranchError, BranchOpener, BranchResult, LocalBranch, RevisionId, StackingResolution,
    resolve_stacked_on,
};

use crate::classify::{ClassifiedFailure, FailureCategory, classify};
use crate::deadline::Deadline;

/// Terminal outcome of one mirror job. Produced exactly once per run,
/// reported once, then discarded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MirrorOutcome {
    /// The destination now matches the source.
    Success {
        /// The destination tip after the pull.
        last_revision: RevisionId,
    },
    /// The job failed; the message went out via `mirrorFailed`.
    Failure {
        /// Taxonomy row the failure landed in.
        category: FailureCategory,
        /// Message reported downstream.
        message: String,
    },
}

/// Internal fault channel: backend errors still carrying structure, or the
/// one failure the backend cannot produce itself.
enum MirrorFault {
    Backend(BranchError),
    Timeout(Deadline),
}

impl From<BranchError> for MirrorFault {
    fn from(error: BranchError) -> Self {
        Self::Backend(error)
    }
}

/// Synchronises one destination branch with one source branch.
///
/// The run sequence is fixed: report `startMirroring`, open the source,
/// reconcile the destination, pull, then report the terminal event. No step
/// is retried; all failures funnel through [`classify`] into the outcome.
pub struct MirrorWorker {
    branch_id: u64,
    source_url: String,
    destination: PathBuf,
    opener: Arc<dyn BranchOpener>,
    reporter: Arc<dyn StatusReporter>,
    deadline: Option<Deadline>,
}

impl MirrorWorker {
    /// Creates a worker for one job.
    pub fn new(
        branch_id: u64,
        source_url: impl Into<String>,
        destination: impl Into<PathBuf>,
        opener: Arc<dyn BranchOpener>,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        Self {
            branch_id,
            source_url: source_url.into(),
            destination: destination.into(),
            opener,
            reporter,
            deadline: None,
        }
    }

    /// Runs the job under a deadline; expiry is reported as a failure with
    /// the timeout category.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Runs the job to its terminal outcome.
    ///
    /// Infallible by contract: backend failures become reported outcomes,
    /// and a failed status delivery is logged without changing the outcome
    /// (the mirror already happened or already failed; redelivery belongs to
    /// another layer).
    pub fn run(&self) -> MirrorOutcome {
        tracing::info!(
            target: "puller::job",
            branch_id = self.branch_id,
            source = %self.source_url,
            "mirroring"
        );
        if let Err(error) = self.reporter.start_mirroring(self.branch_id) {
            tracing::warn!(
                target: "puller::job",
                branch_id = self.branch_id,
                %error,
                "startMirroring not delivered"
            );
        }

        let outcome = match self.mirror() {
            Ok(last_revision) => MirrorOutcome::Success { last_revision },
            Err(MirrorFault::Backend(error)) => {
                let ClassifiedFailure { category, message } = classify(&error);
                MirrorOutcome::Failure { category, message }
            }
            Err(MirrorFault::Timeout(deadline)) => MirrorOutcome::Failure {
                category: FailureCategory::Timeout,
                message: format!(
                    "timeout: mirroring did not finish within {}s",
                    deadline.budget().as_secs()
                ),
            },
        };

        match &outcome {
            MirrorOutcome::Success { last_revision } => {
                tracing::info!(
                    target: "puller::job",
                    branch_id = self.branch_id,
                    tip = %last_revision,
                    "mirrored"
                );
                if let Err(error) = self
                    .reporter
                    .mirror_complete(self.branch_id, last_revision.as_str())
                {
                    tracing::warn!(
                        target: "puller::job",
                        branch_id = self.branch_id,
                        %error,
                        "mirrorComplete not delivered"
                    );
                }
            }
            MirrorOutcome::Failure { message, .. } => {
                tracing::info!(
                    target: "puller::job",
                    branch_id = self.branch_id,
                    reason = %message,
                    "mirror failed"
                );
                if let Err(error) = self.reporter.mirror_failed(self.branch_id, message) {
                    tracing::warn!(
                        target: "puller::job",
                        branch_id = self.branch_id,
                        %error,
                        "mirrorFailed not delivered"
                    );
                }
            }
        }
        outcome
    }

    fn mirror(&self) -> Result<RevisionId, MirrorFault> {
        self.check_deadline()?;
        let source = self.opener.open_branch(&self.source_url)?;
        self.check_deadline()?;
        let destination = self.reconcile_destination(source.as_ref())?;
        self.check_deadline()?;
        let tip = destination.pull(source.as_ref())?;
        self.propagate_stacking(source.as_ref(), &destination)?;
        Ok(tip)
    }

    /// Opens the destination, creating or recreating it as needed.
    ///
    /// A fresh destination is created in the source's exact format. An
    /// existing one is kept only when all three format identifiers match;
    /// any divergence, and any destination whose own store fails format
    /// validation, means destroy-and-recreate — mirrors are derived data,
    /// so rebuilding is always safe. Plain I/O failures propagate instead:
    /// an unreadable disk is not a reason to delete anything.
    fn reconcile_destination(&self, source: &dyn Branch) -> BranchResult<LocalBranch> {
        let path = &self.destination;
        if !LocalBranch::exists(path) {
            tracing::debug!(
                target: "puller::job",
                branch_id = self.branch_id,
                destination = %path.display(),
                "creating new mirror"
            );
            return LocalBranch::create(path, source.format());
        }
        match LocalBranch::open(path) {
            Ok(destination) if destination.format() == source.format() => Ok(destination),
            Ok(_)
            | Err(
                BranchError::NotABranch { .. }
                | BranchError::UnknownFormat { .. }
                | BranchError::LegacyFormat { .. }
                | BranchError::NoBranchPresent { .. },
            ) => {
                tracing::info!(
                    target: "puller::job",
                    branch_id = self.branch_id,
                    destination = %path.display(),
                    "format divergence, recreating mirror"
                );
                LocalBranch::destroy(path)?;
                LocalBranch::create(path, source.format())
            }
            Err(error) => Err(error),
        }
    }

    /// Copies the source's stacked-on location onto the destination,
    /// verbatim. `Unstackable` sources record nothing.
    fn propagate_stacking(
        &self,
        source: &dyn Branch,
        destination: &LocalBranch,
    ) -> BranchResult<()> {
        match resolve_stacked_on(source)? {
            StackingResolution::StackedOn(location) => {
                destination.set_stacked_on(Some(&location))
            }
            StackingResolution::NotStacked => destination.set_stacked_on(None),
            StackingResolution::Unstackable => Ok(()),
        }
    }

    fn check_deadline(&self) -> Result<(), MirrorFault> {
        match self.deadline {
            Some(deadline) if deadline.expired() => Err(MirrorFault::Timeout(deadline)),
            _ => Ok(()),
        }
    }
}
