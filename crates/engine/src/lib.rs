#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `engine` synchronises one destination branch to match one source branch.
//! A [`MirrorWorker`] owns exactly one job: it opens the source, reconciles
//! the destination (create it, pull into it, or destroy-and-recreate it on
//! format divergence), and reports exactly one terminal outcome to the
//! tracking service — `mirrorComplete` with the destination tip, or
//! `mirrorFailed` with a message from the fixed failure vocabulary.
//!
//! # Design
//!
//! - Nothing here retries. A failed job is reported failed; the next
//!   scheduled batch run retries naturally.
//! - The worker boundary is exception-tight: every backend failure is
//!   converted by [`classify`] into a [`FailureCategory`] plus message, and
//!   [`MirrorWorker::run`] is infallible — it always produces a
//!   [`MirrorOutcome`], never an error.
//! - [`classify`] pattern-matches the closed
//!   [`BranchError`](vcs::BranchError) enum, so adding a backend failure
//!   mode without deciding its user-visible category is a compile error,
//!   not a silent fallthrough.
//! - Downstream tooling parses the produced messages; the mapping is a
//!   tested contract, not an implementation detail.

mod classify;
mod deadline;
mod worker;

pub use classify::{ClassifiedFailure, FailureCategory, classify};
pub use deadline::Deadline;
pub use worker::{MirrorOutcome, MirrorWorker};
