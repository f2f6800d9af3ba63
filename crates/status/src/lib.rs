#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `status` delivers per-branch mirroring lifecycle notifications to the
//! central tracking service. The tracking service is authoritative for
//! user-visible mirroring status, so this client never hides a delivery
//! failure; it also never retries one. Each call is exactly one HTTP
//! request: retrying here could reorder `startMirroring` relative to the
//! terminal report for the same branch, and redelivering status belongs to
//! a different layer than redoing the mirror anyway.
//!
//! # Design
//!
//! [`StatusReporter`] is the seam the mirror engine holds (behind an `Arc`,
//! shared across the worker pool — implementations must be safe for
//! concurrent calls). [`HttpStatusClient`] is the production implementation:
//! a stateless blocking client performing one POST per notification, with a
//! fixed client-side timeout. There is no connection state shared between
//! calls, so concurrent workers can never interleave responses.

mod client;
mod error;

pub use client::HttpStatusClient;
pub use error::{StatusError, StatusResult};

/// Delivery of the three lifecycle notifications.
///
/// Within one branch id the caller invokes `start_mirroring` strictly before
/// the terminal call; nothing is promised across branch ids. Every method
/// performs at most one delivery attempt, and a `Err` return means exactly
/// that the service may not have seen the event — callers log it and move
/// on, they do not re-mirror.
pub trait StatusReporter: Send + Sync {
    /// Reports that mirroring of `branch_id` is starting.
    fn start_mirroring(&self, branch_id: u64) -> StatusResult<()>;

    /// Reports that `branch_id` mirrored successfully up to `last_revision`.
    fn mirror_complete(&self, branch_id: u64, last_revision: &str) -> StatusResult<()>;

    /// Reports that mirroring `branch_id` failed with `reason`.
    fn mirror_failed(&self, branch_id: u64, reason: &str) -> StatusResult<()>;
}
