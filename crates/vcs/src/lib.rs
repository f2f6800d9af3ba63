#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `vcs` is the version-control backend the mirroring subsystem calls into.
//! The rest of the workspace treats "open a branch", "pull", "last revision"
//! and "what is this branch stacked on" as opaque capabilities; this crate
//! supplies them over a small on-disk layout (the *branch store*) together
//! with a read-only HTTP flavour of the same layout for remote sources.
//!
//! # Design
//!
//! - [`Branch`] is the capability seam. Mirror code only ever holds a
//!   `Box<dyn Branch>` for sources, so richer backends can slot in without
//!   touching the mirroring logic.
//! - [`FormatDescriptor`] models the three on-disk format markers (control
//!   directory, repository, branch) as a plain value with structural
//!   equality. Format compatibility decisions compare descriptors, never
//!   backend object identity.
//! - [`LocalBranch`] owns the writable side: create, incremental pull with
//!   overwrite semantics, destroy, and stacked-on bookkeeping.
//! - [`BranchOpener`] dispatches a source URL to the matching transport.
//!   Scheme support is deliberately closed: `file`/plain paths and
//!   `http(s)` work, `sftp` fails with a fixed diagnostic, and anything
//!   else is surfaced as a backend error.
//!
//! # Errors
//!
//! Every fallible operation returns [`BranchError`], a closed enum carrying
//! structured detail (HTTP status, offending marker, location). Callers in
//! the mirror engine pattern-match on it to produce the user-visible failure
//! vocabulary; nothing in this crate formats user-facing categories itself.

mod branch;
mod error;
mod format;
mod http;
mod local;
mod open;
mod revision;
mod stacking;

pub use branch::{Branch, Revision};
pub use error::{BranchError, BranchResult};
pub use format::{
    BRANCH_FORMAT_1, BRANCH_FORMAT_2, CONTROL_FORMAT_1, FormatDescriptor, MarkerKind,
    REPOSITORY_FORMAT_1, REPOSITORY_FORMAT_2,
};
pub use http::HttpBranch;
pub use local::LocalBranch;
pub use open::{BranchOpener, DefaultOpener};
pub use revision::RevisionId;
pub use stacking::{StackingResolution, resolve_stacked_on};

/// Name of the control directory that marks a branch store root.
pub const CONTROL_DIR: &str = ".bstore";
