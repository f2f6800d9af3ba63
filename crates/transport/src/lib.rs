#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `transport` maps a branch's logical identity — `(user id, unique name)` —
//! to the concrete storage it lives in, and confines every filesystem
//! access to the resolved area.
//!
//! Two storage areas exist per identity: the *hosted* area (user uploads)
//! and the *mirrored* area (the read-optimised public copy this subsystem
//! keeps in sync). The roots of both areas come from an external directory
//! service; the mapping is recomputed on every resolution because the
//! service's answer may change between calls.
//!
//! # Design
//!
//! - [`ChrootTransport`] is the confinement primitive: every operation takes
//!   a relative path and rejects absolute paths, `..` segments, and symlink
//!   escapes with the distinct [`TransportError::PathEscape`] before
//!   touching anything outside the root. Confinement is enforced here, at
//!   the transport layer, not by caller convention.
//! - [`DirectoryService`] is the blocking RPC seam; [`HttpDirectoryClient`]
//!   is the production implementation. Its error type keeps "endpoint slow"
//!   ([`DirectoryError::Timeout`]) apart from "endpoint answered garbage"
//!   ([`DirectoryError::MalformedResponse`]) so callers can choose between
//!   retrying and aborting.
//! - [`VirtualTransportResolver`] glues the two together and produces
//!   [`VirtualLocation`] values.

mod chroot;
mod directory;
mod location;
mod resolver;

pub use chroot::{ChrootTransport, EntryKind, TransportError, TransportResult};
pub use directory::{
    BranchRoots, DirectoryError, DirectoryResult, DirectoryService, HttpDirectoryClient,
};
pub use location::VirtualLocation;
pub use resolver::{ResolveError, VirtualTransportResolver};
