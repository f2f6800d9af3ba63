//! crates/transport/src/location.rs
//! The resolved placement of one branch identity.

use std::path::{Path, PathBuf};

use crate::chroot::ChrootTransport;

/// Where one branch lives, in both storage areas.
///
/// Values are computed on demand by
/// [`VirtualTransportResolver::resolve`](crate::VirtualTransportResolver::resolve)
/// and never mutated; when the directory mapping might have changed, callers
/// resolve again instead of patching an existing location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VirtualLocation {
    logical_id: String,
    hosted_root: PathBuf,
    mirrored_root: PathBuf,
    relative_path: String,
}

impl VirtualLocation {
    pub(crate) fn new(
        logical_id: String,
        hosted_root: PathBuf,
        mirrored_root: PathBuf,
        relative_path: String,
    ) -> Self {
        Self {
            logical_id,
            hosted_root,
            mirrored_root,
            relative_path,
        }
    }

    /// The branch's logical identity, `<user_id>/<unique_name>`.
    #[must_use]
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// The branch's path relative to either area root.
    #[must_use]
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Absolute path of the branch in the hosted area.
    #[must_use]
    pub fn hosted_path(&self) -> PathBuf {
        self.hosted_root.join(&self.relative_path)
    }

    /// Absolute path of the branch in the mirrored area.
    #[must_use]
    pub fn mirrored_path(&self) -> PathBuf {
        self.mirrored_root.join(&self.relative_path)
    }

    /// The hosted area root.
    #[must_use]
    pub fn hosted_root(&self) -> &Path {
        &self.hosted_root
    }

    /// The mirrored area root.
    #[must_use]
    pub fn mirrored_root(&self) -> &Path {
        &self.mirrored_root
    }

    /// Transport confined to the hosted area root.
    #[must_use]
    pub fn hosted_transport(&self) -> ChrootTransport {
        ChrootTransport::new(&self.hosted_root)
    }

    /// Transport confined to the mirrored area root.
    #[must_use]
    pub fn mirrored_transport(&self) -> ChrootTransport {
        ChrootTransport::new(&self.mirrored_root)
    }
}
