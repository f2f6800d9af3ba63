//! crates/transport/src/resolver.rs
//! Logical identity to storage location resolution.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::directory::{DirectoryError, DirectoryService};
use crate::location::VirtualLocation;

/// Failures of a location resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The unique name cannot be a branch path (empty, absolute, traversal).
    #[error("invalid unique name '{name}'")]
    InvalidName {
        /// The rejected name.
        name: String,
    },
    /// The directory lookup failed; see [`DirectoryError`] for whether a
    /// retry makes sense.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Maps `(user_id, unique_name)` to chroot-scoped storage locations.
pub struct VirtualTransportResolver {
    directory: Arc<dyn DirectoryService>,
}

impl VirtualTransportResolver {
    /// Creates a resolver backed by the given directory service.
    pub fn new(directory: Arc<dyn DirectoryService>) -> Self {
        Self { directory }
    }

    /// Resolves one identity to a fresh [`VirtualLocation`].
    ///
    /// The unique name is validated before the RPC: a name that could step
    /// outside an area root is refused here even though the chroot transport
    /// would also catch it later. Directory connectivity failures propagate;
    /// there is no fallback mapping.
    pub fn resolve(
        &self,
        user_id: u64,
        unique_name: &str,
    ) -> Result<VirtualLocation, ResolveError> {
        if !name_is_safe(unique_name) {
            return Err(ResolveError::InvalidName {
                name: unique_name.to_owned(),
            });
        }
        let roots = self.directory.resolve_branch_roots(user_id, unique_name)?;
        tracing::debug!(
            target: "serve::resolve",
            user_id,
            unique_name,
            hosted_root = %roots.hosted_root,
            mirrored_root = %roots.mirrored_root,
            "resolved branch roots"
        );
        let relative_path = format!("{user_id}/{unique_name}");
        Ok(VirtualLocation::new(
            format!("{user_id}/{unique_name}"),
            PathBuf::from(roots.hosted_root),
            PathBuf::from(roots.mirrored_root),
            relative_path,
        ))
    }
}

fn name_is_safe(unique_name: &str) -> bool {
    if unique_name.is_empty() || unique_name.contains('\0') {
        return false;
    }
    let path = Path::new(unique_name);
    if path.is_absolute() {
        return false;
    }
    path.components()
        .all(|component| matches!(component, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{BranchRoots, DirectoryResult};

    struct FixedDirectory;

    impl DirectoryService for FixedDirectory {
        fn resolve_branch_roots(
            &self,
            _user_id: u64,
            _unique_name: &str,
        ) -> DirectoryResult<BranchRoots> {
            Ok(BranchRoots {
                hosted_root: "/srv/hosted".to_owned(),
                mirrored_root: "/srv/mirrored".to_owned(),
            })
        }
    }

    struct FailingDirectory;

    impl DirectoryService for FailingDirectory {
        fn resolve_branch_roots(
            &self,
            _user_id: u64,
            _unique_name: &str,
        ) -> DirectoryResult<BranchRoots> {
            Err(DirectoryError::Timeout {
                detail: "deadline elapsed".to_owned(),
            })
        }
    }

    #[test]
    fn resolve_joins_roots_with_the_identity() {
        let resolver = VirtualTransportResolver::new(Arc::new(FixedDirectory));

        let location = resolver.resolve(17, "project/trunk").unwrap();
        assert_eq!(location.logical_id(), "17/project/trunk");
        assert_eq!(
            location.hosted_path(),
            PathBuf::from("/srv/hosted/17/project/trunk")
        );
        assert_eq!(
            location.mirrored_path(),
            PathBuf::from("/srv/mirrored/17/project/trunk")
        );
    }

    #[test]
    fn traversal_names_are_refused_before_the_rpc() {
        let resolver = VirtualTransportResolver::new(Arc::new(FixedDirectory));

        for name in ["../sibling", "a/../../b", "/absolute", ""] {
            let result = resolver.resolve(17, name);
            assert!(
                matches!(result, Err(ResolveError::InvalidName { .. })),
                "{name:?} should be refused"
            );
        }
    }

    #[test]
    fn directory_failures_propagate() {
        let resolver = VirtualTransportResolver::new(Arc::new(FailingDirectory));

        let result = resolver.resolve(17, "trunk");
        assert!(matches!(
            result,
            Err(ResolveError::Directory(DirectoryError::Timeout { .. }))
        ));
    }
}
