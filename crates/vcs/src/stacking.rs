//! crates/vcs/src/stacking.rs
//! Total three-way answer to "what is this branch stacked on?".

use crate::branch::Branch;
use crate::error::{BranchError, BranchResult};

/// Outcome of a stacking query, derived fresh on every call (branch format
/// may change between calls, so nothing here is cached).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StackingResolution {
    /// Stacked on the given location, verbatim as the backend stored it.
    ///
    /// The location may be relative or absolute; callers normalise it
    /// against whatever base URL their use site needs.
    StackedOn(String),
    /// The branch could stack but currently does not.
    NotStacked,
    /// The branch's format has no notion of stacking.
    Unstackable,
}

/// Resolves the stacking state of `branch`.
///
/// Total over the three backend conditions: stacked, not stacked, and
/// format-cannot-stack all map to `Ok`. A bare control directory with no
/// branch in it is *not* folded in; it propagates as
/// [`BranchError::NoBranchPresent`], as does any transport failure.
pub fn resolve_stacked_on(branch: &dyn Branch) -> BranchResult<StackingResolution> {
    match branch.stacked_on() {
        Ok(Some(location)) => Ok(StackingResolution::StackedOn(location)),
        Ok(None) => Ok(StackingResolution::NotStacked),
        Err(BranchError::StackingUnsupported) => Ok(StackingResolution::Unstackable),
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{BRANCH_FORMAT_1, FormatDescriptor};
    use crate::local::LocalBranch;
    use tempfile::TempDir;

    #[test]
    fn stacked_branch_resolves_to_its_location() {
        let dir = TempDir::new().unwrap();
        let branch =
            LocalBranch::create(&dir.path().join("b"), &FormatDescriptor::current()).unwrap();
        branch.set_stacked_on(Some("../base")).unwrap();

        let resolution = resolve_stacked_on(&branch).unwrap();
        assert_eq!(
            resolution,
            StackingResolution::StackedOn("../base".to_owned())
        );
    }

    #[test]
    fn unstacked_branch_resolves_to_not_stacked() {
        let dir = TempDir::new().unwrap();
        let branch =
            LocalBranch::create(&dir.path().join("b"), &FormatDescriptor::current()).unwrap();

        assert_eq!(
            resolve_stacked_on(&branch).unwrap(),
            StackingResolution::NotStacked
        );
    }

    #[test]
    fn format_without_stacking_resolves_to_unstackable() {
        let dir = TempDir::new().unwrap();
        let format = FormatDescriptor {
            branch: BRANCH_FORMAT_1.to_owned(),
            ..FormatDescriptor::current()
        };
        let branch = LocalBranch::create(&dir.path().join("b"), &format).unwrap();

        assert_eq!(
            resolve_stacked_on(&branch).unwrap(),
            StackingResolution::Unstackable
        );
    }

    #[test]
    fn relative_location_is_not_normalised() {
        let dir = TempDir::new().unwrap();
        let branch =
            LocalBranch::create(&dir.path().join("b"), &FormatDescriptor::current()).unwrap();
        branch.set_stacked_on(Some("../../other/base")).unwrap();

        assert_eq!(
            resolve_stacked_on(&branch).unwrap(),
            StackingResolution::StackedOn("../../other/base".to_owned())
        );
    }
}
