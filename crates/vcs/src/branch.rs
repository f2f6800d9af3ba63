//! crates/vcs/src/branch.rs
//! The capability seam mirror code programs against.

use crate::error::BranchResult;
use crate::format::FormatDescriptor;
use crate::revision::RevisionId;

/// One entry in a branch's revision log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Revision {
    /// This revision's id.
    pub id: RevisionId,
    /// Parent revision, `None` for a root revision.
    pub parent: Option<RevisionId>,
}

/// Read capabilities of an opened branch.
///
/// Implementations are transport-specific ([`crate::LocalBranch`],
/// [`crate::HttpBranch`]); the mirror engine only ever sees `dyn Branch`
/// sources. Writable operations live on [`crate::LocalBranch`] directly
/// since mirrors are always written to local storage.
pub trait Branch: Send {
    /// The location this branch was opened from, for diagnostics.
    fn location(&self) -> &str;

    /// The branch's three-part format descriptor.
    fn format(&self) -> &FormatDescriptor;

    /// The branch tip, or the null sentinel for an empty branch.
    fn last_revision(&self) -> BranchResult<RevisionId>;

    /// Every revision reachable in the branch's repository, in log order.
    fn revisions(&self) -> BranchResult<Vec<Revision>>;

    /// The stacked-on location, verbatim as stored.
    ///
    /// `Ok(None)` means the branch is not currently stacked. Formats without
    /// a stacked-on slot fail with
    /// [`BranchError::StackingUnsupported`](crate::BranchError::StackingUnsupported).
    fn stacked_on(&self) -> BranchResult<Option<String>>;
}
