//! crates/vcs/src/revision.rs
//! Revision identifiers and the empty-branch sentinel.

use std::fmt;

/// Opaque identifier of one revision in a branch's history.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RevisionId(String);

impl RevisionId {
    /// The sentinel id reported for a branch with no commits.
    pub const NULL: &'static str = "null:";

    /// Wraps a backend-provided revision id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The empty-branch sentinel.
    #[must_use]
    pub fn null() -> Self {
        Self(Self::NULL.to_owned())
    }

    /// Whether this is the empty-branch sentinel.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == Self::NULL
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
