//! crates/vcs/src/format.rs
//! Format markers and the three-part format descriptor.
//!
//! A branch store records three format identifiers on disk, one per layer:
//!
//! | marker file | layer |
//! |---|---|
//! | `.bstore/format` | control directory |
//! | `.bstore/repository/format` | history storage |
//! | `.bstore/branch/format` | branch metadata |
//!
//! An incremental pull is only safe when all three identifiers match between
//! source and destination; the mirror engine compares whole
//! [`FormatDescriptor`] values and re-creates the destination on any
//! mismatch.

use crate::error::{BranchError, BranchResult};

/// Control directory format, version 1 (the only one).
pub const CONTROL_FORMAT_1: &str = "Branch Store Control Directory 1";

/// Repository format 1. Predates the minimum the mirroring subsystem
/// supports; opening a branch with this marker fails with the legacy error.
pub const REPOSITORY_FORMAT_1: &str = "Branch Store Repository 1";

/// Repository format 2, the current history storage layout.
pub const REPOSITORY_FORMAT_2: &str = "Branch Store Repository 2";

/// Branch format 1. Supported, but has no stacked-on slot.
pub const BRANCH_FORMAT_1: &str = "Branch Store Branch 1";

/// Branch format 2. Adds the optional `stacked-on` location.
pub const BRANCH_FORMAT_2: &str = "Branch Store Branch 2";

/// Which of the three marker files a string was read from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MarkerKind {
    /// `.bstore/format`
    Control,
    /// `.bstore/repository/format`
    Repository,
    /// `.bstore/branch/format`
    Branch,
}

impl MarkerKind {
    fn recognised(self, marker: &str) -> bool {
        match self {
            Self::Control => marker == CONTROL_FORMAT_1,
            Self::Repository => marker == REPOSITORY_FORMAT_1 || marker == REPOSITORY_FORMAT_2,
            Self::Branch => marker == BRANCH_FORMAT_1 || marker == BRANCH_FORMAT_2,
        }
    }
}

/// The three on-disk format identifiers of one branch, as plain strings.
///
/// Equality is structural; two branches are format-compatible exactly when
/// their descriptors compare equal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatDescriptor {
    /// Control directory marker.
    pub control: String,
    /// Repository marker.
    pub repository: String,
    /// Branch marker.
    pub branch: String,
}

impl FormatDescriptor {
    /// The descriptor newly created branches use.
    #[must_use]
    pub fn current() -> Self {
        Self {
            control: CONTROL_FORMAT_1.to_owned(),
            repository: REPOSITORY_FORMAT_2.to_owned(),
            branch: BRANCH_FORMAT_2.to_owned(),
        }
    }

    /// Whether this branch format has a stacked-on slot.
    #[must_use]
    pub fn supports_stacking(&self) -> bool {
        self.branch == BRANCH_FORMAT_2
    }
}

/// Returns true when `marker` has the shape of a format marker: one line of
/// printable ASCII ending in a space-separated version number.
///
/// Shape is checked separately from recognition so corrupt markers ("not a
/// branch") and merely unknown ones ("unknown format") stay distinguishable.
#[must_use]
pub fn marker_is_well_formed(marker: &str) -> bool {
    if marker.is_empty() || !marker.chars().all(|c| c.is_ascii_graphic() || c == ' ') {
        return false;
    }
    match marker.rsplit_once(' ') {
        Some((name, version)) => {
            !name.is_empty() && !version.is_empty() && version.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

/// Validates one marker line read from `location`, returning it trimmed.
///
/// Failure modes, in order of precedence: a malformed marker is
/// [`BranchError::NotABranch`]; a well-formed marker we do not recognise is
/// [`BranchError::UnknownFormat`]; a recognised pre-minimum marker is
/// [`BranchError::LegacyFormat`].
pub fn check_marker(kind: MarkerKind, raw: &str, location: &str) -> BranchResult<String> {
    let marker = raw.trim_end_matches(['\r', '\n']);
    if !marker_is_well_formed(marker) {
        return Err(BranchError::NotABranch {
            location: location.to_owned(),
        });
    }
    if !kind.recognised(marker) {
        return Err(BranchError::UnknownFormat {
            detail: marker.to_owned(),
        });
    }
    if kind == MarkerKind::Repository && marker == REPOSITORY_FORMAT_1 {
        return Err(BranchError::LegacyFormat {
            marker: marker.to_owned(),
        });
    }
    Ok(marker.to_owned())
}
