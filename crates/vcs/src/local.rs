//! crates/vcs/src/local.rs
//! Writable branch store on the local filesystem.
//!
//! Layout under the branch root:
//!
//! ```text
//! <root>/.bstore/format                control marker
//! <root>/.bstore/repository/format     repository marker
//! <root>/.bstore/repository/revlog     append-only "<id> <parent|->" lines
//! <root>/.bstore/branch/format         branch marker
//! <root>/.bstore/branch/last-revision  branch tip ("null:" when empty)
//! <root>/.bstore/branch/stacked-on     optional, branch format 2 only
//! ```

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::CONTROL_DIR;
use crate::branch::{Branch, Revision};
use crate::error::{BranchError, BranchResult};
use crate::format::{FormatDescriptor, MarkerKind, check_marker};
use crate::revision::RevisionId;

const REVLOG: &str = "repository/revlog";
const LAST_REVISION: &str = "branch/last-revision";
const STACKED_ON: &str = "branch/stacked-on";
const NO_PARENT: &str = "-";

/// A branch store rooted at a local directory.
pub struct LocalBranch {
    root: PathBuf,
    location: String,
    format: FormatDescriptor,
}

impl LocalBranch {
    /// Whether `path` holds a branch store control directory at all.
    ///
    /// This is a cheap presence probe; it says nothing about whether the
    /// store would actually open.
    #[must_use]
    pub fn exists(path: &Path) -> bool {
        path.join(CONTROL_DIR).is_dir()
    }

    /// Opens an existing branch store, validating all three format markers.
    pub fn open(path: &Path) -> BranchResult<Self> {
        let location = path.display().to_string();
        let control = path.join(CONTROL_DIR);
        if !control.is_dir() {
            return Err(BranchError::NotABranch { location });
        }

        let control_marker = match read_optional(&control.join("format"))? {
            Some(raw) => check_marker(MarkerKind::Control, &raw, &location)?,
            None => return Err(BranchError::NotABranch { location }),
        };
        let repository_marker = match read_optional(&control.join("repository/format"))? {
            Some(raw) => check_marker(MarkerKind::Repository, &raw, &location)?,
            None => return Err(BranchError::NotABranch { location }),
        };

        if !control.join("branch").is_dir() {
            return Err(BranchError::NoBranchPresent { location });
        }
        let branch_marker = match read_optional(&control.join("branch/format"))? {
            Some(raw) => check_marker(MarkerKind::Branch, &raw, &location)?,
            None => return Err(BranchError::NotABranch { location }),
        };

        Ok(Self {
            root: path.to_path_buf(),
            location,
            format: FormatDescriptor {
                control: control_marker,
                repository: repository_marker,
                branch: branch_marker,
            },
        })
    }

    /// Creates a fresh, empty branch store in the given format.
    ///
    /// The parent directories of `path` are created as needed. Fails if a
    /// control directory is already present.
    pub fn create(path: &Path, format: &FormatDescriptor) -> BranchResult<Self> {
        let control = path.join(CONTROL_DIR);
        if control.exists() {
            return Err(BranchError::backend(format!(
                "branch already exists at {}",
                path.display()
            )));
        }
        fs::create_dir_all(control.join("repository"))?;
        fs::create_dir_all(control.join("branch"))?;
        write_line(&control.join("format"), &format.control)?;
        write_line(&control.join("repository/format"), &format.repository)?;
        write_line(&control.join("branch/format"), &format.branch)?;
        write_line(&control.join(LAST_REVISION), RevisionId::NULL)?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(control.join(REVLOG))?;

        Ok(Self {
            root: path.to_path_buf(),
            location: path.display().to_string(),
            format: format.clone(),
        })
    }

    /// Removes the branch store at `path` entirely. Missing paths are fine.
    pub fn destroy(path: &Path) -> BranchResult<()> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    /// Pulls from `source`, overwriting divergence.
    ///
    /// Revisions the destination already holds are kept; missing ones are
    /// appended in source log order; the tip is then forced to the source's
    /// tip regardless of what the destination pointed at before. Returns the
    /// new tip.
    pub fn pull(&self, source: &dyn Branch) -> BranchResult<RevisionId> {
        let have: HashSet<RevisionId> = self
            .revisions()?
            .into_iter()
            .map(|revision| revision.id)
            .collect();
        for revision in source.revisions()? {
            if !have.contains(&revision.id) {
                self.add_revision(&revision)?;
            }
        }
        let tip = source.last_revision()?;
        self.set_last_revision(&tip)?;
        Ok(tip)
    }

    /// Appends one revision record to the repository log.
    pub fn add_revision(&self, revision: &Revision) -> BranchResult<()> {
        let parent = revision
            .parent
            .as_ref()
            .map_or(NO_PARENT, RevisionId::as_str);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.control_path(REVLOG))?;
        writeln!(file, "{} {}", revision.id, parent)?;
        Ok(())
    }

    /// Points the branch tip at `revision`.
    pub fn set_last_revision(&self, revision: &RevisionId) -> BranchResult<()> {
        write_line(&self.control_path(LAST_REVISION), revision.as_str())?;
        Ok(())
    }

    /// Records, or clears, the stacked-on location.
    pub fn set_stacked_on(&self, location: Option<&str>) -> BranchResult<()> {
        if !self.format.supports_stacking() {
            return Err(BranchError::StackingUnsupported);
        }
        let path = self.control_path(STACKED_ON);
        match location {
            Some(target) => write_line(&path, target)?,
            None => match fs::remove_file(&path) {
                Ok(()) => {}
                Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                Err(error) => return Err(error.into()),
            },
        }
        Ok(())
    }

    /// The directory this store is rooted at.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn control_path(&self, rel: &str) -> PathBuf {
        self.root.join(CONTROL_DIR).join(rel)
    }
}

impl Branch for LocalBranch {
    fn location(&self) -> &str {
        &self.location
    }

    fn format(&self) -> &FormatDescriptor {
        &self.format
    }

    fn last_revision(&self) -> BranchResult<RevisionId> {
        match read_optional(&self.control_path(LAST_REVISION))? {
            Some(raw) => {
                let tip = raw.trim();
                if tip.is_empty() {
                    Ok(RevisionId::null())
                } else {
                    Ok(RevisionId::new(tip))
                }
            }
            None => Ok(RevisionId::null()),
        }
    }

    fn revisions(&self) -> BranchResult<Vec<Revision>> {
        let raw = match read_optional(&self.control_path(REVLOG))? {
            Some(raw) => raw,
            None => return Ok(Vec::new()),
        };
        parse_revlog(&raw, &self.location)
    }

    fn stacked_on(&self) -> BranchResult<Option<String>> {
        if !self.format.supports_stacking() {
            return Err(BranchError::StackingUnsupported);
        }
        match read_optional(&self.control_path(STACKED_ON))? {
            Some(raw) => {
                let target = raw.trim();
                if target.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(target.to_owned()))
                }
            }
            None => Ok(None),
        }
    }
}

/// Parses revlog text into revision records.
pub(crate) fn parse_revlog(raw: &str, location: &str) -> BranchResult<Vec<Revision>> {
    let mut revisions = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let (id, parent) = line.split_once(' ').ok_or_else(|| {
            BranchError::backend(format!(
                "malformed revlog entry at line {} in {location}",
                index + 1
            ))
        })?;
        let parent = if parent == NO_PARENT {
            None
        } else {
            Some(RevisionId::new(parent))
        };
        revisions.push(Revision {
            id: RevisionId::new(id),
            parent,
        });
    }
    Ok(revisions)
}

fn read_optional(path: &Path) -> BranchResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error.into()),
    }
}

fn write_line(path: &Path, contents: &str) -> io::Result<()> {
    fs::write(path, format!("{contents}\n"))
}
