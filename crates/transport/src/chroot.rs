//! crates/transport/src/chroot.rs
//! Filesystem access confined to one root directory.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors raised by chroot-scoped filesystem access.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The requested path would resolve outside the transport root.
    #[error("path escapes transport root: {path}")]
    PathEscape {
        /// The offending request path.
        path: String,
    },
    /// The path is inside the root but nothing is there.
    #[error("no such file: {path}")]
    NotFound {
        /// The requested path.
        path: String,
    },
    /// Any other filesystem failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Kind and size of a directory entry, as reported by [`ChrootTransport::stat`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file with its size in bytes.
    File {
        /// Size in bytes.
        size: u64,
    },
    /// Directory.
    Directory,
}

/// A transport rooted at one directory.
///
/// All paths handed to the operations are interpreted relative to the root.
/// Escape attempts — absolute paths, `..` segments, or symlinks resolving
/// outside the root — fail with [`TransportError::PathEscape`] without the
/// filesystem outside the root ever being touched.
#[derive(Clone, Debug)]
pub struct ChrootTransport {
    root: PathBuf,
}

impl ChrootTransport {
    /// Creates a transport confined to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The confining root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `rel` to an absolute local path inside the root.
    ///
    /// This is the confinement gate every operation goes through: first a
    /// lexical check (absolute paths and `..` are rejected outright), then a
    /// physical one (the deepest existing ancestor is canonicalised and must
    /// stay under the canonicalised root, so symlinks cannot smuggle access
    /// out). A symlink whose target cannot be resolved is treated as
    /// escaping.
    pub fn local_path(&self, rel: &str) -> TransportResult<PathBuf> {
        let escape = || TransportError::PathEscape {
            path: rel.to_owned(),
        };

        let relative = Path::new(rel);
        if relative.is_absolute() {
            return Err(escape());
        }
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => return Err(escape()),
            }
        }

        let candidate = self.root.join(relative);
        let root_real = self.root.canonicalize()?;

        let mut probe = candidate.as_path();
        let resolved = loop {
            match fs::symlink_metadata(probe) {
                Ok(_) => break probe.canonicalize().map_err(|_| escape())?,
                Err(error) if error.kind() == io::ErrorKind::NotFound => {
                    probe = probe.parent().ok_or_else(escape)?;
                }
                Err(error) => return Err(error.into()),
            }
        };
        if resolved.starts_with(&root_real) {
            Ok(candidate)
        } else {
            Err(escape())
        }
    }

    /// Reads the file at `rel`.
    pub fn read(&self, rel: &str) -> TransportResult<Vec<u8>> {
        let path = self.local_path(rel)?;
        fs::read(&path).map_err(|error| not_found_or_io(error, rel))
    }

    /// Writes `data` to the file at `rel`, creating parent directories.
    pub fn write(&self, rel: &str, data: &[u8]) -> TransportResult<()> {
        let path = self.local_path(rel)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data)?;
        Ok(())
    }

    /// Lists the names inside the directory at `rel`, sorted.
    pub fn list_dir(&self, rel: &str) -> TransportResult<Vec<String>> {
        let path = self.local_path(rel)?;
        let entries = fs::read_dir(&path).map_err(|error| not_found_or_io(error, rel))?;
        let mut names = Vec::new();
        for entry in entries {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    /// Reports what lives at `rel`.
    pub fn stat(&self, rel: &str) -> TransportResult<EntryKind> {
        let path = self.local_path(rel)?;
        let metadata = fs::metadata(&path).map_err(|error| not_found_or_io(error, rel))?;
        if metadata.is_dir() {
            Ok(EntryKind::Directory)
        } else {
            Ok(EntryKind::File {
                size: metadata.len(),
            })
        }
    }
}

fn not_found_or_io(error: io::Error, rel: &str) -> TransportError {
    if error.kind() == io::ErrorKind::NotFound {
        TransportError::NotFound {
            path: rel.to_owned(),
        }
    } else {
        TransportError::Io(error)
    }
}
