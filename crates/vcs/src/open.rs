//! crates/vcs/src/open.rs
//! URL-scheme dispatch for opening source branches.

use std::path::Path;
use std::time::Duration;

use url::Url;

use crate::branch::Branch;
use crate::error::{BranchError, BranchResult};
use crate::http::HttpBranch;
use crate::local::LocalBranch;

/// Opens branches by URL. Mirror workers hold this behind an `Arc` so the
/// scheme dispatch (and, in tests, a scripted stand-in) can be shared across
/// the worker pool.
pub trait BranchOpener: Send + Sync {
    /// Opens the branch at `location`.
    fn open_branch(&self, location: &str) -> BranchResult<Box<dyn Branch>>;
}

/// The production opener: plain paths and `file://` open locally, `http(s)`
/// opens the remote store, `sftp` is refused outright.
pub struct DefaultOpener {
    agent: ureq::Agent,
}

impl DefaultOpener {
    /// Creates an opener whose remote requests time out after `io_timeout`.
    #[must_use]
    pub fn new(io_timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(io_timeout).build(),
        }
    }
}

impl BranchOpener for DefaultOpener {
    fn open_branch(&self, location: &str) -> BranchResult<Box<dyn Branch>> {
        tracing::debug!(target: "vcs::open", location, "opening branch");
        match Url::parse(location) {
            Ok(parsed) => match parsed.scheme() {
                "file" => {
                    let path = parsed.to_file_path().map_err(|()| {
                        BranchError::backend(format!("invalid file URL '{location}'"))
                    })?;
                    Ok(Box::new(LocalBranch::open(&path)?))
                }
                "http" | "https" => Ok(Box::new(HttpBranch::open(
                    location,
                    self.agent.clone(),
                )?)),
                "sftp" => Err(BranchError::SftpUnsupported),
                other => Err(BranchError::backend(format!(
                    "unsupported URL scheme '{other}' in '{location}'"
                ))),
            },
            // Not a URL at all: treat it as a filesystem path.
            Err(_) => Ok(Box::new(LocalBranch::open(Path::new(location))?)),
        }
    }
}
