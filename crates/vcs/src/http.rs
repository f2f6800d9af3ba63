//! crates/vcs/src/http.rs
//! Read-only branch store access over HTTP.
//!
//! Remote sources publish the same `.bstore/` layout the local store writes;
//! each metadata file is fetched with a plain GET. 401/403 answers surface
//! as the authentication-required error and transport failures as socket
//! errors, which is what the mirror engine's failure taxonomy expects.

use crate::CONTROL_DIR;
use crate::branch::{Branch, Revision};
use crate::error::{BranchError, BranchResult};
use crate::format::{FormatDescriptor, MarkerKind, check_marker};
use crate::local::parse_revlog;
use crate::revision::RevisionId;

/// A branch store reachable over `http://` or `https://`.
pub struct HttpBranch {
    base: String,
    agent: ureq::Agent,
    format: FormatDescriptor,
}

impl HttpBranch {
    /// Opens the branch published under `url`, validating its markers.
    pub fn open(url: &str, agent: ureq::Agent) -> BranchResult<Self> {
        let base = url.trim_end_matches('/').to_owned();
        let probe = Self {
            base,
            agent,
            format: FormatDescriptor::current(),
        };

        let control_marker = match probe.fetch_optional("format")? {
            Some(raw) => check_marker(MarkerKind::Control, &raw, &probe.base)?,
            None => {
                return Err(BranchError::NotABranch {
                    location: probe.base,
                });
            }
        };
        let repository_marker = match probe.fetch_optional("repository/format")? {
            Some(raw) => check_marker(MarkerKind::Repository, &raw, &probe.base)?,
            None => {
                return Err(BranchError::NotABranch {
                    location: probe.base,
                });
            }
        };
        // HTTP cannot distinguish a missing branch directory from a missing
        // marker file; a 404 here is reported as the bare-store condition.
        let branch_marker = match probe.fetch_optional("branch/format")? {
            Some(raw) => check_marker(MarkerKind::Branch, &raw, &probe.base)?,
            None => {
                return Err(BranchError::NoBranchPresent {
                    location: probe.base,
                });
            }
        };

        Ok(Self {
            format: FormatDescriptor {
                control: control_marker,
                repository: repository_marker,
                branch: branch_marker,
            },
            ..probe
        })
    }

    fn fetch_optional(&self, rel: &str) -> BranchResult<Option<String>> {
        let url = format!("{}/{CONTROL_DIR}/{rel}", self.base);
        match self.agent.get(&url).call() {
            Ok(response) => match response.into_string() {
                Ok(body) => Ok(Some(body)),
                Err(error) => Err(BranchError::Socket {
                    detail: error.to_string(),
                }),
            },
            Err(ureq::Error::Status(status @ (401 | 403), _)) => {
                Err(BranchError::AuthRequired { status })
            }
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(ureq::Error::Status(status, _)) => Err(BranchError::backend(format!(
                "HTTP {status} fetching {url}"
            ))),
            Err(ureq::Error::Transport(transport)) => Err(BranchError::Socket {
                detail: transport.to_string(),
            }),
        }
    }
}

impl Branch for HttpBranch {
    fn location(&self) -> &str {
        &self.base
    }

    fn format(&self) -> &FormatDescriptor {
        &self.format
    }

    fn last_revision(&self) -> BranchResult<RevisionId> {
        match self.fetch_optional("branch/last-revision")? {
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
        match self.fetch_optional("repository/revlog")? {
            Some(raw) => parse_revlog(&raw, &self.base),
            None => Ok(Vec::new()),
        }
    }

    fn stacked_on(&self) -> BranchResult<Option<String>> {
        if !self.format.supports_stacking() {
            return Err(BranchError::StackingUnsupported);
        }
        match self.fetch_optional("branch/stacked-on")? {
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
