//! crates/scheduler/src/job.rs
//! Job stream parsing and the deterministic destination layout.

use std::io::BufRead;
use std::path::Path;

/// One branch to mirror: where it comes from and where its mirror lives.
///
/// Immutable once constructed and consumed exactly once by a mirror worker;
/// the authoritative record lives with whatever produced the job stream.
#[derive(Clone, Debug)]
pub struct BranchJob {
    /// The branch's id in the external system.
    pub branch_id: u64,
    /// Where to pull from.
    pub source_url: String,
    /// Where the mirror is written.
    pub destination_url: String,
}

// Two jobs are the same job when they move the same data between the same
// places; the id is bookkeeping for the status reports.
impl PartialEq for BranchJob {
    fn eq(&self, other: &Self) -> bool {
        self.source_url == other.source_url && self.destination_url == other.destination_url
    }
}

impl Eq for BranchJob {}

/// Renders a branch id as a sharded relative path, `0000002a` becoming
/// `00/00/00/2a`. Two hex digits per level keeps every directory under 256
/// entries no matter how many branches exist.
#[must_use]
pub fn branch_id_to_path(branch_id: u64) -> String {
    let hex = format!("{branch_id:08x}");
    format!("{}/{}/{}/{}", &hex[..2], &hex[2..4], &hex[4..6], &hex[6..])
}

/// Parses the newline-delimited job stream.
///
/// Each line is `"<branch_id> <source_url>"`. Blank lines are ignored; a
/// malformed line is skipped with a warning naming its line number, never
/// aborting the batch. Order is preserved so successive runs log
/// reproducibly. Destinations are derived from the id under `mirror_root`.
pub fn parse_jobs(reader: impl BufRead, mirror_root: &Path) -> std::io::Result<Vec<BranchJob>> {
    let mut jobs = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let parsed = trimmed
            .split_once(char::is_whitespace)
            .and_then(|(id, source)| {
                let source = source.trim();
                match id.parse::<u64>() {
                    Ok(branch_id) if !source.is_empty() => Some((branch_id, source)),
                    _ => None,
                }
            });
        match parsed {
            Some((branch_id, source)) => {
                let destination = mirror_root.join(branch_id_to_path(branch_id));
                jobs.push(BranchJob {
                    branch_id,
                    source_url: source.to_owned(),
                    destination_url: destination.display().to_string(),
                });
            }
            None => {
                tracing::warn!(
                    target: "puller::jobs",
                    line = index + 1,
                    content = trimmed,
                    "skipping malformed job line"
                );
            }
        }
    }
    Ok(jobs)
}
