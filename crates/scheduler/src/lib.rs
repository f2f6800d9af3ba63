#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `scheduler` coordinates one batch mirroring run: parse the job stream,
//! take the system-wide run lock, fan the jobs out over a bounded pool of
//! mirror workers, and get out of the way. Individual job failures are the
//! engine's business (reported, never escalated); the only fatal conditions
//! at this level are a lock that is already held and broken configuration.
//!
//! # Invariants
//!
//! - At most one scheduler process holds the run lock at a time,
//!   system-wide. A second invocation fails fast with a distinct exit code
//!   rather than queueing behind the first — a long-poll here would only
//!   hide operator errors.
//! - The lock is released on every exit path out of [`Scheduler::run`],
//!   including unwinding, because the guard lives on the run's stack. After
//!   a hard crash (kill -9, power loss) the file can remain; that is a
//!   documented operational condition requiring manual removal, not
//!   something this code auto-expires.
//! - The scheduler exits 0 regardless of how many jobs failed; the tracking
//!   service carries per-branch outcomes.

mod cli;
mod error;
mod job;
mod lock;
mod run;

pub use cli::run as run_cli;
pub use error::{ExitCode, SchedulerError};
pub use job::{BranchJob, branch_id_to_path, parse_jobs};
pub use lock::{LockError, RunLock};
pub use run::{DEFAULT_WORKERS, Scheduler, SchedulerConfig};
