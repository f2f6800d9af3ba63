//! crates/scheduler/src/run.rs
//! The batch run: lock, fan out, drain.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use engine::{Deadline, MirrorWorker};
use status::StatusReporter;
use vcs::BranchOpener;

use crate::job::BranchJob;
use crate::lock::{LockError, RunLock};

/// Worker pool size when none is configured.
pub const DEFAULT_WORKERS: usize = 4;

/// Everything one batch run needs to know, threaded explicitly — there is
/// no module-level default timeout to patch.
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Path of the run lock file.
    pub lock_path: PathBuf,
    /// Upper bound on concurrently running mirror workers.
    pub workers: usize,
    /// Per-job deadline; `None` leaves jobs bounded only by backend I/O
    /// timeouts.
    pub job_timeout: Option<Duration>,
}

/// Coordinates one batch of mirror jobs.
pub struct Scheduler {
    config: SchedulerConfig,
    opener: Arc<dyn BranchOpener>,
    reporter: Arc<dyn StatusReporter>,
    jobs: Vec<BranchJob>,
}

impl Scheduler {
    /// Creates a scheduler with an empty work list.
    pub fn new(
        config: SchedulerConfig,
        opener: Arc<dyn BranchOpener>,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        Self {
            config,
            opener,
            reporter,
            jobs: Vec::new(),
        }
    }

    /// Appends one job to the work list.
    ///
    /// No deduplication happens here: the same job added twice runs twice.
    /// The job stream producer owns uniqueness, including the precondition
    /// that no two jobs in one batch target the same destination.
    pub fn add(&mut self, job: BranchJob) {
        self.jobs.push(job);
    }

    /// The jobs queued for the next run.
    #[must_use]
    pub fn jobs(&self) -> &[BranchJob] {
        &self.jobs
    }

    /// Runs every queued job under the run lock; the work list is empty
    /// afterwards.
    ///
    /// Jobs are independent, so they execute on a bounded pool of worker
    /// threads fed from one queue; the only shared values are the opener and
    /// the reporter, both of which are safe for concurrent use. Individual
    /// job outcomes are reported by the workers and never surface here —
    /// the one failure this method can return is not getting the lock.
    pub fn run(&mut self) -> Result<(), LockError> {
        let lock = RunLock::acquire(&self.config.lock_path)?;
        let jobs = std::mem::take(&mut self.jobs);
        let workers = self.config.workers.clamp(1, jobs.len().max(1));
        tracing::info!(
            target: "puller::run",
            jobs = jobs.len(),
            workers,
            "starting batch run"
        );

        thread::scope(|scope| {
            eprintln!("DBG scope enter workers={workers}");
            let (sender, receiver) = crossbeam_channel::bounded::<BranchJob>(workers);
            eprintln!("DBG channel cap={}", sender.capacity().map(|c| c as i64).unwrap_or(-1));
            for _ in 0..workers {
                let receiver = receiver.clone();
                let opener = Arc::clone(&self.opener);
                let reporter = Arc::clone(&self.reporter);
                let job_timeout = self.config.job_timeout;
                scope.spawn(move || {
                    eprintln!("DBG worker started, waiting for jobs");
                    for job in receiver {
                        eprintln!("DBG worker got job {}", job.branch_id);
                        let mut worker = MirrorWorker::new(
                            job.branch_id,
                            job.source_url,
                            job.destination_url,
                            Arc::clone(&opener),
                            Arc::clone(&reporter),
                        );
                        if let Some(budget) = job_timeout {
                            worker = worker.with_deadline(Deadline::after(budget));
                        }
                        worker.run();
                    }
                });
            }
            drop(receiver);
            for job in jobs {
                eprintln!("DBG sending job {}", job.branch_id);
                if sender.send(job).is_err() {
                    // All workers gone; nothing left to feed.
                    break;
                }
                eprintln!("DBG sent job");
            }
            eprintln!("DBG all jobs sent, closure ending");
        });
        eprintln!("DBG scope joined");

        tracing::info!(target: "puller::run", "batch run complete");
        lock.release();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use test_support::{Event, RecordingReporter, branch_with_history, local_opener};

    fn config(dir: &TempDir, workers: usize) -> SchedulerConfig {
        SchedulerConfig {
            lock_path: dir.path().join("run.lock"),
            workers,
            job_timeout: Some(Duration::from_secs(30)),
        }
    }

    fn job(dir: &TempDir, branch_id: u64, name: &str) -> BranchJob {
        let source = dir.path().join(name);
        branch_with_history(&source, &["rev-1"]);
        BranchJob {
            branch_id,
            source_url: source.display().to_string(),
            destination_url: dir
                .path()
                .join(format!("mirrors/{name}"))
                .display()
                .to_string(),
        }
    }

    #[test]
    fn run_drains_the_work_list_and_reports_each_job() {
        let dir = TempDir::new().unwrap();
        let reporter = Arc::new(RecordingReporter::default());
        let mut scheduler = Scheduler::new(
            config(&dir, 2),
            local_opener(),
            Arc::clone(&reporter) as Arc<dyn StatusReporter>,
        );
        scheduler.add(job(&dir, 1, "a"));
        scheduler.add(job(&dir, 2, "b"));

        scheduler.run().unwrap();

        assert!(scheduler.jobs().is_empty());
        let events = reporter.events();
        // Per-branch ordering holds even though cross-branch order may vary.
        for id in [1, 2] {
            let start = events.iter().position(|e| *e == Event::Start(id)).unwrap();
            let done = events
                .iter()
                .position(|e| matches!(e, Event::Complete(i, _) if *i == id))
                .unwrap();
            assert!(start < done);
        }
    }

    #[test]
    fn failed_jobs_do_not_fail_the_run() {
        let dir = TempDir::new().unwrap();
        let reporter = Arc::new(RecordingReporter::default());
        let mut scheduler = Scheduler::new(
            config(&dir, 1),
            local_opener(),
            Arc::clone(&reporter) as Arc<dyn StatusReporter>,
        );
        scheduler.add(BranchJob {
            branch_id: 9,
            source_url: dir.path().join("missing").display().to_string(),
            destination_url: dir.path().join("mirrors/9").display().to_string(),
        });

        scheduler.run().unwrap();

        assert!(matches!(
            reporter.events().as_slice(),
            [Event::Start(9), Event::Failed(9, _)]
        ));
    }

    #[test]
    fn held_lock_aborts_before_any_work() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("run.lock");
        fs::write(&lock_path, "12345\n").unwrap();
        let reporter = Arc::new(RecordingReporter::default());
        let mut scheduler = Scheduler::new(
            SchedulerConfig {
                lock_path,
                workers: 1,
                job_timeout: None,
            },
            local_opener(),
            Arc::clone(&reporter) as Arc<dyn StatusReporter>,
        );
        scheduler.add(job(&dir, 1, "a"));

        let result = scheduler.run();

        assert!(matches!(result, Err(LockError::Held { .. })));
        assert!(reporter.events().is_empty(), "no job may start");
        assert_eq!(scheduler.jobs().len(), 1, "work list untouched");
    }

    #[test]
    fn lock_is_released_after_the_run() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, 1);
        let reporter = Arc::new(RecordingReporter::default());
        let mut scheduler = Scheduler::new(
            cfg.clone(),
            local_opener(),
            Arc::clone(&reporter) as Arc<dyn StatusReporter>,
        );

        scheduler.run().unwrap();

        assert!(!cfg.lock_path.exists());
        let mut again = Scheduler::new(cfg, local_opener(), reporter);
        again.run().unwrap();
    }

    #[test]
    fn duplicate_jobs_run_twice() {
        let dir = TempDir::new().unwrap();
        let reporter = Arc::new(RecordingReporter::default());
        let mut scheduler = Scheduler::new(
            config(&dir, 1),
            local_opener(),
            Arc::clone(&reporter) as Arc<dyn StatusReporter>,
        );
        let first = job(&dir, 5, "dup");
        scheduler.add(first.clone());
        scheduler.add(first);

        scheduler.run().unwrap();

        let starts = reporter
            .events()
            .iter()
            .filter(|e| matches!(e, Event::Start(5)))
            .count();
        assert_eq!(starts, 2);
    }
}
