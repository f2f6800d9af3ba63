//! crates/scheduler/src/cli.rs
//! Command-line front-end for the puller binary.

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use status::HttpStatusClient;
use vcs::DefaultOpener;

use crate::error::{ExitCode, SchedulerError};
use crate::job::parse_jobs;
use crate::run::{DEFAULT_WORKERS, Scheduler, SchedulerConfig};

#[derive(Parser, Debug)]
#[command(
    name = "bmirror-puller",
    version,
    about = "Mirror a batch of branches into the canonical sharded layout"
)]
struct PullerArgs {
    /// Job stream file ("<branch_id> <source_url>" per line); stdin if omitted.
    #[arg(long, value_name = "FILE")]
    jobs: Option<PathBuf>,

    /// Root directory destinations are sharded under.
    #[arg(long, value_name = "DIR")]
    mirror_root: PathBuf,

    /// Run lock file path.
    #[arg(long, value_name = "FILE")]
    lock_file: PathBuf,

    /// Tracking service endpoint for lifecycle reports.
    #[arg(long, value_name = "URL")]
    status_endpoint: String,

    /// Concurrent mirror workers.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Per-job deadline in seconds; unset means backend I/O timeouts only.
    #[arg(long, value_name = "SECONDS")]
    job_timeout: Option<u64>,

    /// Timeout for individual remote reads and status deliveries, seconds.
    #[arg(long, value_name = "SECONDS", default_value_t = 30)]
    io_timeout: u64,

    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Runs the puller CLI and returns the process exit code.
///
/// Mirrors the binary entry point but takes explicit argument and output
/// streams so the whole surface is testable in-process.
pub fn run<I, S, Out, Err>(arguments: I, stdout: &mut Out, stderr: &mut Err) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
    Out: Write,
    Err: Write,
{
    let args = match PullerArgs::try_parse_from(arguments) {
        Ok(args) => args,
        Err(error) => {
            let rendered = error.render();
            return if error.use_stderr() {
                let _ = writeln!(stderr, "{rendered}");
                ExitCode::Config.as_i32()
            } else {
                // --help and --version land here.
                let _ = write!(stdout, "{rendered}");
                ExitCode::Success.as_i32()
            };
        }
    };
    logging::init(args.verbose);

    if args.workers == 0 {
        let _ = writeln!(stderr, "bmirror-puller: --workers must be at least 1");
        return ExitCode::Config.as_i32();
    }

    match execute(&args) {
        Ok(()) => ExitCode::Success.as_i32(),
        Err(error) => {
            let _ = writeln!(stderr, "bmirror-puller: {error}");
            error.exit_code().as_i32()
        }
    }
}

fn execute(args: &PullerArgs) -> Result<(), SchedulerError> {
    let io_timeout = Duration::from_secs(args.io_timeout);
    let jobs = read_jobs(args)?;

    let mut scheduler = Scheduler::new(
        SchedulerConfig {
            lock_path: args.lock_file.clone(),
            workers: args.workers,
            job_timeout: args.job_timeout.map(Duration::from_secs),
        },
        Arc::new(DefaultOpener::new(io_timeout)),
        Arc::new(HttpStatusClient::new(
            args.status_endpoint.clone(),
            io_timeout,
        )),
    );
    for job in jobs {
        scheduler.add(job);
    }
    scheduler.run()?;
    Ok(())
}

fn read_jobs(args: &PullerArgs) -> Result<Vec<crate::job::BranchJob>, SchedulerError> {
    let stream_error = |path: &str, source| SchedulerError::JobStream {
        path: path.to_owned(),
        source,
    };
    match &args.jobs {
        Some(path) => {
            let display = path.display().to_string();
            let file = File::open(path).map_err(|error| stream_error(&display, error))?;
            parse_jobs(BufReader::new(file), &args.mirror_root)
                .map_err(|error| stream_error(&display, error))
        }
        None => parse_jobs(io::stdin().lock(), &args.mirror_root)
            .map_err(|error| stream_error("<stdin>", error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use test_support::branch_with_history;

    fn run_cli(args: &[&str]) -> (i32, String, String) {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let full: Vec<&str> = std::iter::once("bmirror-puller")
            .chain(args.iter().copied())
            .collect();
        let code = run(full, &mut stdout, &mut stderr);
        (
            code,
            String::from_utf8(stdout).unwrap(),
            String::from_utf8(stderr).unwrap(),
        )
    }

    #[test]
    fn help_prints_to_stdout_and_exits_zero() {
        let (code, stdout, stderr) = run_cli(&["--help"]);

        assert_eq!(code, 0);
        assert!(stdout.contains("--mirror-root"));
        assert!(stderr.is_empty());
    }

    #[test]
    fn missing_required_flags_is_a_usage_error() {
        let (code, _stdout, stderr) = run_cli(&[]);

        assert_eq!(code, ExitCode::Config.as_i32());
        assert!(stderr.contains("required"));
    }

    #[test]
    fn zero_workers_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (code, _stdout, stderr) = run_cli(&[
            "--jobs",
            "/dev/null",
            "--mirror-root",
            dir.path().to_str().unwrap(),
            "--lock-file",
            dir.path().join("l").to_str().unwrap(),
            "--status-endpoint",
            "http://127.0.0.1:1/",
            "--workers",
            "0",
        ]);

        assert_eq!(code, ExitCode::Config.as_i32());
        assert!(stderr.contains("--workers"));
    }

    #[test]
    fn missing_jobs_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let (code, _stdout, stderr) = run_cli(&[
            "--jobs",
            dir.path().join("absent.jobs").to_str().unwrap(),
            "--mirror-root",
            dir.path().to_str().unwrap(),
            "--lock-file",
            dir.path().join("l").to_str().unwrap(),
            "--status-endpoint",
            "http://127.0.0.1:1/",
        ]);

        assert_eq!(code, ExitCode::Config.as_i32());
        assert!(stderr.contains("job stream"));
    }

    #[test]
    fn held_lock_exits_with_the_lock_code() {
        let dir = TempDir::new().unwrap();
        let lock = dir.path().join("run.lock");
        fs::write(&lock, "99999\n").unwrap();
        let jobs = dir.path().join("batch.jobs");
        fs::write(&jobs, "").unwrap();

        let (code, _stdout, stderr) = run_cli(&[
            "--jobs",
            jobs.to_str().unwrap(),
            "--mirror-root",
            dir.path().join("mirrors").to_str().unwrap(),
            "--lock-file",
            lock.to_str().unwrap(),
            "--status-endpoint",
            "http://127.0.0.1:1/",
        ]);

        assert_eq!(code, ExitCode::LockHeld.as_i32());
        assert!(stderr.contains("already held"));
    }

    #[test]
    fn batch_runs_even_when_the_tracking_service_is_down() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source");
        branch_with_history(&source, &["rev-1"]);
        let jobs = dir.path().join("batch.jobs");
        fs::write(&jobs, format!("42 {}\n", source.display())).unwrap();
        let mirror_root = dir.path().join("mirrors");

        let (code, _stdout, _stderr) = run_cli(&[
            "--jobs",
            jobs.to_str().unwrap(),
            "--mirror-root",
            mirror_root.to_str().unwrap(),
            "--lock-file",
            dir.path().join("run.lock").to_str().unwrap(),
            "--status-endpoint",
            // Nothing listens here; deliveries fail and are logged only.
            "http://127.0.0.1:1/",
            "--io-timeout",
            "1",
        ]);

        assert_eq!(code, ExitCode::Success.as_i32());
        assert!(mirror_root.join("00/00/00/2a").join(".bstore").is_dir());
    }
}
