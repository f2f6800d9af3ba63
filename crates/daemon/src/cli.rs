//! crates/daemon/src/cli.rs
//! Command-line front-end for the serving binary.

use std::ffi::OsString;
use std::io::Write;
use std::time::Duration;

use clap::Parser;

use crate::config::{ServeConfig, ServeMode, parse_port_spec};
use crate::error::{DaemonError, EXIT_CONFIG};
use crate::run_daemon;

#[derive(Parser, Debug)]
#[command(
    name = "bmirror-serve",
    version,
    about = "Serve virtual branch locations over the wire protocol"
)]
struct ServeArgs {
    /// Serve one session over inherited stdin/stdout (inetd/ssh style).
    #[arg(long, conflicts_with = "port")]
    inet: bool,

    /// Listen on [host:]port; port 0 binds an ephemeral port and prints it
    /// on stdout.
    #[arg(long, value_name = "[HOST:]PORT")]
    port: Option<String>,

    /// Directory service endpoint for location resolution.
    #[arg(long, value_name = "URL")]
    directory_endpoint: String,

    /// Socket and RPC timeout in seconds.
    #[arg(long, value_name = "SECONDS", default_value_t = 30)]
    io_timeout: u64,

    /// Exit after serving this many connections (TCP mode only).
    #[arg(long, value_name = "N")]
    max_connections: Option<usize>,

    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Runs the serving CLI and returns the process exit code.
pub fn run<I, S, Out, Err>(arguments: I, stdout: &mut Out, stderr: &mut Err) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
    Out: Write,
    Err: Write,
{
    let args = match ServeArgs::try_parse_from(arguments) {
        Ok(args) => args,
        Err(error) => {
            let rendered = error.render();
            return if error.use_stderr() {
                let _ = writeln!(stderr, "{rendered}");
                EXIT_CONFIG
            } else {
                let _ = write!(stdout, "{rendered}");
                0
            };
        }
    };
    logging::init(args.verbose);

    let mode = match (args.inet, &args.port) {
        (true, _) => ServeMode::Inet,
        (false, Some(spec)) => match parse_port_spec(spec) {
            Ok(addr) => ServeMode::Tcp { addr },
            Err(error) => {
                let _ = writeln!(stderr, "bmirror-serve: {error}");
                return error.exit_code();
            }
        },
        (false, None) => {
            let _ = writeln!(stderr, "bmirror-serve: one of --inet or --port is required");
            return EXIT_CONFIG;
        }
    };

    let config = ServeConfig {
        mode,
        directory_endpoint: args.directory_endpoint,
        io_timeout: Duration::from_secs(args.io_timeout),
        max_connections: args.max_connections,
    };
    match run_daemon(&config, stdout) {
        Ok(()) => 0,
        Err(error) => {
            let _ = writeln!(stderr, "bmirror-serve: {error}");
            DaemonError::exit_code(&error)
        }
    }
}
