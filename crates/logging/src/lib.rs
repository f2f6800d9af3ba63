#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` wires the workspace's `tracing` diagnostics to stderr for both
//! binaries. Verbosity comes from repeated `-v` flags; the `RUST_LOG`
//! environment filter, when set, wins over the flag-derived level so
//! operators can focus on one target (`puller::job`, `serve::session`, ...)
//! without recompiling.

use tracing_subscriber::EnvFilter;

/// Maps `-v` repetitions to a default filter directive.
#[must_use]
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Initialises the global subscriber. Safe to call more than once; later
/// calls are no-ops (first writer wins), which keeps unit tests that share a
/// process from fighting over it.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_directives() {
        assert_eq!(default_directive(0), "info");
        assert_eq!(default_directive(1), "debug");
        assert_eq!(default_directive(2), "trace");
        assert_eq!(default_directive(200), "trace");
    }

    #[test]
    fn init_twice_is_harmless() {
        init(0);
        init(2);
    }
}
