//! crates/daemon/src/config.rs
//! Serving configuration, explicit and per-instance.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::DaemonError;

/// How the frontend gets its connections.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ServeMode {
    /// One session over inherited stdin/stdout.
    Inet,
    /// TCP listener on the given address.
    Tcp {
        /// Address to bind; port 0 picks an ephemeral port.
        addr: SocketAddr,
    },
}

/// Everything one serving instance needs, threaded explicitly — timeouts
/// are fields here, never module state.
#[derive(Clone, Debug)]
pub struct ServeConfig {
    /// Connection source.
    pub mode: ServeMode,
    /// Directory service endpoint for location resolution.
    pub directory_endpoint: String,
    /// Socket and RPC timeout.
    pub io_timeout: Duration,
    /// Stop accepting after this many connections (drain, then exit).
    /// `None` serves until the process is terminated.
    pub max_connections: Option<usize>,
}

/// Parses a `[host:]port` specification.
///
/// A bare port listens on all IPv4 interfaces; anything containing a colon
/// must parse as a full socket address (bracketed IPv6 included).
pub fn parse_port_spec(spec: &str) -> Result<SocketAddr, DaemonError> {
    let invalid = |detail: &str| DaemonError::InvalidPort {
        spec: spec.to_owned(),
        detail: detail.to_owned(),
    };
    if spec.contains(':') {
        spec.parse()
            .map_err(|_| invalid("expected host:port or [v6-host]:port"))
    } else {
        let port: u16 = spec.parse().map_err(|_| invalid("expected a port number"))?;
        Ok(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
    }
}
