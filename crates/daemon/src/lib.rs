#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `daemon` is the smart serving frontend: a long-running process that
//! resolves virtual branch locations through the directory service and
//! serves their chroot-scoped storage areas live over the wire protocol.
//! It shares the resolution and confinement machinery with the batch
//! puller but is an independent entry point — serving does not touch the
//! run lock and runs regardless of whether a batch is in flight.
//!
//! # Design
//!
//! Two serving modes, selected on the command line:
//!
//! - `--inet`: one session over inherited stdin/stdout, for inetd-style or
//!   ssh-forced-command invocation. The process exits when the session
//!   ends.
//! - `--port [host:]port`: a TCP listener; each accepted connection gets a
//!   session thread. Port `0` binds an ephemeral port and prints the bound
//!   port on stdout before the first accept, so test harnesses and process
//!   supervisors can find it.
//!
//! Shutdown is drain-then-exit: once the listener stops accepting (the
//! connection cap was reached, or accept failed), every in-flight session
//! thread is joined before the process exits.
//!
//! # Errors
//!
//! Bind and accept failures are unrecoverable and exit non-zero with a
//! distinct socket exit code. Per-session failures only end that session;
//! they are logged and answered with protocol error frames where the
//! connection still permits.

mod cli;
mod config;
mod error;
mod session;

use std::io::{self, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use socket2::{Domain, Protocol, Socket, Type};
use transport::{HttpDirectoryClient, VirtualTransportResolver};

pub use cli::run as run_cli;
pub use config::{ServeConfig, ServeMode, parse_port_spec};
pub use error::{DaemonError, DaemonResult};
pub use session::serve_session;

/// Runs the serving frontend until its mode says it is done.
///
/// `port_sink` receives the ephemeral-port announcement in TCP mode; in
/// inet mode stdout belongs to the protocol and nothing is announced.
pub fn run_daemon(config: &ServeConfig, port_sink: &mut dyn Write) -> DaemonResult<()> {
    let resolver = Arc::new(VirtualTransportResolver::new(Arc::new(
        HttpDirectoryClient::new(config.directory_endpoint.clone(), config.io_timeout),
    )));
    match config.mode {
        ServeMode::Inet => serve_stdio(&resolver),
        ServeMode::Tcp { addr } => serve_tcp(config, &resolver, addr, port_sink),
    }
}

fn serve_stdio(resolver: &VirtualTransportResolver) -> DaemonResult<()> {
    tracing::info!(target: "serve::frontend", "serving one session over stdio");
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut reader = stdin.lock();
    let mut writer = stdout.lock();
    if let Err(error) = serve_session(resolver, &mut reader, &mut writer) {
        tracing::warn!(target: "serve::session", %error, "stdio session failed");
    }
    Ok(())
}

fn serve_tcp(
    config: &ServeConfig,
    resolver: &Arc<VirtualTransportResolver>,
    addr: std::net::SocketAddr,
    port_sink: &mut dyn Write,
) -> DaemonResult<()> {
    let listener = bind_listener(addr)?;
    let local_addr = listener.local_addr().map_err(|source| DaemonError::Bind {
        addr,
        source,
    })?;
    tracing::info!(target: "serve::frontend", %local_addr, "listening");
    if addr.port() == 0 {
        // Announced before the first accept so callers can connect
        // immediately after reading the line.
        writeln!(port_sink, "{}", local_addr.port()).map_err(DaemonError::Io)?;
        port_sink.flush().map_err(DaemonError::Io)?;
    }

    let mut sessions: Vec<JoinHandle<()>> = Vec::new();
    let mut accepted = 0usize;
    let result = loop {
        if config
            .max_connections
            .is_some_and(|limit| accepted >= limit)
        {
            break Ok(());
        }
        match listener.accept() {
            Ok((stream, peer)) => {
                accepted += 1;
                tracing::debug!(target: "serve::frontend", %peer, "accepted connection");
                let _ = stream.set_read_timeout(Some(config.io_timeout));
                let _ = stream.set_write_timeout(Some(config.io_timeout));
                let resolver = Arc::clone(resolver);
                sessions.push(thread::spawn(move || {
                    let mut reader = match stream.try_clone() {
                        Ok(reader) => reader,
                        Err(error) => {
                            tracing::warn!(
                                target: "serve::session",
                                %peer,
                                %error,
                                "failed to clone stream"
                            );
                            return;
                        }
                    };
                    let mut writer = stream;
                    if let Err(error) = serve_session(&resolver, &mut reader, &mut writer) {
                        tracing::warn!(target: "serve::session", %peer, %error, "session failed");
                    }
                }));
            }
            Err(source) => break Err(DaemonError::Accept { source }),
        }
    };

    // Drain: no new connections past this point, but every in-flight
    // session finishes before the process exits.
    tracing::info!(
        target: "serve::frontend",
        sessions = sessions.len(),
        "draining sessions"
    );
    for session in sessions {
        let _ = session.join();
    }
    result
}

fn bind_listener(addr: std::net::SocketAddr) -> DaemonResult<TcpListener> {
    let bind_error = |source| DaemonError::Bind { addr, source };
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(bind_error)?;
    socket.set_reuse_address(true).map_err(bind_error)?;
    socket.bind(&addr.into()).map_err(bind_error)?;
    socket.listen(128).map_err(bind_error)?;
    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{
        Area, PROTOCOL_VERSION, Request, Response, read_frame, write_frame,
    };
    use std::io::{BufReader, BufWriter};
    use std::net::TcpStream;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    /// `Write` that appends into shared memory, for the port announcement.
    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// A directory endpoint that answers every lookup with fixed roots.
    fn fixed_directory_endpoint(hosted: &std::path::Path, mirrored: &std::path::Path) -> String {
        let body = format!(
            r#"{{"hosted_root": "{}", "mirrored_root": "{}"}}"#,
            hosted.display(),
            mirrored.display()
        );
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let body = body.clone();
                thread::spawn(move || {
                    use std::io::{BufRead, Read, Write};
                    let mut reader = std::io::BufReader::new(stream);
                    let mut content_length = 0usize;
                    loop {
                        let mut line = String::new();
                        if reader.read_line(&mut line).is_err() {
                            return;
                        }
                        if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:")
                        {
                            content_length = v.trim().parse().unwrap_or(0);
                        }
                        if line == "\r\n" {
                            break;
                        }
                    }
                    let mut body_buf = vec![0u8; content_length];
                    let _ = reader.read_exact(&mut body_buf);
                    let mut stream = reader.into_inner();
                    let _ = write!(
                        stream,
                        "HTTP/1.1 200 OK\r\ncontent-length: {}\r\n\r\n{}",
                        body.len(),
                        body
                    );
                });
            }
        });
        endpoint
    }

    fn send(stream: &mut impl Write, request: &Request) {
        write_frame(stream, &request.encode()).unwrap();
    }

    fn recv(stream: &mut impl io::Read) -> Response {
        let payload = read_frame(stream).unwrap().expect("response frame");
        Response::decode(&payload).unwrap()
    }

    #[test]
    fn tcp_mode_announces_port_serves_one_session_and_drains() {
        let dir = TempDir::new().unwrap();
        let mirrored = dir.path().join("mirrored");
        std::fs::create_dir_all(mirrored.join("17/trunk")).unwrap();
        std::fs::write(mirrored.join("17/trunk/greeting"), b"hello over tcp").unwrap();
        let hosted = dir.path().join("hosted");
        std::fs::create_dir_all(&hosted).unwrap();

        let config = ServeConfig {
            mode: ServeMode::Tcp {
                addr: "127.0.0.1:0".parse().unwrap(),
            },
            directory_endpoint: fixed_directory_endpoint(&hosted, &mirrored),
            io_timeout: Duration::from_secs(5),
            max_connections: Some(1),
        };
        let sink = SharedSink::default();
        let mut daemon_sink = sink.clone();
        let daemon = thread::spawn(move || run_daemon(&config, &mut daemon_sink));

        // Wait for the announced port.
        let port = loop {
            let buffered = sink.0.lock().unwrap().clone();
            if buffered.ends_with(b"\n") {
                break String::from_utf8(buffered).unwrap().trim().parse::<u16>().unwrap();
            }
            thread::sleep(Duration::from_millis(10));
        };

        let stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        let mut writer = BufWriter::new(stream.try_clone().unwrap());
        let mut reader = BufReader::new(stream);

        send(&mut writer, &Request::Hello { version: PROTOCOL_VERSION });
        assert_eq!(recv(&mut reader), Response::Welcome { version: PROTOCOL_VERSION });

        send(
            &mut writer,
            &Request::Open {
                user_id: 17,
                unique_name: "trunk".to_owned(),
                area: Area::Mirrored,
            },
        );
        assert_eq!(
            recv(&mut reader),
            Response::Opened {
                logical_id: "17/trunk".to_owned()
            }
        );

        send(&mut writer, &Request::Read { path: "greeting".to_owned() });
        assert_eq!(recv(&mut reader), Response::Data(b"hello over tcp".to_vec()));

        send(&mut writer, &Request::Done);
        assert_eq!(recv(&mut reader), Response::Bye);

        // Connection cap reached: the daemon drains and returns cleanly.
        daemon.join().unwrap().unwrap();
    }
}
