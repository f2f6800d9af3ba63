//! crates/daemon/src/session.rs
//! One protocol session over one byte stream.

use std::io::{Read, Write};

use protocol::{
    Area, EntryKind, ErrorCode, PROTOCOL_VERSION, ProtocolResult, Request, Response, read_frame,
    write_frame,
};
use transport::{ChrootTransport, TransportError, VirtualTransportResolver};

/// An area scoped by a successful `Open`: the confining transport plus the
/// branch's path inside it.
struct OpenArea {
    transport: ChrootTransport,
    branch_path: String,
}

impl OpenArea {
    /// Joins a request path onto the branch path. Confinement is not
    /// checked here; the transport rejects escapes when the path is used.
    fn resolve(&self, path: &str) -> String {
        if path.is_empty() || path == "." {
            self.branch_path.clone()
        } else {
            format!("{}/{path}", self.branch_path)
        }
    }
}

/// Serves one session: a frame loop from `Hello` to `Done`, EOF, or a
/// protocol violation.
///
/// Per-request failures (unresolvable location, escaping path, missing
/// file) are answered with error frames and the session continues; only a
/// broken stream or an unparseable frame ends it. The function returns
/// `Ok` for every orderly end, including a client that just hangs up.
pub fn serve_session(
    resolver: &VirtualTransportResolver,
    reader: &mut impl Read,
    writer: &mut impl Write,
) -> ProtocolResult<()> {
    let mut open: Option<OpenArea> = None;

    loop {
        let payload = match read_frame(reader)? {
            Some(payload) => payload,
            None => return Ok(()),
        };
        let request = match Request::decode(&payload) {
            Ok(request) => request,
            Err(error) => {
                // One error frame, then give up on the stream: after a
                // malformed frame there is no trustworthy boundary left.
                let response = Response::Error {
                    code: ErrorCode::Protocol,
                    message: error.to_string(),
                };
                write_frame(writer, &response.encode())?;
                return Err(error);
            }
        };
        tracing::debug!(target: "serve::session", ?request, "request");

        let response = match request {
            Request::Hello { version } => {
                if version == PROTOCOL_VERSION {
                    Response::Welcome {
                        version: PROTOCOL_VERSION,
                    }
                } else {
                    let response = Response::Error {
                        code: ErrorCode::UnsupportedVersion,
                        message: format!(
                            "protocol version {version} not supported, speak {PROTOCOL_VERSION}"
                        ),
                    };
                    write_frame(writer, &response.encode())?;
                    return Ok(());
                }
            }
            Request::Open {
                user_id,
                unique_name,
                area,
            } => match resolver.resolve(user_id, &unique_name) {
                Ok(location) => {
                    let transport = match area {
                        Area::Hosted => location.hosted_transport(),
                        Area::Mirrored => location.mirrored_transport(),
                    };
                    let logical_id = location.logical_id().to_owned();
                    open = Some(OpenArea {
                        transport,
                        branch_path: location.relative_path().to_owned(),
                    });
                    Response::Opened { logical_id }
                }
                Err(error) => Response::Error {
                    code: ErrorCode::ResolveFailed,
                    message: error.to_string(),
                },
            },
            Request::Stat { path } => with_open(&open, |area| {
                area.transport
                    .stat(&area.resolve(&path))
                    .map(|kind| match kind {
                        transport::EntryKind::File { size } => {
                            Response::Entry(EntryKind::File { size })
                        }
                        transport::EntryKind::Directory => Response::Entry(EntryKind::Directory),
                    })
            }),
            Request::List { path } => with_open(&open, |area| {
                area.transport
                    .list_dir(&area.resolve(&path))
                    .map(Response::Names)
            }),
            Request::Read { path } => with_open(&open, |area| {
                area.transport
                    .read(&area.resolve(&path))
                    .map(Response::Data)
            }),
            Request::Done => {
                write_frame(writer, &Response::Bye.encode())?;
                return Ok(());
            }
        };
        write_frame(writer, &response.encode())?;
    }
}

/// Runs a transport operation against the open area, mapping the failure
/// modes onto their wire codes.
fn with_open(
    open: &Option<OpenArea>,
    operation: impl FnOnce(&OpenArea) -> Result<Response, TransportError>,
) -> Response {
    let Some(area) = open else {
        return Response::Error {
            code: ErrorCode::NoBranchOpen,
            message: "open a branch before requesting paths".to_owned(),
        };
    };
    match operation(area) {
        Ok(response) => response,
        Err(error) => {
            let code = match &error {
                TransportError::PathEscape { .. } => ErrorCode::PathEscape,
                TransportError::NotFound { .. } => ErrorCode::NotFound,
                TransportError::Io(_) => ErrorCode::Io,
            };
            Response::Error {
                code,
                message: error.to_string(),
            }
        }
    }
}
