#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `protocol` defines version 1 of the branch serving wire protocol: the
//! frames a client exchanges with `bmirror-serve` to open a virtual branch
//! location and read files out of its chroot-scoped areas.
//!
//! # Design
//!
//! Every message travels in one frame: a varint byte length followed by the
//! payload, whose first byte tags the message kind. Strings are
//! varint-length-prefixed UTF-8. The codec is streaming on the outside
//! ([`read_frame`]/[`write_frame`] work on any `Read`/`Write`) and purely
//! in-memory on the inside ([`Request::decode`] and friends take byte
//! slices), which keeps every parsing decision unit-testable without a
//! socket.
//!
//! # Errors
//!
//! Malformed input never panics and never hangs: oversized frames, truncated
//! payloads, unknown tags, and invalid UTF-8 each surface as a distinct
//! [`ProtocolError`] so the session layer can answer with a protocol error
//! frame and drop the connection.

mod error;
mod frame;
mod message;
mod varint;

pub use error::{ProtocolError, ProtocolResult};
pub use frame::{MAX_FRAME_LEN, read_frame, write_frame};
pub use message::{Area, EntryKind, ErrorCode, Request, Response};
pub use varint::{read_varint, write_varint};

/// The protocol version this crate implements.
pub const PROTOCOL_VERSION: u32 = 1;
