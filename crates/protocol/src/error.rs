//! crates/protocol/src/error.rs
//! Decode and transport failures.

use std::io;

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while reading or decoding protocol traffic.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The underlying stream failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// A frame or field ended before its announced length.
    #[error("truncated message")]
    Truncated,
    /// A frame announced a length beyond the accepted maximum.
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge {
        /// Announced length.
        len: u64,
        /// The enforced maximum.
        max: u64,
    },
    /// The message tag byte is not part of this protocol version.
    #[error("unknown message tag 0x{tag:02x}")]
    UnknownTag {
        /// The unrecognised tag.
        tag: u8,
    },
    /// A string field was not valid UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,
    /// A varint ran past its maximum encodable width.
    #[error("malformed varint")]
    MalformedVarint,
}
