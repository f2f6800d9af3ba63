//! crates/protocol/src/frame.rs
//! Length-prefixed frames.

use std::io::{Read, Write};

use crate::error::{ProtocolError, ProtocolResult};
use crate::varint::{read_varint, write_varint};

/// Upper bound on one frame's payload. Large enough for any metadata
/// message and a generous file chunk, small enough that a hostile length
/// prefix cannot balloon memory.
pub const MAX_FRAME_LEN: u64 = 16 * 1024 * 1024;

/// Writes one frame: varint payload length, then the payload.
pub fn write_frame(writer: &mut impl Write, payload: &[u8]) -> ProtocolResult<()> {
    write_varint(writer, payload.len() as u64)?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Reads one frame, `Ok(None)` on clean EOF at a frame boundary.
pub fn read_frame(reader: &mut impl Read) -> ProtocolResult<Option<Vec<u8>>> {
    let len = match read_varint(reader)? {
        Some(len) => len,
        None => return Ok(None),
    };
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }
    let mut payload = vec![0u8; len as usize];
    reader
        .read_exact(&mut payload)
        .map_err(|error| match error.kind() {
            std::io::ErrorKind::UnexpectedEof => ProtocolError::Truncated,
            _ => ProtocolError::Io(error),
        })?;
    Ok(Some(payload))
}
