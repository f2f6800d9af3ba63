//! crates/protocol/src/message.rs
//! Message bodies: tag byte plus fields.

use crate::error::{ProtocolError, ProtocolResult};
use crate::varint::{read_varint, write_varint};

const TAG_HELLO: u8 = 0x01;
const TAG_OPEN: u8 = 0x02;
const TAG_STAT: u8 = 0x03;
const TAG_LIST: u8 = 0x04;
const TAG_READ: u8 = 0x05;
const TAG_DONE: u8 = 0x06;

const TAG_WELCOME: u8 = 0x81;
const TAG_OPENED: u8 = 0x82;
const TAG_ENTRY: u8 = 0x83;
const TAG_NAMES: u8 = 0x84;
const TAG_DATA: u8 = 0x85;
const TAG_BYE: u8 = 0x86;
const TAG_ERROR: u8 = 0xff;

/// Which storage area of a virtual location a session addresses.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Area {
    /// The user-writable upload area.
    Hosted,
    /// The read-optimised public copy.
    Mirrored,
}

impl Area {
    fn to_byte(self) -> u8 {
        match self {
            Self::Hosted => 0,
            Self::Mirrored => 1,
        }
    }

    fn from_byte(byte: u8) -> ProtocolResult<Self> {
        match byte {
            0 => Ok(Self::Hosted),
            1 => Ok(Self::Mirrored),
            tag => Err(ProtocolError::UnknownTag { tag }),
        }
    }
}

/// What a `Stat` answer says lives at the path.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file and its size.
    File {
        /// Size in bytes.
        size: u64,
    },
    /// Directory.
    Directory,
}

/// Error codes carried by [`Response::Error`] frames.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    /// Client and server versions do not overlap.
    UnsupportedVersion,
    /// Request arrived before a successful `Open`.
    NoBranchOpen,
    /// The path would escape the area root.
    PathEscape,
    /// Nothing lives at the path.
    NotFound,
    /// The virtual location could not be resolved.
    ResolveFailed,
    /// The request itself was malformed.
    Protocol,
    /// The server hit a filesystem failure serving the request.
    Io,
}

impl ErrorCode {
    fn to_byte(self) -> u8 {
        match self {
            Self::UnsupportedVersion => 1,
            Self::NoBranchOpen => 2,
            Self::PathEscape => 3,
            Self::NotFound => 4,
            Self::ResolveFailed => 5,
            Self::Protocol => 6,
            Self::Io => 7,
        }
    }

    fn from_byte(byte: u8) -> ProtocolResult<Self> {
        match byte {
            1 => Ok(Self::UnsupportedVersion),
            2 => Ok(Self::NoBranchOpen),
            3 => Ok(Self::PathEscape),
            4 => Ok(Self::NotFound),
            5 => Ok(Self::ResolveFailed),
            6 => Ok(Self::Protocol),
            7 => Ok(Self::Io),
            tag => Err(ProtocolError::UnknownTag { tag }),
        }
    }
}

/// Client-to-server messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    /// Version negotiation; must be the first message of a session.
    Hello {
        /// The client's protocol version.
        version: u32,
    },
    /// Resolve a virtual location and scope the session to one area.
    Open {
        /// Owner's user id.
        user_id: u64,
        /// The branch's unique name.
        unique_name: String,
        /// Which storage area to serve.
        area: Area,
    },
    /// Ask what lives at a path inside the open area.
    Stat {
        /// Area-relative path.
        path: String,
    },
    /// List a directory inside the open area.
    List {
        /// Area-relative path.
        path: String,
    },
    /// Read a file inside the open area.
    Read {
        /// Area-relative path.
        path: String,
    },
    /// Orderly end of session.
    Done,
}

/// Server-to-client messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// Version accepted.
    Welcome {
        /// The version the server will speak.
        version: u32,
    },
    /// Location resolved, area scoped.
    Opened {
        /// The resolved logical id, for diagnostics.
        logical_id: String,
    },
    /// Answer to `Stat`.
    Entry(EntryKind),
    /// Answer to `List`.
    Names(Vec<String>),
    /// Answer to `Read`.
    Data(Vec<u8>),
    /// Answer to `Done`; the server closes after sending it.
    Bye,
    /// Any failure.
    Error {
        /// Machine-readable code.
        code: ErrorCode,
        /// Human-readable detail.
        message: String,
    },
}

impl Request {
    /// Encodes the request into a frame payload.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Self::Hello { version } => {
                out.push(TAG_HELLO);
                push_varint(&mut out, u64::from(*version));
            }
            Self::Open {
                user_id,
                unique_name,
                area,
            } => {
                out.push(TAG_OPEN);
                push_varint(&mut out, *user_id);
                out.push(area.to_byte());
                push_string(&mut out, unique_name);
            }
            Self::Stat { path } => {
                out.push(TAG_STAT);
                push_string(&mut out, path);
            }
            Self::List { path } => {
                out.push(TAG_LIST);
                push_string(&mut out, path);
            }
            Self::Read { path } => {
                out.push(TAG_READ);
                push_string(&mut out, path);
            }
            Self::Done => out.push(TAG_DONE),
        }
        out
    }

    /// Decodes one request from a frame payload.
    pub fn decode(payload: &[u8]) -> ProtocolResult<Self> {
        let mut cursor = Cursor::new(payload);
        let request = match cursor.take_byte()? {
            TAG_HELLO => Self::Hello {
                version: cursor.take_varint()? as u32,
            },
            TAG_OPEN => Self::Open {
                user_id: cursor.take_varint()?,
                area: Area::from_byte(cursor.take_byte()?)?,
                unique_name: cursor.take_string()?,
            },
            TAG_STAT => Self::Stat {
                path: cursor.take_string()?,
            },
            TAG_LIST => Self::List {
                path: cursor.take_string()?,
            },
            TAG_READ => Self::Read {
                path: cursor.take_string()?,
            },
            TAG_DONE => Self::Done,
            tag => return Err(ProtocolError::UnknownTag { tag }),
        };
        cursor.expect_end()?;
        Ok(request)
    }
}

impl Response {
    /// Encodes the response into a frame payload.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Self::Welcome { version } => {
                out.push(TAG_WELCOME);
                push_varint(&mut out, u64::from(*version));
            }
            Self::Opened { logical_id } => {
                out.push(TAG_OPENED);
                push_string(&mut out, logical_id);
            }
            Self::Entry(kind) => {
                out.push(TAG_ENTRY);
                match kind {
                    EntryKind::File { size } => {
                        out.push(0);
                        push_varint(&mut out, *size);
                    }
                    EntryKind::Directory => out.push(1),
                }
            }
            Self::Names(names) => {
                out.push(TAG_NAMES);
                push_varint(&mut out, names.len() as u64);
                for name in names {
                    push_string(&mut out, name);
                }
            }
            Self::Data(bytes) => {
                out.push(TAG_DATA);
                push_varint(&mut out, bytes.len() as u64);
                out.extend_from_slice(bytes);
            }
            Self::Bye => out.push(TAG_BYE),
            Self::Error { code, message } => {
                out.push(TAG_ERROR);
                out.push(code.to_byte());
                push_string(&mut out, message);
            }
        }
        out
    }

    /// Decodes one response from a frame payload.
    pub fn decode(payload: &[u8]) -> ProtocolResult<Self> {
        let mut cursor = Cursor::new(payload);
        let response = match cursor.take_byte()? {
            TAG_WELCOME => Self::Welcome {
                version: cursor.take_varint()? as u32,
            },
            TAG_OPENED => Self::Opened {
                logical_id: cursor.take_string()?,
            },
            TAG_ENTRY => match cursor.take_byte()? {
                0 => Self::Entry(EntryKind::File {
                    size: cursor.take_varint()?,
                }),
                1 => Self::Entry(EntryKind::Directory),
                tag => return Err(ProtocolError::UnknownTag { tag }),
            },
            TAG_NAMES => {
                let count = cursor.take_varint()?;
                let mut names = Vec::new();
                for _ in 0..count {
                    names.push(cursor.take_string()?);
                }
                Self::Names(names)
            }
            TAG_DATA => {
                let len = cursor.take_varint()?;
                Self::Data(cursor.take_bytes(len)?)
            }
            TAG_BYE => Self::Bye,
            TAG_ERROR => Self::Error {
                code: ErrorCode::from_byte(cursor.take_byte()?)?,
                message: cursor.take_string()?,
            },
            tag => return Err(ProtocolError::UnknownTag { tag }),
        };
        cursor.expect_end()?;
        Ok(response)
    }
}

fn push_varint(out: &mut Vec<u8>, value: u64) {
    // Writing to a Vec cannot fail.
    let _ = write_varint(out, value);
}

fn push_string(out: &mut Vec<u8>, value: &str) {
    push_varint(out, value.len() as u64);
    out.extend_from_slice(value.as_bytes());
}

/// Field-level reader over one frame payload.
struct Cursor<'a> {
    rest: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn new(payload: &'a [u8]) -> Self {
        Self { rest: payload }
    }

    fn take_byte(&mut self) -> ProtocolResult<u8> {
        let (&byte, rest) = self.rest.split_first().ok_or(ProtocolError::Truncated)?;
        self.rest = rest;
        Ok(byte)
    }

    fn take_varint(&mut self) -> ProtocolResult<u64> {
        let mut reader = self.rest;
        let before = reader.len();
        let value = read_varint(&mut reader)?.ok_or(ProtocolError::Truncated)?;
        self.rest = &self.rest[before - reader.len()..];
        Ok(value)
    }

    fn take_bytes(&mut self, len: u64) -> ProtocolResult<Vec<u8>> {
        let len = usize::try_from(len).map_err(|_| ProtocolError::Truncated)?;
        if self.rest.len() < len {
            return Err(ProtocolError::Truncated);
        }
        let (taken, rest) = self.rest.split_at(len);
        self.rest = rest;
        Ok(taken.to_vec())
    }

    fn take_string(&mut self) -> ProtocolResult<String> {
        let len = self.take_varint()?;
        let bytes = self.take_bytes(len)?;
        String::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)
    }

    fn expect_end(&self) -> ProtocolResult<()> {
        if self.rest.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::UnknownTag { tag: self.rest[0] })
        }
    }
}
