// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! CONTEXT: fifod wire protocol v1 (versioned byte frames; bounded inputs)
//!
//! OWNERS: @runtime
//!
//! STATUS: Functional
//!
//! API_STABILITY: Unstable
//!
//! TEST_COVERAGE: Tests in `source/services/fifod/tests/protocol.rs`
//!   - Decode: OPEN/READ/WRITE/CLOSE happy path, reject malformed/oversized/unsupported input
//!   - Encode: responses for all 4 opcodes plus error-only responses
//!   - Property tests for panic-freedom on arbitrary input

use core::fmt;

use thiserror::Error;

pub const MAGIC0: u8 = b'F';
pub const MAGIC1: u8 = b'D';
pub const VERSION: u8 = 1;

pub const OP_OPEN: u8 = 1;
pub const OP_READ: u8 = 2;
pub const OP_WRITE: u8 = 3;
pub const OP_CLOSE: u8 = 4;

/// Set on the opcode byte of every response.
pub const RESPONSE_BIT: u8 = 0x80;

pub const MAX_PATH_LEN: usize = 255;
/// Hard ceiling for WRITE payloads and READ buffers, independent of configuration.
pub const MAX_DATA_LEN: usize = 16 << 20;
/// Largest frame a transport accepts.
pub const MAX_FRAME_LEN: usize = MAX_DATA_LEN + 64;

const HEADER_LEN: usize = 4;

/// Response status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    Ok = 0,
    Malformed = 1,
    Unsupported = 2,
    NotFound = 3,
    BadHandle = 4,
    /// Caller memory could not be copied (EFAULT).
    BadAddress = 5,
    /// Negative or oversized request length (EINVAL).
    InvalidArgument = 6,
}

impl Status {
    pub fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => Self::Ok,
            1 => Self::Malformed,
            2 => Self::Unsupported,
            3 => Self::NotFound,
            4 => Self::BadHandle,
            5 => Self::BadAddress,
            6 => Self::InvalidArgument,
            _ => return None,
        })
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Ok => "ok",
            Self::Malformed => "malformed request",
            Self::Unsupported => "unsupported request",
            Self::NotFound => "no such device",
            Self::BadHandle => "bad file handle",
            Self::BadAddress => "bad address",
            Self::InvalidArgument => "invalid argument",
        };
        f.write_str(text)
    }
}

/// A decoded v1 request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    Open(OpenRequest),
    Read(ReadRequest),
    Write(WriteRequest),
    Close(CloseRequest),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenRequest {
    pub path: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadRequest {
    pub handle: u32,
    /// Requested length as the caller passed it (may be negative).
    pub len: i64,
    /// Bytes the caller has mapped to receive data.
    pub buf_cap: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteRequest {
    pub handle: u32,
    pub len: i64,
    /// Caller memory the write copies from; may be shorter than `len`.
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloseRequest {
    pub handle: u32,
}

/// A decoded v1 response. Non-OK responses carry no payload; their fields are zero/empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    Open { status: Status, handle: u32 },
    Read { status: Status, data: Vec<u8> },
    Write { status: Status, count: u32 },
    Close { status: Status },
}

impl Response {
    pub fn status(&self) -> Status {
        match self {
            Self::Open { status, .. }
            | Self::Read { status, .. }
            | Self::Write { status, .. }
            | Self::Close { status } => *status,
        }
    }

    pub fn op(&self) -> u8 {
        match self {
            Self::Open { .. } => OP_OPEN,
            Self::Read { .. } => OP_READ,
            Self::Write { .. } => OP_WRITE,
            Self::Close { .. } => OP_CLOSE,
        }
    }
}

/// Decode errors for v1 frames.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[must_use = "decode errors must be handled"]
pub enum DecodeError {
    #[error("malformed frame")]
    Malformed,
    #[error("unsupported version or opcode")]
    Unsupported,
    #[error("frame field exceeds limits")]
    TooLarge,
}

impl From<DecodeError> for Status {
    fn from(value: DecodeError) -> Self {
        match value {
            DecodeError::Malformed => Status::Malformed,
            DecodeError::Unsupported => Status::Unsupported,
            DecodeError::TooLarge => Status::InvalidArgument,
        }
    }
}

fn check_header(frame: &[u8], response: bool) -> Result<u8, DecodeError> {
    if frame.len() < HEADER_LEN || frame[0] != MAGIC0 || frame[1] != MAGIC1 {
        return Err(DecodeError::Malformed);
    }
    if frame[2] != VERSION {
        return Err(DecodeError::Unsupported);
    }
    let op = frame[3];
    if (op & RESPONSE_BIT != 0) != response {
        return Err(DecodeError::Malformed);
    }
    Ok(op & !RESPONSE_BIT)
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn read_i64(bytes: &[u8], at: usize) -> i64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[at..at + 8]);
    i64::from_le_bytes(raw)
}

pub fn decode_request(frame: &[u8]) -> Result<Request, DecodeError> {
    match check_header(frame, false)? {
        OP_OPEN => decode_open(frame),
        OP_READ => decode_read(frame),
        OP_WRITE => decode_write(frame),
        OP_CLOSE => decode_close(frame),
        _ => Err(DecodeError::Unsupported),
    }
}

fn decode_open(frame: &[u8]) -> Result<Request, DecodeError> {
    // [F,D,ver,OP, path_len:u16le, path]
    if frame.len() < 6 {
        return Err(DecodeError::Malformed);
    }
    let path_len = u16::from_le_bytes([frame[4], frame[5]]) as usize;
    if path_len > MAX_PATH_LEN {
        return Err(DecodeError::TooLarge);
    }
    if frame.len() != 6 + path_len {
        return Err(DecodeError::Malformed);
    }
    let path = core::str::from_utf8(&frame[6..]).map_err(|_| DecodeError::Malformed)?;
    Ok(Request::Open(OpenRequest { path: path.to_string() }))
}

fn decode_read(frame: &[u8]) -> Result<Request, DecodeError> {
    // [F,D,ver,OP, handle:u32le, len:i64le, buf_cap:u32le]
    if frame.len() != 20 {
        return Err(DecodeError::Malformed);
    }
    let buf_cap = read_u32(frame, 16);
    if buf_cap as usize > MAX_DATA_LEN {
        return Err(DecodeError::TooLarge);
    }
    Ok(Request::Read(ReadRequest { handle: read_u32(frame, 4), len: read_i64(frame, 8), buf_cap }))
}

fn decode_write(frame: &[u8]) -> Result<Request, DecodeError> {
    // [F,D,ver,OP, handle:u32le, len:i64le, data_len:u32le, data]
    if frame.len() < 20 {
        return Err(DecodeError::Malformed);
    }
    let data_len = read_u32(frame, 16) as usize;
    if data_len > MAX_DATA_LEN {
        return Err(DecodeError::TooLarge);
    }
    if frame.len() != 20 + data_len {
        return Err(DecodeError::Malformed);
    }
    Ok(Request::Write(WriteRequest {
        handle: read_u32(frame, 4),
        len: read_i64(frame, 8),
        data: frame[20..].to_vec(),
    }))
}

fn decode_close(frame: &[u8]) -> Result<Request, DecodeError> {
    // [F,D,ver,OP, handle:u32le]
    if frame.len() != 8 {
        return Err(DecodeError::Malformed);
    }
    Ok(Request::Close(CloseRequest { handle: read_u32(frame, 4) }))
}

/// Longest prefix of `path` that fits in `MAX_PATH_LEN` bytes without splitting a character.
pub fn clamp_path(path: &str) -> &str {
    let mut end = path.len().min(MAX_PATH_LEN);
    while !path.is_char_boundary(end) {
        end -= 1;
    }
    &path[..end]
}

/// Encodes a request frame (client side). Paths longer than `MAX_PATH_LEN` are cut at a
/// character boundary.
pub fn encode_request(request: &Request) -> Vec<u8> {
    match request {
        Request::Open(OpenRequest { path }) => {
            let path = clamp_path(path).as_bytes();
            let mut out = Vec::with_capacity(6 + path.len());
            out.extend_from_slice(&[MAGIC0, MAGIC1, VERSION, OP_OPEN]);
            out.extend_from_slice(&(path.len() as u16).to_le_bytes());
            out.extend_from_slice(path);
            out
        }
        Request::Read(ReadRequest { handle, len, buf_cap }) => {
            let mut out = Vec::with_capacity(20);
            out.extend_from_slice(&[MAGIC0, MAGIC1, VERSION, OP_READ]);
            out.extend_from_slice(&handle.to_le_bytes());
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(&buf_cap.to_le_bytes());
            out
        }
        Request::Write(WriteRequest { handle, len, data }) => {
            let mut out = Vec::with_capacity(20 + data.len());
            out.extend_from_slice(&[MAGIC0, MAGIC1, VERSION, OP_WRITE]);
            out.extend_from_slice(&handle.to_le_bytes());
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
            out.extend_from_slice(data);
            out
        }
        Request::Close(CloseRequest { handle }) => {
            let mut out = Vec::with_capacity(8);
            out.extend_from_slice(&[MAGIC0, MAGIC1, VERSION, OP_CLOSE]);
            out.extend_from_slice(&handle.to_le_bytes());
            out
        }
    }
}

/// Encodes a status-only response for `op` (used for failures and for CLOSE).
pub fn encode_status_response(op: u8, status: Status) -> Vec<u8> {
    // [F,D,ver,OP|0x80, status]
    vec![MAGIC0, MAGIC1, VERSION, op | RESPONSE_BIT, status as u8]
}

pub fn encode_response(response: &Response) -> Vec<u8> {
    let status = response.status();
    let mut out = encode_status_response(response.op(), status);
    if !status.is_ok() {
        return out;
    }
    match response {
        Response::Open { handle, .. } => out.extend_from_slice(&handle.to_le_bytes()),
        Response::Read { data, .. } => {
            // [.., count:u32le, bytes]
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
            out.extend_from_slice(data);
        }
        Response::Write { count, .. } => out.extend_from_slice(&count.to_le_bytes()),
        Response::Close { .. } => {}
    }
    out
}

pub fn decode_response(frame: &[u8]) -> Result<Response, DecodeError> {
    let op = check_header(frame, true)?;
    if frame.len() < HEADER_LEN + 1 {
        return Err(DecodeError::Malformed);
    }
    let status = Status::from_u8(frame[4]).ok_or(DecodeError::Malformed)?;
    let body = &frame[HEADER_LEN + 1..];
    if !status.is_ok() {
        if !body.is_empty() {
            return Err(DecodeError::Malformed);
        }
        return match op {
            OP_OPEN => Ok(Response::Open { status, handle: 0 }),
            OP_READ => Ok(Response::Read { status, data: Vec::new() }),
            OP_WRITE => Ok(Response::Write { status, count: 0 }),
            OP_CLOSE => Ok(Response::Close { status }),
            _ => Err(DecodeError::Unsupported),
        };
    }
    match op {
        OP_OPEN if body.len() == 4 => Ok(Response::Open { status, handle: read_u32(body, 0) }),
        OP_READ if body.len() >= 4 => {
            let count = read_u32(body, 0) as usize;
            if body.len() != 4 + count {
                return Err(DecodeError::Malformed);
            }
            Ok(Response::Read { status, data: body[4..].to_vec() })
        }
        OP_WRITE if body.len() == 4 => Ok(Response::Write { status, count: read_u32(body, 0) }),
        OP_CLOSE if body.is_empty() => Ok(Response::Close { status }),
        OP_OPEN | OP_READ | OP_WRITE | OP_CLOSE => Err(DecodeError::Malformed),
        _ => Err(DecodeError::Unsupported),
    }
}
