// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Typed client for the fifod protocol over any [`ClientTransport`].

use thiserror::Error;

use crate::protocol::{
    decode_response, encode_request, CloseRequest, DecodeError, OpenRequest, ReadRequest,
    Request, Response, Status, WriteRequest, MAX_PATH_LEN,
};
use crate::transport::{ClientTransport, TransportError};

/// Errors surfaced by [`FifoClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    /// The service answered with a non-OK status.
    #[error("request failed: {0}")]
    Status(Status),
    #[error("response does not match request")]
    Mismatch,
    /// Path does not fit in an OPEN frame.
    #[error("path of {0} bytes exceeds limit")]
    PathTooLong(usize),
}

impl ClientError {
    /// Wire status carried by the error, if any.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Status(status) => Some(*status),
            _ => None,
        }
    }
}

pub struct FifoClient<C> {
    transport: C,
}

impl<C: ClientTransport> FifoClient<C> {
    pub fn new(transport: C) -> Self {
        Self { transport }
    }

    pub fn open(&mut self, path: &str) -> Result<u32, ClientError> {
        if path.len() > MAX_PATH_LEN {
            return Err(ClientError::PathTooLong(path.len()));
        }
        match self.call(Request::Open(OpenRequest { path: path.to_string() }))? {
            Response::Open { handle, .. } => Ok(handle),
            _ => Err(ClientError::Mismatch),
        }
    }

    /// Reads up to `len` bytes into a buffer of the same size.
    pub fn read(&mut self, handle: u32, len: usize) -> Result<Vec<u8>, ClientError> {
        let len = u32::try_from(len).unwrap_or(u32::MAX);
        self.read_raw(handle, i64::from(len), len)
    }

    /// Reads with an explicit requested length and mapped buffer size.
    pub fn read_raw(&mut self, handle: u32, len: i64, buf_cap: u32) -> Result<Vec<u8>, ClientError> {
        match self.call(Request::Read(ReadRequest { handle, len, buf_cap }))? {
            Response::Read { data, .. } => Ok(data),
            _ => Err(ClientError::Mismatch),
        }
    }

    /// Writes all of `data`; returns the accepted count.
    pub fn write(&mut self, handle: u32, data: &[u8]) -> Result<usize, ClientError> {
        self.write_raw(handle, data.len() as i64, data)
    }

    /// Writes with an explicit requested length that may disagree with `data`.
    pub fn write_raw(&mut self, handle: u32, len: i64, data: &[u8]) -> Result<usize, ClientError> {
        let request = Request::Write(WriteRequest { handle, len, data: data.to_vec() });
        match self.call(request)? {
            Response::Write { count, .. } => Ok(count as usize),
            _ => Err(ClientError::Mismatch),
        }
    }

    pub fn close(&mut self, handle: u32) -> Result<(), ClientError> {
        match self.call(Request::Close(CloseRequest { handle }))? {
            Response::Close { .. } => Ok(()),
            _ => Err(ClientError::Mismatch),
        }
    }

    /// Sends a pre-encoded frame and returns the raw reply.
    pub fn call_raw(&mut self, frame: &[u8]) -> Result<Vec<u8>, ClientError> {
        Ok(self.transport.call(frame)?)
    }

    fn call(&mut self, request: Request) -> Result<Response, ClientError> {
        let reply = self.transport.call(&encode_request(&request))?;
        let response = decode_response(&reply)?;
        let expected = match request {
            Request::Open(_) => crate::protocol::OP_OPEN,
            Request::Read(_) => crate::protocol::OP_READ,
            Request::Write(_) => crate::protocol::OP_WRITE,
            Request::Close(_) => crate::protocol::OP_CLOSE,
        };
        if response.op() != expected {
            return Err(ClientError::Mismatch);
        }
        match response.status() {
            Status::Ok => Ok(response),
            status => Err(ClientError::Status(status)),
        }
    }
}
