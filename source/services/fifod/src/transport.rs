// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: fifod frame transports (in-process loopback, Unix stream sockets)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Exercised by `source/services/fifod/tests/service_loopback.rs`
//!
//! Stream transports carry frames as `[len:u32le][frame]`.

use std::io::{self, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use thiserror::Error;

use crate::protocol::MAX_FRAME_LEN;

/// Transport level failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection closed by the peer.
    #[error("transport closed")]
    Closed,
    /// I/O failure.
    #[error("io error: {0}")]
    Io(String),
    /// Peer announced a frame above `MAX_FRAME_LEN`.
    #[error("frame of {0} bytes exceeds limit")]
    FrameTooLarge(usize),
    /// A reply was sent with no request outstanding.
    #[error("no request awaiting a reply")]
    NoPendingRequest,
}

impl From<io::Error> for TransportError {
    fn from(value: io::Error) -> Self {
        match value.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::UnexpectedEof => Self::Closed,
            _ => Self::Io(value.to_string()),
        }
    }
}

/// Server side of a request/response transport.
pub trait Transport {
    /// Error surfaced by the transport implementation.
    type Error: Into<TransportError>;

    /// Receives the next frame; `None` once the peer is gone.
    fn recv(&mut self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Sends the response to the last received frame.
    fn send(&mut self, frame: &[u8]) -> Result<(), Self::Error>;
}

/// Client side: one request frame in, one response frame out.
pub trait ClientTransport {
    fn call(&mut self, frame: &[u8]) -> Result<Vec<u8>, TransportError>;
}

type LoopbackRequest = (Vec<u8>, Sender<Vec<u8>>);

/// Creates a connected in-process client/server pair.
pub fn loopback_channel() -> (LoopbackClient, LoopbackServer) {
    let (tx, rx) = unbounded();
    (LoopbackClient { requests: tx }, LoopbackServer { requests: rx, pending: None })
}

/// Cloneable in-process client; each clone is an independent caller.
#[derive(Clone)]
pub struct LoopbackClient {
    requests: Sender<LoopbackRequest>,
}

impl ClientTransport for LoopbackClient {
    fn call(&mut self, frame: &[u8]) -> Result<Vec<u8>, TransportError> {
        let (reply_tx, reply_rx) = bounded(1);
        self.requests.send((frame.to_vec(), reply_tx)).map_err(|_| TransportError::Closed)?;
        reply_rx.recv().map_err(|_| TransportError::Closed)
    }
}

/// Server end of [`loopback_channel`]; finishes once every client is dropped.
pub struct LoopbackServer {
    requests: Receiver<LoopbackRequest>,
    pending: Option<Sender<Vec<u8>>>,
}

impl Transport for LoopbackServer {
    type Error = TransportError;

    fn recv(&mut self) -> Result<Option<Vec<u8>>, Self::Error> {
        match self.requests.recv() {
            Ok((frame, reply)) => {
                self.pending = Some(reply);
                Ok(Some(frame))
            }
            Err(_) => Ok(None),
        }
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        let reply = self.pending.take().ok_or(TransportError::NoPendingRequest)?;
        // A caller that gave up waiting is not a server failure.
        let _ = reply.send(frame.to_vec());
        Ok(())
    }
}

/// Reads one length-prefixed frame; `None` on a clean end of stream.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>, TransportError> {
    let mut prefix = [0u8; 4];
    let mut filled = 0;
    while filled < prefix.len() {
        match reader.read(&mut prefix[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(TransportError::Closed),
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err.into()),
        }
    }
    let len = u32::from_le_bytes(prefix) as usize;
    if len > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge(len));
    }
    let mut frame = vec![0u8; len];
    reader.read_exact(&mut frame)?;
    Ok(Some(frame))
}

pub fn write_frame<W: Write>(writer: &mut W, frame: &[u8]) -> Result<(), TransportError> {
    if frame.len() > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge(frame.len()));
    }
    writer.write_all(&(frame.len() as u32).to_le_bytes())?;
    writer.write_all(frame)?;
    writer.flush()?;
    Ok(())
}

/// Server side of one accepted Unix stream connection.
pub struct UnixTransport {
    stream: UnixStream,
}

impl UnixTransport {
    pub fn new(stream: UnixStream) -> Self {
        Self { stream }
    }
}

impl Transport for UnixTransport {
    type Error = TransportError;

    fn recv(&mut self) -> Result<Option<Vec<u8>>, Self::Error> {
        read_frame(&mut self.stream)
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        write_frame(&mut self.stream, frame)
    }
}

/// Client connection to a fifod Unix socket.
pub struct UnixClient {
    stream: UnixStream,
}

impl UnixClient {
    pub fn connect(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        Ok(Self { stream: UnixStream::connect(path)? })
    }
}

impl ClientTransport for UnixClient {
    fn call(&mut self, frame: &[u8]) -> Result<Vec<u8>, TransportError> {
        write_frame(&mut self.stream, frame)?;
        read_frame(&mut self.stream)?.ok_or(TransportError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{read_frame, write_frame, TransportError};
    use crate::protocol::MAX_FRAME_LEN;

    #[test]
    fn frames_stream_back_to_back() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"one").unwrap();
        write_frame(&mut wire, b"").unwrap();
        let mut cursor = Cursor::new(wire);
        assert_eq!(read_frame(&mut cursor).unwrap(), Some(b"one".to_vec()));
        assert_eq!(read_frame(&mut cursor).unwrap(), Some(Vec::new()));
        assert_eq!(read_frame(&mut cursor).unwrap(), None);
    }

    #[test]
    fn truncated_and_oversized_frames_fail() {
        let mut cursor = Cursor::new(vec![5u8, 0, 0, 0, b'a']);
        assert!(matches!(read_frame(&mut cursor), Err(TransportError::Closed)));
        let big = ((MAX_FRAME_LEN + 1) as u32).to_le_bytes().to_vec();
        assert!(matches!(
            read_frame(&mut Cursor::new(big)),
            Err(TransportError::FrameTooLarge(_))
        ));
        let mut cursor = Cursor::new(vec![5u8, 0]);
        assert!(matches!(read_frame(&mut cursor), Err(TransportError::Closed)));
    }
}
