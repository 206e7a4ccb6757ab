// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Handle table mapping remote open files onto registered character devices.

use std::collections::HashMap;
use std::sync::Arc;

use char_fifo::{request_len, CharDevice, ChrdevRegistry, DeviceError};
use log::{debug, info, warn};
use nexus_hal::{checked_range, CopyFault, UserSliceMut};
use parking_lot::Mutex;
use thiserror::Error;

use crate::protocol::Status;

/// Error types produced by the dispatcher.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// No device node at the requested path.
    #[error("not found: {0}")]
    NotFound(String),
    /// File handle is invalid or has been closed.
    #[error("bad file handle {0}")]
    BadHandle(u32),
    /// The device rejected the operation.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),
}

impl ServiceError {
    /// Wire status reported for this error.
    pub fn status(&self) -> Status {
        match self {
            Self::NotFound(_) => Status::NotFound,
            Self::BadHandle(_) => Status::BadHandle,
            Self::Device(DeviceError::BadAddress { .. }) => Status::BadAddress,
            Self::Device(_) => Status::InvalidArgument,
        }
    }
}

struct OpenFile {
    path: String,
    device: Arc<dyn CharDevice>,
}

/// Caller buffer of which only the first `mapped` bytes are writable.
///
/// Backing storage grows with the copy, so an oversized `mapped` does not allocate up front.
pub struct RemoteBuffer {
    bytes: Vec<u8>,
    mapped: usize,
}

impl RemoteBuffer {
    pub fn new(mapped: usize) -> Self {
        Self { bytes: Vec::new(), mapped }
    }

    /// Returns the first `len` bytes written by the device.
    pub fn into_filled(mut self, len: usize) -> Vec<u8> {
        self.bytes.truncate(len);
        self.bytes
    }
}

impl UserSliceMut for RemoteBuffer {
    fn len(&self) -> usize {
        self.mapped
    }

    fn copy_to_user(&mut self, offset: usize, src: &[u8]) -> Result<(), CopyFault> {
        let end = checked_range(offset, src.len(), self.mapped)?;
        if self.bytes.len() < end {
            self.bytes.resize(end, 0);
        }
        self.bytes[offset..end].copy_from_slice(src);
        Ok(())
    }
}

#[derive(Default)]
struct HandleTable {
    files: HashMap<u32, OpenFile>,
    next: u32,
    /// Set by `close_all`; later opens are refused.
    closed: bool,
}

/// Shared dispatcher state.
pub struct Dispatcher {
    registry: Arc<ChrdevRegistry>,
    max_request_len: usize,
    handles: Mutex<HandleTable>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ChrdevRegistry>, max_request_len: usize) -> Self {
        Self {
            registry,
            max_request_len,
            handles: Mutex::new(HandleTable { next: 1, ..HandleTable::default() }),
        }
    }

    /// Opens the node at `path` and returns a fresh handle.
    pub fn open(&self, path: &str) -> Result<u32, ServiceError> {
        let device = self
            .registry
            .lookup(path)
            .ok_or_else(|| ServiceError::NotFound(path.to_string()))?;
        device.open()?;

        let mut table = self.handles.lock();
        if table.closed {
            drop(table);
            if let Err(err) = device.release() {
                warn!("fifod: release after shutdown failed: {err}");
            }
            return Err(ServiceError::NotFound(path.to_string()));
        }
        let mut handle = table.next;
        while handle == 0 || table.files.contains_key(&handle) {
            handle = handle.wrapping_add(1);
        }
        table.next = handle.wrapping_add(1).max(1);
        table.files.insert(handle, OpenFile { path: path.to_string(), device });
        debug!("fifod: open {path} -> handle {handle}");
        Ok(handle)
    }

    /// Reads up to `len` bytes into a caller buffer of `buf_cap` bytes.
    pub fn read(&self, handle: u32, len: i64, buf_cap: u32) -> Result<Vec<u8>, ServiceError> {
        let len = request_len(len, self.max_request_len)?;
        let device = self.device(handle)?;
        let mut buffer = RemoteBuffer::new(buf_cap as usize);
        let n = device.read(&mut buffer, len)?;
        Ok(buffer.into_filled(n))
    }

    /// Writes up to `len` bytes from `data`; `data` is all the caller has mapped.
    pub fn write(&self, handle: u32, len: i64, data: &[u8]) -> Result<usize, ServiceError> {
        let len = request_len(len, self.max_request_len)?;
        let device = self.device(handle)?;
        Ok(device.write(&data, len)?)
    }

    pub fn close(&self, handle: u32) -> Result<(), ServiceError> {
        let file = self.handles.lock().files.remove(&handle).ok_or(ServiceError::BadHandle(handle))?;
        debug!("fifod: close handle {handle} ({})", file.path);
        file.device.release()?;
        Ok(())
    }

    /// Releases every open handle and refuses further opens.
    pub fn close_all(&self) {
        let files: Vec<(u32, OpenFile)> = {
            let mut table = self.handles.lock();
            table.closed = true;
            table.files.drain().collect()
        };
        if !files.is_empty() {
            info!("fifod: releasing {} open handle(s)", files.len());
        }
        for (handle, file) in files {
            if let Err(err) = file.device.release() {
                warn!("fifod: release of handle {handle} failed: {err}");
            }
        }
    }

    pub fn open_handles(&self) -> usize {
        self.handles.lock().files.len()
    }

    fn device(&self, handle: u32) -> Result<Arc<dyn CharDevice>, ServiceError> {
        self.handles
            .lock()
            .files
            .get(&handle)
            .map(|file| file.device.clone())
            .ok_or(ServiceError::BadHandle(handle))
    }
}
