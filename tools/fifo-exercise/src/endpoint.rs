// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Targets the exerciser can drive: a device node on disk or a fifod session.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use fifod::transport::ClientTransport;
use fifod::FifoClient;

/// One open handle on a FIFO device. Each call is a single read/write request.
pub trait Endpoint {
    /// Returns the number of bytes the device accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Returns the bytes the device produced; empty means no data right now.
    fn read(&mut self, len: usize) -> Result<Vec<u8>>;
}

impl<E: Endpoint + ?Sized> Endpoint for Box<E> {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write(data)
    }

    fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        (**self).read(len)
    }
}

/// Device node opened read/write through the filesystem.
pub struct DeviceFile {
    file: File,
}

impl DeviceFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("failed to open the device {}", path.display()))?;
        Ok(Self { file })
    }
}

impl Endpoint for DeviceFile {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.file.write(data).context("failed to write the message to the device")
    }

    fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let n = self.file.read(&mut buf).context("failed to read the message from the device")?;
        buf.truncate(n);
        Ok(buf)
    }
}

/// Open handle held through a fifod client; closed on drop.
pub struct ServiceEndpoint<C: ClientTransport> {
    client: FifoClient<C>,
    handle: u32,
}

impl<C: ClientTransport> ServiceEndpoint<C> {
    pub fn open(transport: C, path: &str) -> Result<Self> {
        let mut client = FifoClient::new(transport);
        let handle = client.open(path).with_context(|| format!("failed to open {path}"))?;
        Ok(Self { client, handle })
    }
}

impl<C: ClientTransport> Endpoint for ServiceEndpoint<C> {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        Ok(self.client.write(self.handle, data)?)
    }

    fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        Ok(self.client.read(self.handle, len)?)
    }
}

impl<C: ClientTransport> Drop for ServiceEndpoint<C> {
    fn drop(&mut self) {
        if let Err(err) = self.client.close(self.handle) {
            log::debug!("fifo-exercise: close failed: {err}");
        }
    }
}
