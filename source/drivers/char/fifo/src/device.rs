// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info, trace, warn};
use nexus_byteq::{ByteQueue, QueueStats};
use nexus_hal::{checked_range, UserSlice, UserSliceMut};
use parking_lot::Mutex;

use crate::{CharDevice, DeviceError, DeviceResult};

/// Character device exposing one bounded byte queue to every opener.
///
/// All queue access goes through a single lock. Reads copy out while holding it and only
/// consume the bytes once the copy succeeded, so a faulting reader loses nothing.
pub struct FifoDevice {
    name: String,
    queue: Mutex<ByteQueue>,
    openers: AtomicUsize,
}

impl FifoDevice {
    pub fn new(name: impl Into<String>, capacity: usize) -> DeviceResult<Self> {
        let queue = ByteQueue::new(capacity).map_err(|_| DeviceError::InvalidCapacity(capacity))?;
        Ok(Self { name: name.into(), queue: Mutex::new(queue), openers: AtomicUsize::new(0) })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.queue.lock().capacity()
    }

    /// Bytes currently pending.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Number of handles currently open on the device.
    pub fn openers(&self) -> usize {
        self.openers.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> QueueStats {
        self.queue.lock().stats()
    }
}

impl CharDevice for FifoDevice {
    fn open(&self) -> DeviceResult<()> {
        self.openers.fetch_add(1, Ordering::AcqRel);
        info!("{}: device opened", self.name);
        Ok(())
    }

    fn release(&self) -> DeviceResult<()> {
        let prev = self
            .openers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0);
        if prev == 0 {
            warn!("{}: release without matching open", self.name);
        }
        info!("{}: device closed", self.name);
        Ok(())
    }

    fn read(&self, dst: &mut dyn UserSliceMut, len: usize) -> DeviceResult<usize> {
        let mut queue = self.queue.lock();
        let want = len.min(queue.len());
        if want == 0 {
            trace!("{}: read {len} -> 0 (empty or zero-length)", self.name);
            return Ok(0);
        }
        let mut staged = vec![0u8; want];
        let n = queue.peek_into(&mut staged);
        if let Err(fault) = dst.copy_to_user(0, &staged[..n]) {
            warn!("{}: read copy faulted: {fault:?}", self.name);
            return Err(fault.into());
        }
        queue.consume(n);
        debug!("{}: read {n}/{len} bytes, {} pending", self.name, queue.len());
        Ok(n)
    }

    fn write(&self, src: &dyn UserSlice, len: usize) -> DeviceResult<usize> {
        // Unmapped lengths fault before anything is staged.
        let checked = checked_range(0, len, src.len())
            .and_then(|_| {
                let mut staged = vec![0u8; len];
                src.copy_from_user(0, &mut staged).map(|()| staged)
            });
        let staged = match checked {
            Ok(staged) => staged,
            Err(fault) => {
                warn!("{}: write copy faulted: {fault:?}", self.name);
                return Err(fault.into());
            }
        };
        let mut queue = self.queue.lock();
        let n = queue.enqueue(&staged);
        if n < len {
            debug!("{}: write truncated {n}/{len} bytes (queue full)", self.name);
        } else {
            debug!("{}: wrote {n} bytes, {} pending", self.name, queue.len());
        }
        Ok(n)
    }
}
