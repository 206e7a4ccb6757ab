// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

//! CONTEXT: Bounded FIFO byte queue (ring buffer) backing character devices
//!
//! OWNERS: @runtime
//!
//! STATUS: Functional
//!
//! API_STABILITY: Stable
//!
//! TEST_COVERAGE: 5 unit tests, property tests in `source/libs/nexus-byteq/tests/queue_laws.rs`
//!   - Truncating enqueue/dequeue, wrap-around, zero-length no-ops
//!   - Model-based property tests (FIFO order, capacity invariant, conservation)
//!
//! PUBLIC API:
//!   - ByteQueue: fixed-capacity byte ring; short transfers instead of errors
//!   - QueueStats: counters snapshot
//!   - QueueError: construction failures
//!
//! ADR: docs/adr/0016-kernel-libs-architecture.md

extern crate alloc;

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::cmp::min;
use core::fmt;

/// Errors returned when building a queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use = "queue errors must be handled"]
pub enum QueueError {
    /// The queue must hold at least one byte.
    ZeroCapacity,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCapacity => write!(f, "queue capacity must be non-zero"),
        }
    }
}

/// Queue counters snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub capacity: usize,
    pub used: usize,
    pub total_enqueued: u64,
    pub total_dequeued: u64,
    /// Bytes offered to `enqueue` that did not fit.
    pub truncated_bytes: u64,
}

/// Fixed-capacity FIFO of bytes.
///
/// Writes that do not fit are truncated and reads of more than what is pending return what
/// is there; neither case is an error. Storage is allocated once and never grows.
pub struct ByteQueue {
    storage: Box<[u8]>,
    head: usize,
    len: usize,
    total_enqueued: u64,
    total_dequeued: u64,
    truncated_bytes: u64,
}

impl ByteQueue {
    /// Creates an empty queue holding at most `capacity` bytes.
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::ZeroCapacity);
        }
        Ok(Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            head: 0,
            len: 0,
            total_enqueued: 0,
            total_dequeued: 0,
            truncated_bytes: 0,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Number of pending bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    #[inline]
    pub fn free_space(&self) -> usize {
        self.capacity() - self.len
    }

    /// Appends as much of `data` as fits and returns the number of bytes accepted.
    ///
    /// Returns 0 when `data` is empty or the queue is full.
    pub fn enqueue(&mut self, data: &[u8]) -> usize {
        let n = min(data.len(), self.free_space());
        self.truncated_bytes = self.truncated_bytes.saturating_add((data.len() - n) as u64);
        if n == 0 {
            return 0;
        }
        let cap = self.capacity();
        let tail = (self.head + self.len) % cap;
        let first = min(n, cap - tail);
        self.storage[tail..tail + first].copy_from_slice(&data[..first]);
        self.storage[..n - first].copy_from_slice(&data[first..n]);
        self.len += n;
        self.total_enqueued = self.total_enqueued.saturating_add(n as u64);
        n
    }

    /// Removes up to `requested_len` bytes from the front.
    ///
    /// An empty result means no data is pending right now.
    pub fn dequeue(&mut self, requested_len: usize) -> Vec<u8> {
        let mut out = vec![0u8; min(requested_len, self.len)];
        self.dequeue_into(&mut out);
        out
    }

    /// Moves up to `out.len()` bytes from the front into `out`.
    pub fn dequeue_into(&mut self, out: &mut [u8]) -> usize {
        let n = self.peek_into(out);
        self.consume(n)
    }

    /// Copies up to `out.len()` pending bytes into `out` without removing them.
    pub fn peek_into(&self, out: &mut [u8]) -> usize {
        let n = min(out.len(), self.len);
        let (front, back) = self.as_slices();
        let first = min(n, front.len());
        out[..first].copy_from_slice(&front[..first]);
        out[first..n].copy_from_slice(&back[..n - first]);
        n
    }

    /// Drops up to `n` bytes from the front and returns how many were dropped.
    pub fn consume(&mut self, n: usize) -> usize {
        let n = min(n, self.len);
        if n == 0 {
            return 0;
        }
        self.head = (self.head + n) % self.capacity();
        self.len -= n;
        if self.len == 0 {
            self.head = 0;
        }
        self.total_dequeued = self.total_dequeued.saturating_add(n as u64);
        n
    }

    /// Pending bytes in FIFO order, split at the wrap point.
    pub fn as_slices(&self) -> (&[u8], &[u8]) {
        let cap = self.capacity();
        let end = self.head + self.len;
        if end <= cap {
            (&self.storage[self.head..end], &[])
        } else {
            (&self.storage[self.head..], &self.storage[..end - cap])
        }
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            capacity: self.capacity(),
            used: self.len,
            total_enqueued: self.total_enqueued,
            total_dequeued: self.total_dequeued,
            truncated_bytes: self.truncated_bytes,
        }
    }
}

impl fmt::Debug for ByteQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteQueue")
            .field("capacity", &self.capacity())
            .field("len", &self.len)
            .field("head", &self.head)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{ByteQueue, QueueError};

    #[test]
    fn zero_capacity_rejected() {
        assert_eq!(ByteQueue::new(0).unwrap_err(), QueueError::ZeroCapacity);
    }

    #[test]
    fn overfill_then_partial_reads() {
        let mut q = ByteQueue::new(1024).unwrap();
        assert_eq!(q.enqueue(&[b'a'; 1100]), 1024);
        assert_eq!(q.len(), 1024);
        let first = q.dequeue(500);
        assert_eq!(first, vec![b'a'; 500]);
        assert_eq!(q.len(), 524);
        assert_eq!(q.dequeue(500).len(), 500);
        assert_eq!(q.len(), 24);
        assert_eq!(q.stats().truncated_bytes, 76);
    }

    #[test]
    fn empty_and_zero_length_requests() {
        let mut q = ByteQueue::new(4096).unwrap();
        assert!(q.dequeue(1).is_empty());
        assert_eq!(q.enqueue(&[]), 0);
        assert_eq!(q.enqueue(b"A"), 1);
        assert!(q.dequeue(0).is_empty());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn full_queue_accepts_nothing_until_read() {
        let mut q = ByteQueue::new(1024).unwrap();
        let mut msg = vec![b'a'; 499];
        msg.extend_from_slice(&[b'b'; 500]);
        msg.extend_from_slice(&[b'c'; 101]);
        assert_eq!(q.enqueue(&msg), 1024);
        assert!(q.is_full());
        assert_eq!(q.enqueue(b"more"), 0);
        assert_eq!(q.dequeue(2), b"aa");
        assert_eq!(q.enqueue(b"more"), 2);
        assert_eq!(q.len(), 1024);
    }

    #[test]
    fn wraps_around_in_fifo_order() {
        let mut q = ByteQueue::new(5).unwrap();
        assert_eq!(q.enqueue(b"12345"), 5);
        assert_eq!(q.dequeue(2), b"12");
        assert_eq!(q.enqueue(b"abc"), 2);
        let (front, back) = q.as_slices();
        assert_eq!(front, b"345");
        assert_eq!(back, b"ab");
        let mut peeked = [0u8; 4];
        assert_eq!(q.peek_into(&mut peeked), 4);
        assert_eq!(&peeked, b"345a");
        assert_eq!(q.len(), 5);
        assert_eq!(q.dequeue(10), b"345ab");
        assert!(q.is_empty());
    }
}
