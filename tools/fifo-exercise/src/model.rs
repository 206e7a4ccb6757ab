// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

use std::collections::VecDeque;

/// Reference queue used to predict what the device should report.
#[derive(Clone, Debug)]
pub struct QueueModel {
    capacity: usize,
    pending: VecDeque<u8>,
}

impl QueueModel {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, pending: VecDeque::with_capacity(capacity) }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Accepts the prefix of `data` that fits; returns its length.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.capacity - self.pending.len());
        self.pending.extend(&data[..n]);
        n
    }

    /// Removes and returns up to `len` bytes from the front.
    pub fn read(&mut self, len: usize) -> Vec<u8> {
        let n = len.min(self.pending.len());
        self.pending.drain(..n).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::QueueModel;

    #[test]
    fn truncation_law() {
        let mut model = QueueModel::new(1024);
        assert_eq!(model.write(&[b'x'; 1100]), 1024);
        assert_eq!(model.write(b"y"), 0);
        assert_eq!(model.read(500).len(), 500);
        assert_eq!(model.write(&[b'z'; 600]), 500);
        assert_eq!(model.len(), 1024);
        assert!(model.read(0).is_empty());
    }
}
