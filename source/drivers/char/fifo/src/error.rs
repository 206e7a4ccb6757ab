// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

use nexus_hal::CopyFault;
use thiserror::Error;

/// Result alias used by the driver.
pub type DeviceResult<T> = core::result::Result<T, DeviceError>;

/// Errors surfaced by the FIFO device and its registration.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeviceError {
    /// Caller memory could not be copied (EFAULT).
    #[error("bad address: {len} bytes at offset {offset}")]
    BadAddress { offset: usize, len: usize },
    /// Request length is negative or above the configured limit (EINVAL).
    #[error("invalid argument: request length {0}")]
    InvalidArgument(i64),
    /// Queue capacity must be non-zero.
    #[error("invalid capacity {0}")]
    InvalidCapacity(usize),
    /// Device name is empty, too long or contains '/'.
    #[error("invalid device name {0:?}")]
    InvalidName(String),
    /// A device with this name is already registered.
    #[error("device {0} already registered")]
    AlreadyRegistered(String),
    /// The requested major number is taken.
    #[error("major number {0} busy")]
    MajorBusy(u32),
    /// The dynamic major range is exhausted.
    #[error("no free major numbers")]
    NoFreeMajor,
    /// The device class already exists.
    #[error("device class {0} already exists")]
    ClassExists(String),
    /// No such device class.
    #[error("unknown device class {0}")]
    UnknownClass(String),
    /// The device node path is already in use.
    #[error("device node {0} already exists")]
    NodeExists(String),
}

impl From<CopyFault> for DeviceError {
    fn from(value: CopyFault) -> Self {
        match value {
            CopyFault::BadAddress { offset, len } => Self::BadAddress { offset, len },
        }
    }
}
