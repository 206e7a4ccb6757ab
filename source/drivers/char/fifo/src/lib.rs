// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! CONTEXT: FIFO character device driver (single bounded byte queue behind open/read/write/close)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable
//! TEST_COVERAGE: 11 unit tests, integration tests in `source/drivers/char/fifo/tests/`
//!
//! PUBLIC API:
//!   - CharDevice: four-operation contract called by the device-file layer
//!   - FifoDevice: CharDevice over a locked `nexus_byteq::ByteQueue`
//!   - ChrdevRegistry / Registration: major number, class and node lifecycle
//!   - request_len(): validates raw signed request lengths
//!
//! DEPENDENCIES:
//!   - nexus-byteq::ByteQueue: queue semantics (truncating transfers)
//!   - nexus-hal::{UserSlice, UserSliceMut}: cross-domain copies
//!
//! ADR: docs/adr/0016-kernel-libs-architecture.md

mod device;
mod error;
pub mod registration;

pub use device::FifoDevice;
pub use error::{DeviceError, DeviceResult};
pub use registration::{ChrdevRegistry, DeviceNumber, Registration};

use nexus_hal::{UserSlice, UserSliceMut};

/// Default queue capacity in bytes.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Operations the device-file layer invokes on a character device.
///
/// Short counts from `read`/`write` are normal results; errors are reserved for structural
/// faults and invalid arguments.
pub trait CharDevice: Send + Sync {
    fn open(&self) -> DeviceResult<()>;

    fn release(&self) -> DeviceResult<()>;

    /// Moves up to `len` bytes into `dst`; 0 means nothing is pending.
    fn read(&self, dst: &mut dyn UserSliceMut, len: usize) -> DeviceResult<usize>;

    /// Accepts up to `len` bytes from `src`; a short count means the rest was dropped.
    fn write(&self, src: &dyn UserSlice, len: usize) -> DeviceResult<usize>;
}

/// Validates a caller-supplied signed length against `max`.
pub fn request_len(raw: i64, max: usize) -> DeviceResult<usize> {
    match usize::try_from(raw) {
        Ok(len) if len <= max => Ok(len),
        _ => Err(DeviceError::InvalidArgument(raw)),
    }
}
