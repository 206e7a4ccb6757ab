// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! CONTEXT: fifod daemon exposing the FIFO character device to remote callers
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Unit tests per module, host tests in `source/services/fifod/tests/`
//!
//! PUBLIC API:
//!   - FifoConfig: defaults, TOML file and environment overrides
//!   - protocol: versioned OPEN/READ/WRITE/CLOSE frames
//!   - Dispatcher: handle table over the chrdev registry
//!   - FifoService / service_main_loop(): lifecycle and serve loops
//!   - FifoClient: typed client over loopback or Unix sockets
//!
//! DEPENDENCIES:
//!   - char-fifo: device, registration
//!   - crossbeam-channel: loopback transport
//!   - serde/toml: configuration
//!
//! ADR: docs/adr/0017-service-architecture.md

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod protocol;
mod std_server;
pub mod transport;

pub use client::{ClientError, FifoClient};
pub use config::{ConfigError, FifoConfig};
pub use dispatcher::{Dispatcher, ServiceError};
pub use std_server::{
    handle_frame, run_loop, run_with_transport, serve_unix, service_main_loop, FifoService,
    ReadyNotifier, ServerError,
};
pub use transport::{loopback_channel, LoopbackClient, TransportError, UnixClient};
