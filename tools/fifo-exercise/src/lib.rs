// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! CONTEXT: FIFO device exerciser (boundary, randomized and interactive request sequences)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: 4 unit tests, end-to-end runs in `tools/fifo-exercise/tests/scenarios.rs`
//!
//! PUBLIC API:
//!   - Endpoint: DeviceFile (device node) or ServiceEndpoint (fifod session)
//!   - Exerciser: transcript + per-request check against QueueModel
//!   - interactive/brute_force/random/empty: scenarios
//!
//! The model check assumes the exerciser is the only user of the device.

mod endpoint;
mod model;
mod scenario;

pub use endpoint::{DeviceFile, Endpoint, ServiceEndpoint};
pub use model::QueueModel;
pub use scenario::{
    brute_force, brute_force_message, empty, interactive, random, Exerciser, Report, Step,
    StepKind, RECEIVE_LEN,
};
