// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! CONTEXT: fifod daemon entrypoint (config path from argv[1] or FIFOD_CONFIG)
//!
//! OWNERS: @runtime
//!
//! STATUS: Functional
//!
//! API_STABILITY: Unstable
//!
//! TEST_COVERAGE: Host tests in `source/services/fifod/tests/`
//!
//! ADR: docs/adr/0017-service-architecture.md

use std::path::PathBuf;

fn main() {
    env_logger::init();
    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = match fifod::FifoConfig::load(path.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("fifod: {err}");
            std::process::exit(1);
        }
    };
    if let Err(err) = fifod::service_main_loop(&config, fifod::ReadyNotifier::new(|| {
        log::info!("fifod: ready");
    })) {
        eprintln!("fifod: exited with error: {err}");
        std::process::exit(1);
    }
}
