// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Host tests for loading fifod configuration from disk
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable
//! TEST_COVERAGE: 3 tests
//!
//! TEST_SCENARIOS:
//!   - load_reads_file_sections(): file values override defaults
//!   - load_missing_file_reports_path(): Io error names the path
//!   - load_rejects_invalid_limits(): validation runs after parsing

use std::io::Write;
use std::path::PathBuf;

use fifod::{ConfigError, FifoConfig};
use tempfile::NamedTempFile;

fn write_config(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("tempfile");
    file.write_all(text.as_bytes()).expect("write config");
    file
}

#[test]
fn load_reads_file_sections() {
    let file = write_config(
        r#"
[device]
name = "fifo0"
major = 240

[queue]
capacity = 2048

[service]
socket = "/tmp/fifo0.sock"
"#,
    );
    let config = FifoConfig::load(Some(file.path())).expect("load");
    assert_eq!(config.device.name, "fifo0");
    assert_eq!(config.device.major, 240);
    assert_eq!(config.device.class, "char");
    assert_eq!(config.service.socket, PathBuf::from("/tmp/fifo0.sock"));
    assert_eq!(config.node_path(), "/dev/fifo0");
}

#[test]
fn load_missing_file_reports_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("absent.toml");
    match FifoConfig::load(Some(path.as_path())) {
        Err(ConfigError::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn load_rejects_invalid_limits() {
    let file = write_config("[queue]\ncapacity = 4096\n[limits]\nmax_request_len = 100\n");
    assert!(matches!(FifoConfig::load(Some(file.path())), Err(ConfigError::Invalid(_))));
}
