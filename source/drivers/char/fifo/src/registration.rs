// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Character device registration: major numbers, device classes and `/dev` nodes.
//!
//! [`Registration::register`] performs the steps in order and unwinds the completed ones
//! when a later step fails. Dropping the registration tears everything down in reverse.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use log::{error, info};
use parking_lot::Mutex;

use crate::{CharDevice, DeviceError, DeviceResult};

/// Requests a dynamically allocated major number.
pub const DYNAMIC_MAJOR: u32 = 0;
/// Dynamic majors are handed out from the top of this range downwards.
pub const DYNAMIC_MAJOR_RANGE: core::ops::RangeInclusive<u32> = 234..=254;

const MAX_NAME_LEN: usize = 64;

/// Major/minor pair identifying a device node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceNumber {
    pub major: u32,
    pub minor: u32,
}

impl fmt::Display for DeviceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}

struct NodeEntry {
    number: DeviceNumber,
    class: String,
    device: Arc<dyn CharDevice>,
}

#[derive(Default)]
struct RegistryState {
    majors: BTreeMap<u32, String>,
    classes: BTreeSet<String>,
    nodes: BTreeMap<String, NodeEntry>,
}

/// Table of registered character devices, classes and nodes.
#[derive(Default)]
pub struct ChrdevRegistry {
    state: Mutex<RegistryState>,
}

impl ChrdevRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `major` for `name`, or allocates one when `major == DYNAMIC_MAJOR`.
    pub fn register_chrdev(&self, major: u32, name: &str) -> DeviceResult<u32> {
        validate_name(name)?;
        let mut state = self.state.lock();
        if state.majors.values().any(|owner| owner == name) {
            return Err(DeviceError::AlreadyRegistered(name.to_string()));
        }
        let major = if major == DYNAMIC_MAJOR {
            DYNAMIC_MAJOR_RANGE
                .rev()
                .find(|candidate| !state.majors.contains_key(candidate))
                .ok_or(DeviceError::NoFreeMajor)?
        } else if state.majors.contains_key(&major) {
            return Err(DeviceError::MajorBusy(major));
        } else {
            major
        };
        state.majors.insert(major, name.to_string());
        Ok(major)
    }

    /// Releases `major`. Returns false if it was not held by `name`.
    pub fn unregister_chrdev(&self, major: u32, name: &str) -> bool {
        let mut state = self.state.lock();
        match state.majors.get(&major) {
            Some(owner) if owner == name => {
                state.majors.remove(&major);
                true
            }
            _ => false,
        }
    }

    pub fn class_create(&self, class: &str) -> DeviceResult<()> {
        validate_name(class)?;
        if self.state.lock().classes.insert(class.to_string()) {
            Ok(())
        } else {
            Err(DeviceError::ClassExists(class.to_string()))
        }
    }

    pub fn class_destroy(&self, class: &str) -> bool {
        self.state.lock().classes.remove(class)
    }

    /// Creates `/dev/<name>` for `number` and returns the node path.
    pub fn device_create(
        &self,
        class: &str,
        number: DeviceNumber,
        name: &str,
        device: Arc<dyn CharDevice>,
    ) -> DeviceResult<String> {
        validate_name(name)?;
        let path = node_path(name);
        let mut state = self.state.lock();
        if !state.classes.contains(class) {
            return Err(DeviceError::UnknownClass(class.to_string()));
        }
        if state.nodes.contains_key(&path) {
            return Err(DeviceError::NodeExists(path));
        }
        state.nodes.insert(path.clone(), NodeEntry { number, class: class.to_string(), device });
        Ok(path)
    }

    pub fn device_destroy(&self, path: &str) -> bool {
        self.state.lock().nodes.remove(path).is_some()
    }

    /// Resolves a node path to its device.
    pub fn lookup(&self, path: &str) -> Option<Arc<dyn CharDevice>> {
        self.state.lock().nodes.get(path).map(|node| node.device.clone())
    }

    pub fn device_number(&self, path: &str) -> Option<DeviceNumber> {
        self.state.lock().nodes.get(path).map(|node| node.number)
    }

    /// Node paths registered under `class`.
    pub fn class_nodes(&self, class: &str) -> Vec<String> {
        let state = self.state.lock();
        state
            .nodes
            .iter()
            .filter(|(_, node)| node.class == class)
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn majors_in_use(&self) -> usize {
        self.state.lock().majors.len()
    }
}

/// Live registration of one character device; torn down on drop.
pub struct Registration {
    registry: Arc<ChrdevRegistry>,
    name: String,
    class: String,
    number: DeviceNumber,
    node_path: String,
    active: bool,
}

impl Registration {
    /// Registers `device` as `name` in `class`, requesting `major` (0 = dynamic).
    pub fn register(
        registry: Arc<ChrdevRegistry>,
        name: &str,
        class: &str,
        major: u32,
        device: Arc<dyn CharDevice>,
    ) -> DeviceResult<Self> {
        info!("{name}: installing module");
        let major = registry.register_chrdev(major, name).map_err(|err| {
            error!("{name}: could not register major number: {err}");
            err
        })?;
        info!("{name}: registered correctly with major number {major}");

        if let Err(err) = registry.class_create(class) {
            registry.unregister_chrdev(major, name);
            error!("{name}: failed to register device class: {err}");
            return Err(err);
        }
        info!("{name}: device class registered correctly");

        let number = DeviceNumber { major, minor: 0 };
        let node_path = match registry.device_create(class, number, name, device) {
            Ok(path) => path,
            Err(err) => {
                registry.class_destroy(class);
                registry.unregister_chrdev(major, name);
                error!("{name}: failed to create the device: {err}");
                return Err(err);
            }
        };
        info!("{name}: device node {node_path} created correctly");

        Ok(Self {
            registry,
            name: name.to_string(),
            class: class.to_string(),
            number,
            node_path,
            active: true,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn number(&self) -> DeviceNumber {
        self.number
    }

    pub fn node_path(&self) -> &str {
        &self.node_path
    }

    pub fn registry(&self) -> &Arc<ChrdevRegistry> {
        &self.registry
    }

    /// Tears the registration down now instead of at drop.
    pub fn unregister(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        info!("{}: removing module", self.name);
        self.registry.device_destroy(&self.node_path);
        self.registry.class_destroy(&self.class);
        self.registry.unregister_chrdev(self.number.major, &self.name);
        info!("{}: goodbye", self.name);
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// `/dev` path for a device name.
pub fn node_path(name: &str) -> String {
    format!("/dev/{name}")
}

fn validate_name(name: &str) -> DeviceResult<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN || name.contains('/') {
        return Err(DeviceError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{ChrdevRegistry, Registration, DYNAMIC_MAJOR};
    use crate::{DeviceError, FifoDevice};

    fn device() -> Arc<FifoDevice> {
        Arc::new(FifoDevice::new("fifo", 64).unwrap())
    }

    #[test]
    fn dynamic_majors_count_down() {
        let registry = ChrdevRegistry::new();
        assert_eq!(registry.register_chrdev(DYNAMIC_MAJOR, "a").unwrap(), 254);
        assert_eq!(registry.register_chrdev(DYNAMIC_MAJOR, "b").unwrap(), 253);
        assert_eq!(registry.register_chrdev(240, "c").unwrap(), 240);
        assert_eq!(registry.register_chrdev(240, "d"), Err(DeviceError::MajorBusy(240)));
    }

    #[test]
    fn register_and_drop_round_trip() {
        let registry = Arc::new(ChrdevRegistry::new());
        {
            let reg = Registration::register(registry.clone(), "fifo", "char", 0, device()).unwrap();
            assert_eq!(reg.node_path(), "/dev/fifo");
            assert!(registry.lookup("/dev/fifo").is_some());
            assert_eq!(registry.class_nodes("char"), vec!["/dev/fifo".to_string()]);
        }
        assert!(registry.lookup("/dev/fifo").is_none());
        assert_eq!(registry.majors_in_use(), 0);
    }

    #[test]
    fn failed_class_step_releases_major() {
        let registry = Arc::new(ChrdevRegistry::new());
        registry.class_create("char").unwrap();
        let err = Registration::register(registry.clone(), "fifo", "char", 0, device()).err();
        assert_eq!(err, Some(DeviceError::ClassExists("char".into())));
        assert_eq!(registry.majors_in_use(), 0);
    }
}
