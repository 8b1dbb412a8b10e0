//! Printer device and scan results

use super::adapter::GattCharacteristic;
use std::collections::HashSet;
use std::fmt;

/// Stable platform identifier of a BLE device
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A printer as seen by the connection manager
///
/// `characteristic` is set once service discovery picked a write
/// characteristic; it is only meaningful while the device is connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterDevice {
    pub id: DeviceId,
    pub name: String,
    pub characteristic: Option<GattCharacteristic>,
}

impl PrinterDevice {
    pub fn discovered(id: DeviceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            characteristic: None,
        }
    }
}

/// Devices discovered during one scan session
///
/// Append-only in discovery order, deduplicated by id.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    devices: Vec<PrinterDevice>,
    seen: HashSet<DeviceId>,
}

impl ScanResult {
    /// Append a device; returns false if the id was already present
    pub fn insert(&mut self, device: PrinterDevice) -> bool {
        if !self.seen.insert(device.id.clone()) {
            return false;
        }
        self.devices.push(device);
        true
    }

    pub fn get(&self, id: &DeviceId) -> Option<&PrinterDevice> {
        self.devices.iter().find(|d| &d.id == id)
    }

    pub fn devices(&self) -> &[PrinterDevice] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn clear(&mut self) {
        self.devices.clear();
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_result_dedups_by_id() {
        let mut result = ScanResult::default();
        assert!(result.insert(PrinterDevice::discovered("AA".into(), "MTP-II")));
        assert!(result.insert(PrinterDevice::discovered("BB".into(), "RPP02N")));
        // Same id, different name: ignored
        assert!(!result.insert(PrinterDevice::discovered("AA".into(), "Renamed")));

        assert_eq!(result.len(), 2);
        assert_eq!(result.get(&"AA".into()).unwrap().name, "MTP-II");
        assert_eq!(result.devices()[1].id.as_str(), "BB");
    }

    #[test]
    fn test_clear_allows_rediscovery() {
        let mut result = ScanResult::default();
        result.insert(PrinterDevice::discovered("AA".into(), "MTP-II"));
        result.clear();
        assert!(result.is_empty());
        assert!(result.insert(PrinterDevice::discovered("AA".into(), "MTP-II")));
    }
}
