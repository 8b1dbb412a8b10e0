//! Bluetooth Low Energy access
//!
//! - [`BleAdapter`]: the seam to the platform stack
//! - [`BtleplugAdapter`]: btleplug-backed adapter
//! - [`MemoryAdapter`]: in-process simulated printers
//! - [`ConnectionManager`]: scan / connect / reconnect state for one printer

mod adapter;
mod device;
mod manager;
mod memory;
mod platform;
mod state;

pub use adapter::{
    AdapterEvent, Advertisement, BleAdapter, BleError, GattCharacteristic, GattService,
};
pub use device::{DeviceId, PrinterDevice, ScanResult};
pub use manager::{
    ConnectionConfig, ConnectionManager, DEFAULT_SERVICE_UUIDS, DEFAULT_WRITE_CHARACTERISTIC_UUIDS,
    DeviceStore, ReconnectPolicy,
};
pub use memory::MemoryAdapter;
pub use platform::BtleplugAdapter;
pub use state::{ConnectionState, DisconnectReason};
