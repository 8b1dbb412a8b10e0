//! Platform adapter seam

use super::device::DeviceId;
use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;
use uuid::Uuid;

/// Errors reported by a BLE adapter
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BleError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("no Bluetooth adapter available")]
    AdapterUnavailable,

    #[error("device not found")]
    DeviceNotFound,

    #[error("not connected")]
    NotConnected,

    #[error("operation timed out")]
    TimedOut,

    #[error("{0}")]
    Other(String),
}

/// Advertisement seen while scanning
///
/// Platforms may deliver partial data; the manager drops entries without an
/// id or without services.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Advertisement {
    pub id: Option<DeviceId>,
    pub name: Option<String>,
    pub services: Vec<Uuid>,
}

/// Event pushed by the adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterEvent {
    Discovered(Advertisement),
    Disconnected(DeviceId),
}

/// GATT service with its characteristic UUIDs in discovery order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattService {
    pub uuid: Uuid,
    pub characteristics: Vec<Uuid>,
}

/// Handle of a characteristic to write print data to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GattCharacteristic {
    pub service: Uuid,
    pub uuid: Uuid,
}

/// Platform BLE central
///
/// All calls are async; implementations must not block the runtime.
#[async_trait]
pub trait BleAdapter: Send + Sync + 'static {
    /// Stream of adapter events; each call returns an independent stream
    async fn events(&self) -> Result<BoxStream<'static, AdapterEvent>, BleError>;

    /// Start discovery filtered by service UUIDs
    async fn start_scan(&self, services: &[Uuid]) -> Result<(), BleError>;

    async fn stop_scan(&self) -> Result<(), BleError>;

    /// Device still cached by the platform (used for silent reconnect)
    async fn known_device(&self, id: &DeviceId) -> Option<Advertisement>;

    /// GATT connect
    async fn connect(&self, id: &DeviceId) -> Result<(), BleError>;

    /// Discover services and characteristics of a connected device
    async fn discover_services(&self, id: &DeviceId) -> Result<Vec<GattService>, BleError>;

    async fn disconnect(&self, id: &DeviceId) -> Result<(), BleError>;

    async fn is_connected(&self, id: &DeviceId) -> bool;

    /// Write without response; resolves when the platform accepted the data
    async fn write(
        &self,
        id: &DeviceId,
        characteristic: &GattCharacteristic,
        data: &[u8],
    ) -> Result<(), BleError>;
}
