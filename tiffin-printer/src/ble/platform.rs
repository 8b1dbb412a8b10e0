//! btleplug-backed adapter

use super::adapter::{
    AdapterEvent, Advertisement, BleAdapter, BleError, GattCharacteristic, GattService,
};
use super::device::DeviceId;
use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, CharPropFlags, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::StreamExt;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

impl From<btleplug::Error> for BleError {
    fn from(err: btleplug::Error) -> Self {
        match err {
            btleplug::Error::PermissionDenied => {
                BleError::PermissionDenied("Bluetooth access refused by the platform".to_string())
            }
            btleplug::Error::DeviceNotFound => BleError::DeviceNotFound,
            btleplug::Error::NotConnected => BleError::NotConnected,
            btleplug::Error::TimedOut(_) => BleError::TimedOut,
            other => BleError::Other(other.to_string()),
        }
    }
}

fn device_id(id: &PeripheralId) -> DeviceId {
    DeviceId::new(format!("{:?}", id))
}

async fn advertisement(peripheral: &Peripheral) -> Advertisement {
    let properties = peripheral.properties().await.ok().flatten();
    Advertisement {
        id: Some(device_id(&peripheral.id())),
        name: properties.as_ref().and_then(|p| p.local_name.clone()),
        services: properties.map(|p| p.services).unwrap_or_default(),
    }
}

/// BLE central backed by the first adapter btleplug reports
pub struct BtleplugAdapter {
    _manager: Manager,
    central: Adapter,
    peripherals: Arc<Mutex<HashMap<DeviceId, Peripheral>>>,
}

impl BtleplugAdapter {
    #[instrument]
    pub async fn new() -> Result<Self, BleError> {
        let manager = Manager::new().await?;
        let central = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(BleError::AdapterUnavailable)?;

        match central.adapter_info().await {
            Ok(adapter) => info!(adapter = %adapter, "Bluetooth adapter ready"),
            Err(e) => debug!(error = %e, "Adapter info unavailable"),
        }

        Ok(Self {
            _manager: manager,
            central,
            peripherals: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    async fn refresh(&self) -> Result<(), BleError> {
        let found = self.central.peripherals().await?;
        let mut cache = self.peripherals.lock();
        for peripheral in found {
            cache.insert(device_id(&peripheral.id()), peripheral);
        }
        Ok(())
    }

    async fn peripheral(&self, id: &DeviceId) -> Result<Peripheral, BleError> {
        let cached = self.peripherals.lock().get(id).cloned();
        if let Some(peripheral) = cached {
            return Ok(peripheral);
        }
        self.refresh().await?;
        let refreshed = self.peripherals.lock().get(id).cloned();
        refreshed.ok_or(BleError::DeviceNotFound)
    }
}

#[async_trait]
impl BleAdapter for BtleplugAdapter {
    async fn events(&self) -> Result<BoxStream<'static, AdapterEvent>, BleError> {
        let events = self.central.events().await?;
        let central = self.central.clone();
        let peripherals = Arc::clone(&self.peripherals);

        let mapped = events.filter_map(move |event| {
            let central = central.clone();
            let peripherals = Arc::clone(&peripherals);
            async move {
                match event {
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                        let peripheral = central.peripheral(&id).await.ok()?;
                        let ad = advertisement(&peripheral).await;
                        peripherals.lock().insert(device_id(&id), peripheral);
                        Some(AdapterEvent::Discovered(ad))
                    }
                    CentralEvent::DeviceDisconnected(id) => {
                        Some(AdapterEvent::Disconnected(device_id(&id)))
                    }
                    _ => None,
                }
            }
        });
        Ok(mapped.boxed())
    }

    async fn start_scan(&self, services: &[Uuid]) -> Result<(), BleError> {
        self.central
            .start_scan(ScanFilter {
                services: services.to_vec(),
            })
            .await?;
        Ok(())
    }

    async fn stop_scan(&self) -> Result<(), BleError> {
        self.central.stop_scan().await?;
        Ok(())
    }

    async fn known_device(&self, id: &DeviceId) -> Option<Advertisement> {
        let peripheral = self.peripheral(id).await.ok()?;
        Some(advertisement(&peripheral).await)
    }

    async fn connect(&self, id: &DeviceId) -> Result<(), BleError> {
        let peripheral = self.peripheral(id).await?;
        peripheral.connect().await?;
        Ok(())
    }

    async fn discover_services(&self, id: &DeviceId) -> Result<Vec<GattService>, BleError> {
        let peripheral = self.peripheral(id).await?;
        peripheral.discover_services().await?;
        Ok(peripheral
            .services()
            .into_iter()
            .map(|service| GattService {
                uuid: service.uuid,
                characteristics: service.characteristics.iter().map(|c| c.uuid).collect(),
            })
            .collect())
    }

    async fn disconnect(&self, id: &DeviceId) -> Result<(), BleError> {
        let peripheral = self.peripheral(id).await?;
        peripheral.disconnect().await?;
        Ok(())
    }

    async fn is_connected(&self, id: &DeviceId) -> bool {
        match self.peripheral(id).await {
            Ok(peripheral) => peripheral.is_connected().await.unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn write(
        &self,
        id: &DeviceId,
        characteristic: &GattCharacteristic,
        data: &[u8],
    ) -> Result<(), BleError> {
        let peripheral = self.peripheral(id).await?;
        let target = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == characteristic.uuid && c.service_uuid == characteristic.service)
            .ok_or_else(|| BleError::Other("write characteristic not discovered".to_string()))?;

        let write_type = if target
            .properties
            .contains(CharPropFlags::WRITE_WITHOUT_RESPONSE)
        {
            WriteType::WithoutResponse
        } else {
            WriteType::WithResponse
        };
        peripheral.write(&target, data, write_type).await?;
        Ok(())
    }
}
