//! In-process adapter with simulated printers
//!
//! Used by tests and by the CLI's `--simulate` mode. Simulated printers accept
//! writes and record them; faults (connect failures, latency, link drops) can
//! be injected.

use super::adapter::{
    AdapterEvent, Advertisement, BleAdapter, BleError, GattCharacteristic, GattService,
};
use super::device::DeviceId;
use super::manager::{DEFAULT_SERVICE_UUIDS, DEFAULT_WRITE_CHARACTERISTIC_UUIDS};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

struct SimulatedPrinter {
    id: DeviceId,
    name: String,
    services: Vec<GattService>,
}

impl SimulatedPrinter {
    fn advertisement(&self) -> Advertisement {
        Advertisement {
            id: Some(self.id.clone()),
            name: Some(self.name.clone()),
            services: self.services.iter().map(|s| s.uuid).collect(),
        }
    }
}

#[derive(Default)]
struct MemoryState {
    printers: Vec<SimulatedPrinter>,
    listeners: Vec<mpsc::UnboundedSender<AdapterEvent>>,
    scanning: bool,
    connected: HashSet<DeviceId>,
    writes: HashMap<DeviceId, Vec<Vec<u8>>>,
    connect_calls: usize,
    connect_failures: u32,
    connect_latency: Duration,
    disconnect_latency: Duration,
    write_latency: Duration,
    fail_writes: bool,
    drop_after_writes: Option<usize>,
    permission_denied: bool,
}

impl MemoryState {
    fn emit(&mut self, event: AdapterEvent) {
        self.listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn printer(&self, id: &DeviceId) -> Option<&SimulatedPrinter> {
        self.printers.iter().find(|p| &p.id == id)
    }

    fn check_permission(&self) -> Result<(), BleError> {
        if self.permission_denied {
            return Err(BleError::PermissionDenied(
                "simulated permission denial".to_string(),
            ));
        }
        Ok(())
    }
}

/// Adapter backed by simulated printers
#[derive(Default)]
pub struct MemoryAdapter {
    state: Mutex<MemoryState>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a printer exposing the first default service/characteristic
    pub fn add_printer(&self, id: impl Into<DeviceId>, name: &str) {
        self.add_printer_with_services(
            id,
            name,
            vec![GattService {
                uuid: DEFAULT_SERVICE_UUIDS[0],
                characteristics: vec![DEFAULT_WRITE_CHARACTERISTIC_UUIDS[0]],
            }],
        );
    }

    pub fn add_printer_with_services(
        &self,
        id: impl Into<DeviceId>,
        name: &str,
        services: Vec<GattService>,
    ) {
        self.state.lock().printers.push(SimulatedPrinter {
            id: id.into(),
            name: name.to_string(),
            services,
        });
    }

    /// Push a raw advertisement to event listeners
    pub fn advertise(&self, ad: Advertisement) {
        self.state.lock().emit(AdapterEvent::Discovered(ad));
    }

    /// Drop the link as if the printer went out of range
    pub fn drop_link(&self, id: &DeviceId) {
        let mut state = self.state.lock();
        if state.connected.remove(id) {
            state.emit(AdapterEvent::Disconnected(id.clone()));
        }
    }

    pub fn fail_next_connects(&self, count: u32) {
        self.state.lock().connect_failures = count;
    }

    pub fn set_connect_latency(&self, latency: Duration) {
        self.state.lock().connect_latency = latency;
    }

    pub fn set_disconnect_latency(&self, latency: Duration) {
        self.state.lock().disconnect_latency = latency;
    }

    pub fn set_write_latency(&self, latency: Duration) {
        self.state.lock().write_latency = latency;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Drop the link once `count` writes have been accepted
    pub fn drop_link_after_writes(&self, count: usize) {
        self.state.lock().drop_after_writes = Some(count);
    }

    pub fn deny_permission(&self) {
        self.state.lock().permission_denied = true;
    }

    pub fn is_scanning(&self) -> bool {
        self.state.lock().scanning
    }

    pub fn connect_calls(&self) -> usize {
        self.state.lock().connect_calls
    }

    /// Accepted writes, one entry per chunk
    pub fn writes(&self, id: &DeviceId) -> Vec<Vec<u8>> {
        self.state.lock().writes.get(id).cloned().unwrap_or_default()
    }

    /// All accepted bytes in order
    pub fn written(&self, id: &DeviceId) -> Vec<u8> {
        self.writes(id).concat()
    }
}

#[async_trait]
impl BleAdapter for MemoryAdapter {
    async fn events(&self) -> Result<BoxStream<'static, AdapterEvent>, BleError> {
        let mut state = self.state.lock();
        state.check_permission()?;

        let (tx, rx) = mpsc::unbounded_channel();
        state.listeners.push(tx);
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });
        Ok(stream.boxed())
    }

    async fn start_scan(&self, services: &[Uuid]) -> Result<(), BleError> {
        let mut state = self.state.lock();
        state.check_permission()?;
        state.scanning = true;

        let ads: Vec<Advertisement> = state
            .printers
            .iter()
            .map(SimulatedPrinter::advertisement)
            .filter(|ad| services.is_empty() || ad.services.iter().any(|s| services.contains(s)))
            .collect();
        for ad in ads {
            state.emit(AdapterEvent::Discovered(ad));
        }
        Ok(())
    }

    async fn stop_scan(&self) -> Result<(), BleError> {
        self.state.lock().scanning = false;
        Ok(())
    }

    async fn known_device(&self, id: &DeviceId) -> Option<Advertisement> {
        self.state.lock().printer(id).map(SimulatedPrinter::advertisement)
    }

    async fn connect(&self, id: &DeviceId) -> Result<(), BleError> {
        let latency = self.state.lock().connect_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        state.check_permission()?;
        state.connect_calls += 1;
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(BleError::Other("simulated connect failure".to_string()));
        }
        if state.printer(id).is_none() {
            return Err(BleError::DeviceNotFound);
        }
        state.connected.insert(id.clone());
        Ok(())
    }

    async fn discover_services(&self, id: &DeviceId) -> Result<Vec<GattService>, BleError> {
        let state = self.state.lock();
        if !state.connected.contains(id) {
            return Err(BleError::NotConnected);
        }
        state
            .printer(id)
            .map(|p| p.services.clone())
            .ok_or(BleError::DeviceNotFound)
    }

    async fn disconnect(&self, id: &DeviceId) -> Result<(), BleError> {
        let latency = self.state.lock().disconnect_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        if state.connected.remove(id) {
            state.emit(AdapterEvent::Disconnected(id.clone()));
        }
        Ok(())
    }

    async fn is_connected(&self, id: &DeviceId) -> bool {
        self.state.lock().connected.contains(id)
    }

    async fn write(
        &self,
        id: &DeviceId,
        _characteristic: &GattCharacteristic,
        data: &[u8],
    ) -> Result<(), BleError> {
        let latency = self.state.lock().write_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        if !state.connected.contains(id) {
            return Err(BleError::NotConnected);
        }
        if state.fail_writes {
            return Err(BleError::Other("simulated write failure".to_string()));
        }

        let accepted = {
            let writes = state.writes.entry(id.clone()).or_default();
            writes.push(data.to_vec());
            writes.len()
        };
        if state.drop_after_writes == Some(accepted) {
            state.connected.remove(id);
            state.emit(AdapterEvent::Disconnected(id.clone()));
        }
        Ok(())
    }
}
