//! Device connection manager
//!
//! Owns the scan / connect / reconnect state machine for exactly one printer.
//! Every transition runs under one async mutex, so at most one operation
//! changes the state at a time. Screens observe the state through a
//! [`watch::Receiver`] and never mutate it.
//!
//! ```text
//! Idle --scan--> Scanning --stop_scan--> Idle
//! Idle/Scanning --select--> Connecting --ok--> Connected
//!                                      --err--> Idle
//! Connected --disconnect--> TeardownRequested --> Idle
//! Connected --link lost--> Disconnected(LinkLost) --backoff--> Connecting ...
//!                          --attempts used up--> Disconnected(ReconnectExhausted)
//! ```

use super::adapter::{
    AdapterEvent, Advertisement, BleAdapter, BleError, GattCharacteristic, GattService,
};
use super::device::{DeviceId, PrinterDevice, ScanResult};
use super::state::{ConnectionState, DisconnectReason};
use crate::error::{ConnectionError, Missing, PermissionError, PrintError, PrintResult};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::{Uuid, uuid};

/// Printer services accepted during discovery
pub const DEFAULT_SERVICE_UUIDS: [Uuid; 3] = [
    uuid!("000018f0-0000-1000-8000-00805f9b34fb"),
    uuid!("e7810a71-73ae-499d-8c15-faa9aef0c3f2"),
    uuid!("49535343-fe7d-4ae5-8fa9-9fafd205e455"),
];

/// Characteristics print data may be written to
pub const DEFAULT_WRITE_CHARACTERISTIC_UUIDS: [Uuid; 3] = [
    uuid!("00002af1-0000-1000-8000-00805f9b34fb"),
    uuid!("bef8d6c9-9c21-4c9e-b632-bd58c1009f9f"),
    uuid!("49535343-8841-43f4-a8d4-ecbe34729bb3"),
];

const UNKNOWN_PRINTER: &str = "Unknown printer";

/// Bounded exponential backoff for automatic reconnects
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        Duration::try_from_secs_f64(self.initial_backoff.as_secs_f64() * factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Connection manager configuration
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Service UUID allow-list
    pub service_uuids: Vec<Uuid>,
    /// Write characteristic UUID allow-list, in preference order
    pub write_characteristic_uuids: Vec<Uuid>,
    /// Bound on GATT connect + service discovery
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            service_uuids: DEFAULT_SERVICE_UUIDS.to_vec(),
            write_characteristic_uuids: DEFAULT_WRITE_CHARACTERISTIC_UUIDS.to_vec(),
            connect_timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Persistence of the last connected printer
///
/// Failures are logged by the manager and never fail a connection.
#[async_trait]
pub trait DeviceStore: Send + Sync + 'static {
    async fn load_last_device(&self) -> std::io::Result<Option<DeviceId>>;

    async fn save_last_device(&self, id: &DeviceId) -> std::io::Result<()>;
}

fn connection_error(err: BleError) -> PrintError {
    match err {
        BleError::PermissionDenied(msg) => PermissionError::Denied(msg).into(),
        BleError::AdapterUnavailable => PermissionError::AdapterUnavailable(err.to_string()).into(),
        BleError::DeviceNotFound => ConnectionError::NotFound(Missing::Device).into(),
        BleError::NotConnected => ConnectionError::Lost.into(),
        other => ConnectionError::Failed(other.to_string()).into(),
    }
}

fn display_name(name: Option<String>) -> String {
    name.map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| UNKNOWN_PRINTER.to_string())
}

/// First allow-listed characteristic inside an allow-listed service
fn pick_characteristic(
    services: &[GattService],
    config: &ConnectionConfig,
) -> Result<GattCharacteristic, ConnectionError> {
    let mut allowed = services
        .iter()
        .filter(|s| config.service_uuids.contains(&s.uuid))
        .peekable();
    if allowed.peek().is_none() {
        return Err(ConnectionError::NotFound(Missing::Service));
    }

    allowed
        .flat_map(|s| {
            s.characteristics.iter().map(move |c| GattCharacteristic {
                service: s.uuid,
                uuid: *c,
            })
        })
        .find(|c| config.write_characteristic_uuids.contains(&c.uuid))
        .ok_or(ConnectionError::NotFound(Missing::Characteristic))
}

/// Single-printer connection manager
///
/// Cheap to clone; clones share the same state machine.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

struct Inner {
    adapter: Arc<dyn BleAdapter>,
    store: Arc<dyn DeviceStore>,
    config: ConnectionConfig,
    state: watch::Sender<ConnectionState>,
    scan: watch::Sender<ScanResult>,
    /// Serializes transitions
    transition: tokio::sync::Mutex<()>,
    shutdown: CancellationToken,
    reconnect: Mutex<Option<CancellationToken>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    pub fn new(
        adapter: Arc<dyn BleAdapter>,
        store: Arc<dyn DeviceStore>,
        config: ConnectionConfig,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        let (scan, _) = watch::channel(ScanResult::default());
        Self {
            inner: Arc::new(Inner {
                adapter,
                store,
                config,
                state,
                scan,
                transition: tokio::sync::Mutex::new(()),
                shutdown: CancellationToken::new(),
                reconnect: Mutex::new(None),
                pump: Mutex::new(None),
            }),
        }
    }

    /// Read-only view of the connection state
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Read-only view of the current scan session
    pub fn subscribe_scan(&self) -> watch::Receiver<ScanResult> {
        self.inner.scan.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.current()
    }

    pub fn scan_results(&self) -> Vec<PrinterDevice> {
        self.inner.scan.borrow().devices().to_vec()
    }

    pub fn connected_device(&self) -> Option<PrinterDevice> {
        self.inner.current().device().cloned()
    }

    /// Start the adapter event pump, then try a silent reconnect to the last
    /// printer
    #[instrument(skip(self))]
    pub async fn start(&self) -> PrintResult<()> {
        let events = self.inner.adapter.events().await.map_err(connection_error)?;

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move { inner.run_event_pump(events).await });
        if let Some(previous) = self.inner.pump.lock().replace(handle) {
            previous.abort();
        }
        info!("Connection manager started");

        if let Err(e) = self.restore().await {
            warn!(error = %e, "Silent reconnect failed");
        }
        Ok(())
    }

    /// Disconnect and stop background tasks
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        self.disconnect().await;
        self.inner.shutdown.cancel();

        let pump = self.inner.pump.lock().take();
        if let Some(handle) = pump {
            if let Err(e) = handle.await {
                warn!(error = %e, "Event pump ended abnormally");
            }
        }
        info!("Connection manager stopped");
    }

    /// Start discovery; clears the previous scan session
    #[instrument(skip(self))]
    pub async fn scan(&self) -> PrintResult<()> {
        self.inner.cancel_reconnect();
        let _guard = self.inner.transition.lock().await;

        let previous = self.inner.current();
        match previous {
            ConnectionState::Scanning => return Ok(()),
            ConnectionState::Idle | ConnectionState::Disconnected(_) => {}
            ref other => {
                return Err(ConnectionError::InvalidState {
                    op: "scan",
                    state: other.name(),
                }
                .into());
            }
        }

        self.inner.scan.send_modify(ScanResult::clear);
        self.inner.set_state(ConnectionState::Scanning);
        if let Err(e) = self
            .inner
            .adapter
            .start_scan(&self.inner.config.service_uuids)
            .await
        {
            self.inner.set_state(previous);
            return Err(connection_error(e));
        }
        info!("Scanning for printers");
        Ok(())
    }

    /// Stop discovery; no-op unless scanning
    pub async fn stop_scan(&self) {
        let _guard = self.inner.transition.lock().await;
        self.inner.stop_scan_locked().await;
    }

    /// Connect to a discovered (or adapter-cached) printer
    ///
    /// Stops scanning and tears down any other connected printer first.
    #[instrument(skip(self), fields(device_id = %id))]
    pub async fn select(&self, id: &DeviceId) -> PrintResult<PrinterDevice> {
        self.inner.cancel_reconnect();
        let _guard = self.inner.transition.lock().await;

        self.inner.stop_scan_locked().await;
        if let ConnectionState::Connected(current) = self.inner.current() {
            if &current.id == id {
                return Ok(current);
            }
            self.inner.teardown_locked(&current.id).await;
        }

        let name = self.inner.resolve_name(id).await?;
        self.inner
            .connect_locked(id, &name, ConnectionState::Idle)
            .await
    }

    /// Caller-initiated disconnect; never followed by a reconnect
    #[instrument(skip(self))]
    pub async fn disconnect(&self) {
        self.inner.cancel_reconnect();
        let _guard = self.inner.transition.lock().await;

        match self.inner.current() {
            ConnectionState::Connected(device) => self.inner.teardown_locked(&device.id).await,
            ConnectionState::Scanning => self.inner.stop_scan_locked().await,
            ConnectionState::Disconnected(_) => self.inner.set_state(ConnectionState::Idle),
            _ => {}
        }
    }

    /// Silent reconnect to the persisted printer if the adapter still knows it
    #[instrument(skip(self))]
    pub async fn restore(&self) -> PrintResult<Option<PrinterDevice>> {
        let _guard = self.inner.transition.lock().await;
        if self.inner.current() != ConnectionState::Idle {
            return Ok(None);
        }

        let id = match self.inner.store.load_last_device().await {
            Ok(Some(id)) => id,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!(error = %e, "Failed to load last printer");
                return Ok(None);
            }
        };

        let Some(ad) = self.inner.adapter.known_device(&id).await else {
            debug!(device_id = %id, "Last printer not cached by adapter");
            return Ok(None);
        };

        info!(device_id = %id, "Reconnecting to last printer");
        self.inner
            .connect_locked(&id, &display_name(ad.name), ConnectionState::Idle)
            .await
            .map(Some)
    }

    /// Connected to `id` according to both the state machine and the adapter
    pub async fn is_link_up(&self, id: &DeviceId) -> bool {
        self.inner.current().is_connected_to(id) && self.inner.adapter.is_connected(id).await
    }

    /// Write one chunk to the device's write characteristic
    pub async fn write_chunk(&self, device: &PrinterDevice, chunk: &[u8]) -> Result<(), BleError> {
        let characteristic = device.characteristic.as_ref().ok_or(BleError::NotConnected)?;
        self.inner
            .adapter
            .write(&device.id, characteristic, chunk)
            .await
    }
}

impl Inner {
    fn current(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    fn set_state(&self, next: ConnectionState) {
        let to = next.name();
        let from = self.state.send_replace(next);
        debug!(from = from.name(), to, "Connection state changed");
    }

    fn cancel_reconnect(&self) {
        let pending = self.reconnect.lock().take();
        if let Some(token) = pending {
            token.cancel();
        }
    }

    async fn stop_scan_locked(&self) {
        if self.current() != ConnectionState::Scanning {
            return;
        }
        if let Err(e) = self.adapter.stop_scan().await {
            warn!(error = %e, "Failed to stop scan");
        }
        self.set_state(ConnectionState::Idle);
        debug!(found = self.scan.borrow().len(), "Scan stopped");
    }

    async fn teardown_locked(&self, id: &DeviceId) {
        self.set_state(ConnectionState::TeardownRequested(id.clone()));
        if let Err(e) = self.adapter.disconnect(id).await {
            warn!(device_id = %id, error = %e, "Disconnect failed");
        }
        self.set_state(ConnectionState::Idle);
        info!(device_id = %id, "Printer disconnected");
    }

    async fn resolve_name(&self, id: &DeviceId) -> PrintResult<String> {
        let scanned = self.scan.borrow().get(id).map(|d| d.name.clone());
        if let Some(name) = scanned {
            return Ok(name);
        }
        match self.adapter.known_device(id).await {
            Some(ad) => Ok(display_name(ad.name)),
            None => Err(ConnectionError::NotFound(Missing::Device).into()),
        }
    }

    async fn handshake(&self, id: &DeviceId) -> PrintResult<GattCharacteristic> {
        self.adapter.connect(id).await.map_err(connection_error)?;
        let services = self
            .adapter
            .discover_services(id)
            .await
            .map_err(connection_error)?;
        Ok(pick_characteristic(&services, &self.config)?)
    }

    /// Connect + discovery under the connect timeout; `on_failure` is the
    /// state left behind when it does not succeed
    async fn connect_locked(
        &self,
        id: &DeviceId,
        name: &str,
        on_failure: ConnectionState,
    ) -> PrintResult<PrinterDevice> {
        self.set_state(ConnectionState::Connecting(id.clone()));

        let timeout = self.config.connect_timeout;
        let outcome = match tokio::time::timeout(timeout, self.handshake(id)).await {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::Timeout(timeout).into()),
        };

        let characteristic = match outcome {
            Ok(characteristic) => characteristic,
            Err(e) => {
                warn!(device_id = %id, error = %e, "Printer connection failed");
                if let Err(err) = self.adapter.disconnect(id).await {
                    debug!(device_id = %id, error = %err, "Cleanup disconnect failed");
                }
                self.set_state(on_failure);
                return Err(e);
            }
        };

        let device = PrinterDevice {
            id: id.clone(),
            name: name.to_string(),
            characteristic: Some(characteristic),
        };
        self.set_state(ConnectionState::Connected(device.clone()));
        info!(
            device_id = %id,
            name,
            service = %characteristic.service,
            characteristic = %characteristic.uuid,
            "Printer connected"
        );

        if let Err(e) = self.store.save_last_device(id).await {
            warn!(device_id = %id, error = %e, "Failed to persist last printer");
        }
        Ok(device)
    }

    async fn run_event_pump(self: Arc<Self>, mut events: BoxStream<'static, AdapterEvent>) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("Event pump stopped");
                    break;
                }
                event = events.next() => match event {
                    Some(AdapterEvent::Discovered(ad)) => self.on_discovered(ad),
                    Some(AdapterEvent::Disconnected(id)) => self.on_disconnected(id).await,
                    None => {
                        warn!("Adapter event stream ended");
                        break;
                    }
                },
            }
        }
    }

    fn on_discovered(&self, ad: Advertisement) {
        if self.current() != ConnectionState::Scanning {
            return;
        }
        let Some(id) = ad.id else {
            debug!(name = ?ad.name, "Skipping advertisement without device id");
            return;
        };
        if ad.services.is_empty() {
            debug!(device_id = %id, "Skipping advertisement without services");
            return;
        }
        if !ad.services.iter().any(|s| self.config.service_uuids.contains(s)) {
            debug!(device_id = %id, "Skipping non-printer advertisement");
            return;
        }

        let device = PrinterDevice::discovered(id.clone(), display_name(ad.name));
        let name = device.name.clone();
        if self.scan.send_if_modified(|result| result.insert(device)) {
            info!(device_id = %id, name = %name, "Printer discovered");
        }
    }

    async fn on_disconnected(self: &Arc<Self>, id: DeviceId) {
        let _guard = self.transition.lock().await;

        let device = match self.current() {
            ConnectionState::Connected(device) if device.id == id => device,
            state => {
                debug!(device_id = %id, state = state.name(), "Ignoring disconnect event");
                return;
            }
        };
        if self.adapter.is_connected(&id).await {
            debug!(device_id = %id, "Stale disconnect event, link is up");
            return;
        }

        warn!(device_id = %id, "Printer link lost");
        self.set_state(ConnectionState::Disconnected(DisconnectReason::LinkLost));
        self.spawn_reconnect(device);
    }

    fn spawn_reconnect(self: &Arc<Self>, device: PrinterDevice) {
        let token = self.shutdown.child_token();
        if let Some(previous) = self.reconnect.lock().replace(token.clone()) {
            previous.cancel();
        }
        let inner = Arc::clone(self);
        tokio::spawn(async move { inner.reconnect_loop(device, token).await });
    }

    async fn reconnect_loop(self: Arc<Self>, device: PrinterDevice, token: CancellationToken) {
        let policy = &self.config.reconnect;

        for attempt in 1..=policy.max_attempts {
            let delay = policy.backoff(attempt);
            debug!(device_id = %device.id, attempt, ?delay, "Reconnect scheduled");
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(device_id = %device.id, "Reconnect cancelled");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let _guard = self.transition.lock().await;
            if token.is_cancelled() {
                return;
            }
            let lost = ConnectionState::Disconnected(DisconnectReason::LinkLost);
            match self.connect_locked(&device.id, &device.name, lost).await {
                Ok(_) => {
                    info!(device_id = %device.id, attempt, "Printer reconnected");
                    return;
                }
                Err(e) => {
                    warn!(device_id = %device.id, attempt, error = %e, "Reconnect attempt failed");
                }
            }
        }

        let _guard = self.transition.lock().await;
        if !token.is_cancelled() {
            warn!(
                device_id = %device.id,
                attempts = policy.max_attempts,
                "Giving up on reconnect"
            );
            self.set_state(ConnectionState::Disconnected(
                DisconnectReason::ReconnectExhausted,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::MemoryAdapter;

    #[derive(Default)]
    struct MemoryStore {
        last: Mutex<Option<DeviceId>>,
        fail_saves: bool,
    }

    #[async_trait]
    impl DeviceStore for MemoryStore {
        async fn load_last_device(&self) -> std::io::Result<Option<DeviceId>> {
            Ok(self.last.lock().clone())
        }

        async fn save_last_device(&self, id: &DeviceId) -> std::io::Result<()> {
            if self.fail_saves {
                return Err(std::io::Error::other("disk full"));
            }
            *self.last.lock() = Some(id.clone());
            Ok(())
        }
    }

    fn config() -> ConnectionConfig {
        ConnectionConfig {
            reconnect: ReconnectPolicy {
                max_attempts: 3,
                initial_backoff: Duration::from_secs(1),
                max_backoff: Duration::from_secs(4),
                multiplier: 2.0,
            },
            ..Default::default()
        }
    }

    fn setup() -> (Arc<MemoryAdapter>, Arc<MemoryStore>, ConnectionManager) {
        let adapter = Arc::new(MemoryAdapter::new());
        let store = Arc::new(MemoryStore::default());
        let manager = ConnectionManager::new(adapter.clone(), store.clone(), config());
        (adapter, store, manager)
    }

    async fn wait_for_state(
        manager: &ConnectionManager,
        predicate: impl FnMut(&ConnectionState) -> bool,
    ) -> ConnectionState {
        let mut rx = manager.subscribe();
        let state = tokio::time::timeout(Duration::from_secs(120), rx.wait_for(predicate))
            .await
            .expect("state not reached")
            .expect("manager dropped");
        state.clone()
    }

    async fn connect(manager: &ConnectionManager, id: &str) -> PrinterDevice {
        manager.select(&DeviceId::from(id)).await.unwrap()
    }

    #[test]
    fn test_backoff_is_bounded() {
        let policy = config().reconnect;
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
        assert_eq!(policy.backoff(10), Duration::from_secs(4));
        assert_eq!(policy.backoff(u32::MAX), Duration::from_secs(4));
    }

    #[test]
    fn test_pick_first_allowed_characteristic() {
        let other = uuid!("0000180a-0000-1000-8000-00805f9b34fb");
        let services = vec![
            GattService {
                uuid: other,
                characteristics: vec![DEFAULT_WRITE_CHARACTERISTIC_UUIDS[0]],
            },
            GattService {
                uuid: DEFAULT_SERVICE_UUIDS[2],
                characteristics: vec![other, DEFAULT_WRITE_CHARACTERISTIC_UUIDS[2]],
            },
        ];

        let picked = pick_characteristic(&services, &config()).unwrap();
        assert_eq!(picked.service, DEFAULT_SERVICE_UUIDS[2]);
        assert_eq!(picked.uuid, DEFAULT_WRITE_CHARACTERISTIC_UUIDS[2]);
    }

    #[test]
    fn test_pick_reports_what_is_missing() {
        let other = uuid!("0000180a-0000-1000-8000-00805f9b34fb");
        let no_service = vec![GattService {
            uuid: other,
            characteristics: vec![],
        }];
        assert_eq!(
            pick_characteristic(&no_service, &config()),
            Err(ConnectionError::NotFound(Missing::Service))
        );

        let no_characteristic = vec![GattService {
            uuid: DEFAULT_SERVICE_UUIDS[0],
            characteristics: vec![other],
        }];
        assert_eq!(
            pick_characteristic(&no_characteristic, &config()),
            Err(ConnectionError::NotFound(Missing::Characteristic))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_dedups_and_skips_malformed() {
        let (adapter, _, manager) = setup();
        adapter.add_printer("AA", "MTP-II");
        adapter.add_printer("BB", "RPP02N");
        manager.start().await.unwrap();

        manager.scan().await.unwrap();
        assert_eq!(manager.state(), ConnectionState::Scanning);

        // Repeat, missing id, missing services, foreign service
        adapter.advertise(Advertisement {
            id: Some("AA".into()),
            name: Some("MTP-II".into()),
            services: vec![DEFAULT_SERVICE_UUIDS[0]],
        });
        adapter.advertise(Advertisement {
            id: None,
            name: Some("ghost".into()),
            services: vec![DEFAULT_SERVICE_UUIDS[0]],
        });
        adapter.advertise(Advertisement {
            id: Some("CC".into()),
            name: None,
            services: vec![],
        });
        adapter.advertise(Advertisement {
            id: Some("DD".into()),
            name: Some("Watch".into()),
            services: vec![uuid!("0000180d-0000-1000-8000-00805f9b34fb")],
        });
        // Sentinel: processed after everything above
        adapter.advertise(Advertisement {
            id: Some("EE".into()),
            name: None,
            services: vec![DEFAULT_SERVICE_UUIDS[1]],
        });

        let mut rx = manager.subscribe_scan();
        rx.wait_for(|r| r.len() == 3).await.unwrap();

        let ids: Vec<String> = manager
            .scan_results()
            .iter()
            .map(|d| d.id.to_string())
            .collect();
        assert_eq!(ids, vec!["AA", "BB", "EE"]);
        assert_eq!(manager.scan_results()[2].name, "Unknown printer");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_scan_is_idempotent() {
        let (adapter, _, manager) = setup();
        manager.start().await.unwrap();

        manager.scan().await.unwrap();
        manager.scan().await.unwrap();
        assert!(adapter.is_scanning());

        manager.stop_scan().await;
        manager.stop_scan().await;
        assert_eq!(manager.state(), ConnectionState::Idle);
        assert!(!adapter.is_scanning());
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_connects_and_persists() {
        let (adapter, store, manager) = setup();
        adapter.add_printer("AA", "MTP-II");
        manager.start().await.unwrap();
        manager.scan().await.unwrap();
        manager
            .subscribe_scan()
            .wait_for(|r| !r.is_empty())
            .await
            .unwrap();

        let device = connect(&manager, "AA").await;

        assert_eq!(device.name, "MTP-II");
        assert_eq!(
            device.characteristic,
            Some(GattCharacteristic {
                service: DEFAULT_SERVICE_UUIDS[0],
                uuid: DEFAULT_WRITE_CHARACTERISTIC_UUIDS[0],
            })
        );
        assert_eq!(manager.state(), ConnectionState::Connected(device.clone()));
        assert!(!adapter.is_scanning());
        assert_eq!(*store.last.lock(), Some(DeviceId::from("AA")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_persist_failure_does_not_fail_connection() {
        let adapter = Arc::new(MemoryAdapter::new());
        adapter.add_printer("AA", "MTP-II");
        let store = Arc::new(MemoryStore {
            fail_saves: true,
            ..Default::default()
        });
        let manager = ConnectionManager::new(adapter, store, config());

        assert!(manager.select(&"AA".into()).await.is_ok());
        assert!(manager.state().is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_while_connected_is_invalid() {
        let (adapter, _, manager) = setup();
        adapter.add_printer("AA", "MTP-II");
        manager.start().await.unwrap();
        connect(&manager, "AA").await;

        let err = manager.scan().await.unwrap_err();
        assert_eq!(
            err,
            PrintError::from(ConnectionError::InvalidState {
                op: "scan",
                state: "connected"
            })
        );
        assert!(manager.state().is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_unknown_device() {
        let (_, _, manager) = setup();
        manager.start().await.unwrap();

        let err = manager.select(&"ZZ".into()).await.unwrap_err();
        assert_eq!(err, PrintError::from(ConnectionError::NotFound(Missing::Device)));
        assert_eq!(manager.state(), ConnectionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_without_printer_service() {
        let (adapter, _, manager) = setup();
        adapter.add_printer_with_services(
            "AA",
            "Headphones",
            vec![GattService {
                uuid: uuid!("0000110b-0000-1000-8000-00805f9b34fb"),
                characteristics: vec![],
            }],
        );
        manager.start().await.unwrap();

        let err = manager.select(&"AA".into()).await.unwrap_err();
        assert_eq!(err, PrintError::from(ConnectionError::NotFound(Missing::Service)));
        assert_eq!(manager.state(), ConnectionState::Idle);
        assert!(!adapter.is_connected(&"AA".into()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_timeout() {
        let (adapter, _, manager) = setup();
        adapter.add_printer("AA", "MTP-II");
        adapter.set_connect_latency(Duration::from_secs(30));
        manager.start().await.unwrap();

        let err = manager.select(&"AA".into()).await.unwrap_err();
        assert_eq!(
            err,
            PrintError::from(ConnectionError::Timeout(Duration::from_secs(10)))
        );
        assert_eq!(manager.state(), ConnectionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_replaces_connected_device() {
        let (adapter, _, manager) = setup();
        adapter.add_printer("AA", "MTP-II");
        adapter.add_printer("BB", "RPP02N");
        manager.start().await.unwrap();

        connect(&manager, "AA").await;
        let device = connect(&manager, "BB").await;

        assert_eq!(manager.connected_device(), Some(device));
        assert!(!adapter.is_connected(&"AA".into()).await);

        // The old link's disconnect event must not start a reconnect
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(adapter.connect_calls(), 2);
        assert_eq!(manager.connected_device().unwrap().id.as_str(), "BB");
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_tears_down_before_connecting() {
        let (adapter, _, manager) = setup();
        adapter.add_printer("AA", "MTP-II");
        adapter.add_printer("BB", "RPP02N");
        manager.start().await.unwrap();
        connect(&manager, "AA").await;

        adapter.set_disconnect_latency(Duration::from_millis(100));
        adapter.set_connect_latency(Duration::from_millis(100));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = {
            let seen = Arc::clone(&seen);
            let mut rx = manager.subscribe();
            tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    seen.lock().push(rx.borrow_and_update().clone());
                }
            })
        };

        let device = connect(&manager, "BB").await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        recorder.abort();

        let seen = seen.lock().clone();
        let position = |wanted: &ConnectionState| {
            seen.iter()
                .position(|s| s == wanted)
                .unwrap_or_else(|| panic!("{wanted:?} not observed in {seen:?}"))
        };
        let teardown = position(&ConnectionState::TeardownRequested("AA".into()));
        let connecting = position(&ConnectionState::Connecting("BB".into()));
        let connected = position(&ConnectionState::Connected(device));
        assert!(teardown < connecting);
        assert!(connecting < connected);
        assert!(!seen[teardown..].iter().any(|s| s.is_connected_to(&"AA".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_intentional_disconnect_does_not_reconnect() {
        let (adapter, _, manager) = setup();
        adapter.add_printer("AA", "MTP-II");
        manager.start().await.unwrap();
        connect(&manager, "AA").await;

        let mut rx = manager.subscribe();
        manager.disconnect().await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(manager.state(), ConnectionState::Idle);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(adapter.connect_calls(), 1);
        assert_eq!(manager.state(), ConnectionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_loss_reconnects() {
        let (adapter, _, manager) = setup();
        adapter.add_printer("AA", "MTP-II");
        manager.start().await.unwrap();
        connect(&manager, "AA").await;

        adapter.drop_link(&"AA".into());
        wait_for_state(&manager, |s| {
            *s == ConnectionState::Disconnected(DisconnectReason::LinkLost)
        })
        .await;

        let state = wait_for_state(&manager, ConnectionState::is_connected).await;
        assert_eq!(state.device().unwrap().id.as_str(), "AA");
        assert_eq!(adapter.connect_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_exhausted() {
        let (adapter, _, manager) = setup();
        adapter.add_printer("AA", "MTP-II");
        manager.start().await.unwrap();
        connect(&manager, "AA").await;

        adapter.fail_next_connects(10);
        adapter.drop_link(&"AA".into());

        wait_for_state(&manager, |s| {
            *s == ConnectionState::Disconnected(DisconnectReason::ReconnectExhausted)
        })
        .await;
        assert_eq!(adapter.connect_calls(), 1 + 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_action_cancels_reconnect() {
        let (adapter, _, manager) = setup();
        adapter.add_printer("AA", "MTP-II");
        manager.start().await.unwrap();
        connect(&manager, "AA").await;

        adapter.fail_next_connects(10);
        adapter.drop_link(&"AA".into());
        wait_for_state(&manager, |s| {
            *s == ConnectionState::Disconnected(DisconnectReason::LinkLost)
        })
        .await;

        manager.disconnect().await;
        assert_eq!(manager.state(), ConnectionState::Idle);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(adapter.connect_calls(), 1);
        assert_eq!(manager.state(), ConnectionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_restores_last_printer() {
        let (adapter, store, manager) = setup();
        adapter.add_printer("AA", "MTP-II");
        *store.last.lock() = Some("AA".into());

        manager.start().await.unwrap();

        let device = manager.connected_device().unwrap();
        assert_eq!(device.id.as_str(), "AA");
        assert_eq!(device.name, "MTP-II");
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_skips_uncached_printer() {
        let (adapter, store, manager) = setup();
        *store.last.lock() = Some("GONE".into());

        manager.start().await.unwrap();

        assert_eq!(manager.state(), ConnectionState::Idle);
        assert_eq!(adapter.connect_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_denied_on_start() {
        let (adapter, _, manager) = setup();
        adapter.deny_permission();

        let err = manager.start().await.unwrap_err();
        assert!(matches!(err, PrintError::Permission(PermissionError::Denied(_))));
        assert!(!err.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_disconnects() {
        let (adapter, _, manager) = setup();
        adapter.add_printer("AA", "MTP-II");
        manager.start().await.unwrap();
        connect(&manager, "AA").await;

        manager.shutdown().await;

        assert_eq!(manager.state(), ConnectionState::Idle);
        assert!(!adapter.is_connected(&"AA".into()).await);
    }
}
