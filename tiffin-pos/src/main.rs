//! # Tiffin POS printer CLI
//!
//! ## Usage
//!
//! ```bash
//! # Find printers nearby
//! tiffin-pos scan --seconds 10
//!
//! # Connect, remember the printer and print a test page
//! tiffin-pos connect AA:BB:CC:DD:EE:FF
//!
//! # Print from order snapshots (JSON)
//! tiffin-pos receipt --order order.json
//! tiffin-pos kot --order order.json --previous last_kot.json
//!
//! # Same, against a simulated printer; bytes are dumped to WORK_DIR
//! tiffin-pos --simulate receipt --order order.json
//! ```

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use shared::order::{OrderSnapshot, PreviousOrderSnapshot};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tiffin_pos::{Config, FileSettings, PrintService, print_banner, setup_environment};
use tiffin_printer::{
    BleAdapter, BtleplugAdapter, ConnectionManager, DeviceId, DeviceStore, MemoryAdapter,
    PrintError, PrinterDevice, TransmitReport,
};

const SIMULATED_PRINTER_ID: &str = "SIM-PRINTER-01";
const SIMULATED_PRINTER_NAME: &str = "Simulated Printer";

/// Scan bound when the last printer is not cached by the adapter
const DISCOVERY_SECONDS: u64 = 10;

/// Tiffin POS - BLE thermal printer tools
#[derive(Parser, Debug)]
#[command(name = "tiffin-pos")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Use an in-memory simulated printer instead of Bluetooth
    #[arg(long, global = true, env = "TIFFIN_SIMULATE")]
    simulate: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan for nearby printers
    Scan {
        /// Scan duration
        #[arg(long, default_value = "10")]
        seconds: u64,
    },
    /// Connect to a printer, remember it and print a test page
    Connect {
        /// Printer id as shown by `scan`
        id: String,

        /// How long to look for the printer if the adapter does not know it
        #[arg(long, default_value = "10")]
        seconds: u64,
    },
    /// Print a test page on the last printer
    Test,
    /// Print a customer receipt
    Receipt {
        /// Order snapshot (JSON)
        #[arg(long, value_name = "FILE")]
        order: PathBuf,
    },
    /// Print a kitchen order ticket
    Kot {
        /// Current order snapshot (JSON)
        #[arg(long, value_name = "FILE")]
        order: PathBuf,

        /// Last printed snapshot; prints an additional ticket with the increases only
        #[arg(long, value_name = "FILE")]
        previous: Option<PathBuf>,
    },
}

enum Backend {
    Bluetooth(Arc<BtleplugAdapter>),
    Simulated(Arc<MemoryAdapter>),
}

impl Backend {
    async fn open(simulate: bool) -> anyhow::Result<Self> {
        if simulate {
            let adapter = MemoryAdapter::new();
            adapter.add_printer(SIMULATED_PRINTER_ID, SIMULATED_PRINTER_NAME);
            return Ok(Self::Simulated(Arc::new(adapter)));
        }

        let adapter = BtleplugAdapter::new()
            .await
            .context("Bluetooth is not available")?;
        Ok(Self::Bluetooth(Arc::new(adapter)))
    }

    fn adapter(&self) -> Arc<dyn BleAdapter> {
        match self {
            Self::Bluetooth(adapter) => adapter.clone(),
            Self::Simulated(adapter) => adapter.clone(),
        }
    }

    /// Simulated runs keep their own settings file
    fn settings_path(&self, config: &Config) -> PathBuf {
        match self {
            Self::Bluetooth(_) => config.settings_path(),
            Self::Simulated(_) => PathBuf::from(&config.work_dir).join("settings.simulated.json"),
        }
    }

    fn fallback_printer(&self) -> Option<DeviceId> {
        match self {
            Self::Bluetooth(_) => None,
            Self::Simulated(_) => Some(SIMULATED_PRINTER_ID.into()),
        }
    }

    /// Save what the simulated printer received
    fn dump(
        &self,
        config: &Config,
        device: &PrinterDevice,
        report: &TransmitReport,
    ) -> anyhow::Result<()> {
        let Self::Simulated(adapter) = self else {
            return Ok(());
        };
        let path = PathBuf::from(&config.work_dir).join(format!("simulated-{}.bin", report.kind));
        std::fs::write(&path, adapter.written(&device.id))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Simulated output: {}", path.display());
        Ok(())
    }
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("Invalid order snapshot {}", path.display()))
}

fn print_failure(err: PrintError) -> anyhow::Error {
    let hint = if err.is_retryable() {
        "check the printer and retry"
    } else {
        "continue without printing"
    };
    anyhow::anyhow!("Printing failed: {err} (code {}); {hint}", err.code().code())
}

/// Wait until `id` shows up in the scan results
async fn discover(manager: &ConnectionManager, id: &DeviceId, seconds: u64) -> anyhow::Result<()> {
    manager.scan().await?;
    let mut results = manager.subscribe_scan();
    let found = tokio::time::timeout(
        Duration::from_secs(seconds),
        results.wait_for(|r| r.get(id).is_some()),
    )
    .await
    .map(|r| r.is_ok())
    .unwrap_or(false);
    manager.stop_scan().await;

    if !found {
        bail!("Printer {id} not found after {seconds}s");
    }
    Ok(())
}

/// The printer restored on start, or the last printer found by scanning
async fn ensure_connected(
    manager: &ConnectionManager,
    store: &FileSettings,
    fallback: Option<DeviceId>,
) -> anyhow::Result<PrinterDevice> {
    if let Some(device) = manager.connected_device() {
        return Ok(device);
    }

    let id = match store.load_last_device().await? {
        Some(id) => id,
        None => match fallback {
            Some(id) => id,
            None => bail!("No printer selected; run `tiffin-pos connect <ID>` first"),
        },
    };
    discover(manager, &id, DISCOVERY_SECONDS).await?;
    Ok(manager.select(&id).await?)
}

async fn scan(manager: &ConnectionManager, seconds: u64) -> anyhow::Result<()> {
    // Subscribe first so printers found while the scan starts are not missed
    let mut results = manager.subscribe_scan();
    manager.scan().await.map_err(print_failure)?;
    println!("Scanning for {seconds}s...");

    let mut shown = 0;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(seconds);
    while let Ok(Ok(())) = tokio::time::timeout_at(deadline, results.changed()).await {
        let devices = results.borrow_and_update().devices().to_vec();
        for device in devices.iter().skip(shown) {
            println!("  {:<24} {}", device.id, device.name);
        }
        shown = devices.len();
    }
    manager.stop_scan().await;

    if shown == 0 {
        println!("No printers found");
    } else {
        println!("{shown} printer(s) found");
    }
    Ok(())
}

struct Session {
    backend: Backend,
    store: Arc<FileSettings>,
    manager: ConnectionManager,
    service: PrintService,
    config: Config,
}

impl Session {
    async fn open(simulate: bool, config: Config) -> anyhow::Result<Self> {
        let backend = Backend::open(simulate).await?;
        let store = Arc::new(FileSettings::new(backend.settings_path(&config)));
        let manager =
            ConnectionManager::new(backend.adapter(), store.clone(), config.connection_config());
        manager.start().await.map_err(print_failure)?;

        let service = PrintService::new(manager.clone(), &config);
        Ok(Self {
            backend,
            store,
            manager,
            service,
            config,
        })
    }

    async fn ensure_connected(&self) -> anyhow::Result<PrinterDevice> {
        ensure_connected(&self.manager, &self.store, self.backend.fallback_printer()).await
    }

    async fn connect(&self, id: DeviceId, seconds: u64) -> anyhow::Result<TransmitReport> {
        let connected = self.manager.connected_device().is_some_and(|d| d.id == id);
        if !connected && self.backend.adapter().known_device(&id).await.is_none() {
            discover(&self.manager, &id, seconds).await?;
        }
        let device = self.manager.select(&id).await.map_err(print_failure)?;
        println!("Connected to {} ({})", device.name, device.id);
        self.service.print_test_page().await.map_err(print_failure)
    }

    async fn print_kot(
        &self,
        order: &Path,
        previous: Option<&Path>,
    ) -> anyhow::Result<TransmitReport> {
        let order: OrderSnapshot = load_json(order)?;
        let previous = previous
            .map(|p| load_json::<OrderSnapshot>(p).map(PreviousOrderSnapshot::from))
            .transpose()?;
        self.ensure_connected().await?;

        let kot = self
            .service
            .print_kot(&order, previous.as_ref())
            .await
            .map_err(print_failure)?;
        if kot.lines.is_empty() {
            println!("No new items; duplicate ticket printed");
        }
        for line in &kot.lines {
            println!("  {} x {}", line.quantity, line.name);
        }
        println!("Total items: {}", kot.total_items);
        Ok(kot.transmit)
    }

    async fn execute(&self, command: Commands) -> anyhow::Result<()> {
        let report = match command {
            Commands::Scan { seconds } => return scan(&self.manager, seconds).await,
            Commands::Connect { id, seconds } => self.connect(DeviceId::new(id), seconds).await?,
            Commands::Test => {
                self.ensure_connected().await?;
                self.service.print_test_page().await.map_err(print_failure)?
            }
            Commands::Receipt { order } => {
                let order: OrderSnapshot = load_json(&order)?;
                self.ensure_connected().await?;
                self.service.print_receipt(&order).await.map_err(print_failure)?
            }
            Commands::Kot { order, previous } => {
                self.print_kot(&order, previous.as_deref()).await?
            }
        };

        println!(
            "Printed {} ({} bytes, {} chunks, {} ms)",
            report.kind,
            report.bytes,
            report.chunks,
            report.elapsed.as_millis()
        );
        if let Some(device) = self.manager.connected_device() {
            self.backend.dump(&self.config, &device, &report)?;
        }
        Ok(())
    }
}

async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let session = Session::open(cli.simulate, config).await?;
    let outcome = session.execute(cli.command).await;
    session.manager.shutdown().await;
    outcome
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment (dotenv, work dir, logging)
    dotenv::dotenv().ok();
    let config = Config::from_env();
    setup_environment(&config)?;

    let cli = Cli::parse();
    print_banner();
    tracing::info!(simulate = cli.simulate, "Tiffin POS printer tools starting");

    // 2. Run the command
    if let Err(e) = run(cli, config).await {
        tracing::error!(error = %e, "Command failed");
        return Err(e);
    }
    Ok(())
}
