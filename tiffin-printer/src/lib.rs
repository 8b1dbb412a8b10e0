//! # tiffin-printer
//!
//! BLE thermal printer library - low-level printing capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - ESC/POS command encoding
//! - Column layout for fixed-width paper
//! - BLE discovery, connection and reconnection of a single printer
//! - Chunked, paced transmission of a print job
//!
//! Business logic (WHAT to print) stays in application code:
//! - Receipt / kitchen ticket rendering → tiffin-pos
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tiffin_printer::{
//!     BtleplugAdapter, ConnectionConfig, ConnectionManager, EscPosBuilder,
//!     TransmissionPipeline, TransmitConfig,
//! };
//!
//! let adapter = Arc::new(BtleplugAdapter::new().await?);
//! let manager = ConnectionManager::new(adapter, store, ConnectionConfig::default());
//! manager.start().await?;
//!
//! let mut b = EscPosBuilder::new(32);
//! b.center().double_height().line("KOT").reset_style();
//! b.cut();
//!
//! let pipeline = TransmissionPipeline::new(manager.clone(), TransmitConfig::default());
//! pipeline.transmit(PrintJob::new(PrintJobKind::Kot, b.build())).await?;
//! ```

pub mod ble;
mod error;
pub mod escpos;
pub mod text;
mod transmit;

// Re-exports
pub use ble::{
    AdapterEvent, Advertisement, BleAdapter, BleError, BtleplugAdapter, ConnectionConfig,
    ConnectionManager, ConnectionState, DeviceId, DeviceStore, DisconnectReason,
    GattCharacteristic, GattService, MemoryAdapter, PrinterDevice, ReconnectPolicy, ScanResult,
};
pub use error::{
    ConnectionError, EncodingError, Missing, PermissionError, PrintError, PrintResult,
    TransmissionError,
};
pub use escpos::{Alignment, EscPosBuilder, FontScale, Rule};
pub use transmit::{
    CHUNK_DELAY_MS, CHUNK_SIZE, SETTLE_DELAY_MS, TransmissionPipeline, TransmitConfig,
    TransmitReport, WRITE_TIMEOUT_MS,
};
