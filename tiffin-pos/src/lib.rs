//! Tiffin POS - printing side of the point-of-sale client
//!
//! # Module structure
//!
//! ```text
//! tiffin-pos/src/
//! ├── core/          # configuration
//! ├── common/        # logging
//! ├── settings.rs    # persisted printer selection
//! └── printing/      # receipt / KOT / test page rendering, print service
//! ```
//!
//! Rendering turns an [`shared::OrderSnapshot`] into a [`shared::PrintJob`];
//! [`printing::PrintService`] hands the job to the transmission pipeline of
//! `tiffin-printer`.

pub mod common;
pub mod core;
pub mod printing;
pub mod settings;

pub use crate::core::Config;
pub use common::logger::{cleanup_old_logs, init_logger, init_logger_with_file};
pub use printing::{KitchenTicket, KitchenTicketRenderer, PrintService, ReceiptRenderer};
pub use settings::FileSettings;

/// Create the work directory and initialize logging
pub fn setup_environment(config: &Config) -> anyhow::Result<()> {
    std::fs::create_dir_all(&config.work_dir)?;
    let log_dir = config.log_dir();
    init_logger_with_file(&config.log_level, config.log_json, Some(log_dir.as_path()))?;
    Ok(())
}

/// Print the startup banner
pub fn print_banner() {
    println!(
        r#"
  _____ _  __  __ _         ____   ___  ____
 |_   _(_)/ _|/ _(_)_ __   |  _ \ / _ \/ ___|
   | | | | |_| |_| | '_ \  | |_) | | | \___ \
   | | | |  _|  _| | | | | |  __/| |_| |___) |
   |_| |_|_| |_| |_|_| |_| |_|    \___/|____/
    "#
    );
}
