use chrono_tz::Tz;
use shared::models::Outlet;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tiffin_printer::{ConnectionConfig, ReconnectPolicy, TransmitConfig};

/// Application configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./work_dir | settings.json and logs |
/// | LOG_LEVEL | info | tracing filter |
/// | LOG_JSON | false | JSON console logs |
/// | PAPER_WIDTH | 32 | characters per printed line |
/// | TIMEZONE | Asia/Kolkata | zone for printed timestamps |
/// | OUTLET_NAME | Tiffin House | receipt header |
/// | OUTLET_ADDRESS | (empty) | receipt header |
/// | OUTLET_PHONE | (unset) | receipt header |
/// | MERCHANT_UPI_ID | (unset) | pay-request QR; no QR when unset |
/// | CONNECT_TIMEOUT_MS | 10000 | connect + service discovery bound |
/// | WRITE_TIMEOUT_MS | 2000 | per-chunk write bound |
/// | CHUNK_SIZE | 20 | bytes per BLE write |
/// | CHUNK_DELAY_MS | 20 | pause after each chunk |
/// | SETTLE_DELAY_MS | 500 | pause after the last chunk |
/// | RECONNECT_MAX_ATTEMPTS | 5 | automatic reconnect attempts |
/// | RECONNECT_BACKOFF_MS | 1000 | first reconnect backoff |
///
/// # Example
///
/// ```ignore
/// PAPER_WIDTH=48 MERCHANT_UPI_ID=tiffin@upi tiffin-pos receipt --order order.json
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Work directory holding settings and logs
    pub work_dir: String,
    pub log_level: String,
    pub log_json: bool,
    /// Characters per printed line (32 for 58mm paper, 48 for 80mm)
    pub paper_width: usize,
    pub timezone: Tz,
    pub outlet: Outlet,
    pub connect_timeout_ms: u64,
    pub write_timeout_ms: u64,
    pub chunk_size: usize,
    pub chunk_delay_ms: u64,
    pub settle_delay_ms: u64,
    pub reconnect_max_attempts: u32,
    pub reconnect_backoff_ms: u64,
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable values fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            work_dir: lookup("WORK_DIR").unwrap_or_else(|| "./work_dir".into()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_json: parse_or(lookup("LOG_JSON"), false),
            paper_width: parse_or(lookup("PAPER_WIDTH"), 32),
            timezone: parse_or(lookup("TIMEZONE"), chrono_tz::Asia::Kolkata),
            outlet: Outlet {
                name: non_blank(lookup("OUTLET_NAME")).unwrap_or_else(|| "Tiffin House".into()),
                address: lookup("OUTLET_ADDRESS").unwrap_or_default(),
                phone: non_blank(lookup("OUTLET_PHONE")),
                merchant_upi_id: non_blank(lookup("MERCHANT_UPI_ID")),
            },
            connect_timeout_ms: parse_or(lookup("CONNECT_TIMEOUT_MS"), 10_000),
            write_timeout_ms: parse_or(lookup("WRITE_TIMEOUT_MS"), 2_000),
            chunk_size: parse_or(lookup("CHUNK_SIZE"), tiffin_printer::CHUNK_SIZE),
            chunk_delay_ms: parse_or(lookup("CHUNK_DELAY_MS"), tiffin_printer::CHUNK_DELAY_MS),
            settle_delay_ms: parse_or(lookup("SETTLE_DELAY_MS"), tiffin_printer::SETTLE_DELAY_MS),
            reconnect_max_attempts: parse_or(lookup("RECONNECT_MAX_ATTEMPTS"), 5),
            reconnect_backoff_ms: parse_or(lookup("RECONNECT_BACKOFF_MS"), 1_000),
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    pub fn settings_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("settings.json")
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            reconnect: ReconnectPolicy {
                max_attempts: self.reconnect_max_attempts,
                initial_backoff: Duration::from_millis(self.reconnect_backoff_ms),
                ..ReconnectPolicy::default()
            },
            ..ConnectionConfig::default()
        }
    }

    pub fn transmit_config(&self) -> TransmitConfig {
        TransmitConfig {
            chunk_size: self.chunk_size.max(1),
            chunk_delay: Duration::from_millis(self.chunk_delay_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            write_timeout: Duration::from_millis(self.write_timeout_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
