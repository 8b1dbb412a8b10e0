//! Error types for the printer library

use shared::error::{AppError, ErrorCode};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Platform refused Bluetooth access
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PermissionError {
    /// Bluetooth (or location, on some platforms) permission not granted
    #[error("Bluetooth permission denied: {0}")]
    Denied(String),

    /// No usable Bluetooth adapter (radio off or missing)
    #[error("Bluetooth adapter unavailable: {0}")]
    AdapterUnavailable(String),
}

/// What could not be found while connecting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Device,
    Service,
    Characteristic,
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::Device => f.write_str("device"),
            Missing::Service => f.write_str("printer service"),
            Missing::Characteristic => f.write_str("write characteristic"),
        }
    }
}

/// Connection manager errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    /// Device, allow-listed service or write characteristic not found
    #[error("Printer not found: no {0}")]
    NotFound(Missing),

    /// GATT connect or discovery failed
    #[error("Connection failed: {0}")]
    Failed(String),

    /// Link dropped
    #[error("Connection lost")]
    Lost,

    /// Connect + discovery did not finish in time
    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),

    /// Operation not allowed in the current state
    #[error("Cannot {op} while {state}")]
    InvalidState {
        op: &'static str,
        state: &'static str,
    },
}

/// Command encoding errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodingError {
    /// QR payload does not fit the single-byte length field
    #[error("QR payload too long: {len} bytes (max {max})")]
    PayloadTooLong { len: usize, max: usize },
}

/// Transmission pipeline errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransmissionError {
    /// No printer connected, nothing was written
    #[error("No printer connected")]
    NotConnected,

    /// Link dropped mid-job
    #[error("Connection lost after {written} of {total} bytes")]
    LostDuringTransfer { written: usize, total: usize },

    /// Another job is in flight
    #[error("Printer busy with another job")]
    Busy,

    /// A chunk write was not acknowledged in time
    #[error("Write timed out at chunk {chunk}")]
    WriteTimeout { chunk: usize },

    /// A chunk write failed on a live link
    #[error("Write failed at chunk {chunk}: {reason}")]
    WriteFailed { chunk: usize, reason: String },
}

/// Printer error types
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PrintError {
    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Transmission(#[from] TransmissionError),
}

impl PrintError {
    /// UI-facing error code
    pub fn code(&self) -> ErrorCode {
        match self {
            PrintError::Permission(PermissionError::Denied(_)) => {
                ErrorCode::BluetoothPermissionDenied
            }
            PrintError::Permission(PermissionError::AdapterUnavailable(_)) => {
                ErrorCode::PrinterNotAvailable
            }
            PrintError::Connection(e) => match e {
                ConnectionError::NotFound(_) => ErrorCode::PrinterNotAvailable,
                ConnectionError::Failed(_) => ErrorCode::PrinterConnectionFailed,
                ConnectionError::Lost => ErrorCode::PrinterConnectionLost,
                ConnectionError::Timeout(_) => ErrorCode::TimeoutError,
                ConnectionError::InvalidState { .. } => ErrorCode::ValidationFailed,
            },
            PrintError::Encoding(_) => ErrorCode::PrintEncodingFailed,
            PrintError::Transmission(e) => match e {
                TransmissionError::NotConnected => ErrorCode::PrinterNotConnected,
                TransmissionError::LostDuringTransfer { .. } => ErrorCode::PrinterConnectionLost,
                TransmissionError::Busy => ErrorCode::PrinterBusy,
                TransmissionError::WriteTimeout { .. } => ErrorCode::TimeoutError,
                TransmissionError::WriteFailed { .. } => ErrorCode::PrintFailed,
            },
        }
    }

    /// Whether "retry" makes sense (vs. "continue without printing")
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

impl From<PrintError> for AppError {
    fn from(err: PrintError) -> Self {
        let app = AppError::with_message(err.code(), err.to_string());
        match err {
            PrintError::Transmission(TransmissionError::LostDuringTransfer { written, total }) => {
                app.with_detail("written", written).with_detail("total", total)
            }
            PrintError::Transmission(
                TransmissionError::WriteTimeout { chunk }
                | TransmissionError::WriteFailed { chunk, .. },
            ) => app.with_detail("chunk", chunk),
            _ => app,
        }
    }
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_is_not_retryable() {
        let err: PrintError = PermissionError::Denied("BLUETOOTH_CONNECT".into()).into();
        assert_eq!(err.code(), ErrorCode::BluetoothPermissionDenied);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_link_errors_are_retryable() {
        let lost: PrintError = TransmissionError::LostDuringTransfer {
            written: 40,
            total: 100,
        }
        .into();
        assert!(lost.is_retryable());

        let not_connected: PrintError = TransmissionError::NotConnected.into();
        assert!(not_connected.is_retryable());

        let too_long: PrintError = EncodingError::PayloadTooLong { len: 300, max: 252 }.into();
        assert!(!too_long.is_retryable());
    }

    #[test]
    fn test_into_app_error_carries_progress() {
        let err: PrintError = TransmissionError::LostDuringTransfer {
            written: 40,
            total: 100,
        }
        .into();
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::PrinterConnectionLost);
        assert_eq!(app.message, "Connection lost after 40 of 100 bytes");
        let details = app.details.unwrap();
        assert_eq!(details["written"], 40);
        assert_eq!(details["total"], 100);
    }

    #[test]
    fn test_display() {
        let err = ConnectionError::NotFound(Missing::Characteristic);
        assert_eq!(err.to_string(), "Printer not found: no write characteristic");

        let err = ConnectionError::InvalidState {
            op: "scan",
            state: "connected",
        };
        assert_eq!(err.to_string(), "Cannot scan while connected");
    }
}
