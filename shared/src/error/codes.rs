//! Unified error codes for the printing stack
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 2xxx: Permission errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// across the UI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,

    // ==================== 2xxx: Permission ====================
    /// Bluetooth or location permission denied by the platform
    BluetoothPermissionDenied = 2101,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Timeout
    TimeoutError = 9004,
    /// Printer not available (no device, service or characteristic)
    PrinterNotAvailable = 9201,
    /// Print failed
    PrintFailed = 9202,
    /// Printer connection could not be established
    PrinterConnectionFailed = 9203,
    /// Printer link dropped
    PrinterConnectionLost = 9204,
    /// No printer connected
    PrinterNotConnected = 9205,
    /// Printer is busy with another job
    PrinterBusy = 9206,
    /// Printer command could not be encoded
    PrintEncodingFailed = 9207,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Whether the UI should offer "retry" rather than only "continue without printing"
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::TimeoutError
                | ErrorCode::PrinterNotAvailable
                | ErrorCode::PrintFailed
                | ErrorCode::PrinterConnectionFailed
                | ErrorCode::PrinterConnectionLost
                | ErrorCode::PrinterNotConnected
                | ErrorCode::PrinterBusy
        )
    }

    /// Get the default message for this error code
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::BluetoothPermissionDenied => "Bluetooth permission denied",
            ErrorCode::InternalError => "Internal error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::PrinterNotAvailable => "Printer is not available",
            ErrorCode::PrintFailed => "Print failed",
            ErrorCode::PrinterConnectionFailed => "Could not connect to printer",
            ErrorCode::PrinterConnectionLost => "Printer connection lost",
            ErrorCode::PrinterNotConnected => "No printer connected",
            ErrorCode::PrinterBusy => "Printer is busy",
            ErrorCode::PrintEncodingFailed => "Print content could not be encoded",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(ErrorCode::ValidationFailed),
            2101 => Ok(ErrorCode::BluetoothPermissionDenied),
            9001 => Ok(ErrorCode::InternalError),
            9004 => Ok(ErrorCode::TimeoutError),
            9201 => Ok(ErrorCode::PrinterNotAvailable),
            9202 => Ok(ErrorCode::PrintFailed),
            9203 => Ok(ErrorCode::PrinterConnectionFailed),
            9204 => Ok(ErrorCode::PrinterConnectionLost),
            9205 => Ok(ErrorCode::PrinterNotConnected),
            9206 => Ok(ErrorCode::PrinterBusy),
            9207 => Ok(ErrorCode::PrintEncodingFailed),
            _ => Err(InvalidErrorCode(value)),
        }
    }
}
