//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Domain an error code belongs to, derived from its numeric range
///
/// | Range | Category |
/// |-------|----------|
/// | 0xxx | General |
/// | 2xxx | Permission (Bluetooth access) |
/// | 92xx | Printer (connection, encoding, transmission) |
/// | other 9xxx | System |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    General,
    Permission,
    Printer,
    System,
}

impl ErrorCategory {
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            2000..3000 => Self::Permission,
            9200..9300 => Self::Printer,
            _ => Self::System,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Permission => "permission",
            Self::Printer => "printer",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges() {
        assert_eq!(ErrorCategory::from_code(2), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(2101), ErrorCategory::Permission);
        assert_eq!(ErrorCategory::from_code(9205), ErrorCategory::Printer);
        assert_eq!(ErrorCategory::from_code(9004), ErrorCategory::System);
    }

    #[test]
    fn test_printer_codes_are_printer_category() {
        assert_eq!(
            ErrorCode::BluetoothPermissionDenied.category(),
            ErrorCategory::Permission
        );
        assert_eq!(ErrorCode::PrinterBusy.category(), ErrorCategory::Printer);
        assert_eq!(ErrorCode::PrintEncodingFailed.category().name(), "printer");
        assert_eq!(ErrorCode::TimeoutError.category(), ErrorCategory::System);
    }
}
