//! Unified error codes for the printing stack
//!
//! - [`ErrorCode`]: Standardized error codes handed to the UI
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Error with code, message and details
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 2xxx: Permission errors
//! - 92xx: Printer errors (connection, encoding, transmission)
//! - 9xxx: Other system errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! let err = AppError::with_message(ErrorCode::PrinterNotConnected, "Connect a printer first");
//! assert!(err.code.is_retryable());
//! ```

mod category;
mod codes;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult};
