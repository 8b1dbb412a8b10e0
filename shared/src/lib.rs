//! Shared types for the Tiffin POS printing stack
//!
//! Order snapshots handed over by the pricing layer, print jobs produced by
//! the ticket renderers, and the error codes surfaced to the UI.

pub mod error;
pub mod models;
pub mod order;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, AppResult, ErrorCategory, ErrorCode};
pub use models::{Outlet, PrintJob, PrintJobKind};
pub use order::{
    Customer, OrderLine, OrderSnapshot, OrderTotals, OrderType, Portion, PreviousOrderSnapshot,
};
