//! Order snapshots handed to the printing stack
//!
//! The pricing/order layer owns all money arithmetic. These types are the
//! read-only view it produces for printing:
//! - [`OrderSnapshot`]: the current state of an order
//! - [`PreviousOrderSnapshot`]: the last state that was printed to the kitchen

pub mod snapshot;
pub mod types;

// Re-exports
pub use snapshot::{OrderSnapshot, PreviousOrderSnapshot};
pub use types::*;
