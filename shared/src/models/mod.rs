//! Data models
//!
//! Shared between the ticket renderers and the transmission pipeline.

pub mod print_job;
pub mod store_info;

// Re-exports
pub use print_job::*;
pub use store_info::*;
