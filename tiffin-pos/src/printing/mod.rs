//! Printing
//!
//! Turns order snapshots into ESC/POS print jobs and sends them to the
//! connected printer.
//!
//! # Structure
//!
//! ```text
//! printing/
//! ├── format.rs     # money rows, timestamps
//! ├── diff.rs       # incremental KOT diff
//! ├── receipt.rs    # customer receipt
//! ├── kitchen.rs    # kitchen order ticket
//! ├── test_page.rs  # printer self-test
//! └── service.rs    # PrintService facade
//! ```

pub mod diff;
pub mod format;
mod kitchen;
mod receipt;
mod service;
mod test_page;

pub use diff::{KotLine, kot_lines};
pub use format::{AmountSign, format_amount_line};
pub use kitchen::{KitchenTicket, KitchenTicketRenderer};
pub use receipt::{ReceiptRenderer, upi_pay_uri};
pub use service::{KotReport, PrintService};
pub use test_page::TestPageRenderer;
