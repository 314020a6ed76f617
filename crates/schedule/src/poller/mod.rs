//! Background reminder poller.
//!
//! Split into focused submodules:
//! - `core`: Poller struct, start/stop lifecycle and the poll loop
//! - `tick`: one poll pass (window, classify, suppress, de-duplicate, send)
//! - `ledger`: the single-writer notification record

mod core;
mod ledger;
mod tick;

pub use self::core::{Poller, PollerHandle};
pub use self::ledger::{LedgerReader, LedgerSnapshot, NotificationRecord};
pub use self::tick::TickReport;
