pub mod calendar;
pub mod memory;

pub use calendar::LedgerEntry;
pub use memory::InMemoryLedger;
