//! SQLite storage for synchronized ledger entries.

mod model;
mod repository;
mod writer;

pub use model::LedgerEntryDB;
pub use repository::LedgerEntryRepository;
pub use writer::{BatchWriter, BatchWriterStats};
