//! SQLite persistence for the ledger sync engine.
//!
//! One database file per installation, WAL mode, every mutation funneled
//! through the single-writer actor in [`db::write_actor`]. Repositories hold
//! the read pool plus a [`db::WriteHandle`] clone and expose async APIs that
//! keep diesel types out of callers.

pub mod companies;
pub mod db;
pub mod errors;
pub mod records;
pub mod schema;
pub mod sync_log;

pub use companies::CompanyRepository;
pub use db::WriteHandle;
pub use errors::StorageError;
pub use records::{BatchWriter, BatchWriterStats, LedgerEntryRepository};
pub use sync_log::{LogBackup, SyncLogRecorder, SyncLogRepository};
