//! Sync engine: orchestrates replication of company ledgers from the remote
//! accounting source into the local SQLite store.
//!
//! The entry point is [`SyncService`]: construct it with a
//! [`RemoteRecordSource`](ledgersync_core::sync::RemoteRecordSource)
//! implementation (normally the gateway client from `ledgersync-connector`),
//! the storage pool and write handle, and an [`EngineConfig`], then call
//! `start_sync` per company revision.

mod config;
mod orchestrator;
mod service;

pub use config::{EngineConfig, LOG_BACKUP_FILE_NAME};
pub use orchestrator::{SyncOutcome, SyncStatus};
pub use service::{SyncHandle, SyncService};
