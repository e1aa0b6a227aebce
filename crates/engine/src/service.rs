//! Caller-facing sync API.
//!
//! `start_sync` either launches an attempt on the runtime and returns a
//! handle, or rejects immediately when the (company_id, revision_id)
//! partition already has an active attempt. Requests are never queued.
//! Progress and history are polled by reading `sync_logs`.

use chrono::NaiveDate;
use log::info;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use ledgersync_core::errors::{DatabaseError, Error, Result};
use ledgersync_core::ledger::Company;
use ledgersync_core::sync::{RemoteRecordSource, SyncLogEntry};
use ledgersync_storage_sqlite::db::{DbPool, WriteHandle};
use ledgersync_storage_sqlite::sync_log::{LogBackup, SyncLogRepository};
use ledgersync_storage_sqlite::CompanyRepository;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::orchestrator::{Orchestrator, SyncOutcome};

type ActiveSet = Arc<Mutex<HashSet<(String, String)>>>;

/// Releases the partition slot when the attempt ends, however it ends.
struct ActiveSyncGuard {
    active: ActiveSet,
    key: (String, String),
}

impl Drop for ActiveSyncGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.active.lock() {
            set.remove(&self.key);
        }
    }
}

/// Handle to a launched attempt.
pub struct SyncHandle {
    pub attempt_id: String,
    join: tokio::task::JoinHandle<SyncOutcome>,
}

impl SyncHandle {
    /// Wait for the attempt's structured outcome.
    pub async fn wait(self) -> Result<SyncOutcome> {
        self.join.await.map_err(|e| {
            Error::Database(DatabaseError::Internal(format!(
                "Sync task aborted: {}",
                e
            )))
        })
    }
}

pub struct SyncService {
    source: Arc<dyn RemoteRecordSource>,
    pool: Arc<DbPool>,
    writer: WriteHandle,
    backup: LogBackup,
    batch_size: usize,
    progress_every: u32,
    active: ActiveSet,
}

impl SyncService {
    pub fn new(
        source: Arc<dyn RemoteRecordSource>,
        pool: Arc<DbPool>,
        writer: WriteHandle,
        config: &EngineConfig,
    ) -> Self {
        Self {
            source,
            pool,
            writer,
            backup: LogBackup::new(config.log_backup_path()),
            batch_size: config.batch_size,
            progress_every: config.progress_log_every_n_batches,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Launch a sync for one company revision over an inclusive date span.
    ///
    /// Returns `Error::SyncInProgress` when the partition already has an
    /// active attempt. The slot is claimed before the task is spawned, so
    /// two racing callers cannot both get a handle.
    pub fn start_sync(&self, company: Company, from: NaiveDate, to: NaiveDate) -> Result<SyncHandle> {
        let key = company.partition_key();
        {
            let mut set = self
                .active
                .lock()
                .map_err(|_| DatabaseError::Internal("Active sync registry poisoned".into()))?;
            if !set.insert(key.clone()) {
                info!(
                    "[Sync] Rejecting sync for {} revision {}: already in progress",
                    key.0, key.1
                );
                return Err(Error::SyncInProgress(format!(
                    "company {} revision {}",
                    key.0, key.1
                )));
            }
        }
        let guard = ActiveSyncGuard {
            active: self.active.clone(),
            key,
        };

        let attempt_id = Uuid::now_v7().to_string();
        let orchestrator = Orchestrator::new(
            self.source.clone(),
            self.pool.clone(),
            self.writer.clone(),
            self.backup.clone(),
            attempt_id.clone(),
            company,
            from,
            to,
            self.batch_size,
            self.progress_every,
        );
        let join = tokio::spawn(async move {
            let _guard = guard;
            orchestrator.run().await
        });
        Ok(SyncHandle { attempt_id, join })
    }

    /// True when the partition currently has an active attempt.
    pub fn is_syncing(&self, company_id: &str, revision_id: &str) -> bool {
        self.active
            .lock()
            .map(|set| set.contains(&(company_id.to_string(), revision_id.to_string())))
            .unwrap_or(false)
    }

    /// Latest log entries for one company revision, newest first.
    pub fn get_progress(
        &self,
        company_id: &str,
        revision_id: &str,
        limit: i64,
    ) -> Result<Vec<SyncLogEntry>> {
        SyncLogRepository::new(self.pool.clone()).list_for_revision(company_id, revision_id, limit)
    }

    /// All log entries of one attempt in causal order.
    pub fn get_attempt_log(&self, attempt_id: &str) -> Result<Vec<SyncLogEntry>> {
        SyncLogRepository::new(self.pool.clone()).list_for_attempt(attempt_id)
    }

    /// Known company revisions and their sync state.
    pub fn list_companies(&self) -> Result<Vec<Company>> {
        CompanyRepository::new(self.pool.clone(), self.writer.clone()).list()
    }
}
