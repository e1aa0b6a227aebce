//! Durable recorder for sync log events.
//!
//! Every event is appended to the JSONL backup before the primary store is
//! touched, then the `sync_logs` insert is committed, checkpointed out of the
//! WAL and read back on a fresh pooled connection. A row that fails the
//! read-back is restored from the in-memory entry with bounded retries. The
//! recorder never fails a sync: persistence problems are logged and swallowed.

use std::sync::Arc;
use std::time::Duration;

use ledgersync_core::errors::{Result, SyncErrorCode};
use ledgersync_core::sync::{
    backoff_ms, SyncLogEntry, SyncLogLevel, SyncPhase, LOG_READBACK_DELAY_MS,
    LOG_RESTORE_MAX_ATTEMPTS,
};

use crate::db::{checkpoint_wal, DbPool, WriteHandle};

use super::backup::LogBackup;
use super::repository::SyncLogRepository;

/// One recorder instance per sync attempt. The attempt id ties all entries
/// of the attempt together in the store and in the backup file.
pub struct SyncLogRecorder {
    repository: SyncLogRepository,
    writer: WriteHandle,
    backup: LogBackup,
    attempt_id: String,
    company_id: String,
    revision_id: String,
}

impl SyncLogRecorder {
    pub fn new(
        pool: Arc<DbPool>,
        writer: WriteHandle,
        backup: LogBackup,
        attempt_id: impl Into<String>,
        company_id: impl Into<String>,
        revision_id: impl Into<String>,
    ) -> Self {
        Self {
            repository: SyncLogRepository::new(pool),
            writer,
            backup,
            attempt_id: attempt_id.into(),
            company_id: company_id.into(),
            revision_id: revision_id.into(),
        }
    }

    pub fn attempt_id(&self) -> &str {
        &self.attempt_id
    }

    // -- phase events ------------------------------------------------------

    pub async fn started(&self, message: impl Into<String>) {
        self.record(self.entry(SyncLogLevel::Info, SyncPhase::Started, message))
            .await;
    }

    pub async fn progress(&self, message: impl Into<String>, records_synced: i64) {
        self.record(
            self.entry(SyncLogLevel::Info, SyncPhase::InProgress, message)
                .with_records_synced(records_synced),
        )
        .await;
    }

    pub async fn completed(
        &self,
        message: impl Into<String>,
        records_synced: i64,
        duration_ms: i64,
    ) {
        self.record(
            self.entry(SyncLogLevel::Success, SyncPhase::Completed, message)
                .with_records_synced(records_synced)
                .with_duration_ms(duration_ms),
        )
        .await;
    }

    pub async fn failed(
        &self,
        message: impl Into<String>,
        code: SyncErrorCode,
        error_message: impl Into<String>,
        records_synced: i64,
        duration_ms: i64,
    ) {
        self.record(
            self.entry(SyncLogLevel::Error, SyncPhase::Failed, message)
                .with_error(code, error_message)
                .with_records_synced(records_synced)
                .with_duration_ms(duration_ms),
        )
        .await;
    }

    // -- informational events ----------------------------------------------

    pub async fn info(&self, message: impl Into<String>) {
        self.record(self.entry(SyncLogLevel::Info, SyncPhase::InProgress, message))
            .await;
    }

    pub async fn warning(&self, message: impl Into<String>, details: impl Into<String>) {
        self.record(
            self.entry(SyncLogLevel::Warning, SyncPhase::InProgress, message)
                .with_details(details),
        )
        .await;
    }

    /// Non-fatal error event; the attempt keeps running. Fatal errors end
    /// the attempt through [`Self::failed`] instead.
    pub async fn error(&self, message: impl Into<String>, details: impl Into<String>) {
        self.record(
            self.entry(SyncLogLevel::Error, SyncPhase::InProgress, message)
                .with_details(details),
        )
        .await;
    }

    /// Intermediate milestone worth surfacing at success level, e.g. a
    /// restored backup entry or a completed long window.
    pub async fn success(&self, message: impl Into<String>) {
        self.record(self.entry(SyncLogLevel::Success, SyncPhase::InProgress, message))
            .await;
    }

    fn entry(
        &self,
        level: SyncLogLevel,
        phase: SyncPhase,
        message: impl Into<String>,
    ) -> SyncLogEntry {
        SyncLogEntry::new(
            &self.attempt_id,
            &self.company_id,
            &self.revision_id,
            level,
            phase,
            message,
        )
    }

    /// Persist one entry. Errors are downgraded to warnings so a logging
    /// failure can never abort the sync it is describing.
    async fn record(&self, entry: SyncLogEntry) {
        let id = entry.id.clone();
        // Backup first. Once the line is on disk the entry survives a crash
        // anywhere in the primary write path and can be replayed offline.
        if let Err(e) = self.backup.append(&entry) {
            log::warn!("[SyncLog] Backup append failed for entry {}: {}", id, e);
        }

        if let Err(e) = self.persist(entry.clone()).await {
            log::warn!(
                "[SyncLog] Primary insert failed for entry {}: {}",
                id,
                e
            );
        }

        if let Err(e) = self.verify_and_restore(entry).await {
            log::warn!(
                "[SyncLog] Entry {} could not be verified in the store: {}",
                id,
                e
            );
        }
    }

    async fn persist(&self, entry: SyncLogEntry) -> Result<()> {
        self.writer
            .exec(move |conn| SyncLogRepository::insert(conn, entry))
            .await?;
        // Flush the WAL so the read-back below sees the committed row even
        // when the fresh connection opens the database file directly.
        self.writer.exec_raw(|conn| checkpoint_wal(conn)).await
    }

    /// Read the entry back on a fresh pooled connection, and if the store
    /// lost it, re-insert from the in-memory copy with bounded retries.
    async fn verify_and_restore(&self, entry: SyncLogEntry) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(LOG_READBACK_DELAY_MS)).await;
        if self.repository.find_by_id(&entry.id)?.is_some() {
            return Ok(());
        }

        log::warn!(
            "[SyncLog] Entry {} missing after commit, restoring from memory",
            entry.id
        );
        entry.validate()?;

        for attempt in 0..LOG_RESTORE_MAX_ATTEMPTS {
            let restore = entry.clone();
            let restored = self
                .writer
                .exec(move |conn| SyncLogRepository::insert_if_absent(conn, restore))
                .await;
            if let Err(e) = restored {
                log::warn!(
                    "[SyncLog] Restore attempt {} for entry {} failed: {}",
                    attempt + 1,
                    entry.id,
                    e
                );
            } else {
                self.writer.exec_raw(|conn| checkpoint_wal(conn)).await?;
                if self.repository.find_by_id(&entry.id)?.is_some() {
                    log::info!("[SyncLog] Entry {} restored", entry.id);
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(backoff_ms(attempt))).await;
        }

        log::warn!(
            "[SyncLog] Entry {} could not be restored after {} attempts, backup copy remains at {}",
            entry.id,
            LOG_RESTORE_MAX_ATTEMPTS,
            self.backup.path().display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    use crate::db::{create_pool, init, run_migrations, write_actor::spawn_writer};

    fn setup() -> (SyncLogRecorder, SyncLogRepository, LogBackup) {
        let app_data = tempdir()
            .expect("tempdir")
            .keep()
            .to_string_lossy()
            .to_string();
        let db_path = init(&app_data).expect("init db");
        run_migrations(&db_path).expect("migrate db");
        let pool = create_pool(&db_path).expect("create pool");
        let writer = spawn_writer(pool.as_ref().clone());
        let backup = LogBackup::new(format!("{}/sync_log_backup.jsonl", app_data));
        let recorder = SyncLogRecorder::new(
            pool.clone(),
            writer,
            backup.clone(),
            "attempt-1",
            "acme",
            "95278",
        );
        (recorder, SyncLogRepository::new(pool), backup)
    }

    #[tokio::test]
    async fn lifecycle_produces_one_started_and_one_terminal_entry() {
        let (recorder, repository, _backup) = setup();

        recorder.started("Sync started").await;
        recorder.progress("100 records written", 100).await;
        recorder.completed("Sync completed", 250, 1800).await;

        let entries = repository.list_for_attempt("attempt-1").expect("list");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].phase, SyncPhase::Started);
        assert_eq!(entries[2].phase, SyncPhase::Completed);
        assert_eq!(entries[2].records_synced, 250);
        assert_eq!(entries[2].duration_ms, Some(1800));
        assert!(repository
            .attempt_is_well_formed("attempt-1")
            .expect("well formed"));
    }

    #[tokio::test]
    async fn error_and_success_events_are_non_terminal() {
        let (recorder, repository, _backup) = setup();

        recorder.started("Sync started").await;
        recorder
            .error("Window query degraded", "gateway returned a partial page")
            .await;
        recorder.success("Backup entry restored").await;

        let entries = repository.list_for_attempt("attempt-1").expect("list");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].level, SyncLogLevel::Error);
        assert_eq!(entries[1].phase, SyncPhase::InProgress);
        assert_eq!(
            entries[1].details.as_deref(),
            Some("gateway returned a partial page")
        );
        assert_eq!(entries[2].level, SyncLogLevel::Success);
        assert!(!entries[2].phase.is_terminal());
        // No terminal entry was produced by either event.
        assert!(repository
            .terminal_for_attempt("attempt-1")
            .expect("terminal")
            .is_none());
    }

    #[tokio::test]
    async fn every_entry_lands_in_the_backup_before_the_store() {
        let (recorder, repository, backup) = setup();

        recorder.started("Sync started").await;
        recorder
            .failed(
                "Sync failed",
                SyncErrorCode::Connection,
                "gateway unreachable",
                0,
                90,
            )
            .await;

        let backed_up = backup.read_all().expect("read backup");
        let stored = repository.list_for_attempt("attempt-1").expect("list");
        assert_eq!(backed_up.len(), 2);
        assert_eq!(stored.len(), 2);
        assert_eq!(backed_up[1].error_code.as_deref(), Some("connection"));
        assert_eq!(backed_up[1].id, stored[1].id);
    }

    #[tokio::test]
    async fn restore_recovers_an_entry_deleted_behind_the_recorder() {
        let (recorder, repository, _backup) = setup();

        recorder.started("Sync started").await;
        let entry = repository
            .list_for_attempt("attempt-1")
            .expect("list")
            .pop()
            .expect("entry");

        // Simulate the primary store losing the row after commit.
        let lost = entry.id.clone();
        recorder
            .writer
            .exec(move |conn| {
                use crate::schema::sync_logs::dsl::*;
                use diesel::prelude::*;
                diesel::delete(sync_logs.filter(id.eq(lost)))
                    .execute(conn)
                    .map_err(crate::errors::StorageError::from)?;
                Ok(())
            })
            .await
            .expect("delete");
        assert!(repository.find_by_id(&entry.id).expect("find").is_none());

        recorder
            .verify_and_restore(entry.clone())
            .await
            .expect("restore");
        assert!(repository.find_by_id(&entry.id).expect("find").is_some());
    }
}
