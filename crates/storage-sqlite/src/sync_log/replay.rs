//! Offline replay of the JSONL log backup into the primary store.
//!
//! Run after a crash or a restore from a stale database file. The replay is
//! idempotent: entries already present in `sync_logs` are counted and left
//! untouched, everything else is inserted with insert-if-absent.

use ledgersync_core::errors::Result;

use crate::db::{checkpoint_wal, WriteHandle};

use super::backup::LogBackup;
use super::repository::SyncLogRepository;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Valid lines read from the backup file.
    pub scanned: usize,
    /// Entries inserted into the store by this replay.
    pub replayed: usize,
    /// Entries the store already had.
    pub already_present: usize,
    /// Entries skipped because they failed validation.
    pub invalid: usize,
}

/// Replay every backed-up entry into `sync_logs`.
pub async fn replay_backup(backup: &LogBackup, writer: &WriteHandle) -> Result<ReplaySummary> {
    let entries = backup.read_all()?;
    let mut summary = ReplaySummary {
        scanned: entries.len(),
        ..ReplaySummary::default()
    };

    for entry in entries {
        if let Err(e) = entry.validate() {
            log::warn!("[SyncLog] Skipping invalid backup entry: {}", e);
            summary.invalid += 1;
            continue;
        }
        let inserted = writer
            .exec(move |conn| SyncLogRepository::insert_if_absent(conn, entry))
            .await?;
        if inserted {
            summary.replayed += 1;
        } else {
            summary.already_present += 1;
        }
    }

    if summary.replayed > 0 {
        writer.exec_raw(|conn| checkpoint_wal(conn)).await?;
    }
    log::info!(
        "[SyncLog] Replay finished: {} scanned, {} replayed, {} already present, {} invalid",
        summary.scanned,
        summary.replayed,
        summary.already_present,
        summary.invalid
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    use ledgersync_core::sync::{SyncLogEntry, SyncLogLevel, SyncPhase};

    use crate::db::{create_pool, init, run_migrations, write_actor::spawn_writer, DbPool};

    fn setup() -> (Arc<DbPool>, WriteHandle, LogBackup) {
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
        (pool, writer, backup)
    }

    fn entry(phase: SyncPhase, message: &str) -> SyncLogEntry {
        SyncLogEntry::new("a1", "acme", "95278", SyncLogLevel::Info, phase, message)
    }

    #[tokio::test]
    async fn replay_restores_missing_entries_and_skips_present_ones() {
        let (pool, writer, backup) = setup();
        let repository = SyncLogRepository::new(pool);

        let present = entry(SyncPhase::Started, "start");
        let missing = entry(SyncPhase::Completed, "done");
        backup.append(&present).expect("append");
        backup.append(&missing).expect("append");

        // Only the first entry made it to the store before the crash.
        let stored = present.clone();
        writer
            .exec(move |conn| SyncLogRepository::insert(conn, stored))
            .await
            .expect("insert");

        let summary = replay_backup(&backup, &writer).await.expect("replay");
        assert_eq!(summary.scanned, 2);
        assert_eq!(summary.replayed, 1);
        assert_eq!(summary.already_present, 1);
        assert_eq!(summary.invalid, 0);
        assert!(repository.find_by_id(&missing.id).expect("find").is_some());

        // Second replay is a no-op.
        let again = replay_backup(&backup, &writer).await.expect("replay");
        assert_eq!(again.replayed, 0);
        assert_eq!(again.already_present, 2);
    }

    #[tokio::test]
    async fn replay_skips_entries_that_fail_validation() {
        let (_pool, writer, backup) = setup();

        let mut bad = entry(SyncPhase::Started, "start");
        bad.timestamp = "not a timestamp".into();
        backup.append(&bad).expect("append");

        let summary = replay_backup(&backup, &writer).await.expect("replay");
        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.invalid, 1);
        assert_eq!(summary.replayed, 0);
    }
}
