//! Repository for sync log entries.

use chrono::{Duration, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use ledgersync_core::errors::Result;
use ledgersync_core::sync::{SyncLogEntry, SyncPhase};

use crate::db::{get_connection, DbPool};
use crate::errors::StorageError;
use crate::schema::sync_logs;

use super::model::SyncLogEntryDB;

pub struct SyncLogRepository {
    pool: Arc<DbPool>,
}

impl SyncLogRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Insert one entry on the caller's connection (the recorder wraps this
    /// in a writer transaction; replay uses insert-if-absent instead).
    pub fn insert(conn: &mut SqliteConnection, entry: SyncLogEntry) -> Result<()> {
        let row = SyncLogEntryDB::from(entry);
        diesel::insert_into(sync_logs::table)
            .values(&row)
            .execute(conn)
            .map_err(StorageError::from)?;
        Ok(())
    }

    /// Insert-if-absent variant used by auto-restore and offline replay.
    /// Returns true when the row was actually inserted.
    pub fn insert_if_absent(conn: &mut SqliteConnection, entry: SyncLogEntry) -> Result<bool> {
        let row = SyncLogEntryDB::from(entry);
        let inserted = diesel::insert_or_ignore_into(sync_logs::table)
            .values(&row)
            .execute(conn)
            .map_err(StorageError::from)?;
        Ok(inserted > 0)
    }

    /// Read one entry by id on a fresh pooled connection. The recorder's
    /// read-back verification must not reuse the connection that wrote the
    /// row, or it would observe its own uncommitted cache.
    pub fn find_by_id(&self, id: &str) -> Result<Option<SyncLogEntry>> {
        let mut conn = get_connection(&self.pool)?;
        let row = sync_logs::table
            .find(id)
            .first::<SyncLogEntryDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(SyncLogEntry::try_from).transpose()
    }

    /// All entries of one attempt, causally ordered. Timestamps from a
    /// coarse clock can collide, so the time-ordered id is the tiebreak.
    pub fn list_for_attempt(&self, attempt_id: &str) -> Result<Vec<SyncLogEntry>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = sync_logs::table
            .filter(sync_logs::attempt_id.eq(attempt_id))
            .order((sync_logs::timestamp.asc(), sync_logs::id.asc()))
            .load::<SyncLogEntryDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(SyncLogEntry::try_from).collect()
    }

    /// All entries for one company revision, newest first. Read-only;
    /// consumed by the progress-polling API and the reporting layer.
    pub fn list_for_revision(
        &self,
        company_id: &str,
        revision_id: &str,
        limit: i64,
    ) -> Result<Vec<SyncLogEntry>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = sync_logs::table
            .filter(sync_logs::company_id.eq(company_id))
            .filter(sync_logs::revision_id.eq(revision_id))
            .order((sync_logs::timestamp.desc(), sync_logs::id.desc()))
            .limit(limit)
            .load::<SyncLogEntryDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(SyncLogEntry::try_from).collect()
    }

    /// Terminal entry of one attempt, if any.
    pub fn terminal_for_attempt(&self, attempt_id: &str) -> Result<Option<SyncLogEntry>> {
        Ok(self
            .list_for_attempt(attempt_id)?
            .into_iter()
            .filter(|entry| entry.phase.is_terminal())
            .next_back())
    }

    /// Age-based retention, run by maintenance outside the sync path.
    pub fn prune_older_than(conn: &mut SqliteConnection, days: i64) -> Result<usize> {
        let cutoff = (Utc::now() - Duration::days(days)).to_rfc3339();
        let deleted = diesel::delete(sync_logs::table.filter(sync_logs::timestamp.lt(cutoff)))
            .execute(conn)
            .map_err(StorageError::from)?;
        Ok(deleted)
    }

    /// True when the attempt has exactly one started entry and exactly one
    /// terminal entry, with the terminal entry last.
    pub fn attempt_is_well_formed(&self, attempt_id: &str) -> Result<bool> {
        let entries = self.list_for_attempt(attempt_id)?;
        let started = entries
            .iter()
            .filter(|e| e.phase == SyncPhase::Started)
            .count();
        let terminal = entries.iter().filter(|e| e.phase.is_terminal()).count();
        let last_is_terminal = entries.last().map(|e| e.phase.is_terminal()).unwrap_or(false);
        Ok(started == 1 && terminal == 1 && last_is_terminal)
    }
}
