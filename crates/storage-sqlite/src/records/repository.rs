//! Repository for synchronized ledger entries.

use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use ledgersync_core::errors::Result;
use ledgersync_core::ledger::LedgerEntry;

use crate::db::{get_connection, DbPool};
use crate::errors::StorageError;
use crate::schema::ledger_entries;

use super::model::LedgerEntryDB;

pub struct LedgerEntryRepository {
    pool: Arc<DbPool>,
}

impl LedgerEntryRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Insert one batch with insert-if-absent semantics, keyed on the
    /// (company_id, revision_id, txn_id, line_name) uniqueness invariant.
    /// Re-running a window after a crash silently skips rows that already
    /// landed; the return value is the number of rows actually inserted.
    ///
    /// Runs on the caller-provided connection so the batch writer can wrap
    /// it in exactly one writer transaction.
    pub fn insert_batch(conn: &mut SqliteConnection, batch: Vec<LedgerEntry>) -> Result<usize> {
        let rows: Vec<LedgerEntryDB> = batch.into_iter().map(LedgerEntryDB::from).collect();
        let inserted = diesel::insert_or_ignore_into(ledger_entries::table)
            .values(&rows)
            .execute(conn)
            .map_err(StorageError::from)?;
        Ok(inserted)
    }

    /// Count persisted rows for one company revision.
    pub fn count_for_revision(&self, company_id: &str, revision_id: &str) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        let count = ledger_entries::table
            .filter(ledger_entries::company_id.eq(company_id))
            .filter(ledger_entries::revision_id.eq(revision_id))
            .select(count_star())
            .first::<i64>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(count)
    }

    /// Read entries for one revision, optionally restricted to a date range
    /// (inclusive). Read-only; consumed by the reporting layer.
    pub fn list_for_revision(
        &self,
        company_id: &str,
        revision_id: &str,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Vec<LedgerEntry>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = ledger_entries::table
            .filter(ledger_entries::company_id.eq(company_id))
            .filter(ledger_entries::revision_id.eq(revision_id))
            .into_boxed();
        if let Some(from) = from {
            query = query.filter(ledger_entries::txn_date.ge(from.to_string()));
        }
        if let Some(to) = to {
            query = query.filter(ledger_entries::txn_date.le(to.to_string()));
        }
        let rows = query
            .order((ledger_entries::txn_date.asc(), ledger_entries::txn_id.asc()))
            .load::<LedgerEntryDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(LedgerEntry::try_from).collect()
    }

    /// Explicit maintenance-only deletion; the sync path never deletes.
    pub fn delete_revision(
        conn: &mut SqliteConnection,
        company_id: &str,
        revision_id: &str,
    ) -> Result<usize> {
        let deleted = diesel::delete(
            ledger_entries::table
                .filter(ledger_entries::company_id.eq(company_id))
                .filter(ledger_entries::revision_id.eq(revision_id)),
        )
        .execute(conn)
        .map_err(StorageError::from)?;
        Ok(deleted)
    }
}
