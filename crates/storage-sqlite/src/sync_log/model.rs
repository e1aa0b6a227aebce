//! Database model for sync log entries.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use ledgersync_core::errors::{Error, Result};
use ledgersync_core::sync::{SyncLogEntry, SyncLogLevel, SyncPhase};

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = crate::schema::sync_logs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SyncLogEntryDB {
    pub id: String,
    pub attempt_id: String,
    pub company_id: String,
    pub revision_id: String,
    pub level: String,
    pub message: String,
    pub details: Option<String>,
    pub phase: String,
    pub records_synced: i64,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub duration_ms: Option<i64>,
    pub timestamp: String,
}

fn level_from_db(value: &str) -> Result<SyncLogLevel> {
    serde_json::from_str(&format!("\"{}\"", value))
        .map_err(|_| Error::Data(format!("Unknown sync log level '{}'", value)))
}

fn phase_from_db(value: &str) -> Result<SyncPhase> {
    serde_json::from_str(&format!("\"{}\"", value))
        .map_err(|_| Error::Data(format!("Unknown sync phase '{}'", value)))
}

impl From<SyncLogEntry> for SyncLogEntryDB {
    fn from(entry: SyncLogEntry) -> Self {
        Self {
            id: entry.id,
            attempt_id: entry.attempt_id,
            company_id: entry.company_id,
            revision_id: entry.revision_id,
            level: entry.level.as_str().to_string(),
            message: entry.message,
            details: entry.details,
            phase: entry.phase.as_str().to_string(),
            records_synced: entry.records_synced,
            error_code: entry.error_code,
            error_message: entry.error_message,
            duration_ms: entry.duration_ms,
            timestamp: entry.timestamp,
        }
    }
}

impl TryFrom<SyncLogEntryDB> for SyncLogEntry {
    type Error = Error;

    fn try_from(db: SyncLogEntryDB) -> Result<Self> {
        Ok(SyncLogEntry {
            level: level_from_db(&db.level)?,
            phase: phase_from_db(&db.phase)?,
            id: db.id,
            attempt_id: db.attempt_id,
            company_id: db.company_id,
            revision_id: db.revision_id,
            message: db.message,
            details: db.details,
            records_synced: db.records_synced,
            error_code: db.error_code,
            error_message: db.error_message,
            duration_ms: db.duration_ms,
            timestamp: db.timestamp,
        })
    }
}
