//! Sync log domain model.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Error, Result, SyncErrorCode};

/// Severity of one sync log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncLogLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl SyncLogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncLogLevel::Info => "info",
            SyncLogLevel::Warning => "warning",
            SyncLogLevel::Error => "error",
            SyncLogLevel::Success => "success",
        }
    }
}

/// Phase of the sync attempt an event belongs to. Every attempt produces
/// exactly one `started` entry and exactly one terminal entry (`completed`
/// xor `failed`), with zero or more `in_progress` entries between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Started,
    InProgress,
    Completed,
    Failed,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Started => "started",
            SyncPhase::InProgress => "in_progress",
            SyncPhase::Completed => "completed",
            SyncPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncPhase::Completed | SyncPhase::Failed)
    }
}

/// One immutable row per phase event of one sync attempt.
///
/// The id is a uuid v7, pre-assigned before any store write so the durable
/// backup line and the primary row always agree, and time-ordered so it is a
/// valid tiebreak when clock resolution makes timestamps collide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLogEntry {
    pub id: String,
    pub attempt_id: String,
    pub company_id: String,
    pub revision_id: String,
    pub level: SyncLogLevel,
    pub message: String,
    pub details: Option<String>,
    pub phase: SyncPhase,
    pub records_synced: i64,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub duration_ms: Option<i64>,
    /// UTC, RFC 3339.
    pub timestamp: String,
}

impl SyncLogEntry {
    pub fn new(
        attempt_id: impl Into<String>,
        company_id: impl Into<String>,
        revision_id: impl Into<String>,
        level: SyncLogLevel,
        phase: SyncPhase,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            attempt_id: attempt_id.into(),
            company_id: company_id.into(),
            revision_id: revision_id.into(),
            level,
            message: message.into(),
            details: None,
            phase,
            records_synced: 0,
            error_code: None,
            error_message: None,
            duration_ms: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_records_synced(mut self, records_synced: i64) -> Self {
        self.records_synced = records_synced;
        self
    }

    pub fn with_error(mut self, code: SyncErrorCode, message: impl Into<String>) -> Self {
        self.error_code = Some(code.as_str().to_string());
        self.error_message = Some(message.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: i64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Validate that all fields required to reconstruct this entry in the
    /// primary store are present. Used before an auto-restore re-insert.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::Data("Sync log entry has an empty id".into()));
        }
        if self.attempt_id.trim().is_empty() {
            return Err(Error::Data("Sync log entry has an empty attempt id".into()));
        }
        if self.company_id.trim().is_empty() || self.revision_id.trim().is_empty() {
            return Err(Error::Data(format!(
                "Sync log entry {} has an empty partition reference",
                self.id
            )));
        }
        if chrono::DateTime::parse_from_rfc3339(&self.timestamp).is_err() {
            return Err(Error::Data(format!(
                "Sync log entry {} has a non-RFC3339 timestamp '{}'",
                self.id, self.timestamp
            )));
        }
        Ok(())
    }
}
