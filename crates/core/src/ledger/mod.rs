//! Ledger domain models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sync lifecycle status of one company revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanySyncStatus {
    New,
    Syncing,
    Synced,
    Failed,
}

impl CompanySyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanySyncStatus::New => "new",
            CompanySyncStatus::Syncing => "syncing",
            CompanySyncStatus::Synced => "synced",
            CompanySyncStatus::Failed => "failed",
        }
    }
}

/// One syncable company revision (the unit of synchronization).
///
/// `company_id` is stable across time; `revision_id` changes whenever the
/// source-side dataset is altered. Each (company_id, revision_id) pair is a
/// distinct row, so a source-side alteration shows up as a new syncable
/// entity rather than an update of the old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub company_id: String,
    pub revision_id: String,
    pub name: String,
    /// Selector string handed to the connector gateway (e.g. a DSN or
    /// company-file reference).
    pub connector_ref: String,
    pub status: CompanySyncStatus,
    pub record_count: i64,
    pub last_synced_at: Option<String>,
}

impl Company {
    pub fn new(
        company_id: impl Into<String>,
        revision_id: impl Into<String>,
        name: impl Into<String>,
        connector_ref: impl Into<String>,
    ) -> Self {
        Self {
            company_id: company_id.into(),
            revision_id: normalize_revision_id(&revision_id.into()),
            name: name.into(),
            connector_ref: connector_ref.into(),
            status: CompanySyncStatus::New,
            record_count: 0,
            last_synced_at: None,
        }
    }

    /// Key identifying this revision in the active-sync registry.
    pub fn partition_key(&self) -> (String, String) {
        (self.company_id.clone(), self.revision_id.clone())
    }
}

/// One synchronized ledger row.
///
/// Uniqueness invariant: (company_id, revision_id, txn_id, line_name).
/// Rows are append-only; a re-sync re-derives them and relies on
/// insert-if-absent semantics at the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub company_id: String,
    pub revision_id: String,
    /// Source-assigned transaction (group) identifier.
    pub txn_id: String,
    /// Leaf entry name within the transaction (split line).
    pub line_name: String,
    /// ISO-8601 date (YYYY-MM-DD).
    pub txn_date: String,
    pub txn_type: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub account_name: String,
    pub memo: Option<String>,
}

/// Normalize a revision identifier to a representation-independent form.
///
/// The connector reports revision ids as numbers and the textual rendering is
/// not stable ("95278" vs "95278.0"). Comparing raw strings would silently
/// drop every row of a window, so numeric-looking values with a zero
/// fractional part collapse to their integer rendering before any comparison.
pub fn normalize_revision_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if let Ok(value) = trimmed.parse::<f64>() {
        if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
            return format!("{}", value as i64);
        }
    }
    trimmed.to_string()
}
