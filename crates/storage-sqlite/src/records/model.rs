//! Database model for ledger entries.

use chrono::Utc;
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use ledgersync_core::errors::{Error, Result};
use ledgersync_core::ledger::LedgerEntry;

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
#[diesel(primary_key(company_id, revision_id, txn_id, line_name))]
#[diesel(table_name = crate::schema::ledger_entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LedgerEntryDB {
    pub company_id: String,
    pub revision_id: String,
    pub txn_id: String,
    pub line_name: String,
    pub txn_date: String,
    pub txn_type: String,
    pub debit: String,
    pub credit: String,
    pub account_name: String,
    pub memo: Option<String>,
    pub created_at: String,
}

impl From<LedgerEntry> for LedgerEntryDB {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            company_id: entry.company_id,
            revision_id: entry.revision_id,
            txn_id: entry.txn_id,
            line_name: entry.line_name,
            txn_date: entry.txn_date,
            txn_type: entry.txn_type,
            debit: entry.debit.to_string(),
            credit: entry.credit.to_string(),
            account_name: entry.account_name,
            memo: entry.memo,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

fn amount_from_db(raw: &str, column: &str) -> Result<Decimal> {
    Decimal::from_str(raw)
        .map_err(|e| Error::Data(format!("Stored {} amount '{}' is invalid: {}", column, raw, e)))
}

impl TryFrom<LedgerEntryDB> for LedgerEntry {
    type Error = Error;

    fn try_from(db: LedgerEntryDB) -> Result<Self> {
        Ok(LedgerEntry {
            debit: amount_from_db(&db.debit, "debit")?,
            credit: amount_from_db(&db.credit, "credit")?,
            company_id: db.company_id,
            revision_id: db.revision_id,
            txn_id: db.txn_id,
            line_name: db.line_name,
            txn_date: db.txn_date,
            txn_type: db.txn_type,
            account_name: db.account_name,
            memo: db.memo,
        })
    }
}
