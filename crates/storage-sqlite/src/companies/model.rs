//! Database model for company revisions.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use ledgersync_core::errors::{Error, Result};
use ledgersync_core::ledger::{Company, CompanySyncStatus};

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(primary_key(company_id, revision_id))]
#[diesel(table_name = crate::schema::companies)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CompanyDB {
    pub company_id: String,
    pub revision_id: String,
    pub name: String,
    pub connector_ref: String,
    pub status: String,
    pub record_count: i64,
    pub last_synced_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

fn status_from_db(value: &str) -> Result<CompanySyncStatus> {
    serde_json::from_str(&format!("\"{}\"", value))
        .map_err(|_| Error::Data(format!("Unknown company sync status '{}'", value)))
}

pub fn status_to_db(status: &CompanySyncStatus) -> String {
    status.as_str().to_string()
}

impl TryFrom<CompanyDB> for Company {
    type Error = Error;

    fn try_from(db: CompanyDB) -> Result<Self> {
        Ok(Company {
            company_id: db.company_id,
            revision_id: db.revision_id,
            name: db.name,
            connector_ref: db.connector_ref,
            status: status_from_db(&db.status)?,
            record_count: db.record_count,
            last_synced_at: db.last_synced_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_db_strings() {
        for status in [
            CompanySyncStatus::New,
            CompanySyncStatus::Syncing,
            CompanySyncStatus::Synced,
            CompanySyncStatus::Failed,
        ] {
            assert_eq!(status_from_db(&status_to_db(&status)).expect("status"), status);
        }
        assert!(status_from_db("paused").is_err());
    }
}
