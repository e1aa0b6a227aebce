//! Repository for company revisions.

use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use ledgersync_core::errors::Result;
use ledgersync_core::ledger::{Company, CompanySyncStatus};

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::companies;

use super::model::{status_to_db, CompanyDB};

pub struct CompanyRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl CompanyRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    pub fn get(&self, company_id: &str, revision_id: &str) -> Result<Option<Company>> {
        let mut conn = get_connection(&self.pool)?;
        let row = companies::table
            .find((company_id, revision_id))
            .first::<CompanyDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(Company::try_from).transpose()
    }

    /// All known revisions, newest sync first. Read-only; consumed by the
    /// reporting layer.
    pub fn list(&self) -> Result<Vec<Company>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = companies::table
            .order((companies::company_id.asc(), companies::updated_at.desc()))
            .load::<CompanyDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(Company::try_from).collect()
    }

    /// Upsert the revision's summary at a sync phase boundary.
    ///
    /// A revision_id never seen before for a known company_id inserts a new
    /// row rather than touching the old revision; that is how a source-side
    /// alteration becomes a distinct syncable entity.
    pub async fn upsert_sync_state(
        &self,
        company: Company,
        status: CompanySyncStatus,
        record_count: i64,
        last_synced_at: Option<String>,
    ) -> Result<()> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| {
                let now = Utc::now().to_rfc3339();
                let row = CompanyDB {
                    company_id: company.company_id.clone(),
                    revision_id: company.revision_id.clone(),
                    name: company.name.clone(),
                    connector_ref: company.connector_ref.clone(),
                    status: status_to_db(&status),
                    record_count,
                    last_synced_at: last_synced_at.clone(),
                    created_at: now.clone(),
                    updated_at: now.clone(),
                };

                diesel::insert_into(companies::table)
                    .values(&row)
                    .on_conflict((companies::company_id, companies::revision_id))
                    .do_update()
                    .set((
                        companies::status.eq(status_to_db(&status)),
                        companies::record_count.eq(record_count),
                        companies::last_synced_at.eq(last_synced_at),
                        companies::updated_at.eq(now),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    use crate::db::{create_pool, init, run_migrations, write_actor::spawn_writer};

    fn setup_repo() -> CompanyRepository {
        let app_data = tempdir()
            .expect("tempdir")
            .keep()
            .to_string_lossy()
            .to_string();
        let db_path = init(&app_data).expect("init db");
        run_migrations(&db_path).expect("migrate db");
        let pool = create_pool(&db_path).expect("create pool");
        let writer = spawn_writer(pool.as_ref().clone());
        CompanyRepository::new(pool, writer)
    }

    fn company(revision_id: &str) -> Company {
        Company::new("acme", revision_id, "Acme Ltd", "dsn://acme")
    }

    #[tokio::test]
    async fn upsert_inserts_then_updates_in_place() {
        let repo = setup_repo();

        repo.upsert_sync_state(company("95278"), CompanySyncStatus::Syncing, 0, None)
            .await
            .expect("insert");
        let stored = repo.get("acme", "95278").expect("get").expect("present");
        assert_eq!(stored.status, CompanySyncStatus::Syncing);
        assert_eq!(stored.record_count, 0);

        let synced_at = Utc::now().to_rfc3339();
        repo.upsert_sync_state(
            company("95278"),
            CompanySyncStatus::Synced,
            320,
            Some(synced_at.clone()),
        )
        .await
        .expect("update");

        let stored = repo.get("acme", "95278").expect("get").expect("present");
        assert_eq!(stored.status, CompanySyncStatus::Synced);
        assert_eq!(stored.record_count, 320);
        assert_eq!(stored.last_synced_at, Some(synced_at));
        assert_eq!(repo.list().expect("list").len(), 1);
    }

    #[tokio::test]
    async fn new_revision_of_same_company_is_a_new_row() {
        let repo = setup_repo();

        repo.upsert_sync_state(
            company("95278"),
            CompanySyncStatus::Synced,
            320,
            Some(Utc::now().to_rfc3339()),
        )
        .await
        .expect("first revision");
        repo.upsert_sync_state(company("102209"), CompanySyncStatus::Syncing, 0, None)
            .await
            .expect("second revision");

        let all = repo.list().expect("list");
        assert_eq!(all.len(), 2);
        let old = repo.get("acme", "95278").expect("get").expect("present");
        assert_eq!(old.record_count, 320, "old revision untouched");
    }

    #[tokio::test]
    async fn get_missing_revision_is_none() {
        let repo = setup_repo();
        assert!(repo.get("acme", "404").expect("get").is_none());
    }
}
