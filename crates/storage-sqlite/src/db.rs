//! Connection pool, pragma tuning, migrations and the single-writer actor.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::path::Path;
use std::sync::Arc;

use ledgersync_core::errors::{DatabaseError, Error, Result};

use crate::errors::StorageError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

const DB_FILE_NAME: &str = "ledgersync.db";

/// Store tuning applied on every connection acquire. Running pragmas here
/// guarantees no transaction is open: SQLite rejects journal-mode and some
/// cache pragmas mid-transaction. WAL keeps reporting reads unblocked while
/// a sync batch holds the write lock.
#[derive(Debug, Clone, Copy)]
struct SqlitePragmas;

impl diesel::r2d2::CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute(
            "PRAGMA journal_mode = WAL; \
             PRAGMA synchronous = NORMAL; \
             PRAGMA busy_timeout = 5000; \
             PRAGMA cache_size = -16384; \
             PRAGMA foreign_keys = ON;",
        )
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Ensure the app data directory exists and return the database file path.
pub fn init(app_data_dir: &str) -> Result<String> {
    std::fs::create_dir_all(app_data_dir).map_err(|e| {
        Error::Database(DatabaseError::Internal(format!(
            "Failed to create app data directory '{}': {}",
            app_data_dir, e
        )))
    })?;
    let db_path = Path::new(app_data_dir).join(DB_FILE_NAME);
    Ok(db_path.to_string_lossy().to_string())
}

/// Run pending embedded migrations against the database file.
pub fn run_migrations(db_path: &str) -> Result<()> {
    let mut conn = SqliteConnection::establish(db_path).map_err(|e| {
        Error::Database(DatabaseError::Pool(format!(
            "Failed to open '{}': {}",
            db_path, e
        )))
    })?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| StorageError::Migration(e.to_string()))?;
    Ok(())
}

/// Build the shared connection pool with pragma tuning.
pub fn create_pool(db_path: &str) -> Result<Arc<DbPool>> {
    let manager = ConnectionManager::<SqliteConnection>::new(db_path);
    let pool = Pool::builder()
        .max_size(10)
        .connection_customizer(Box::new(SqlitePragmas))
        .build(manager)
        .map_err(|e| Error::Database(DatabaseError::Pool(e.to_string())))?;
    Ok(Arc::new(pool))
}

/// Get a read connection from the pool.
pub fn get_connection(pool: &Arc<DbPool>) -> Result<DbConnection> {
    pool.get()
        .map_err(|e| Error::Database(DatabaseError::Pool(e.to_string())))
}

#[derive(QueryableByName)]
struct WalCheckpointRow {
    #[diesel(sql_type = diesel::sql_types::Integer)]
    #[allow(dead_code)]
    busy: i32,
    #[diesel(sql_type = diesel::sql_types::Integer)]
    #[allow(dead_code)]
    log: i32,
    #[diesel(sql_type = diesel::sql_types::Integer)]
    #[allow(dead_code)]
    checkpointed: i32,
}

/// Force the write-ahead log to checkpoint so committed rows are visible to
/// other connections, not just buffered in the WAL.
pub fn checkpoint_wal(conn: &mut SqliteConnection) -> Result<()> {
    diesel::sql_query("PRAGMA wal_checkpoint(TRUNCATE)")
        .get_result::<WalCheckpointRow>(conn)
        .map_err(StorageError::from)?;
    Ok(())
}

pub mod write_actor {
    //! All writes to the shared store funnel through one actor thread, so
    //! the exclusive-lock discipline is scoped to exactly one job at a time
    //! and readers keep seeing the last committed snapshot.

    use super::*;

    type WriteJob = Box<dyn FnOnce(std::result::Result<&mut SqliteConnection, StorageError>) + Send>;

    /// Handle for submitting write jobs to the writer thread.
    #[derive(Clone)]
    pub struct WriteHandle {
        tx: tokio::sync::mpsc::UnboundedSender<WriteJob>,
    }

    /// Spawn the writer thread. The thread drains jobs until every
    /// `WriteHandle` clone is dropped.
    pub fn spawn_writer(pool: DbPool) -> WriteHandle {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<WriteJob>();
        std::thread::Builder::new()
            .name("ledgersync-writer".to_string())
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    match pool.get() {
                        Ok(mut conn) => job(Ok(&mut conn)),
                        Err(err) => job(Err(StorageError::from(err))),
                    }
                }
            })
            .expect("failed to spawn writer thread");
        WriteHandle { tx }
    }

    impl WriteHandle {
        /// Run `f` inside one immediate transaction on the writer
        /// connection. The write lock is held for the duration of this job
        /// only.
        pub async fn exec<T, F>(&self, f: F) -> Result<T>
        where
            F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
            T: Send + 'static,
        {
            self.submit(move |conn| conn.immediate_transaction(|conn| f(conn)))
                .await
        }

        /// Run `f` on the writer connection without opening a transaction.
        /// Required for pragmas and WAL checkpoints, which SQLite rejects
        /// mid-transaction.
        pub async fn exec_raw<T, F>(&self, f: F) -> Result<T>
        where
            F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
            T: Send + 'static,
        {
            self.submit(f).await
        }

        async fn submit<T, F>(&self, f: F) -> Result<T>
        where
            F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
            T: Send + 'static,
        {
            let (reply_tx, reply_rx) = tokio::sync::oneshot::channel::<Result<T>>();
            let job: WriteJob = Box::new(move |conn| {
                let result = match conn {
                    Ok(conn) => f(conn),
                    Err(err) => Err(Error::from(err)),
                };
                let _ = reply_tx.send(result);
            });
            self.tx.send(job).map_err(|_| {
                Error::Database(DatabaseError::Internal("Write actor has shut down".into()))
            })?;
            reply_rx.await.map_err(|_| {
                Error::Database(DatabaseError::Internal(
                    "Write actor dropped the reply channel".into(),
                ))
            })?
        }
    }
}

pub use write_actor::WriteHandle;

#[cfg(test)]
mod tests {
    use super::write_actor::spawn_writer;
    use super::*;
    use tempfile::tempdir;

    fn setup_db() -> (Arc<DbPool>, WriteHandle, String) {
        let app_data = tempdir()
            .expect("tempdir")
            .keep()
            .to_string_lossy()
            .to_string();
        let db_path = init(&app_data).expect("init db");
        run_migrations(&db_path).expect("migrate db");
        let pool = create_pool(&db_path).expect("create pool");
        let writer = spawn_writer(pool.as_ref().clone());
        (pool, writer, db_path)
    }

    #[derive(QueryableByName)]
    struct JournalModeRow {
        #[diesel(sql_type = diesel::sql_types::Text)]
        journal_mode: String,
    }

    #[tokio::test]
    async fn pool_connections_run_in_wal_mode() {
        let (pool, _writer, _path) = setup_db();
        let mut conn = get_connection(&pool).expect("conn");
        let row = diesel::sql_query("PRAGMA journal_mode")
            .get_result::<JournalModeRow>(&mut conn)
            .expect("journal mode");
        assert_eq!(row.journal_mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn migrations_create_all_tables() {
        let (pool, _writer, _path) = setup_db();
        let mut conn = get_connection(&pool).expect("conn");
        for table in ["companies", "ledger_entries", "sync_logs"] {
            #[derive(QueryableByName)]
            struct CountRow {
                #[diesel(sql_type = diesel::sql_types::BigInt)]
                c: i64,
            }
            let sql = format!(
                "SELECT COUNT(*) as c FROM sqlite_master WHERE type='table' AND name='{}'",
                table
            );
            let row = diesel::sql_query(sql)
                .get_result::<CountRow>(&mut conn)
                .expect("table exists");
            assert_eq!(row.c, 1, "missing table {table}");
        }
    }

    #[tokio::test]
    async fn writer_commits_and_rolls_back_atomically() {
        let (pool, writer, _path) = setup_db();

        writer
            .exec(|conn| {
                diesel::sql_query(
                    "INSERT INTO companies (company_id, revision_id, name, connector_ref, status, record_count, created_at, updated_at) \
                     VALUES ('c1', 'r1', 'Acme', 'dsn://acme', 'new', 0, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(())
            })
            .await
            .expect("insert");

        let failed: Result<()> = writer
            .exec(|conn| {
                diesel::sql_query(
                    "INSERT INTO companies (company_id, revision_id, name, connector_ref, status, record_count, created_at, updated_at) \
                     VALUES ('c2', 'r1', 'Beta', 'dsn://beta', 'new', 0, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                Err(Error::Database(DatabaseError::Internal("boom".into())))
            })
            .await;
        assert!(failed.is_err());

        #[derive(QueryableByName)]
        struct CountRow {
            #[diesel(sql_type = diesel::sql_types::BigInt)]
            c: i64,
        }
        let mut conn = get_connection(&pool).expect("conn");
        let row = diesel::sql_query("SELECT COUNT(*) as c FROM companies")
            .get_result::<CountRow>(&mut conn)
            .expect("count");
        assert_eq!(row.c, 1, "failed job must roll back");
    }

    #[tokio::test]
    async fn wal_checkpoint_runs_outside_transactions() {
        let (_pool, writer, _path) = setup_db();
        writer
            .exec_raw(|conn| checkpoint_wal(conn))
            .await
            .expect("checkpoint");
    }
}
