//! Batch writer: buffers filtered rows and commits them transactionally.

use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

use ledgersync_core::errors::{DatabaseError, Error, Result};
use ledgersync_core::ledger::LedgerEntry;
use ledgersync_core::sync::{backoff_ms, BATCH_SIZE, WRITE_LOCK_MAX_RETRIES, WRITE_LOCK_TIMEOUT_MS};

use crate::db::{DbPool, WriteHandle};

use super::repository::LedgerEntryRepository;

/// Totals reported after the last batch of a sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchWriterStats {
    pub pushed: u64,
    pub inserted: u64,
    pub duplicates: u64,
    pub batches_committed: u32,
}

/// Accumulates filtered rows into fixed-size batches and commits each batch
/// in one writer transaction, holding the exclusive write lock per batch
/// only. Uses insert-if-absent semantics so a window re-run after a crash is
/// safe.
pub struct BatchWriter {
    repo: LedgerEntryRepository,
    writer: WriteHandle,
    company_id: String,
    revision_id: String,
    batch_size: usize,
    lock_timeout_ms: u64,
    lock_max_retries: u32,
    buffer: Vec<LedgerEntry>,
    stats: BatchWriterStats,
    /// Rows already persisted for this revision before the sync started;
    /// part of the expected total in the verification read-back.
    baseline_count: i64,
    verified_first_batch: bool,
}

impl BatchWriter {
    pub fn new(
        pool: Arc<DbPool>,
        writer: WriteHandle,
        company_id: impl Into<String>,
        revision_id: impl Into<String>,
    ) -> Result<Self> {
        Self::with_batch_size(pool, writer, company_id, revision_id, BATCH_SIZE)
    }

    pub fn with_batch_size(
        pool: Arc<DbPool>,
        writer: WriteHandle,
        company_id: impl Into<String>,
        revision_id: impl Into<String>,
        batch_size: usize,
    ) -> Result<Self> {
        let company_id = company_id.into();
        let revision_id = revision_id.into();
        let repo = LedgerEntryRepository::new(pool);
        let baseline_count = repo.count_for_revision(&company_id, &revision_id)?;
        Ok(Self {
            repo,
            writer,
            company_id,
            revision_id,
            batch_size: batch_size.max(1),
            lock_timeout_ms: WRITE_LOCK_TIMEOUT_MS,
            lock_max_retries: WRITE_LOCK_MAX_RETRIES,
            buffer: Vec::with_capacity(batch_size.max(1)),
            stats: BatchWriterStats::default(),
            baseline_count,
            verified_first_batch: false,
        })
    }

    /// Override the per-batch lock-wait budget.
    pub fn with_lock_budget(mut self, timeout_ms: u64, max_retries: u32) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self.lock_max_retries = max_retries.max(1);
        self
    }

    /// Buffer one entry, committing a batch when the buffer fills. Returns
    /// true when a batch was committed by this call.
    pub async fn push(&mut self, entry: LedgerEntry) -> Result<bool> {
        self.buffer.push(entry);
        self.stats.pushed += 1;
        if self.buffer.len() >= self.batch_size {
            self.flush().await?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Commit the buffered rows, if any.
    pub async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.buffer);
        let batch_len = batch.len();
        let inserted = self.commit_with_retry(batch).await?;

        self.stats.inserted += inserted as u64;
        self.stats.duplicates += (batch_len - inserted) as u64;
        self.stats.batches_committed += 1;
        debug!(
            "[Sync] committed batch {} for {}/{}: {} rows ({} new)",
            self.stats.batches_committed, self.company_id, self.revision_id, batch_len, inserted
        );

        if !self.verified_first_batch {
            self.verified_first_batch = true;
            self.verify_first_batch();
        }
        Ok(())
    }

    /// Flush the remainder and return the totals.
    pub async fn finish(mut self) -> Result<BatchWriterStats> {
        self.flush().await?;
        Ok(self.stats)
    }

    pub fn stats(&self) -> BatchWriterStats {
        self.stats
    }

    /// One transactional insert per attempt, bounded by the lock-wait
    /// budget. A timed-out job may still land later from the writer queue;
    /// that is safe because the re-submitted batch is insert-if-absent.
    async fn commit_with_retry(&self, batch: Vec<LedgerEntry>) -> Result<usize> {
        let mut attempt = 0;
        loop {
            let batch_for_attempt = batch.clone();
            let submitted = self.writer.exec(move |conn| {
                LedgerEntryRepository::insert_batch(conn, batch_for_attempt)
            });
            match tokio::time::timeout(Duration::from_millis(self.lock_timeout_ms), submitted)
                .await
            {
                Ok(result) => return result,
                Err(_) => {
                    attempt += 1;
                    if attempt >= self.lock_max_retries {
                        return Err(Error::Database(DatabaseError::LockTimeout {
                            attempts: attempt,
                        }));
                    }
                    warn!(
                        "[Sync] batch commit for {}/{} timed out waiting for the write lock (attempt {}/{})",
                        self.company_id, self.revision_id, attempt, self.lock_max_retries
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms(attempt))).await;
                }
            }
        }
    }

    /// Read-back check after the first batch of the sync: count rows for the
    /// partition and warn (never abort) when the observed count diverges
    /// from the expected running total. Catches silent insert failures
    /// early.
    fn verify_first_batch(&self) {
        let expected = self.baseline_count + self.stats.inserted as i64;
        match self
            .repo
            .count_for_revision(&self.company_id, &self.revision_id)
        {
            Ok(observed) if observed == expected => {}
            Ok(observed) => {
                warn!(
                    "[Sync] first-batch verification for {}/{} observed {} rows, expected {}",
                    self.company_id, self.revision_id, observed, expected
                );
            }
            Err(err) => {
                warn!(
                    "[Sync] first-batch verification read failed for {}/{}: {}",
                    self.company_id, self.revision_id, err
                );
            }
        }
    }
}
