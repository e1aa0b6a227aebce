//! One sync attempt, driven phase by phase.
//!
//! `Idle → Connecting → Windowing → (Fetching → Filtering → Writing)* →
//! Finalizing → Completed | Failed`. Any fatal error jumps straight to
//! Failed: the company row is marked failed and a single terminal log entry
//! carries the classified code. The attempt never panics outward; callers
//! always get a structured [`SyncOutcome`].

use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Instant;

use ledgersync_core::errors::{Result, SyncErrorCode};
use ledgersync_core::ledger::{Company, CompanySyncStatus};
use ledgersync_core::sync::{plan_windows, RemoteRecordSource, RevisionFilter};
use ledgersync_storage_sqlite::db::{DbPool, WriteHandle};
use ledgersync_storage_sqlite::records::{BatchWriter, LedgerEntryRepository};
use ledgersync_storage_sqlite::sync_log::{LogBackup, SyncLogRecorder};
use ledgersync_storage_sqlite::CompanyRepository;

/// Current phase, for diagnostics only; transitions are linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncState {
    Idle,
    Connecting,
    Windowing,
    Fetching,
    Filtering,
    Writing,
    Finalizing,
    Completed,
    Failed,
}

impl SyncState {
    fn as_str(&self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::Connecting => "connecting",
            SyncState::Windowing => "windowing",
            SyncState::Fetching => "fetching",
            SyncState::Filtering => "filtering",
            SyncState::Writing => "writing",
            SyncState::Finalizing => "finalizing",
            SyncState::Completed => "completed",
            SyncState::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Completed,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Completed => "completed",
            SyncStatus::Failed => "failed",
        }
    }
}

/// Structured result of one attempt, mirrored by the terminal log entry.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub attempt_id: String,
    pub company_id: String,
    pub revision_id: String,
    pub status: SyncStatus,
    /// Rows actually inserted by this attempt (duplicates excluded).
    pub records_synced: i64,
    pub duration_ms: i64,
    pub error_code: Option<SyncErrorCode>,
    pub error_message: Option<String>,
}

pub(crate) struct Orchestrator {
    source: Arc<dyn RemoteRecordSource>,
    pool: Arc<DbPool>,
    writer: WriteHandle,
    companies: CompanyRepository,
    recorder: SyncLogRecorder,
    company: Company,
    from: NaiveDate,
    to: NaiveDate,
    batch_size: usize,
    progress_every: u32,
    state: SyncState,
    /// Rows committed so far; reported by the terminal entry even when the
    /// attempt fails mid-span.
    records_so_far: i64,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        source: Arc<dyn RemoteRecordSource>,
        pool: Arc<DbPool>,
        writer: WriteHandle,
        backup: LogBackup,
        attempt_id: String,
        company: Company,
        from: NaiveDate,
        to: NaiveDate,
        batch_size: usize,
        progress_every: u32,
    ) -> Self {
        let recorder = SyncLogRecorder::new(
            pool.clone(),
            writer.clone(),
            backup,
            attempt_id,
            company.company_id.clone(),
            company.revision_id.clone(),
        );
        let companies = CompanyRepository::new(pool.clone(), writer.clone());
        Self {
            source,
            pool,
            writer,
            companies,
            recorder,
            company,
            from,
            to,
            batch_size,
            progress_every,
            state: SyncState::Idle,
            records_so_far: 0,
        }
    }

    fn enter(&mut self, state: SyncState) {
        debug!(
            "[Sync] {} revision {}: {} -> {}",
            self.company.company_id,
            self.company.revision_id,
            self.state.as_str(),
            state.as_str()
        );
        self.state = state;
    }

    /// Run the attempt to a terminal state.
    pub(crate) async fn run(mut self) -> SyncOutcome {
        let started_at = Instant::now();
        info!(
            "[Sync] Starting sync for company {} revision {} ({} to {})",
            self.company.company_id, self.company.revision_id, self.from, self.to
        );
        self.recorder
            .started(format!(
                "Sync started for {} ({} to {})",
                self.company.name, self.from, self.to
            ))
            .await;
        let _ = self
            .companies
            .upsert_sync_state(
                self.company.clone(),
                CompanySyncStatus::Syncing,
                self.company.record_count,
                self.company.last_synced_at.clone(),
            )
            .await;

        match self.run_phases().await {
            Ok(records_synced) => {
                self.enter(SyncState::Completed);
                let duration_ms = started_at.elapsed().as_millis() as i64;
                let total = self.finalize_company(CompanySyncStatus::Synced).await;
                self.recorder
                    .completed(
                        format!(
                            "Sync completed: {} new records, {} total",
                            records_synced, total
                        ),
                        records_synced,
                        duration_ms,
                    )
                    .await;
                info!(
                    "[Sync] Completed sync for {} revision {}: {} new records in {}ms",
                    self.company.company_id, self.company.revision_id, records_synced, duration_ms
                );
                self.outcome(SyncStatus::Completed, records_synced, duration_ms, None)
            }
            Err(err) => {
                self.enter(SyncState::Failed);
                let duration_ms = started_at.elapsed().as_millis() as i64;
                let code = err.sync_error_code();
                let message = err.to_string();
                warn!(
                    "[Sync] Sync failed for {} revision {} ({}): {}",
                    self.company.company_id,
                    self.company.revision_id,
                    code.as_str(),
                    message
                );
                self.finalize_company(CompanySyncStatus::Failed).await;
                self.recorder
                    .failed(
                        "Sync failed",
                        code,
                        message.clone(),
                        self.records_so_far,
                        duration_ms,
                    )
                    .await;
                self.outcome(
                    SyncStatus::Failed,
                    self.records_so_far,
                    duration_ms,
                    Some((code, message)),
                )
            }
        }
    }

    /// Connecting through Writing. Returns the count of newly inserted rows.
    async fn run_phases(&mut self) -> Result<i64> {
        self.enter(SyncState::Connecting);
        self.source
            .check_connection(&self.company.connector_ref)
            .await?;

        self.enter(SyncState::Windowing);
        let windows = plan_windows(self.from, self.to)?;
        self.recorder
            .info(format!(
                "Planned {} windows covering {} to {}",
                windows.len(),
                self.from,
                self.to
            ))
            .await;

        let mut filter = RevisionFilter::new(&self.company.revision_id);
        let mut batch_writer = BatchWriter::with_batch_size(
            self.pool.clone(),
            self.writer.clone(),
            self.company.company_id.clone(),
            self.company.revision_id.clone(),
            self.batch_size,
        )?;
        let mut last_reported_batches = 0u32;

        for (index, window) in windows.iter().enumerate() {
            self.enter(SyncState::Fetching);
            debug!(
                "[Sync] Window {}/{}: {} to {}",
                index + 1,
                windows.len(),
                window.start,
                window.end
            );
            let rows = self
                .source
                .fetch_window(&self.company.connector_ref, &self.company.company_id, window)
                .await?;

            self.enter(SyncState::Filtering);
            let mut kept = Vec::with_capacity(rows.len());
            for row in rows {
                if filter.accept(&row) {
                    kept.push(row);
                }
            }

            self.enter(SyncState::Writing);
            for row in kept {
                let committed = batch_writer.push(row).await?;
                if committed {
                    let stats = batch_writer.stats();
                    self.records_so_far = stats.inserted as i64;
                    if stats.batches_committed >= last_reported_batches + self.progress_every {
                        last_reported_batches = stats.batches_committed;
                        self.recorder
                            .progress(
                                format!(
                                    "Window {}/{}: {} records written so far",
                                    index + 1,
                                    windows.len(),
                                    stats.inserted
                                ),
                                stats.inserted as i64,
                            )
                            .await;
                    }
                }
            }

            let summary = filter.summary();
            if summary.dropped > 0 {
                self.recorder
                    .info(format!(
                        "Window {}/{}: filtered out {} of {} rows belonging to other revisions",
                        index + 1,
                        windows.len(),
                        summary.dropped,
                        summary.kept + summary.dropped
                    ))
                    .await;
            }
            filter.reset();
        }

        self.enter(SyncState::Finalizing);
        let stats = batch_writer.finish().await?;
        self.records_so_far = stats.inserted as i64;
        Ok(stats.inserted as i64)
    }

    /// Upsert the company row at the attempt boundary. Best effort on the
    /// failure path so a store problem cannot mask the original error.
    async fn finalize_company(&self, status: CompanySyncStatus) -> i64 {
        let repo = LedgerEntryRepository::new(self.pool.clone());
        let total = repo
            .count_for_revision(&self.company.company_id, &self.company.revision_id)
            .unwrap_or(self.company.record_count);
        let last_synced_at = match status {
            CompanySyncStatus::Synced => Some(Utc::now().to_rfc3339()),
            _ => self.company.last_synced_at.clone(),
        };
        if let Err(e) = self
            .companies
            .upsert_sync_state(self.company.clone(), status, total, last_synced_at)
            .await
        {
            warn!(
                "[Sync] Could not update company state for {} revision {}: {}",
                self.company.company_id, self.company.revision_id, e
            );
        }
        total
    }

    fn outcome(
        &self,
        status: SyncStatus,
        records_synced: i64,
        duration_ms: i64,
        error: Option<(SyncErrorCode, String)>,
    ) -> SyncOutcome {
        let (error_code, error_message) = match error {
            Some((code, message)) => (Some(code), Some(message)),
            None => (None, None),
        };
        SyncOutcome {
            attempt_id: self.recorder.attempt_id().to_string(),
            company_id: self.company.company_id.clone(),
            revision_id: self.company.revision_id.clone(),
            status,
            records_synced,
            duration_ms,
            error_code,
            error_message,
        }
    }
}
