//! Tuning constants and retry helpers for the sync engine.

/// Rows buffered per transactional batch insert.
pub const BATCH_SIZE: usize = 5_000;

/// Progress log cadence: one `in_progress` entry every N committed batches.
pub const PROGRESS_LOG_EVERY_N_BATCHES: u32 = 4;

/// Per-attempt deadline for acquiring the exclusive write lock.
pub const WRITE_LOCK_TIMEOUT_MS: u64 = 5_000;

/// Lock-acquisition retries before escalating to a fatal sync error.
pub const WRITE_LOCK_MAX_RETRIES: u32 = 3;

/// Delay before the read-back verification of a just-committed log entry.
pub const LOG_READBACK_DELAY_MS: u64 = 50;

/// Auto-restore attempts for a log entry whose commit was not visible.
pub const LOG_RESTORE_MAX_ATTEMPTS: u32 = 3;

/// Remote connection probe deadline.
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Per-window remote query deadline. Large windows are minutes, not seconds.
pub const QUERY_TIMEOUT_SECS: u64 = 600;

/// Exponential backoff in milliseconds with cap, used between lock retries
/// and log auto-restore attempts.
pub fn backoff_ms(attempt: u32) -> u64 {
    const MAX_EXPONENT: u32 = 6;
    const BASE_DELAY_MS: u64 = 100;

    let capped = attempt.min(MAX_EXPONENT);
    2_u64.pow(capped) * BASE_DELAY_MS
}
