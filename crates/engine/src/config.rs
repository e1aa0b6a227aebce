//! Engine configuration.

use serde::{Deserialize, Serialize};

use ledgersync_connector::GatewayConfig;
use ledgersync_core::sync::{BATCH_SIZE, PROGRESS_LOG_EVERY_N_BATCHES};

pub const LOG_BACKUP_FILE_NAME: &str = "sync_log_backup.jsonl";

/// Runtime configuration for the sync engine. Deserialized from the host
/// application's settings; every field has a sensible default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Directory holding the SQLite database and the log backup file.
    pub app_data_dir: String,
    /// Gateway the remote source is reached through.
    pub gateway: GatewayConfig,
    /// Rows per write transaction.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Emit an in-progress log entry every N committed batches.
    #[serde(default = "default_progress_every")]
    pub progress_log_every_n_batches: u32,
}

fn default_batch_size() -> usize {
    BATCH_SIZE
}

fn default_progress_every() -> u32 {
    PROGRESS_LOG_EVERY_N_BATCHES
}

impl EngineConfig {
    pub fn new(app_data_dir: &str, gateway_base_url: &str) -> Self {
        Self {
            app_data_dir: app_data_dir.to_string(),
            gateway: GatewayConfig::new(gateway_base_url),
            batch_size: BATCH_SIZE,
            progress_log_every_n_batches: PROGRESS_LOG_EVERY_N_BATCHES,
        }
    }

    /// Path of the JSONL side-channel the log recorder appends to.
    pub fn log_backup_path(&self) -> String {
        format!("{}/{}", self.app_data_dir, LOG_BACKUP_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"appDataDir": "/tmp/ledgersync", "gateway": {"baseUrl": "http://localhost:8700"}}"#,
        )
        .expect("deserialize");
        assert_eq!(config.batch_size, BATCH_SIZE);
        assert_eq!(
            config.progress_log_every_n_batches,
            PROGRESS_LOG_EVERY_N_BATCHES
        );
        assert_eq!(
            config.log_backup_path(),
            "/tmp/ledgersync/sync_log_backup.jsonl"
        );
    }
}
