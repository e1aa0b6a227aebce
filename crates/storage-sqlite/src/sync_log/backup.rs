//! Durable side-channel backup of sync log entries.
//!
//! Append-only JSONL file, one self-contained record per line including the
//! pre-assigned entry id. Every entry is appended here *before* the primary
//! store commit is attempted, so the backup is a superset of the primary
//! table no matter how the commit went.

use log::warn;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use ledgersync_core::errors::{Error, Result};
use ledgersync_core::sync::SyncLogEntry;

#[derive(Debug, Clone)]
pub struct LogBackup {
    path: PathBuf,
}

impl LogBackup {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry and flush it to disk before returning.
    pub fn append(&self, entry: &SyncLogEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Data(format!("Failed to create backup directory: {}", e)))?;
        }
        let line = serde_json::to_string(entry)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                Error::Data(format!(
                    "Failed to open log backup '{}': {}",
                    self.path.display(),
                    e
                ))
            })?;
        writeln!(file, "{}", line)
            .and_then(|_| file.sync_data())
            .map_err(|e| Error::Data(format!("Failed to append log backup line: {}", e)))?;
        Ok(())
    }

    /// Read every reconstructable entry. Corrupt lines are skipped with a
    /// diagnostic so a torn final write cannot block replay of the rest.
    pub fn read_all(&self) -> Result<Vec<SyncLogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = std::fs::File::open(&self.path).map_err(|e| {
            Error::Data(format!(
                "Failed to open log backup '{}': {}",
                self.path.display(),
                e
            ))
        })?;
        let mut entries = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line =
                line.map_err(|e| Error::Data(format!("Failed to read log backup: {}", e)))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SyncLogEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(err) => {
                    warn!(
                        "[SyncLog] skipping corrupt backup line {} in '{}': {}",
                        index + 1,
                        self.path.display(),
                        err
                    );
                }
            }
        }
        Ok(entries)
    }

    /// Look up one backed-up entry by its pre-assigned id.
    pub fn find(&self, id: &str) -> Result<Option<SyncLogEntry>> {
        Ok(self.read_all()?.into_iter().find(|entry| entry.id == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgersync_core::sync::{SyncLogLevel, SyncPhase};
    use tempfile::tempdir;

    fn entry(message: &str) -> SyncLogEntry {
        SyncLogEntry::new(
            "a1",
            "acme",
            "95278",
            SyncLogLevel::Info,
            SyncPhase::InProgress,
            message,
        )
    }

    #[test]
    fn appends_and_reads_back_in_order() {
        let dir = tempdir().expect("tempdir");
        let backup = LogBackup::new(dir.path().join("sync_log_backup.jsonl"));

        let first = entry("window 1 committed");
        let second = entry("window 2 committed");
        backup.append(&first).expect("append");
        backup.append(&second).expect("append");

        let all = backup.read_all().expect("read");
        assert_eq!(all, vec![first.clone(), second]);
        assert_eq!(backup.find(&first.id).expect("find"), Some(first));
    }

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempdir().expect("tempdir");
        let backup = LogBackup::new(dir.path().join("absent.jsonl"));
        assert!(backup.read_all().expect("read").is_empty());
    }

    #[test]
    fn corrupt_lines_are_skipped() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("sync_log_backup.jsonl");
        let backup = LogBackup::new(path.clone());
        let good = entry("survives");
        backup.append(&good).expect("append");
        std::fs::write(
            &path,
            format!(
                "{}\n{{\"torn\": tru",
                serde_json::to_string(&good).expect("serialize")
            ),
        )
        .expect("write");

        let all = backup.read_all().expect("read");
        assert_eq!(all, vec![good]);
    }
}
