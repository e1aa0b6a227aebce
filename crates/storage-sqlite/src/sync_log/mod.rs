mod backup;
mod model;
mod recorder;
mod replay;
mod repository;

pub use backup::LogBackup;
pub use recorder::SyncLogRecorder;
pub use replay::{replay_backup, ReplaySummary};
pub use repository::SyncLogRepository;
