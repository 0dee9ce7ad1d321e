use crate::domain::models::ScheduleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Store error: {0}")]
    Store(String),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error("Confirmation required: {action} would discard content of blocks {}", block_ids.join(","))]
    ConfirmationRequired {
        action: String,
        block_ids: Vec<String>,
    },
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
