pub mod connection;
pub mod scrapes;
pub mod snapshots;

pub use connection::Database;
pub use scrapes::{get_recent_runs, RunJournal, RunStats};
pub use snapshots::{JsonSnapshotStore, SnapshotStore, SqliteSnapshotStore};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no saved snapshot")]
    NotFound,
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}
