pub mod duckdb_store;
pub mod schema;

pub use duckdb_store::DuckDbStore;

use chrono::Utc;

/// Storage errors surfaced by the sample store
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] duckdb::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no batch in progress")]
    NoBatchInProgress,
    #[error("batch already in progress")]
    BatchAlreadyInProgress,
}

/// Transactional sink for session samples.
///
/// One session flush maps to exactly one `begin_batch` / `append_row`* /
/// `commit_batch` cycle, or `rollback_batch` on failure. Either every
/// appended row becomes durable or none does.
pub trait SampleStore {
    fn begin_batch(&mut self, session_id: &str) -> Result<(), StorageError>;
    fn append_row(&mut self, x: f64, y: f64, z: f64, recorded_at: i64) -> Result<(), StorageError>;
    fn commit_batch(&mut self) -> Result<usize, StorageError>;
    fn rollback_batch(&mut self) -> Result<(), StorageError>;
}

pub fn generate_session_id() -> String {
    format!("session_{}", Utc::now().format("%Y%m%d_%H%M%S"))
}
