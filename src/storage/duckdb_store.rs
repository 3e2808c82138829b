use std::fs;
use std::path::Path;

use duckdb::Connection;
use log::{info, warn};

use crate::types::{Sample, SessionFeatures};

use super::schema::DatabaseSchema;
use super::{SampleStore, StorageError};

/// DuckDB-backed sample store.
///
/// Batches map to real database transactions, so a crash mid-flush cannot
/// leave a partial session behind.
pub struct DuckDbStore {
    conn: Connection,
    batch: Option<BatchState>,
}

struct BatchState {
    session_id: String,
    rows: usize,
}

impl DuckDbStore {
    pub fn open<P: AsRef<Path>>(path: P, auto_create_dir: bool) -> Result<Self, StorageError> {
        // 确保数据目录存在
        if auto_create_dir {
            if let Some(parent) = path.as_ref().parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
        }

        let conn = Connection::open(path.as_ref())?;
        info!("Database connection established at: {}", path.as_ref().display());

        DatabaseSchema::create_tables(&conn)?;
        Ok(Self { conn, batch: None })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        DatabaseSchema::create_tables(&conn)?;
        Ok(Self { conn, batch: None })
    }

    /// Second handle onto the same database, for the feature worker thread.
    pub fn try_clone(&self) -> Result<Self, StorageError> {
        Ok(Self {
            conn: self.conn.try_clone()?,
            batch: None,
        })
    }

    /// 按写入顺序读取一个会话的全部样本
    pub fn load_session(&self, session_id: &str) -> Result<Vec<Sample>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT x, y, z, recorded_at FROM accelerometer_data
             WHERE session_id = ?
             ORDER BY id",
        )?;

        let rows = stmt.query_map([session_id], |row| {
            Ok(Sample {
                x: row.get(0)?,
                y: row.get(1)?,
                z: row.get(2)?,
                timestamp: row.get(3)?,
            })
        })?;

        let mut samples = Vec::new();
        for row in rows {
            samples.push(row?);
        }

        Ok(samples)
    }

    pub fn save_features(&self, features: &SessionFeatures) -> Result<usize, StorageError> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO session_features
                (session_id, axis, sample_count, mean, std_dev, min_value, max_value, recorded_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )?;

        let mut count = 0;
        for axis in &features.axes {
            stmt.execute(duckdb::params![
                features.session_id,
                axis.axis,
                axis.sample_count as i64,
                axis.mean,
                axis.std_dev,
                axis.min_value,
                axis.max_value,
                features.recorded_at,
            ])?;
            count += 1;
        }

        info!("Saved {} feature rows for session {}", count, features.session_id);
        Ok(count)
    }
}

impl SampleStore for DuckDbStore {
    fn begin_batch(&mut self, session_id: &str) -> Result<(), StorageError> {
        if self.batch.is_some() {
            return Err(StorageError::BatchAlreadyInProgress);
        }

        self.conn.execute_batch("BEGIN TRANSACTION")?;
        self.batch = Some(BatchState {
            session_id: session_id.to_string(),
            rows: 0,
        });
        Ok(())
    }

    fn append_row(&mut self, x: f64, y: f64, z: f64, recorded_at: i64) -> Result<(), StorageError> {
        let batch = self.batch.as_mut().ok_or(StorageError::NoBatchInProgress)?;

        self.conn.execute(
            "INSERT INTO accelerometer_data (x, y, z, recorded_at, session_id)
             VALUES (?, ?, ?, ?, ?)",
            duckdb::params![x, y, z, recorded_at, batch.session_id],
        )?;

        batch.rows += 1;
        Ok(())
    }

    fn commit_batch(&mut self) -> Result<usize, StorageError> {
        let rows = match &self.batch {
            Some(batch) => batch.rows,
            None => return Err(StorageError::NoBatchInProgress),
        };

        // 提交失败时保留 batch 状态，调用方仍可回滚
        self.conn.execute_batch("COMMIT")?;

        if let Some(batch) = self.batch.take() {
            info!("Committed {} rows for session {}", rows, batch.session_id);
        }
        Ok(rows)
    }

    fn rollback_batch(&mut self) -> Result<(), StorageError> {
        let batch = self.batch.take().ok_or(StorageError::NoBatchInProgress)?;

        self.conn.execute_batch("ROLLBACK")?;
        warn!("Rolled back batch of {} rows for session {}", batch.rows, batch.session_id);
        Ok(())
    }
}

#[cfg(test)]
impl DuckDbStore {
    pub fn session_row_count(&self, session_id: &str) -> Result<usize, StorageError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM accelerometer_data WHERE session_id = ?",
            [session_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn feature_row_count(&self, session_id: &str) -> Result<usize, StorageError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM session_features WHERE session_id = ?",
            [session_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
