use log::{debug, info};

use crate::storage::{DuckDbStore, StorageError};
use crate::types::{AxisFeatures, SessionFeatures, TimestampSource};

#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("session {0} has no persisted samples")]
    EmptySession(String),
}

/// Builds per-axis summary features for a persisted session and writes
/// them back into the database.
pub struct FeaturesConstructor {
    store: DuckDbStore,
}

impl FeaturesConstructor {
    pub fn new(store: DuckDbStore) -> Self {
        Self { store }
    }

    pub fn construct_features(
        &self,
        session_id: &str,
        timestamp_source: TimestampSource,
    ) -> Result<SessionFeatures, FeatureError> {
        let samples = self.store.load_session(session_id)?;
        if samples.is_empty() {
            return Err(FeatureError::EmptySession(session_id.to_string()));
        }

        if timestamp_source == TimestampSource::FlushTime {
            // 行时间戳是落盘时刻，不能用来估计采样率
            debug!("Session {} rows carry flush-time timestamps", session_id);
        }

        let recorded_at = samples.first().map(|s| s.timestamp).unwrap_or(0);
        let xs: Vec<f64> = samples.iter().map(|s| s.x).collect();
        let ys: Vec<f64> = samples.iter().map(|s| s.y).collect();
        let zs: Vec<f64> = samples.iter().map(|s| s.z).collect();

        let features = SessionFeatures {
            session_id: session_id.to_string(),
            recorded_at,
            axes: vec![
                axis_features("x", &xs),
                axis_features("y", &ys),
                axis_features("z", &zs),
            ],
        };

        self.store.save_features(&features)?;
        info!(
            "Constructed features for session {} ({} samples per axis)",
            session_id,
            samples.len()
        );
        Ok(features)
    }
}

fn axis_features(axis: &str, values: &[f64]) -> AxisFeatures {
    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

    let mut min_value = f64::INFINITY;
    let mut max_value = f64::NEG_INFINITY;
    for &value in values {
        min_value = min_value.min(value);
        max_value = max_value.max(value);
    }

    AxisFeatures {
        axis: axis.to_string(),
        sample_count: count,
        mean,
        std_dev: variance.sqrt(),
        min_value,
        max_value,
    }
}
