use chrono::Utc;
use crossbeam_channel::Sender;
use log::{error, info, warn};

use crate::storage::{SampleStore, StorageError};
use crate::types::{FeatureTask, FlushSummary, Sample, TimestampSource};

/// Errors surfaced by the session recorder
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("no active session")]
    NoActiveSession,
    #[error("session {0} is already active")]
    SessionAlreadyActive(String),
    #[error("persistence failed: {0}")]
    Persistence(#[from] StorageError),
}

/// Accumulates every sample of one calibration session and commits them
/// as a single transaction at session end.
///
/// The log is unbounded and append-only while the session is active.
/// `stop` flushes it through the store as one all-or-nothing batch, then
/// hands a feature-extraction task to the background worker regardless of
/// whether persistence succeeded. The worker owns that task from then on;
/// no result flows back here.
pub struct SessionRecorder<S: SampleStore> {
    store: S,
    feature_task_sender: Sender<FeatureTask>,
    samples: Vec<Sample>,
    active_session: Option<String>,
}

impl<S: SampleStore> SessionRecorder<S> {
    pub fn new(store: S, feature_task_sender: Sender<FeatureTask>) -> Self {
        Self {
            store,
            feature_task_sender,
            samples: Vec::new(),
            active_session: None,
        }
    }

    /// Begins a session with an empty log. Starting over a running
    /// session is rejected.
    pub fn start(&mut self, session_id: &str) -> Result<(), RecorderError> {
        if let Some(active) = &self.active_session {
            return Err(RecorderError::SessionAlreadyActive(active.clone()));
        }

        self.samples.clear();
        self.active_session = Some(session_id.to_string());
        info!("Session {} started", session_id);
        Ok(())
    }

    /// Appends one sample to the session log. No eviction.
    pub fn record(&mut self, sample: Sample) -> Result<(), RecorderError> {
        if self.active_session.is_none() {
            return Err(RecorderError::NoActiveSession);
        }

        self.samples.push(sample);
        Ok(())
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Ends the session: one atomic flush of the whole log, then a
    /// fire-and-forget handoff to the feature worker.
    ///
    /// A persistence failure rolls the transaction back and is returned to
    /// the caller, but the feature task is scheduled either way and the
    /// log is cleared either way.
    pub fn stop(&mut self) -> Result<FlushSummary, RecorderError> {
        let session_id = self
            .active_session
            .take()
            .ok_or(RecorderError::NoActiveSession)?;

        // 所有行统一使用落盘时刻的时间戳
        let recorded_at = Utc::now().timestamp_millis();
        let flush_result = self.flush(&session_id, recorded_at);

        // 事务结束后无论成败都清空日志并调度特征提取
        self.samples.clear();
        self.schedule_feature_extraction(&session_id);

        let rows_saved = flush_result?;
        info!("Session {} flushed: {} rows", session_id, rows_saved);
        Ok(FlushSummary {
            session_id,
            rows_saved,
            recorded_at,
        })
    }

    fn flush(&mut self, session_id: &str, recorded_at: i64) -> Result<usize, StorageError> {
        self.store.begin_batch(session_id)?;

        for sample in &self.samples {
            if let Err(e) = self.store.append_row(sample.x, sample.y, sample.z, recorded_at) {
                Self::rollback_after(&mut self.store, session_id, &e);
                return Err(e);
            }
        }

        match self.store.commit_batch() {
            Ok(rows) => Ok(rows),
            Err(e) => {
                Self::rollback_after(&mut self.store, session_id, &e);
                Err(e)
            }
        }
    }

    fn rollback_after(store: &mut S, session_id: &str, cause: &StorageError) {
        error!("Flush of session {} failed, rolling back: {}", session_id, cause);
        if let Err(rollback_err) = store.rollback_batch() {
            error!("Rollback of session {} also failed: {}", session_id, rollback_err);
        }
    }

    fn schedule_feature_extraction(&self, session_id: &str) {
        let task = FeatureTask::Construct {
            session_id: session_id.to_string(),
            timestamp_source: TimestampSource::FlushTime,
        };

        match self.feature_task_sender.try_send(task) {
            Ok(()) => info!("Scheduled feature extraction for session {}", session_id),
            Err(crossbeam_channel::TrySendError::Full(_)) => {
                warn!("Feature task channel is full, dropping task for session {}", session_id);
            }
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => {
                warn!("Feature worker is gone, dropping task for session {}", session_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::{bounded, Receiver};

    use super::*;

    /// In-memory store that mimics the transactional contract and can be
    /// told to fail at a chosen point.
    #[derive(Default)]
    struct MemoryStore {
        committed: Vec<(f64, f64, f64, i64)>,
        pending: Vec<(f64, f64, f64, i64)>,
        in_batch: bool,
        begin_calls: usize,
        rollback_calls: usize,
        fail_commit: bool,
        fail_append_after: Option<usize>,
    }

    impl SampleStore for MemoryStore {
        fn begin_batch(&mut self, _session_id: &str) -> Result<(), StorageError> {
            if self.in_batch {
                return Err(StorageError::BatchAlreadyInProgress);
            }
            self.begin_calls += 1;
            self.in_batch = true;
            self.pending.clear();
            Ok(())
        }

        fn append_row(&mut self, x: f64, y: f64, z: f64, recorded_at: i64) -> Result<(), StorageError> {
            if !self.in_batch {
                return Err(StorageError::NoBatchInProgress);
            }
            if let Some(limit) = self.fail_append_after {
                if self.pending.len() >= limit {
                    return Err(StorageError::NoBatchInProgress);
                }
            }
            self.pending.push((x, y, z, recorded_at));
            Ok(())
        }

        fn commit_batch(&mut self) -> Result<usize, StorageError> {
            if !self.in_batch {
                return Err(StorageError::NoBatchInProgress);
            }
            if self.fail_commit {
                return Err(StorageError::NoBatchInProgress);
            }
            self.in_batch = false;
            let rows = self.pending.len();
            self.committed.append(&mut self.pending);
            Ok(rows)
        }

        fn rollback_batch(&mut self) -> Result<(), StorageError> {
            self.rollback_calls += 1;
            self.in_batch = false;
            self.pending.clear();
            Ok(())
        }
    }

    fn recorder(store: MemoryStore) -> (SessionRecorder<MemoryStore>, Receiver<FeatureTask>) {
        let (sender, receiver) = bounded(4);
        (SessionRecorder::new(store, sender), receiver)
    }

    #[test]
    fn round_trip_persists_every_sample_once() {
        let (mut rec, tasks) = recorder(MemoryStore::default());

        rec.start("session_1").unwrap();
        rec.record(Sample::new(1.0, 2.0, 3.0, 101)).unwrap();
        rec.record(Sample::new(4.0, 5.0, 6.0, 102)).unwrap();
        let summary = rec.stop().unwrap();

        assert_eq!(summary.session_id, "session_1");
        assert_eq!(summary.rows_saved, 2);

        let committed = &rec.store.committed;
        assert_eq!(committed.len(), 2);
        // columns (x, y, z) survive; every row carries the flush timestamp
        assert_eq!(committed[0], (1.0, 2.0, 3.0, summary.recorded_at));
        assert_eq!(committed[1], (4.0, 5.0, 6.0, summary.recorded_at));

        // feature extraction scheduled exactly once, flagged as flush-time
        let task = tasks.try_recv().unwrap();
        let FeatureTask::Construct { session_id, timestamp_source } = task;
        assert_eq!(session_id, "session_1");
        assert_eq!(timestamp_source, TimestampSource::FlushTime);
        assert!(tasks.try_recv().is_err());
    }

    #[test]
    fn record_without_session_leaves_storage_untouched() {
        let (mut rec, tasks) = recorder(MemoryStore::default());

        let err = rec.record(Sample::new(1.0, 1.0, 1.0, 1)).unwrap_err();
        assert!(matches!(err, RecorderError::NoActiveSession));
        assert_eq!(rec.store.begin_calls, 0);
        assert!(rec.store.committed.is_empty());
        assert!(tasks.try_recv().is_err());
    }

    #[test]
    fn double_start_is_rejected() {
        let (mut rec, _tasks) = recorder(MemoryStore::default());

        rec.start("session_1").unwrap();
        let err = rec.start("session_2").unwrap_err();
        assert!(matches!(err, RecorderError::SessionAlreadyActive(id) if id == "session_1"));
    }

    #[test]
    fn stop_without_session_is_rejected_and_schedules_nothing() {
        let (mut rec, tasks) = recorder(MemoryStore::default());

        let err = rec.stop().unwrap_err();
        assert!(matches!(err, RecorderError::NoActiveSession));
        assert!(tasks.try_recv().is_err());
    }

    #[test]
    fn commit_failure_rolls_back_and_still_schedules_extraction() {
        let store = MemoryStore {
            fail_commit: true,
            ..MemoryStore::default()
        };
        let (mut rec, tasks) = recorder(store);

        rec.start("session_1").unwrap();
        rec.record(Sample::new(1.0, 2.0, 3.0, 1)).unwrap();
        let err = rec.stop().unwrap_err();

        assert!(matches!(err, RecorderError::Persistence(_)));
        // all-or-nothing: zero rows on failure
        assert!(rec.store.committed.is_empty());
        assert_eq!(rec.store.rollback_calls, 1);
        // handoff happens regardless of the persistence outcome
        assert!(tasks.try_recv().is_ok());
        // log is cleared and a new session can start
        assert_eq!(rec.sample_count(), 0);
        rec.start("session_2").unwrap();
    }

    #[test]
    fn append_failure_persists_no_partial_batch() {
        let store = MemoryStore {
            fail_append_after: Some(1),
            ..MemoryStore::default()
        };
        let (mut rec, _tasks) = recorder(store);

        rec.start("session_1").unwrap();
        for n in 0..3 {
            rec.record(Sample::new(n as f64, 0.0, 0.0, n)).unwrap();
        }
        let err = rec.stop().unwrap_err();

        assert!(matches!(err, RecorderError::Persistence(_)));
        assert!(rec.store.committed.is_empty());
        assert_eq!(rec.store.rollback_calls, 1);
    }

    #[test]
    fn empty_session_flushes_zero_rows() {
        let (mut rec, tasks) = recorder(MemoryStore::default());

        rec.start("session_1").unwrap();
        let summary = rec.stop().unwrap();

        assert_eq!(summary.rows_saved, 0);
        assert!(rec.store.committed.is_empty());
        assert!(tasks.try_recv().is_ok());
    }

    #[test]
    fn recorder_is_reusable_across_sessions() {
        let (mut rec, tasks) = recorder(MemoryStore::default());

        rec.start("session_1").unwrap();
        rec.record(Sample::new(1.0, 1.0, 1.0, 1)).unwrap();
        rec.stop().unwrap();

        rec.start("session_2").unwrap();
        rec.record(Sample::new(2.0, 2.0, 2.0, 2)).unwrap();
        let summary = rec.stop().unwrap();

        assert_eq!(summary.session_id, "session_2");
        assert_eq!(rec.store.committed.len(), 2);
        assert_eq!(tasks.iter().take(2).count(), 2);
    }
}
