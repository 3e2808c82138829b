use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use log::{error, info};

use crate::storage::DuckDbStore;
use crate::types::FeatureTask;

use super::extractor::FeaturesConstructor;

/// Drains feature-extraction tasks on a dedicated thread.
///
/// The recorder hands sessions off here fire-and-forget: failures are
/// logged and swallowed, nothing flows back to the caller.
pub fn run_feature_worker(
    store: DuckDbStore,
    task_receiver: Receiver<FeatureTask>,
    shutdown_signal: Arc<AtomicBool>,
) {
    let constructor = FeaturesConstructor::new(store);
    info!("Feature worker thread started");

    while !shutdown_signal.load(Ordering::Relaxed) {
        match task_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(FeatureTask::Construct { session_id, timestamp_source }) => {
                match constructor.construct_features(&session_id, timestamp_source) {
                    Ok(features) => {
                        info!(
                            "Feature worker: session {} done ({} axes)",
                            session_id,
                            features.axes.len()
                        );
                    }
                    Err(e) => {
                        error!(
                            "Feature worker: failed to construct features for session {}: {}",
                            session_id, e
                        );
                    }
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                // 超时，继续循环检查关闭信号
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                info!("Feature worker: task channel disconnected, exiting");
                break;
            }
        }
    }

    info!("Feature worker thread exiting gracefully");
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Instant;

    use crossbeam_channel::bounded;

    use crate::storage::SampleStore;
    use crate::types::TimestampSource;

    use super::*;

    #[test]
    fn worker_processes_task_and_shuts_down() {
        let mut store = DuckDbStore::open_in_memory().unwrap();
        store.begin_batch("session_w").unwrap();
        store.append_row(1.0, 2.0, 3.0, 42).unwrap();
        store.append_row(2.0, 3.0, 4.0, 42).unwrap();
        store.commit_batch().unwrap();

        let worker_store = store.try_clone().unwrap();
        let (task_sender, task_receiver) = bounded(4);
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker_shutdown = Arc::clone(&shutdown);
        let handle = thread::spawn(move || {
            run_feature_worker(worker_store, task_receiver, worker_shutdown);
        });

        task_sender
            .send(FeatureTask::Construct {
                session_id: "session_w".to_string(),
                timestamp_source: TimestampSource::FlushTime,
            })
            .unwrap();

        // poll until the worker has written the feature rows
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if store.feature_row_count("session_w").unwrap() == 3 {
                break;
            }
            assert!(Instant::now() < deadline, "worker did not finish in time");
            thread::sleep(Duration::from_millis(20));
        }

        shutdown.store(true, Ordering::Relaxed);
        handle.join().unwrap();
    }

    #[test]
    fn worker_exits_when_channel_disconnects() {
        let store = DuckDbStore::open_in_memory().unwrap();
        let (task_sender, task_receiver) = bounded::<FeatureTask>(1);
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = thread::spawn(move || {
            run_feature_worker(store, task_receiver, shutdown);
        });

        drop(task_sender);
        handle.join().unwrap();
    }
}
