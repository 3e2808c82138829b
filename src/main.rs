mod config;
mod features;
mod logger;
mod mqtt;
mod session;
mod storage;
mod types;
mod utils;
mod window;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::bounded;
use log::{debug, error, info, warn};

use config::{AppConfig, ConfigManager};
use features::run_feature_worker;
use session::SessionRecorder;
use storage::{generate_session_id, DuckDbStore};
use utils::{format_timestamp, join_with_timeout};
use window::RollingWindowBuffer;

fn main() {
    logger::init_logger();
    info!("Application starting");

    let config = match ConfigManager::load_from_file("config.toml") {
        Ok(manager) => {
            info!("Loaded configuration from config.toml");
            manager
        }
        Err(e) => {
            warn!("No config file loaded ({}), using defaults", e);
            ConfigManager::new()
        }
    };

    if let Err(e) = run_calibration(config.get_config()) {
        error!("Calibration run failed: {}", e);
        std::process::exit(1);
    }
}

fn run_calibration(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (sample_sender, sample_receiver) = bounded(config.channels.sample_channel_capacity);
    let (feature_task_sender, feature_task_receiver) =
        bounded(config.channels.feature_task_channel_capacity);
    let sample_sender = Arc::new(sample_sender);
    let shutdown_signal = Arc::new(AtomicBool::new(false));

    // MQTT 摄取线程
    let mqtt_config = config.mqtt.clone();
    let mqtt_sender = Arc::clone(&sample_sender);
    let mqtt_shutdown = Arc::clone(&shutdown_signal);
    let mqtt_handle = thread::spawn(move || {
        if let Err(e) = mqtt::run_mqtt_client(&mqtt_config, mqtt_sender, mqtt_shutdown) {
            error!("MQTT thread failed: {}", e);
        }
    });

    let store = DuckDbStore::open(&config.database.path, config.database.auto_create_dir)?;
    let worker_store = store.try_clone()?;
    let worker_shutdown = Arc::clone(&shutdown_signal);
    let worker_handle = thread::spawn(move || {
        run_feature_worker(worker_store, feature_task_receiver, worker_shutdown);
    });

    let mut recorder = SessionRecorder::new(store, feature_task_sender);
    let mut window = RollingWindowBuffer::new(config.plot.history_size);

    let session_id = generate_session_id();
    recorder.start(&session_id)?;
    info!(
        "Calibration session {} running for {:.0} seconds",
        session_id, config.session.duration_seconds
    );

    let deadline = Instant::now() + Duration::from_secs_f64(config.session.duration_seconds);
    while Instant::now() < deadline {
        match sample_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(sample) => {
                debug!(
                    "ACC data - x: {:.3}, y: {:.3}, z: {:.3}, time: {}",
                    sample.x,
                    sample.y,
                    sample.z,
                    format_timestamp(sample.timestamp)
                );
                window.push(&sample);
                recorder.record(sample)?;
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                warn!("Sample channel disconnected before session end");
                break;
            }
        }
    }

    let snapshot = window.snapshot();
    if let Some(last_x) = snapshot.x.last() {
        info!(
            "Live window holds {} points, latest x={:.3}",
            window.len(),
            last_x
        );
    }
    info!("Session recorded {} samples", recorder.sample_count());

    match recorder.stop() {
        Ok(summary) => info!(
            "Session {} persisted: {} rows at {}",
            summary.session_id,
            summary.rows_saved,
            format_timestamp(summary.recorded_at)
        ),
        Err(e) => error!("Failed to persist session {}: {}", session_id, e),
    }

    // 关闭摄取与特征线程
    info!("Session complete, signaling worker threads to shutdown");
    shutdown_signal.store(true, Ordering::Relaxed);

    if worker_handle.join().is_err() {
        error!("Feature worker thread panicked");
    }

    // MQTT 线程可能阻塞在下一个事件上，最多等待 3 秒
    if join_with_timeout(mqtt_handle, Duration::from_secs(3)) {
        info!("MQTT thread shut down gracefully");
    } else {
        warn!("MQTT thread did not shut down within timeout");
    }

    Ok(())
}
