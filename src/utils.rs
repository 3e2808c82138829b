use std::thread::JoinHandle;
use std::time::{Duration, UNIX_EPOCH};

use crossbeam_channel::bounded;
use log::error;

/// 在限定时间内等待线程退出，线程仍在运行时返回 false
///
/// The join itself happens on a helper thread; if the target never exits,
/// that helper leaks with it rather than blocking the caller.
pub fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration) -> bool {
    let (done_sender, done_receiver) = bounded(1);

    std::thread::spawn(move || {
        let _ = done_sender.send(handle.join());
    });

    match done_receiver.recv_timeout(timeout) {
        Ok(Ok(())) => true,
        Ok(Err(_)) => {
            error!("Joined thread had panicked");
            true
        }
        Err(_) => false,
    }
}

/// 将毫秒时间戳格式化为标准时间格式 HH:MM:SS.mmm
pub fn format_timestamp(timestamp_ms: i64) -> String {
    if timestamp_ms < 0 {
        return format!("Invalid timestamp: {}", timestamp_ms);
    }

    let duration = Duration::from_millis(timestamp_ms as u64);

    match UNIX_EPOCH.checked_add(duration) {
        Some(system_time) => match system_time.duration_since(UNIX_EPOCH) {
            Ok(d) => {
                let total_ms = d.as_millis();
                let seconds = total_ms / 1000;
                let ms = total_ms % 1000;

                // 只显示时分秒.毫秒
                let hours = (seconds / 3600) % 24;
                let minutes = (seconds / 60) % 60;
                let secs = seconds % 60;

                format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, ms)
            }
            Err(_) => format!("Invalid timestamp: {}", timestamp_ms),
        },
        None => format!("Invalid timestamp: {}", timestamp_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_epoch_start() {
        assert_eq!(format_timestamp(0), "00:00:00.000");
    }

    #[test]
    fn formats_time_of_day_with_millis() {
        // 1h 1m 1s 1ms past midnight UTC
        assert_eq!(format_timestamp(3_661_001), "01:01:01.001");
    }

    #[test]
    fn wraps_at_midnight() {
        // one day + 1ms
        assert_eq!(format_timestamp(86_400_001), "00:00:00.001");
    }

    #[test]
    fn negative_timestamp_is_flagged() {
        assert!(format_timestamp(-5).starts_with("Invalid timestamp"));
    }

    #[test]
    fn join_returns_true_for_finished_thread() {
        let handle = std::thread::spawn(|| {});
        assert!(join_with_timeout(handle, Duration::from_secs(1)));
    }

    #[test]
    fn join_times_out_on_stuck_thread() {
        let (block_sender, block_receiver) = bounded::<()>(1);
        let handle = std::thread::spawn(move || {
            let _ = block_receiver.recv();
        });

        assert!(!join_with_timeout(handle, Duration::from_millis(50)));

        // 释放被阻塞的线程，避免测试结束后悬挂
        drop(block_sender);
    }
}
