use std::collections::VecDeque;

use crate::types::Sample;

/// 滚动窗口缓冲区：为实时显示保留最近 history_size 个样本
///
/// Each axis is kept as its own ordered series so display consumers can
/// plot them independently. Arrival order is preserved; once capacity is
/// exceeded the oldest sample is evicted (FIFO).
#[derive(Debug, Clone)]
pub struct RollingWindowBuffer {
    buffer_x: VecDeque<f64>,
    buffer_y: VecDeque<f64>,
    buffer_z: VecDeque<f64>,
    buffer_timestamp: VecDeque<i64>,
    history_size: usize,
}

/// Read-only copy of the per-axis series, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSnapshot {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub timestamps: Vec<i64>,
}

impl RollingWindowBuffer {
    pub fn new(history_size: usize) -> Self {
        Self {
            buffer_x: VecDeque::with_capacity(history_size),
            buffer_y: VecDeque::with_capacity(history_size),
            buffer_z: VecDeque::with_capacity(history_size),
            buffer_timestamp: VecDeque::with_capacity(history_size),
            history_size,
        }
    }

    /// Appends one sample to every axis series. Eviction happens in the
    /// same step, so the observed length never exceeds `history_size`.
    pub fn push(&mut self, sample: &Sample) {
        self.buffer_x.push_back(sample.x);
        self.buffer_y.push_back(sample.y);
        self.buffer_z.push_back(sample.z);
        self.buffer_timestamp.push_back(sample.timestamp);

        // 超过最大样本数时从前面移除最旧的数据 - O(1)操作
        if self.buffer_x.len() > self.history_size {
            self.buffer_x.pop_front();
            self.buffer_y.pop_front();
            self.buffer_z.pop_front();
            self.buffer_timestamp.pop_front();
        }
    }

    /// Current per-axis series for rendering. Read-only; no side effects.
    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            x: self.buffer_x.iter().copied().collect(),
            y: self.buffer_y.iter().copied().collect(),
            z: self.buffer_z.iter().copied().collect(),
            timestamps: self.buffer_timestamp.iter().copied().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer_x.len()
    }
}
