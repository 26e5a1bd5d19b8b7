//! 异步录制钩子（Async Recording Hook）
//!
//! 把轮询线程追加的每个快照转发到有界 Channel，由调用方在其他线程落盘或回放。
//!
//! - **Bounded Queue**: 有界队列，防止消费者过慢导致内存无限增长
//! - **非阻塞**: 使用 `try_send`，队列满时丢弃新快照而非阻塞轮询线程
//! - **丢弃计数**: `dropped_snapshots` 计数器用于监控
//!
//! # 使用示例
//!
//! ```rust
//! use stretch_driver::recording::AsyncRecordingHook;
//! use stretch_driver::hooks::StatusCallback;
//! use std::sync::Arc;
//!
//! let (hook, rx) = AsyncRecordingHook::with_capacity(1_000);
//! let dropped = hook.dropped_snapshots().clone();
//! let callback = Arc::new(hook) as Arc<dyn StatusCallback>;
//!
//! std::thread::spawn(move || {
//!     while let Ok(record) = rx.recv() {
//!         let _ = record.id;
//!     }
//! });
//!
//! println!("dropped {}", dropped.load(std::sync::atomic::Ordering::Relaxed));
//! ```

use crate::hooks::{StatusCallback, StatusOrigin};
use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use stretch_status::CompositeStatus;

/// 默认队列容量（约 4 分钟 @ 25 Hz + 15 Hz）
pub const DEFAULT_RECORDING_CAPACITY: usize = 10_000;

/// 录制的快照
#[derive(Debug, Clone)]
pub struct RecordedStatus {
    pub id: u64,
    pub origin: StatusOrigin,
    /// 与历史记录共享的不可变快照
    pub status: Arc<CompositeStatus>,
}

/// 异步录制钩子
pub struct AsyncRecordingHook {
    tx: Sender<RecordedStatus>,
    dropped_snapshots: Arc<AtomicU64>,
    recorded_snapshots: Arc<AtomicU64>,
}

impl AsyncRecordingHook {
    /// 创建默认容量的录制钩子
    ///
    /// # 返回
    ///
    /// - `(hook, rx)`: 钩子实例和接收端
    #[must_use]
    pub fn new() -> (Self, Receiver<RecordedStatus>) {
        Self::with_capacity(DEFAULT_RECORDING_CAPACITY)
    }

    /// 创建指定容量的录制钩子
    #[must_use]
    pub fn with_capacity(capacity: usize) -> (Self, Receiver<RecordedStatus>) {
        let (tx, rx) = bounded(capacity);
        let hook = Self {
            tx,
            dropped_snapshots: Arc::new(AtomicU64::new(0)),
            recorded_snapshots: Arc::new(AtomicU64::new(0)),
        };
        (hook, rx)
    }

    #[must_use]
    pub fn dropped_snapshots(&self) -> &Arc<AtomicU64> {
        &self.dropped_snapshots
    }

    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_snapshots.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn recorded_snapshots(&self) -> &Arc<AtomicU64> {
        &self.recorded_snapshots
    }

    #[must_use]
    pub fn recorded_count(&self) -> u64 {
        self.recorded_snapshots.load(Ordering::Relaxed)
    }
}

impl StatusCallback for AsyncRecordingHook {
    #[inline]
    fn on_status(&self, id: u64, origin: StatusOrigin, status: &Arc<CompositeStatus>) {
        let record = RecordedStatus {
            id,
            origin,
            status: Arc::clone(status),
        };
        // 队列满或接收端已关闭时丢弃
        if self.tx.try_send(record).is_err() {
            self.dropped_snapshots.fetch_add(1, Ordering::Relaxed);
        } else {
            self.recorded_snapshots.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_recording_hook_forwards_snapshots() {
        let (hook, rx) = AsyncRecordingHook::new();
        let callback = Arc::new(hook) as Arc<dyn StatusCallback>;

        let status = Arc::new(CompositeStatus::default());
        callback.on_status(42, StatusOrigin::NonDynamixel, &status);

        let record = rx.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(record.id, 42);
        assert_eq!(record.origin, StatusOrigin::NonDynamixel);
        assert!(Arc::ptr_eq(&record.status, &status));
    }

    #[test]
    fn test_recording_hook_counts_drops_when_full() {
        let (hook, _rx) = AsyncRecordingHook::with_capacity(2);
        let dropped = hook.dropped_snapshots().clone();
        let recorded = hook.recorded_snapshots().clone();

        let status = Arc::new(CompositeStatus::default());
        for id in 1..=5 {
            hook.on_status(id, StatusOrigin::Dynamixel, &status);
        }
        assert_eq!(recorded.load(Ordering::Relaxed), 2);
        assert_eq!(dropped.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_recording_hook_counts_drops_after_disconnect() {
        let (hook, rx) = AsyncRecordingHook::new();
        drop(rx);
        let status = Arc::new(CompositeStatus::default());
        for id in 0..10 {
            hook.on_status(id, StatusOrigin::Dynamixel, &status);
        }
        assert_eq!(hook.dropped_count(), 10);
        assert_eq!(hook.recorded_count(), 0);
    }
}
