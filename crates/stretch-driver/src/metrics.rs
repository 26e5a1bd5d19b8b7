//! 轮询线程性能指标
//!
//! 原子计数器，任何线程都可以读取，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 轮询线程实时指标
///
/// # 使用示例
///
/// ```rust
/// use stretch_driver::LoopMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = LoopMetrics::new();
/// metrics.non_dynamixel_iterations.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.non_dynamixel_iterations, 1);
/// ```
#[derive(Debug, Default)]
pub struct LoopMetrics {
    /// 非 Dynamixel 线程迭代次数
    pub non_dynamixel_iterations: AtomicU64,
    /// Dynamixel 线程迭代次数
    pub dynamixel_iterations: AtomicU64,
    /// 处理耗时超过周期的迭代次数
    pub overruns: AtomicU64,
    /// 成功的设备状态拉取次数
    pub status_pulls: AtomicU64,
    /// 失败的设备状态拉取次数
    pub pull_errors: AtomicU64,
    /// 因设备被调用方占用而跳过的次数
    pub skipped_busy: AtomicU64,
    /// 被跳过的 Dynamixel 周期（传输错误）
    pub skipped_ticks: AtomicU64,
    /// 轨迹路点推送次数
    pub trajectory_pushes: AtomicU64,
    /// 轨迹推送失败次数
    pub trajectory_errors: AtomicU64,
    pub monitor_steps: AtomicU64,
    pub sentry_steps: AtomicU64,
    /// 状态同步脉冲次数
    pub status_syncs: AtomicU64,
    /// 追加到历史记录的快照数
    pub snapshots_appended: AtomicU64,
}

impl LoopMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        LoopMetricsSnapshot {
            non_dynamixel_iterations: self.non_dynamixel_iterations.load(Ordering::Relaxed),
            dynamixel_iterations: self.dynamixel_iterations.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            status_pulls: self.status_pulls.load(Ordering::Relaxed),
            pull_errors: self.pull_errors.load(Ordering::Relaxed),
            skipped_busy: self.skipped_busy.load(Ordering::Relaxed),
            skipped_ticks: self.skipped_ticks.load(Ordering::Relaxed),
            trajectory_pushes: self.trajectory_pushes.load(Ordering::Relaxed),
            trajectory_errors: self.trajectory_errors.load(Ordering::Relaxed),
            monitor_steps: self.monitor_steps.load(Ordering::Relaxed),
            sentry_steps: self.sentry_steps.load(Ordering::Relaxed),
            status_syncs: self.status_syncs.load(Ordering::Relaxed),
            snapshots_appended: self.snapshots_appended.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        for counter in [
            &self.non_dynamixel_iterations,
            &self.dynamixel_iterations,
            &self.overruns,
            &self.status_pulls,
            &self.pull_errors,
            &self.skipped_busy,
            &self.skipped_ticks,
            &self.trajectory_pushes,
            &self.trajectory_errors,
            &self.monitor_steps,
            &self.sentry_steps,
            &self.status_syncs,
            &self.snapshots_appended,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopMetricsSnapshot {
    pub non_dynamixel_iterations: u64,
    pub dynamixel_iterations: u64,
    pub overruns: u64,
    pub status_pulls: u64,
    pub pull_errors: u64,
    pub skipped_busy: u64,
    pub skipped_ticks: u64,
    pub trajectory_pushes: u64,
    pub trajectory_errors: u64,
    pub monitor_steps: u64,
    pub sentry_steps: u64,
    pub status_syncs: u64,
    pub snapshots_appended: u64,
}

impl LoopMetricsSnapshot {
    /// 拉取失败率（百分比）
    pub fn pull_error_rate(&self) -> f64 {
        let total = self.status_pulls + self.pull_errors;
        if total == 0 {
            return 0.0;
        }
        (self.pull_errors as f64 / total as f64) * 100.0
    }
}
