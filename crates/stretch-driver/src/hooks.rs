//! 钩子系统（Hook System）
//!
//! 在每次向状态历史追加快照后触发自定义回调。
//!
//! # 设计原则
//!
//! - **非阻塞**: 回调运行在轮询线程中，必须极快完成，耗时工作交给 Channel 另一端
//! - **跳过而非等待**: 轮询线程使用 `try_read` 获取钩子列表，拿不到锁就跳过本次触发
//!
//! # 使用示例
//!
//! ```rust
//! use stretch_driver::hooks::{HookManager, StatusCallback};
//! use stretch_driver::recording::AsyncRecordingHook;
//! use std::sync::Arc;
//!
//! let mut hooks = HookManager::new();
//! let (hook, _rx) = AsyncRecordingHook::new();
//! hooks.add_callback(Arc::new(hook) as Arc<dyn StatusCallback>);
//! assert_eq!(hooks.len(), 1);
//! ```

use std::sync::Arc;
use stretch_status::CompositeStatus;

/// 数据来源线程
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOrigin {
    NonDynamixel,
    Dynamixel,
}

/// 状态回调 Trait
///
/// # 性能要求
///
/// - 禁止阻塞操作（I/O、长时间持锁）
/// - 推荐使用 `crossbeam_channel::Sender::try_send`
pub trait StatusCallback: Send + Sync {
    /// 新快照追加到历史后调用
    ///
    /// # 参数
    ///
    /// - `id`: 快照 id
    /// - `origin`: 追加快照的线程
    /// - `status`: 已存储的快照（不可变）
    fn on_status(&self, id: u64, origin: StatusOrigin, status: &Arc<CompositeStatus>);
}

/// 钩子管理器
///
/// 回调列表本身不是线程安全的，需要外部同步（`Robot` 内部使用 `RwLock<HookManager>`）。
#[derive(Default)]
pub struct HookManager {
    callbacks: Vec<Arc<dyn StatusCallback>>,
}

impl HookManager {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    pub fn add_callback(&mut self, callback: Arc<dyn StatusCallback>) {
        self.callbacks.push(callback);
    }

    /// 移除所有回调
    pub fn clear(&mut self) {
        self.callbacks.clear();
    }

    /// 触发所有回调（在轮询线程中调用）
    pub fn trigger_all(&self, id: u64, origin: StatusOrigin, status: &Arc<CompositeStatus>) {
        for callback in self.callbacks.iter() {
            callback.on_status(id, origin, status);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl std::fmt::Debug for HookManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookManager")
            .field("callback_count", &self.callbacks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct CountingCallback {
        count: AtomicU64,
        last_id: AtomicU64,
    }

    impl StatusCallback for CountingCallback {
        fn on_status(&self, id: u64, _origin: StatusOrigin, _status: &Arc<CompositeStatus>) {
            self.count.fetch_add(1, Ordering::Relaxed);
            self.last_id.store(id, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_hook_manager_trigger_all() {
        let mut hooks = HookManager::new();
        assert!(hooks.is_empty());

        let a = Arc::new(CountingCallback {
            count: AtomicU64::new(0),
            last_id: AtomicU64::new(0),
        });
        let b = Arc::new(CountingCallback {
            count: AtomicU64::new(0),
            last_id: AtomicU64::new(0),
        });
        hooks.add_callback(a.clone());
        hooks.add_callback(b.clone());
        assert_eq!(hooks.len(), 2);

        let status = Arc::new(CompositeStatus::default());
        hooks.trigger_all(7, StatusOrigin::Dynamixel, &status);
        hooks.trigger_all(8, StatusOrigin::NonDynamixel, &status);

        assert_eq!(a.count.load(Ordering::Relaxed), 2);
        assert_eq!(b.last_id.load(Ordering::Relaxed), 8);
    }

    #[test]
    fn test_hook_manager_clear() {
        let mut hooks = HookManager::new();
        hooks.add_callback(Arc::new(CountingCallback {
            count: AtomicU64::new(0),
            last_id: AtomicU64::new(0),
        }));
        hooks.clear();
        assert!(hooks.is_empty());
        assert_eq!(format!("{:?}", hooks), "HookManager { callback_count: 0 }");
    }
}
