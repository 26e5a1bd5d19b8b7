//! 共享上下文
//!
//! 轮询线程与调用方线程共享的全部运行时状态。

use crate::checks::PeriodicCheck;
use crate::config::RobotConfig;
use crate::devices::DeviceSet;
use crate::hooks::{HookManager, StatusOrigin};
use crate::metrics::LoopMetrics;
use crate::mode::AtomicSyncMode;
use crate::reconciler::TimestampReconciler;
use crate::store::{StatusEntry, StatusStore};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub(crate) struct RobotContext {
    pub devices: DeviceSet,
    pub store: StatusStore,
    /// 命令锁：串行化命令下发、同步模式切换与状态同步脉冲
    ///
    /// 保证轮询线程不会在多设备命令下发的中途发出同步脉冲。
    pub command_lock: Mutex<()>,
    pub sync_mode: AtomicSyncMode,
    pub hooks: Arc<RwLock<HookManager>>,
    pub metrics: Arc<LoopMetrics>,
    /// 各线程完成第一次迭代后置位
    pub non_dynamixel_ready: AtomicBool,
    pub dynamixel_ready: AtomicBool,
    pub monitor: Mutex<Option<Box<dyn PeriodicCheck>>>,
    pub sentry: Mutex<Option<Box<dyn PeriodicCheck>>>,
    pub reconciler: Mutex<Box<dyn TimestampReconciler>>,
    pub config: RobotConfig,
}

impl RobotContext {
    pub fn new(
        devices: DeviceSet,
        config: RobotConfig,
        monitor: Option<Box<dyn PeriodicCheck>>,
        sentry: Option<Box<dyn PeriodicCheck>>,
        reconciler: Box<dyn TimestampReconciler>,
    ) -> Self {
        Self {
            devices,
            store: StatusStore::new(config.history_capacity),
            command_lock: Mutex::new(()),
            sync_mode: AtomicSyncMode::default(),
            hooks: Arc::new(RwLock::new(HookManager::new())),
            metrics: Arc::new(LoopMetrics::new()),
            non_dynamixel_ready: AtomicBool::new(false),
            dynamixel_ready: AtomicBool::new(false),
            monitor: Mutex::new(monitor),
            sentry: Mutex::new(sentry),
            reconciler: Mutex::new(reconciler),
            config,
        }
    }

    /// 快照追加后的收尾：计数并触发钩子
    ///
    /// 钩子列表被占用（正在注册回调）时跳过本次触发。
    pub fn after_append(&self, entry: &StatusEntry, origin: StatusOrigin) {
        LoopMetrics::incr(&self.metrics.snapshots_appended);
        if let Some(hooks) = self.hooks.try_read() {
            hooks.trigger_all(entry.id, origin, &entry.status);
        }
    }
}
