//! 设备集合
//!
//! 编排层持有的全部设备句柄。每个设备一把锁：
//! 调用方线程使用阻塞的 `lock()`，轮询线程使用 [`lock_or_skip`] 限时等待，
//! 拿不到就跳过本周期，保留该设备上一次的状态。
//!
//! 加锁顺序：命令锁 → 设备锁。持有设备锁时不得再申请命令锁。

use crate::metrics::LoopMetrics;
use parking_lot::MutexGuard;
use std::time::Duration;
use stretch_device::{
    Device, MobileBase, PowerBoard, PrismaticJoint, ServoChain, Shared, WristBoard,
};
use stretch_status::Subsystem;
use tracing::{debug, trace};

/// 轮询线程等待被占用设备的最长时间
pub const BUSY_DEVICE_WAIT: Duration = Duration::from_millis(2);

/// 全部设备句柄
#[derive(Clone)]
pub struct DeviceSet {
    pub pimu: Shared<dyn PowerBoard>,
    pub base: Shared<dyn MobileBase>,
    pub lift: Shared<dyn PrismaticJoint>,
    pub arm: Shared<dyn PrismaticJoint>,
    pub head: Shared<dyn ServoChain>,
    pub wacc: Shared<dyn WristBoard>,
    pub end_of_arm: Shared<dyn ServoChain>,
}

impl DeviceSet {
    /// 启动所有设备，返回各设备的启动结果
    ///
    /// 顺序为 pimu、base、lift、arm、head、wacc、end_of_arm；单个设备失败不影响其余设备。
    pub fn startup_all(&self) -> Vec<(Subsystem, bool)> {
        vec![
            (Subsystem::Pimu, self.pimu.lock().startup()),
            (Subsystem::Base, self.base.lock().startup()),
            (Subsystem::Lift, self.lift.lock().startup()),
            (Subsystem::Arm, self.arm.lock().startup()),
            (Subsystem::Head, self.head.lock().startup()),
            (Subsystem::Wacc, self.wacc.lock().startup()),
            (Subsystem::EndOfArm, self.end_of_arm.lock().startup()),
        ]
    }

    /// 按与启动相同的顺序停止所有设备
    pub fn stop_all(&self) {
        debug!("Shutting down pimu");
        self.pimu.lock().stop();
        debug!("Shutting down base");
        self.base.lock().stop();
        debug!("Shutting down lift");
        self.lift.lock().stop();
        debug!("Shutting down arm");
        self.arm.lock().stop();
        debug!("Shutting down head");
        self.head.lock().stop();
        debug!("Shutting down wacc");
        self.wacc.lock().stop();
        debug!("Shutting down end_of_arm");
        self.end_of_arm.lock().stop();
    }
}

impl std::fmt::Debug for DeviceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSet").finish_non_exhaustive()
    }
}

/// 轮询线程获取设备锁
///
/// 设备被调用方线程长时间占用（如阻塞的 `home()`）时，等待 [`BUSY_DEVICE_WAIT`] 后放弃。
pub(crate) fn lock_or_skip<'a, T: ?Sized>(
    device: &'a Shared<T>,
    subsystem: Subsystem,
    metrics: &LoopMetrics,
) -> Option<MutexGuard<'a, T>> {
    let guard = device.try_lock_for(BUSY_DEVICE_WAIT);
    if guard.is_none() {
        trace!("{} busy, skipping this tick", subsystem.name());
        LoopMetrics::incr(&metrics.skipped_busy);
    }
    guard
}
