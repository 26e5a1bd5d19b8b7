//! 编排核心
//!
//! 本 crate 在设备抽象层之上提供 Stretch 机器人本体的实时编排：
//! - 两个固定频率轮询线程（非 Dynamixel 25Hz / Dynamixel 60Hz）
//! - 组合状态历史（环形缓冲，按 id 查询）
//! - 同步模式命令协议（缓存命令 + 硬件同步脉冲）
//! - 多关节轨迹协调
//! - 回零与收纳流程
//! - 钩子系统：异步录制、自定义回调
//!
//! # 使用场景
//!
//! 通过 [`RobotBuilder`] 注入设备实现并构建 [`Robot`]，
//! 调用 [`Robot::startup`] 后即可在任意线程读取状态、下发命令。

mod builder;
pub mod checks;
pub mod config;
mod context;
pub mod devices;
mod error;
pub mod hooks;
pub mod logging;
pub mod metrics;
pub mod mode;
mod pipeline;
pub mod reconciler;
pub mod recording;
pub mod registry;
pub mod report;
mod robot;
mod sequencer;
pub mod store;
mod sync;
mod trajectory;

#[cfg(test)]
pub(crate) mod testing;

pub use builder::RobotBuilder;
pub use checks::PeriodicCheck;
pub use config::{DynamixelLoopConfig, NonDynamixelLoopConfig, RobotConfig, StowConfig};
pub use devices::{BUSY_DEVICE_WAIT, DeviceSet};
pub use error::DriverError;
pub use hooks::{HookManager, StatusCallback, StatusOrigin};
pub use logging::{LoggingConfig, init_file_logging, log_file_name};
pub use metrics::{LoopMetrics, LoopMetricsSnapshot};
pub use mode::{AtomicSyncMode, SyncMode};
pub use pipeline::MIN_SLEEP;
pub use reconciler::{TimestampReconciler, WallClockReconciler};
pub use recording::{AsyncRecordingHook, RecordedStatus};
pub use registry::{WaccFactory, WaccRegistry};
pub use report::StatusReport;
pub use robot::{FIRST_STATUS_TIMEOUT, Robot};
pub use sequencer::{
    ARM_TIMEOUT, CONVERGENCE_POLL, LIFT_FIRST_TIMEOUT, LIFT_LAST_TIMEOUT, STOW_SETTLE,
};
pub use store::{DEFAULT_HISTORY_CAPACITY, StatusEntry, StatusStore};
pub use trajectory::TRAJECTORY_START_GRACE;
