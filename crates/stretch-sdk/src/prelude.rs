//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use stretch_sdk::prelude::*;
//! ```

// 驱动层
pub use crate::driver::{
    AsyncRecordingHook, LoopMetricsSnapshot, Robot, RobotBuilder, RobotConfig, StatusCallback,
    StatusOrigin, SyncMode,
};

// 设备接口（方法调用需要 trait 在作用域内）
pub use crate::device::{
    Device, MobileBase, PowerBoard, PrismaticJoint, ServoChain, ServoJoint, Shared, SyncCapable,
    TrajectoryJoint, WristBoard, shared,
};

// 状态类型
pub use crate::status::{ClockSource, CompositeStatus, Subsystem, SystemTimestamp};

// 错误类型
pub use crate::device::DeviceError;
pub use crate::driver::DriverError;
