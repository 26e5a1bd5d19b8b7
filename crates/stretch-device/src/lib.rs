//! # Stretch Device Facade
//!
//! 设备抽象层，定义核心编排层所消费的设备接口。
//!
//! 非 Dynamixel 总线上的板卡（pimu、底盘、升降、伸缩臂、腕部加速度计板）
//! 与 Dynamixel 总线上的舵机链（头部、末端执行器）都通过这里的 trait 接入。
//! 串口协议与电机控制环不在本 crate 范围内。
//!
//! 设备句柄统一为 [`Shared<T>`]（`Arc<parking_lot::Mutex<T>>`），
//! 每个设备一把锁，与状态存储的锁相互独立。

use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::Duration;
use stretch_status::{ClockSource, SubsystemStatus};
use thiserror::Error;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

/// 设备层统一错误类型
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Operation timeout")]
    Timeout,
    #[error("Device not started")]
    NotStarted,
    #[error("Unknown joint: {0}")]
    UnknownJoint(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl DeviceError {
    /// 是否为传输层错误（单次 I/O 失败，可跳过本周期）
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            DeviceError::Transport(_) | DeviceError::Io(_) | DeviceError::Timeout
        )
    }
}

/// 设备硬件时钟采样 `(来源, 原始微秒值)`
///
/// 绝大多数设备只有一到两个时钟来源。
pub type ClockReadings = SmallVec<[(ClockSource, u64); 2]>;

/// 共享设备句柄
pub type Shared<T> = Arc<Mutex<T>>;

/// 将设备包装为共享句柄
pub fn shared<T>(device: T) -> Shared<T> {
    Arc::new(Mutex::new(device))
}

/// 轨迹执行的控制方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrajectoryControl {
    /// 位置控制
    Position,
    /// 速度控制
    ///
    /// `watchdog_timeout` 为 `None` 时关闭看门狗。
    Velocity { watchdog_timeout: Option<Duration> },
}

/// 所有设备的公共接口
pub trait Device: Send {
    /// 设备名（日志与事件记录使用）
    fn name(&self) -> &str;

    /// 启动设备，返回是否成功
    fn startup(&mut self) -> bool;

    /// 停止设备
    fn stop(&mut self);

    /// 从硬件拉取状态
    fn pull_status(&mut self) -> Result<(), DeviceError>;

    /// 下发待发送的命令
    fn push_command(&mut self) -> Result<(), DeviceError>;

    /// 当前状态记录（副本）
    fn status(&self) -> SubsystemStatus;

    /// 最近一次拉取时的硬件时钟采样
    fn clock_readings(&self) -> ClockReadings {
        ClockReadings::new()
    }
}

/// 支持同步模式（命令缓存，等待硬件同步脉冲统一生效）的设备
pub trait SyncCapable {
    fn enable_sync_mode(&mut self);
    fn disable_sync_mode(&mut self);
    fn sync_mode_enabled(&self) -> bool;
}

/// 支持多路点轨迹执行的关节
pub trait TrajectoryJoint {
    /// 开始执行已加载的轨迹
    fn start_trajectory(&mut self, control: TrajectoryControl) -> Result<(), DeviceError>;

    /// 停止轨迹
    fn stop_trajectory(&mut self);

    /// 推送下一段路点
    fn push_trajectory(&mut self) -> Result<(), DeviceError>;

    /// 轨迹是否仍在执行
    fn trajectory_active(&self) -> bool;
}

/// 电源/IMU 板（pimu），持有硬件同步触发线
pub trait PowerBoard: Device + SyncCapable {
    /// 触发电机同步脉冲：所有缓存命令同时生效
    fn trigger_motor_sync(&mut self) -> Result<(), DeviceError>;

    /// 触发状态同步脉冲：所有设备同时采样
    fn trigger_status_sync(&mut self) -> Result<(), DeviceError>;

    /// 蜂鸣提示
    fn trigger_beep(&mut self) -> Result<(), DeviceError>;
}

/// 腕部加速度计板（wacc）
pub trait WristBoard: Device + SyncCapable {
    fn trigger_status_sync(&mut self) -> Result<(), DeviceError>;
}

/// 移动底盘
///
/// 同步模式切换作用于左右两个轮电机；任一轮轨迹在执行即视为底盘轨迹在执行。
pub trait MobileBase: Device + SyncCapable + TrajectoryJoint {}

/// 直线关节（升降、伸缩臂）
pub trait PrismaticJoint: Device + SyncCapable + TrajectoryJoint {
    /// 阻塞式回零（撞限位标定）
    fn home(&mut self) -> Result<(), DeviceError>;

    /// 设置目标位置（米），随下一次 `push_command` 下发
    fn move_to(&mut self, position: f64);

    /// 当前位置（米）
    fn position(&self) -> f64;

    /// 是否已接近目标位置
    fn near_pos_setpoint(&self) -> bool;

    /// 位置是否已标定
    fn pos_calibrated(&self) -> bool;
}

/// Dynamixel 舵机链中的单个关节
pub trait ServoJoint: TrajectoryJoint + Send {
    fn name(&self) -> &str;

    /// 直接下发目标位置（弧度）
    fn move_to(&mut self, position: f64) -> Result<(), DeviceError>;

    /// 阻塞式回零
    fn home(&mut self) -> Result<(), DeviceError>;

    /// 是否需要标定
    fn requires_calibration(&self) -> bool;

    fn is_calibrated(&self) -> bool;

    fn is_moving(&self) -> bool;

    fn position(&self) -> f64;
}

/// Dynamixel 舵机链（头部、末端执行器）
pub trait ServoChain: Device {
    /// 关节名，按链上顺序
    fn joint_names(&self) -> Vec<String>;

    fn joint(&self, name: &str) -> Option<&dyn ServoJoint>;

    fn joint_mut(&mut self, name: &str) -> Option<&mut dyn ServoJoint>;

    /// 工具（关节）是否存在
    fn is_tool_present(&self, name: &str) -> bool {
        self.joint(name).is_some()
    }
}
