//! Stretch SDK - Stretch 机器人本体 Rust SDK
//!
//! # 架构设计
//!
//! 本 SDK 采用分层架构，从底层到高层：
//!
//! - **状态层** (`status`): 组合状态与时间戳类型
//! - **设备层** (`device`): 子系统设备接口（电源板、底盘、升降、伸缩臂、舵机链、腕部板）
//! - **驱动层** (`driver`): 轮询线程、状态历史、同步模式、轨迹、回零与收纳
//!
//! # 快速开始
//!
//! ```rust
//! use stretch_sdk::prelude::*;
//! ```

pub use stretch_device as device;
pub use stretch_driver as driver;
pub use stretch_status as status;

pub mod prelude;

// --- 用户以此为界 ---

pub use stretch_device::DeviceError;
pub use stretch_driver::{DriverError, Robot, RobotBuilder, RobotConfig};
pub use stretch_status::{CompositeStatus, Subsystem};

use tracing_subscriber::EnvFilter;

/// 安装控制台日志
///
/// 未设置 `RUST_LOG` 时使用 `default_filter`。全局 subscriber 已存在时返回 `false`。
/// 需要写入按序列号命名的日志文件时改用 [`driver::init_file_logging`]。
pub fn init_console_logging(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!("Console logging installed");
    }
    installed
}
