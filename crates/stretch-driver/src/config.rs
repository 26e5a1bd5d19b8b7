//! 机器人配置
//!
//! 替代全局参数字典的显式配置结构，在构建 `Robot` 时传入。
//! 所有字段都有默认值，TOML 中缺省的字段使用默认值。
//!
//! ```toml
//! serial_no = "stretch-re2-1042"
//! sync_mode_enabled = true
//!
//! [stow]
//! lift = 0.23
//! wrist_yaw = 3.4
//!
//! [non_dynamixel]
//! rate_hz = 25.0
//! trajectory_downrate = 5
//! ```

use crate::error::DriverError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 机器人配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// 机器人序列号（日志文件名使用）
    pub serial_no: String,
    pub batch_name: String,
    /// 启动时是否开启同步模式
    pub sync_mode_enabled: bool,
    pub use_monitor: bool,
    pub use_sentry: bool,
    pub log_to_console: bool,
    /// 状态历史环形缓冲容量
    pub history_capacity: usize,
    /// 自定义腕部板实现名（`None` 使用标准实现）
    pub custom_wacc: Option<String>,
    pub stow: StowConfig,
    pub non_dynamixel: NonDynamixelLoopConfig,
    pub dynamixel: DynamixelLoopConfig,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            serial_no: "stretch-re1-0000".to_string(),
            batch_name: String::new(),
            sync_mode_enabled: true,
            use_monitor: true,
            use_sentry: true,
            log_to_console: false,
            history_capacity: 25,
            custom_wacc: None,
            stow: StowConfig::default(),
            non_dynamixel: NonDynamixelLoopConfig::default(),
            dynamixel: DynamixelLoopConfig::default(),
        }
    }
}

/// 收纳姿态目标（米 / 弧度）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StowConfig {
    pub head_pan: f64,
    pub head_tilt: f64,
    pub lift: f64,
    pub arm: f64,
    pub wrist_yaw: f64,
    pub stretch_gripper: f64,
}

impl Default for StowConfig {
    fn default() -> Self {
        Self {
            head_pan: 0.0,
            head_tilt: 0.0,
            lift: 0.23,
            arm: 0.0,
            wrist_yaw: 3.4,
            stretch_gripper: 0.0,
        }
    }
}

/// 非 Dynamixel 轮询线程配置
///
/// 各 `*_downrate` 表示每 N 次迭代执行一次。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NonDynamixelLoopConfig {
    pub rate_hz: f64,
    pub status_downrate: u32,
    pub trajectory_downrate: u32,
    pub monitor_downrate: u32,
    pub sentry_downrate: u32,
}

impl Default for NonDynamixelLoopConfig {
    fn default() -> Self {
        Self {
            rate_hz: 25.0,
            status_downrate: 1,
            trajectory_downrate: 5,
            monitor_downrate: 5,
            sentry_downrate: 2,
        }
    }
}

/// Dynamixel 轮询线程配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamixelLoopConfig {
    pub rate_hz: f64,
    pub trajectory_downrate: u32,
    pub status_downrate: u32,
}

impl Default for DynamixelLoopConfig {
    fn default() -> Self {
        Self {
            rate_hz: 60.0,
            trajectory_downrate: 1,
            status_downrate: 4,
        }
    }
}

impl RobotConfig {
    /// 从 TOML 文本解析并校验
    pub fn from_toml_str(text: &str) -> Result<Self, DriverError> {
        let config: RobotConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载并校验
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DriverError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// 校验取值范围
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.history_capacity == 0 {
            return Err(DriverError::Config(
                "history_capacity must be at least 1".into(),
            ));
        }
        check_rate("non_dynamixel.rate_hz", self.non_dynamixel.rate_hz)?;
        check_rate("dynamixel.rate_hz", self.dynamixel.rate_hz)?;

        let divisors = [
            ("non_dynamixel.status_downrate", self.non_dynamixel.status_downrate),
            (
                "non_dynamixel.trajectory_downrate",
                self.non_dynamixel.trajectory_downrate,
            ),
            ("non_dynamixel.monitor_downrate", self.non_dynamixel.monitor_downrate),
            ("non_dynamixel.sentry_downrate", self.non_dynamixel.sentry_downrate),
            ("dynamixel.trajectory_downrate", self.dynamixel.trajectory_downrate),
            ("dynamixel.status_downrate", self.dynamixel.status_downrate),
        ];
        for (name, value) in divisors {
            if value == 0 {
                return Err(DriverError::Config(format!("{} must be at least 1", name)));
            }
        }
        Ok(())
    }
}

fn check_rate(name: &str, rate_hz: f64) -> Result<(), DriverError> {
    if !rate_hz.is_finite() || rate_hz <= 0.0 {
        return Err(DriverError::Config(format!(
            "{} must be a positive finite rate, got {}",
            name, rate_hz
        )));
    }
    // 周期必须能表示为 Duration
    if Duration::try_from_secs_f64(1.0 / rate_hz).is_err() {
        return Err(DriverError::Config(format!(
            "{} is too low to form a loop period, got {}",
            name, rate_hz
        )));
    }
    Ok(())
}
