//! # 时间戳
//!
//! 组合状态中使用的具名时钟来源及其时间戳集合。
//!
//! | 来源 | 产生方 | 说明 |
//! |------|--------|------|
//! | `hw_sync` | Pimu | 硬件同步脉冲时刻 |
//! | `pimu_imu` | Pimu | IMU 采样时刻 |
//! | `lift_enc` / `arm_enc` | 步进电机板 | 编码器采样时刻 |
//! | `right_wheel_enc` / `left_wheel_enc` | 底盘电机板 | 轮编码器采样时刻 |
//! | `wacc_acc` | Wacc | 腕部加速度计采样时刻 |
//! | `dynamixel_wall_time` | 核心 | Dynamixel 状态合并时的墙钟时间 |
//! | `non_dynamixel_wall_time` | 核心 | 非 Dynamixel 状态合并时的墙钟时间 |

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// 系统时间戳（微秒，UNIX 纪元起）
///
/// `0` 表示尚未写入。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SystemTimestamp {
    /// 微秒时间戳，0 表示不可用
    pub time_us: u64,
}

impl SystemTimestamp {
    /// 未设置的时间戳
    pub const UNSET: Self = Self { time_us: 0 };

    /// 以当前墙钟时间创建
    pub fn from_wall_time() -> Self {
        let time_us =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_micros() as u64;
        Self { time_us }
    }

    /// 从微秒值创建
    pub const fn from_micros(time_us: u64) -> Self {
        Self { time_us }
    }

    /// 从 `Duration`（相对 UNIX 纪元）创建
    pub fn from_duration(since_epoch: Duration) -> Self {
        Self {
            time_us: since_epoch.as_micros() as u64,
        }
    }

    /// 是否已写入
    pub fn is_set(&self) -> bool {
        self.time_us != 0
    }

    /// 以秒为单位的浮点值
    pub fn as_secs_f64(&self) -> f64 {
        self.time_us as f64 / 1_000_000.0
    }

    /// 严格晚于 `previous` 的下一个时间戳
    ///
    /// 墙钟可能回拨或在同一微秒内重复读取，此处保证单调递增。
    pub fn strictly_after(self, previous: Self) -> Self {
        if self.time_us > previous.time_us {
            self
        } else {
            Self {
                time_us: previous.time_us + 1,
            }
        }
    }
}

/// 具名时钟来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClockSource {
    HwSync,
    PimuImu,
    LiftEnc,
    ArmEnc,
    RightWheelEnc,
    LeftWheelEnc,
    WaccAcc,
    DynamixelWallTime,
    NonDynamixelWallTime,
}

impl ClockSource {
    /// 所有时钟来源（固定顺序）
    pub const ALL: [ClockSource; 9] = [
        ClockSource::HwSync,
        ClockSource::PimuImu,
        ClockSource::LiftEnc,
        ClockSource::ArmEnc,
        ClockSource::RightWheelEnc,
        ClockSource::LeftWheelEnc,
        ClockSource::WaccAcc,
        ClockSource::DynamixelWallTime,
        ClockSource::NonDynamixelWallTime,
    ];

    /// 状态记录中的键名
    pub fn name(&self) -> &'static str {
        match self {
            ClockSource::HwSync => "hw_sync",
            ClockSource::PimuImu => "pimu_imu",
            ClockSource::LiftEnc => "lift_enc",
            ClockSource::ArmEnc => "arm_enc",
            ClockSource::RightWheelEnc => "right_wheel_enc",
            ClockSource::LeftWheelEnc => "left_wheel_enc",
            ClockSource::WaccAcc => "wacc_acc",
            ClockSource::DynamixelWallTime => "dynamixel_wall_time",
            ClockSource::NonDynamixelWallTime => "non_dynamixel_wall_time",
        }
    }

    /// 是否由设备硬件时钟产生（墙钟时间由核心自己写入）
    pub fn is_hardware(&self) -> bool {
        !matches!(
            self,
            ClockSource::DynamixelWallTime | ClockSource::NonDynamixelWallTime
        )
    }
}

/// 组合状态中的时间戳集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimestampSet {
    pub hw_sync: SystemTimestamp,
    pub pimu_imu: SystemTimestamp,
    pub lift_enc: SystemTimestamp,
    pub arm_enc: SystemTimestamp,
    pub right_wheel_enc: SystemTimestamp,
    pub left_wheel_enc: SystemTimestamp,
    pub wacc_acc: SystemTimestamp,
    pub dynamixel_wall_time: SystemTimestamp,
    pub non_dynamixel_wall_time: SystemTimestamp,
}

impl TimestampSet {
    /// 按来源读取
    pub fn get(&self, source: ClockSource) -> SystemTimestamp {
        match source {
            ClockSource::HwSync => self.hw_sync,
            ClockSource::PimuImu => self.pimu_imu,
            ClockSource::LiftEnc => self.lift_enc,
            ClockSource::ArmEnc => self.arm_enc,
            ClockSource::RightWheelEnc => self.right_wheel_enc,
            ClockSource::LeftWheelEnc => self.left_wheel_enc,
            ClockSource::WaccAcc => self.wacc_acc,
            ClockSource::DynamixelWallTime => self.dynamixel_wall_time,
            ClockSource::NonDynamixelWallTime => self.non_dynamixel_wall_time,
        }
    }

    /// 按来源写入
    pub fn set(&mut self, source: ClockSource, stamp: SystemTimestamp) {
        let slot = match source {
            ClockSource::HwSync => &mut self.hw_sync,
            ClockSource::PimuImu => &mut self.pimu_imu,
            ClockSource::LiftEnc => &mut self.lift_enc,
            ClockSource::ArmEnc => &mut self.arm_enc,
            ClockSource::RightWheelEnc => &mut self.right_wheel_enc,
            ClockSource::LeftWheelEnc => &mut self.left_wheel_enc,
            ClockSource::WaccAcc => &mut self.wacc_acc,
            ClockSource::DynamixelWallTime => &mut self.dynamixel_wall_time,
            ClockSource::NonDynamixelWallTime => &mut self.non_dynamixel_wall_time,
        };
        *slot = stamp;
    }

    /// 遍历 `(来源, 时间戳)`
    pub fn iter(&self) -> impl Iterator<Item = (ClockSource, SystemTimestamp)> + '_ {
        ClockSource::ALL.iter().map(move |source| (*source, self.get(*source)))
    }
}
