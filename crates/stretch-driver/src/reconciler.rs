//! 时间戳对齐
//!
//! 把各设备的原始硬件时钟读数换算成与墙钟相关联的统一时间戳，
//! 每个非 Dynamixel 周期调用一次。

use std::collections::HashMap;
use stretch_device::ClockReadings;
use stretch_status::{ClockSource, SystemTimestamp, TimestampSet};
use tracing::debug;

/// 时间戳对齐器
pub trait TimestampReconciler: Send {
    /// 丢弃所有锚点（启动时调用）
    fn reset(&mut self);

    /// 根据本周期的原始读数写入 `timestamps` 中对应来源的时间戳
    ///
    /// 本周期没有读数的来源保持不变。
    fn step(&mut self, readings: &ClockReadings, timestamps: &mut TimestampSet);
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    hw_us: u64,
    wall_us: u64,
}

/// 基于偏移量的墙钟对齐
///
/// 每个硬件时钟第一次出现时记录 `(硬件读数, 墙钟)` 锚点，之后按偏移换算。
/// 硬件时钟回退（设备重启、计数器回绕）时重新锚定。
#[derive(Debug, Default)]
pub struct WallClockReconciler {
    anchors: HashMap<ClockSource, Anchor>,
}

impl WallClockReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以给定墙钟时间执行一步
    pub fn step_at(
        &mut self,
        readings: &ClockReadings,
        wall_now: SystemTimestamp,
        timestamps: &mut TimestampSet,
    ) {
        for &(source, raw_us) in readings.iter() {
            if !source.is_hardware() {
                continue;
            }
            let anchor = self.anchors.entry(source).or_insert(Anchor {
                hw_us: raw_us,
                wall_us: wall_now.time_us,
            });
            if raw_us < anchor.hw_us {
                debug!(
                    "Clock {} went backwards ({} < {}), re-anchoring",
                    source.name(),
                    raw_us,
                    anchor.hw_us
                );
                *anchor = Anchor {
                    hw_us: raw_us,
                    wall_us: wall_now.time_us,
                };
            }
            let stamp = anchor.wall_us + (raw_us - anchor.hw_us);
            timestamps.set(source, SystemTimestamp::from_micros(stamp));
        }
    }

    /// 已锚定的时钟数
    pub fn anchored_sources(&self) -> usize {
        self.anchors.len()
    }
}

impl TimestampReconciler for WallClockReconciler {
    fn reset(&mut self) {
        self.anchors.clear();
    }

    fn step(&mut self, readings: &ClockReadings, timestamps: &mut TimestampSet) {
        self.step_at(readings, SystemTimestamp::from_wall_time(), timestamps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_first_reading_anchors_to_wall_time() {
        let mut reconciler = WallClockReconciler::new();
        let mut ts = TimestampSet::default();
        let readings: ClockReadings = smallvec![(ClockSource::LiftEnc, 5_000)];

        reconciler.step_at(&readings, SystemTimestamp::from_micros(1_000_000), &mut ts);
        assert_eq!(ts.lift_enc.time_us, 1_000_000);
        assert!(!ts.arm_enc.is_set());
    }

    #[test]
    fn test_offset_is_preserved() {
        let mut reconciler = WallClockReconciler::new();
        let mut ts = TimestampSet::default();

        let first: ClockReadings = smallvec![(ClockSource::HwSync, 100)];
        reconciler.step_at(&first, SystemTimestamp::from_micros(2_000_000), &mut ts);

        // 墙钟抖动不影响换算结果，只看硬件读数的增量
        let second: ClockReadings = smallvec![(ClockSource::HwSync, 40_100)];
        reconciler.step_at(&second, SystemTimestamp::from_micros(2_050_000), &mut ts);
        assert_eq!(ts.hw_sync.time_us, 2_040_000);
    }

    #[test]
    fn test_backwards_clock_reanchors() {
        let mut reconciler = WallClockReconciler::new();
        let mut ts = TimestampSet::default();

        let first: ClockReadings = smallvec![(ClockSource::WaccAcc, 90_000)];
        reconciler.step_at(&first, SystemTimestamp::from_micros(1_000_000), &mut ts);

        let reset: ClockReadings = smallvec![(ClockSource::WaccAcc, 10)];
        reconciler.step_at(&reset, SystemTimestamp::from_micros(3_000_000), &mut ts);
        assert_eq!(ts.wacc_acc.time_us, 3_000_000);
    }

    #[test]
    fn test_wall_clock_sources_are_ignored() {
        let mut reconciler = WallClockReconciler::new();
        let mut ts = TimestampSet::default();
        let readings: ClockReadings = smallvec![(ClockSource::DynamixelWallTime, 5)];
        reconciler.step_at(&readings, SystemTimestamp::from_micros(1), &mut ts);
        assert!(!ts.dynamixel_wall_time.is_set());
        assert_eq!(reconciler.anchored_sources(), 0);
    }

    #[test]
    fn test_reset_clears_anchors() {
        let mut reconciler = WallClockReconciler::new();
        let mut ts = TimestampSet::default();
        let readings: ClockReadings = smallvec![
            (ClockSource::LeftWheelEnc, 1),
            (ClockSource::RightWheelEnc, 1),
        ];
        reconciler.step(&readings, &mut ts);
        assert_eq!(reconciler.anchored_sources(), 2);
        reconciler.reset();
        assert_eq!(reconciler.anchored_sources(), 0);
    }
}
