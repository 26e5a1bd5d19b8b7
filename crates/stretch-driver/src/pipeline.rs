//! 轮询线程
//!
//! 两个固定频率线程共享同一个状态存储：
//!
//! - 非 Dynamixel 线程（默认 25Hz）：状态同步脉冲 → 按固定顺序拉取
//!   wacc、base、lift、arm、pimu → 时间戳对齐 → 追加完整快照；
//!   按降频系数推送轨迹路点、执行监控器与哨兵
//! - Dynamixel 线程（默认 60Hz）：按降频系数推送舵机路点；
//!   以更低的频率拉取 end_of_arm 与 head，做局部合并后追加
//!
//! 两个线程只通过存储锁交互，存储锁从不跨越设备 I/O。
//! 周期超时不补偿，直接进入下一次迭代（最短休眠 1ms）。

use crate::context::RobotContext;
use crate::devices::lock_or_skip;
use crate::hooks::StatusOrigin;
use crate::metrics::LoopMetrics;
use crate::trajectory;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use stretch_device::{ClockReadings, Device, DeviceError, Shared};
use stretch_status::{ClockSource, Subsystem, SubsystemStatus, SystemTimestamp, TimestampSet};
use tracing::{error, trace, warn};

/// 每次迭代末尾的最短休眠
pub const MIN_SLEEP: Duration = Duration::from_millis(1);

/// 非 Dynamixel 线程主循环
pub(crate) fn non_dynamixel_loop(ctx: Arc<RobotContext>, is_running: Arc<AtomicBool>) {
    let rate_hz = ctx.config.non_dynamixel.rate_hz;
    run_periodic(
        "non-dynamixel",
        rate_hz,
        &ctx,
        &is_running,
        &ctx.non_dynamixel_ready,
        &ctx.metrics.non_dynamixel_iterations,
        non_dynamixel_tick,
    );
}

/// Dynamixel 线程主循环
pub(crate) fn dynamixel_loop(ctx: Arc<RobotContext>, is_running: Arc<AtomicBool>) {
    let rate_hz = ctx.config.dynamixel.rate_hz;
    run_periodic(
        "dynamixel",
        rate_hz,
        &ctx,
        &is_running,
        &ctx.dynamixel_ready,
        &ctx.metrics.dynamixel_iterations,
        dynamixel_tick,
    );
}

fn run_periodic(
    name: &str,
    rate_hz: f64,
    ctx: &RobotContext,
    is_running: &AtomicBool,
    ready: &AtomicBool,
    iterations: &AtomicU64,
    tick: fn(&RobotContext, u64),
) {
    // 设置线程优先级（可选 feature）
    #[cfg(feature = "realtime")]
    {
        use thread_priority::*;
        use tracing::info;

        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(_) => {
                info!("{} loop priority set to MAX (realtime)", name);
            },
            Err(e) => {
                warn!(
                    "Failed to set {} loop priority: {}. \
                    On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                    name, e
                );
            },
        }
    }

    let period = Duration::from_secs_f64(1.0 / rate_hz);
    let mut iteration: u64 = 0;
    trace!("{} loop started, period {:?}", name, period);

    while is_running.load(Ordering::Acquire) {
        let started = Instant::now();
        tick(ctx, iteration);
        ready.store(true, Ordering::Release);
        LoopMetrics::incr(iterations);
        iteration = iteration.wrapping_add(1);

        if !is_running.load(Ordering::Acquire) {
            break;
        }
        let elapsed = started.elapsed();
        if elapsed >= period {
            trace!("{} loop overrun: {:?} > {:?}", name, elapsed, period);
            LoopMetrics::incr(&ctx.metrics.overruns);
        }
        spin_sleep::sleep(period.saturating_sub(elapsed).max(MIN_SLEEP));
    }

    trace!("{} loop: is_running flag is false, exiting", name);
}

fn due(iteration: u64, downrate: u32) -> bool {
    iteration % u64::from(downrate.max(1)) == 0
}

/// 拉取非 Dynamixel 设备状态
///
/// 拉取失败时记录并返回设备上一次的状态；设备被占用时返回 `None`。
fn pull_device<T: Device + ?Sized>(
    device: &Shared<T>,
    subsystem: Subsystem,
    metrics: &LoopMetrics,
    readings: &mut ClockReadings,
) -> Option<SubsystemStatus> {
    let mut guard = lock_or_skip(device, subsystem, metrics)?;
    match guard.pull_status() {
        Ok(()) => {
            LoopMetrics::incr(&metrics.status_pulls);
            readings.extend(guard.clock_readings());
        },
        Err(e) => {
            warn!("{} status pull failed: {}", subsystem.name(), e);
            LoopMetrics::incr(&metrics.pull_errors);
        },
    }
    Some(guard.status())
}

fn trigger_status_sync(ctx: &RobotContext) {
    let metrics = &ctx.metrics;
    // 非同步模式下不争用命令锁
    if !ctx.sync_mode.get(Ordering::Acquire).is_buffered() {
        return;
    }
    let _command = ctx.command_lock.lock();
    if !ctx.sync_mode.get(Ordering::Acquire).is_buffered() {
        return;
    }
    if let Some(mut pimu) = lock_or_skip(&ctx.devices.pimu, Subsystem::Pimu, metrics) {
        if let Err(e) = pimu.trigger_status_sync() {
            warn!("pimu status sync failed: {}", e);
        }
    }
    if let Some(mut wacc) = lock_or_skip(&ctx.devices.wacc, Subsystem::Wacc, metrics) {
        if let Err(e) = wacc.trigger_status_sync() {
            warn!("wacc status sync failed: {}", e);
        }
    }
    LoopMetrics::incr(&metrics.status_syncs);
}

fn append_non_dynamixel_status(ctx: &RobotContext) {
    let devices = &ctx.devices;
    let metrics = &ctx.metrics;
    let mut readings = ClockReadings::new();

    // 固定拉取顺序
    let pulled = [
        (Subsystem::Wacc, pull_device(&devices.wacc, Subsystem::Wacc, metrics, &mut readings)),
        (Subsystem::Base, pull_device(&devices.base, Subsystem::Base, metrics, &mut readings)),
        (Subsystem::Lift, pull_device(&devices.lift, Subsystem::Lift, metrics, &mut readings)),
        (Subsystem::Arm, pull_device(&devices.arm, Subsystem::Arm, metrics, &mut readings)),
        (Subsystem::Pimu, pull_device(&devices.pimu, Subsystem::Pimu, metrics, &mut readings)),
    ];

    let mut timestamps = TimestampSet::default();
    ctx.reconciler.lock().step(&readings, &mut timestamps);
    let wall_now = SystemTimestamp::from_wall_time();

    let entry = ctx.store.merge_latest_entry(|status| {
        for (subsystem, pulled) in pulled {
            if let Some(pulled) = pulled {
                status.set(subsystem, pulled);
            }
        }
        for (source, stamp) in timestamps.iter() {
            if source.is_hardware() && stamp.is_set() {
                status.timestamps.set(source, stamp);
            }
        }
        let previous = status.timestamps.non_dynamixel_wall_time;
        status.timestamps.non_dynamixel_wall_time = wall_now.strictly_after(previous);
    });
    ctx.after_append(&entry, StatusOrigin::NonDynamixel);
}

/// 非 Dynamixel 线程的一次迭代
pub(crate) fn non_dynamixel_tick(ctx: &RobotContext, iteration: u64) {
    let config = &ctx.config.non_dynamixel;

    if due(iteration, config.status_downrate) {
        trigger_status_sync(ctx);
        append_non_dynamixel_status(ctx);
    }

    if due(iteration, config.trajectory_downrate) {
        trajectory::push_non_dynamixel_waypoints(ctx);
    }

    if ctx.config.use_monitor && due(iteration, config.monitor_downrate) {
        if let Some(monitor) = ctx.monitor.lock().as_mut() {
            monitor.step(&ctx.store.latest());
            LoopMetrics::incr(&ctx.metrics.monitor_steps);
        }
    }

    if ctx.config.use_sentry && due(iteration, config.sentry_downrate) {
        if let Some(sentry) = ctx.sentry.lock().as_mut() {
            sentry.step(&ctx.store.latest());
            LoopMetrics::incr(&ctx.metrics.sentry_steps);
        }
    }
}

/// 拉取舵机链状态；`Ok(None)` 表示设备被占用
fn pull_servo_chain<T: Device + ?Sized>(
    device: &Shared<T>,
    subsystem: Subsystem,
    metrics: &LoopMetrics,
) -> Result<Option<SubsystemStatus>, DeviceError> {
    let Some(mut guard) = lock_or_skip(device, subsystem, metrics) else {
        return Ok(None);
    };
    guard.pull_status()?;
    LoopMetrics::incr(&metrics.status_pulls);
    Ok(Some(guard.status()))
}

fn append_dynamixel_status(ctx: &RobotContext) {
    let devices = &ctx.devices;
    let metrics = &ctx.metrics;

    let pulled = pull_servo_chain(&devices.end_of_arm, Subsystem::EndOfArm, metrics).and_then(
        |end_of_arm| {
            let head = pull_servo_chain(&devices.head, Subsystem::Head, metrics)?;
            Ok((end_of_arm, head))
        },
    );

    let (end_of_arm, head) = match pulled {
        Ok(pulled) => pulled,
        Err(e) => {
            if e.is_transport() {
                warn!("Dynamixel status pull failed, skipping tick: {}", e);
            } else {
                error!("Dynamixel status pull failed, skipping tick: {}", e);
            }
            LoopMetrics::incr(&metrics.pull_errors);
            LoopMetrics::incr(&metrics.skipped_ticks);
            return;
        },
    };

    if end_of_arm.is_none() && head.is_none() {
        return;
    }

    let wall_now = SystemTimestamp::from_wall_time();
    let entry = ctx.store.merge_latest_entry(|status| {
        if let Some(end_of_arm) = end_of_arm {
            status.end_of_arm = end_of_arm;
        }
        if let Some(head) = head {
            status.head = head;
        }
        let previous = status.timestamps.get(ClockSource::DynamixelWallTime);
        status
            .timestamps
            .set(ClockSource::DynamixelWallTime, wall_now.strictly_after(previous));
    });
    ctx.after_append(&entry, StatusOrigin::Dynamixel);
}

/// Dynamixel 线程的一次迭代
pub(crate) fn dynamixel_tick(ctx: &RobotContext, iteration: u64) {
    let config = &ctx.config.dynamixel;

    if due(iteration, config.trajectory_downrate) {
        trajectory::push_dynamixel_waypoints(ctx);
    }

    if due(iteration, config.status_downrate) {
        append_dynamixel_status(ctx);
    }
}
