//! 多关节轨迹协调
//!
//! 轨迹执行不占用独立线程：启动后由两个轮询线程按降频系数推送路点，
//! 直到各关节的 `trajectory_active` 标志清除。

use crate::context::RobotContext;
use crate::devices::lock_or_skip;
use crate::error::DriverError;
use crate::metrics::LoopMetrics;
use std::sync::atomic::Ordering;
use std::time::Duration;
use stretch_device::{DeviceError, ServoChain, Shared, TrajectoryControl, TrajectoryJoint};
use stretch_status::Subsystem;
use tracing::{debug, warn};

/// 启动后等待同步启动生效的时间
pub const TRAJECTORY_START_GRACE: Duration = Duration::from_millis(100);

/// 参与轨迹的舵机关节 `(所属链, 关节名, 控制方式)`
const SERVO_TRAJECTORY_JOINTS: [(Subsystem, &str, TrajectoryControl); 3] = [
    (
        Subsystem::Head,
        "head_pan",
        TrajectoryControl::Velocity {
            watchdog_timeout: None,
        },
    ),
    (
        Subsystem::Head,
        "head_tilt",
        TrajectoryControl::Velocity {
            watchdog_timeout: None,
        },
    ),
    (Subsystem::EndOfArm, "wrist_yaw", TrajectoryControl::Position),
];

fn chain(ctx: &RobotContext, subsystem: Subsystem) -> &Shared<dyn ServoChain> {
    match subsystem {
        Subsystem::Head => &ctx.devices.head,
        _ => &ctx.devices.end_of_arm,
    }
}

fn push_if_active<T>(joint: &mut T, name: &str, metrics: &LoopMetrics)
where
    T: TrajectoryJoint + ?Sized,
{
    if !joint.trajectory_active() {
        return;
    }
    match joint.push_trajectory() {
        Ok(()) => LoopMetrics::incr(&metrics.trajectory_pushes),
        Err(e) => {
            warn!("Trajectory push to {} failed: {}", name, e);
            LoopMetrics::incr(&metrics.trajectory_errors);
        },
    }
}

/// 非 Dynamixel 关节路点推送（arm、lift、base）
pub(crate) fn push_non_dynamixel_waypoints(ctx: &RobotContext) {
    let metrics = &ctx.metrics;
    if let Some(mut arm) = lock_or_skip(&ctx.devices.arm, Subsystem::Arm, metrics) {
        push_if_active(&mut *arm, "arm", metrics);
    }
    if let Some(mut lift) = lock_or_skip(&ctx.devices.lift, Subsystem::Lift, metrics) {
        push_if_active(&mut *lift, "lift", metrics);
    }
    if let Some(mut base) = lock_or_skip(&ctx.devices.base, Subsystem::Base, metrics) {
        push_if_active(&mut *base, "base", metrics);
    }
}

/// Dynamixel 关节路点推送（head_pan、head_tilt、wrist_yaw）
pub(crate) fn push_dynamixel_waypoints(ctx: &RobotContext) {
    let metrics = &ctx.metrics;
    for (subsystem, joint_name, _) in SERVO_TRAJECTORY_JOINTS {
        let Some(mut guard) = lock_or_skip(chain(ctx, subsystem), subsystem, metrics) else {
            continue;
        };
        if let Some(joint) = guard.joint_mut(joint_name) {
            push_if_active(joint, joint_name, metrics);
        }
    }
}

/// 启动全部关节的轨迹
///
/// lift、arm、base 以位置控制启动；同步模式下随即触发一次电机同步，
/// 使三者同时起步。之后启动头部（速度控制，关闭看门狗）与 wrist_yaw（位置控制），
/// 最后等待 [`TRAJECTORY_START_GRACE`]。
pub(crate) fn start(ctx: &RobotContext) -> Result<(), DriverError> {
    {
        let _command = ctx.command_lock.lock();
        let devices = &ctx.devices;
        devices
            .lift
            .lock()
            .start_trajectory(TrajectoryControl::Position)
            .map_err(|e| DriverError::device("lift", e))?;
        devices
            .arm
            .lock()
            .start_trajectory(TrajectoryControl::Position)
            .map_err(|e| DriverError::device("arm", e))?;
        devices
            .base
            .lock()
            .start_trajectory(TrajectoryControl::Position)
            .map_err(|e| DriverError::device("base", e))?;
        if ctx.sync_mode.get(Ordering::Acquire).is_buffered() {
            devices
                .pimu
                .lock()
                .trigger_motor_sync()
                .map_err(|e| DriverError::device("pimu", e))?;
        }
    }

    for (subsystem, joint_name, control) in SERVO_TRAJECTORY_JOINTS {
        let mut guard = chain(ctx, subsystem).lock();
        let joint = guard.joint_mut(joint_name).ok_or_else(|| {
            DriverError::device(
                subsystem.name(),
                DeviceError::UnknownJoint(joint_name.to_string()),
            )
        })?;
        joint
            .start_trajectory(control)
            .map_err(|e| DriverError::device(subsystem.name(), e))?;
    }

    debug!("Trajectory started, waiting {:?} for synced start", TRAJECTORY_START_GRACE);
    spin_sleep::sleep(TRAJECTORY_START_GRACE);
    Ok(())
}

/// 停止全部关节的轨迹
///
/// 顺序：lift、arm、base、head_pan、head_tilt、wrist_yaw。缺失的舵机关节跳过。
pub(crate) fn stop(ctx: &RobotContext) {
    let devices = &ctx.devices;
    devices.lift.lock().stop_trajectory();
    devices.arm.lock().stop_trajectory();
    devices.base.lock().stop_trajectory();
    for (subsystem, joint_name, _) in SERVO_TRAJECTORY_JOINTS {
        let mut guard = chain(ctx, subsystem).lock();
        if let Some(joint) = guard.joint_mut(joint_name) {
            joint.stop_trajectory();
        }
    }
}

/// 任一参与关节的轨迹仍在执行
pub(crate) fn is_executing(ctx: &RobotContext) -> bool {
    let devices = &ctx.devices;
    if devices.lift.lock().trajectory_active()
        || devices.arm.lock().trajectory_active()
        || devices.base.lock().trajectory_active()
    {
        return true;
    }
    SERVO_TRAJECTORY_JOINTS
        .iter()
        .any(|(subsystem, joint_name, _)| {
            chain(ctx, *subsystem)
                .lock()
                .joint(joint_name)
                .is_some_and(|joint| joint.trajectory_active())
        })
}
