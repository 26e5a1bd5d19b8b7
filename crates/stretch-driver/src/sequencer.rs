//! 回零与收纳流程
//!
//! 两个流程都严格顺序执行并阻塞调用线程。
//! 有界等待超时后只记录警告并继续执行后续步骤，卡住的关节不会中止整个流程。
//!
//! 收纳时升降与伸缩臂的先后顺序取决于升降当前高度：
//! 升降低于收纳高度时先抬升降，否则伸缩臂先收回、升降最后下降，避免碰撞。

use crate::context::RobotContext;
use crate::error::DriverError;
use crate::sync;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use stretch_device::{DeviceError, PrismaticJoint, ServoChain, ServoJoint, Shared};
use tracing::{error, info, warn};

/// 收纳时每次下发命令后的稳定时间
pub const STOW_SETTLE: Duration = Duration::from_millis(250);
/// 收敛轮询间隔
pub const CONVERGENCE_POLL: Duration = Duration::from_millis(100);
/// 升降先行时的收敛等待上限
pub const LIFT_FIRST_TIMEOUT: Duration = Duration::from_secs(3);
/// 伸缩臂收敛等待上限
pub const ARM_TIMEOUT: Duration = Duration::from_secs(3);
/// 升降最后下降时的收敛等待上限
pub const LIFT_LAST_TIMEOUT: Duration = Duration::from_secs(10);

const GRIPPER: &str = "stretch_gripper";
const WRIST_YAW: &str = "wrist_yaw";

/// 轮询 `near_pos_setpoint` 直到到位或超时，返回是否到位
fn wait_near_setpoint(joint: &Shared<dyn PrismaticJoint>, name: &str, timeout: Duration) -> bool {
    let start = Instant::now();
    loop {
        if joint.lock().near_pos_setpoint() {
            return true;
        }
        if start.elapsed() >= timeout {
            warn!("{} did not reach its setpoint within {:?}, continuing", name, timeout);
            return false;
        }
        std::thread::sleep(CONVERGENCE_POLL);
    }
}

/// 在舵机链上对指定关节执行操作，关节不存在时报错
fn with_joint<R>(
    chain: &Shared<dyn ServoChain>,
    chain_name: &'static str,
    joint_name: &str,
    op: impl FnOnce(&mut dyn ServoJoint) -> Result<R, DeviceError>,
) -> Result<R, DriverError> {
    let mut guard = chain.lock();
    let joint = guard.joint_mut(joint_name).ok_or_else(|| {
        DriverError::device(chain_name, DeviceError::UnknownJoint(joint_name.to_string()))
    })?;
    op(joint).map_err(|e| DriverError::device(chain_name, e))
}

/// 设置直线关节目标并下发，然后等待稳定与收敛
fn stow_prismatic(
    ctx: &RobotContext,
    joint: &Shared<dyn PrismaticJoint>,
    name: &str,
    target: f64,
    timeout: Duration,
) -> Result<(), DriverError> {
    info!("Stowing {}", name);
    joint.lock().move_to(target);
    sync::push_command(ctx)?;
    std::thread::sleep(STOW_SETTLE);
    wait_near_setpoint(joint, name, timeout);
    Ok(())
}

/// 收纳
pub(crate) fn stow(ctx: &RobotContext) -> Result<(), DriverError> {
    let devices = &ctx.devices;
    let targets = ctx.config.stow;

    info!("Stowing head");
    with_joint(&devices.head, "head", "head_pan", |j| j.move_to(targets.head_pan))?;
    with_joint(&devices.head, "head", "head_tilt", |j| j.move_to(targets.head_tilt))?;

    // 升降低于收纳高度：先抬起，给伸缩臂让出空间
    let lift_first = devices.lift.lock().position() <= targets.lift;
    if lift_first {
        stow_prismatic(ctx, &devices.lift, "lift", targets.lift, LIFT_FIRST_TIMEOUT)?;
    }

    stow_prismatic(ctx, &devices.arm, "arm", targets.arm, ARM_TIMEOUT)?;

    info!("Stowing {}", WRIST_YAW);
    with_joint(&devices.end_of_arm, "end_of_arm", WRIST_YAW, |j| j.move_to(targets.wrist_yaw))?;
    let gripper_present = devices.end_of_arm.lock().is_tool_present(GRIPPER);
    if gripper_present {
        info!("Stowing {}", GRIPPER);
        with_joint(&devices.end_of_arm, "end_of_arm", GRIPPER, |j| {
            j.move_to(targets.stretch_gripper)
        })?;
    }
    std::thread::sleep(STOW_SETTLE);

    if !lift_first {
        stow_prismatic(ctx, &devices.lift, "lift", targets.lift, LIFT_LAST_TIMEOUT)?;
    }

    // wrist_yaw 停稳前不返回
    while devices
        .end_of_arm
        .lock()
        .joint(WRIST_YAW)
        .is_some_and(|joint| joint.is_moving())
    {
        std::thread::sleep(CONVERGENCE_POLL);
    }
    info!("Stow complete");
    Ok(())
}

fn home_chain(
    chain: &Shared<dyn ServoChain>,
    chain_name: &'static str,
    requiring_calibration_only: bool,
) -> Result<(), DriverError> {
    let names = chain.lock().joint_names();
    for name in names {
        let needs_home = if requiring_calibration_only {
            chain
                .lock()
                .joint(&name)
                .is_some_and(|joint| joint.requires_calibration())
        } else {
            true
        };
        if needs_home {
            info!("Homing {}", name);
            with_joint(chain, chain_name, &name, |j| j.home())?;
        }
    }
    Ok(())
}

fn home_all(ctx: &RobotContext) -> Result<(), DriverError> {
    let devices = &ctx.devices;
    home_chain(&devices.head, "head", false)?;

    info!("Homing lift");
    devices
        .lift
        .lock()
        .home()
        .map_err(|e| DriverError::device("lift", e))?;

    info!("Homing arm");
    devices
        .arm
        .lock()
        .home()
        .map_err(|e| DriverError::device("arm", e))?;

    home_chain(&devices.end_of_arm, "end_of_arm", true)
}

/// 回零
///
/// 回零期间关闭同步模式，使各设备各自独立完成回零；结束后（包括出错时）
/// 恢复原先的同步模式设置。成功后蜂鸣提示并下发命令。
pub(crate) fn home(ctx: &RobotContext) -> Result<(), DriverError> {
    let was_buffered = ctx.sync_mode.get(Ordering::Acquire).is_buffered();
    let result = sync::disable_sync_mode(ctx)
        .and_then(|()| sync::push_command(ctx))
        .and_then(|()| home_all(ctx));

    if was_buffered && let Err(e) = sync::enable_sync_mode(ctx) {
        if result.is_ok() {
            return Err(e);
        }
        error!("Failed to restore sync mode after homing: {}", e);
    }
    result?;

    ctx.devices
        .pimu
        .lock()
        .trigger_beep()
        .map_err(|e| DriverError::device("pimu", e))?;
    sync::push_command(ctx)?;
    info!("Homing complete");
    Ok(())
}

/// 全部需要标定的关节均已标定
pub(crate) fn is_calibrated(ctx: &RobotContext) -> bool {
    let devices = &ctx.devices;
    if !devices.lift.lock().pos_calibrated() || !devices.arm.lock().pos_calibrated() {
        return false;
    }
    let end_of_arm = devices.end_of_arm.lock();
    end_of_arm.joint_names().iter().all(|name| {
        end_of_arm
            .joint(name)
            .is_none_or(|joint| !joint.requires_calibration() || joint.is_calibrated())
    })
}
