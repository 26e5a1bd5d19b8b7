//! 同步模式命令协议
//!
//! 同步模式下各设备缓存命令，`push_command()` 在全部设备写完后由 pimu
//! 发出一次电机同步脉冲，使所有缓存命令在同一个物理脉冲上生效。

use crate::context::RobotContext;
use crate::error::DriverError;
use crate::mode::SyncMode;
use std::sync::atomic::Ordering;
use stretch_device::{Device, Shared, SyncCapable};
use tracing::debug;

/// 切换单个设备的同步模式并立即下发命令，使传输层模式与缓存标志一致
fn toggle_and_push<T>(device: &Shared<T>, name: &'static str, enable: bool) -> Result<(), DriverError>
where
    T: Device + SyncCapable + ?Sized,
{
    let mut guard = device.lock();
    if enable {
        guard.enable_sync_mode();
    } else {
        guard.disable_sync_mode();
    }
    guard
        .push_command()
        .map_err(|e| DriverError::device(name, e))
}

fn push<T: Device + ?Sized>(device: &Shared<T>, name: &'static str) -> Result<(), DriverError> {
    device
        .lock()
        .push_command()
        .map_err(|e| DriverError::device(name, e))
}

/// 开启同步模式
///
/// 顺序：arm、lift、base（两个轮电机）、wacc、pimu。pimu 最后开启，
/// 保证其余设备都进入缓存模式后才开始出现同步脉冲。
/// 全部成功后运行时模式才切换为 `Buffered`。
pub(crate) fn enable_sync_mode(ctx: &RobotContext) -> Result<(), DriverError> {
    let _command = ctx.command_lock.lock();
    let devices = &ctx.devices;
    toggle_and_push(&devices.arm, "arm", true)?;
    toggle_and_push(&devices.lift, "lift", true)?;
    toggle_and_push(&devices.base, "base", true)?;
    toggle_and_push(&devices.wacc, "wacc", true)?;
    toggle_and_push(&devices.pimu, "pimu", true)?;
    ctx.sync_mode.set(SyncMode::Buffered, Ordering::Release);
    debug!("Sync mode enabled");
    Ok(())
}

/// 关闭同步模式
///
/// 顺序：pimu、arm、lift、base、wacc。运行时模式先切换为 `Immediate`，
/// 非 Dynamixel 线程随即停止发出状态同步脉冲。
pub(crate) fn disable_sync_mode(ctx: &RobotContext) -> Result<(), DriverError> {
    let _command = ctx.command_lock.lock();
    ctx.sync_mode.set(SyncMode::Immediate, Ordering::Release);
    let devices = &ctx.devices;
    toggle_and_push(&devices.pimu, "pimu", false)?;
    toggle_and_push(&devices.arm, "arm", false)?;
    toggle_and_push(&devices.lift, "lift", false)?;
    toggle_and_push(&devices.base, "base", false)?;
    toggle_and_push(&devices.wacc, "wacc", false)?;
    debug!("Sync mode disabled");
    Ok(())
}

/// 下发所有待发送命令并触发电机同步
///
/// 顺序：base、arm、lift、pimu、wacc，然后 pimu 发出电机同步脉冲。
pub(crate) fn push_command(ctx: &RobotContext) -> Result<(), DriverError> {
    let _command = ctx.command_lock.lock();
    let devices = &ctx.devices;
    push(&devices.base, "base")?;
    push(&devices.arm, "arm")?;
    push(&devices.lift, "lift")?;
    push(&devices.pimu, "pimu")?;
    push(&devices.wacc, "wacc")?;
    devices
        .pimu
        .lock()
        .trigger_motor_sync()
        .map_err(|e| DriverError::device("pimu", e))
}
