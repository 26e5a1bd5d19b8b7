//! 机器人编排（对外 API）
//!
//! [`Robot`] 持有全部设备、状态存储与两个轮询线程，
//! 对外提供状态读取、命令下发、同步模式切换、回零收纳与轨迹控制。

use crate::config::RobotConfig;
use crate::context::RobotContext;
use crate::devices::DeviceSet;
use crate::error::DriverError;
use crate::hooks::{HookManager, StatusCallback};
use crate::metrics::LoopMetrics;
use crate::mode::SyncMode;
use crate::report::StatusReport;
use crate::store::StatusEntry;
use crate::{pipeline, sequencer, sync, trajectory};
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use stretch_status::CompositeStatus;
use tracing::{error, info, trace, warn};

/// 启动后等待两个线程产出首个状态的时间
pub const FIRST_STATUS_TIMEOUT: Duration = Duration::from_secs(3);
/// 等待首个状态的轮询间隔
const FIRST_STATUS_POLL: Duration = Duration::from_millis(100);

/// Stretch 机器人
///
/// 通过 [`RobotBuilder`](crate::RobotBuilder) 创建。
///
/// # 线程模型
///
/// - `stretch-non-dxl`：非 Dynamixel 轮询线程
/// - `stretch-dxl`：Dynamixel 轮询线程
/// - 调用方线程：命令下发、回零收纳、轨迹启停
///
/// 所有 `&self` 方法都可以在多个线程中并发调用。
pub struct Robot {
    ctx: Arc<RobotContext>,
    /// 本次运行的线程运行标志（每次 `startup()` 新建）
    is_running: Arc<AtomicBool>,
    non_dynamixel_thread: Option<JoinHandle<()>>,
    dynamixel_thread: Option<JoinHandle<()>>,
    started: bool,
}

impl Robot {
    pub(crate) fn from_context(ctx: RobotContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            is_running: Arc::new(AtomicBool::new(false)),
            non_dynamixel_thread: None,
            dynamixel_thread: None,
            started: false,
        }
    }

    /// 启动机器人
    ///
    /// 1. 按 pimu、base、lift、arm、head、wacc、end_of_arm 顺序启动设备，
    ///    单个设备失败只记录日志
    /// 2. 重置时间戳对齐器，按配置开启或关闭同步模式
    /// 3. 启动监控器与哨兵（若启用）
    /// 4. 启动两个轮询线程，等待首个状态（最多 [`FIRST_STATUS_TIMEOUT`]）
    ///
    /// # 错误
    ///
    /// - `DriverError::AlreadyRunning`：已经启动
    /// - `DriverError::ThreadSpawn`：线程创建失败
    pub fn startup(&mut self) -> Result<(), DriverError> {
        if self.started {
            return Err(DriverError::AlreadyRunning);
        }
        let ctx = self.ctx.clone();
        info!("Starting up robot {}", ctx.config.serial_no);

        for (subsystem, ok) in ctx.devices.startup_all() {
            if !ok {
                warn!("{} failed to start, continuing", subsystem.name());
            }
        }

        ctx.reconciler.lock().reset();
        let sync_result = if ctx.config.sync_mode_enabled {
            sync::enable_sync_mode(&ctx)
        } else {
            sync::disable_sync_mode(&ctx)
        };
        if let Err(e) = sync_result {
            warn!("Failed to apply configured sync mode: {}", e);
        }

        if ctx.config.use_monitor
            && let Some(monitor) = ctx.monitor.lock().as_mut()
        {
            trace!("Starting {}", monitor.name());
            monitor.startup();
        }
        if ctx.config.use_sentry
            && let Some(sentry) = ctx.sentry.lock().as_mut()
        {
            trace!("Starting {}", sentry.name());
            sentry.startup();
        }

        ctx.non_dynamixel_ready.store(false, Ordering::Release);
        ctx.dynamixel_ready.store(false, Ordering::Release);
        let is_running = Arc::new(AtomicBool::new(true));
        self.is_running = is_running.clone();
        self.started = true;

        let ctx_non_dxl = ctx.clone();
        let running_non_dxl = is_running.clone();
        let non_dynamixel = std::thread::Builder::new()
            .name("stretch-non-dxl".into())
            .spawn(move || pipeline::non_dynamixel_loop(ctx_non_dxl, running_non_dxl));
        match non_dynamixel {
            Ok(handle) => self.non_dynamixel_thread = Some(handle),
            Err(e) => {
                self.stop();
                return Err(DriverError::ThreadSpawn(e.to_string()));
            },
        }

        let ctx_dxl = ctx.clone();
        let running_dxl = is_running;
        let dynamixel = std::thread::Builder::new()
            .name("stretch-dxl".into())
            .spawn(move || pipeline::dynamixel_loop(ctx_dxl, running_dxl));
        match dynamixel {
            Ok(handle) => self.dynamixel_thread = Some(handle),
            Err(e) => {
                self.stop();
                return Err(DriverError::ThreadSpawn(e.to_string()));
            },
        }

        if !self.wait_for_first_status(FIRST_STATUS_TIMEOUT) {
            warn!(
                "Poll loops did not report a first status within {:?}",
                FIRST_STATUS_TIMEOUT
            );
        }
        info!("Robot {} started", ctx.config.serial_no);
        Ok(())
    }

    /// 停止机器人
    ///
    /// 先通知并等待两个轮询线程退出，再按启动顺序停止所有设备，
    /// 保证设备停止后不再有状态拉取或命令下发。重复调用无副作用。
    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        info!("Shutting down robot {}", self.ctx.config.serial_no);
        self.is_running.store(false, Ordering::Release);
        self.join_loops();
        self.ctx.devices.stop_all();
        self.started = false;
    }

    /// 等待两个轮询线程退出
    ///
    /// 不设超时：线程可能正处于一次设备 I/O 中，设备只能在其返回后停止。
    fn join_loops(&mut self) {
        if let Some(handle) = self.non_dynamixel_thread.take()
            && handle.join().is_err()
        {
            error!("Non-dynamixel loop panicked");
        }
        if let Some(handle) = self.dynamixel_thread.take()
            && handle.join().is_err()
        {
            error!("Dynamixel loop panicked");
        }
    }

    /// 等待两个轮询线程都完成首次迭代，返回是否在超时前完成
    pub fn wait_for_first_status(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        loop {
            if self.ctx.non_dynamixel_ready.load(Ordering::Acquire)
                && self.ctx.dynamixel_ready.load(Ordering::Acquire)
            {
                return true;
            }
            if start.elapsed() >= timeout {
                return false;
            }
            std::thread::sleep(FIRST_STATUS_POLL);
        }
    }

    /// 轮询线程是否在运行
    pub fn is_running(&self) -> bool {
        self.started && self.is_running.load(Ordering::Acquire)
    }

    // ============================================================
    // 状态
    // ============================================================

    /// 最新组合状态（深拷贝）
    pub fn get_status(&self) -> CompositeStatus {
        self.ctx.store.latest()
    }

    /// 最新历史记录（id 为 0 表示尚无记录）
    pub fn latest_entry(&self) -> StatusEntry {
        self.ctx.store.latest_entry()
    }

    /// 按 id 查询历史状态
    ///
    /// # 错误
    ///
    /// id 已被淘汰或尚未产生时返回 `DriverError::StatusNotFound`。
    pub fn status_by_id(&self, id: u64) -> Result<CompositeStatus, DriverError> {
        self.ctx.store.by_id(id)
    }

    /// 当前保留的历史 id（从旧到新）
    pub fn status_history_ids(&self) -> Vec<u64> {
        self.ctx.store.ids()
    }

    /// 当前状态摘要（序列号、批次、采集时间、完整状态）
    pub fn status_report(&self) -> StatusReport {
        StatusReport {
            serial_no: self.ctx.config.serial_no.clone(),
            batch_name: self.ctx.config.batch_name.clone(),
            captured_at: chrono::Local::now(),
            status: self.get_status(),
        }
    }

    /// 以 `info` 级别输出状态摘要
    pub fn pretty_print(&self) {
        info!("\n{}", self.status_report());
    }

    // ============================================================
    // 命令与同步模式
    // ============================================================

    /// 下发所有待发送命令并触发电机同步
    pub fn push_command(&self) -> Result<(), DriverError> {
        sync::push_command(&self.ctx)
    }

    pub fn enable_sync_mode(&self) -> Result<(), DriverError> {
        sync::enable_sync_mode(&self.ctx)
    }

    pub fn disable_sync_mode(&self) -> Result<(), DriverError> {
        sync::disable_sync_mode(&self.ctx)
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.ctx.sync_mode.get(Ordering::Acquire)
    }

    pub fn sync_mode_enabled(&self) -> bool {
        self.sync_mode().is_buffered()
    }

    // ============================================================
    // 回零 / 收纳
    // ============================================================

    /// 回零（阻塞）
    pub fn home(&self) -> Result<(), DriverError> {
        sequencer::home(&self.ctx)
    }

    /// 收纳（阻塞）
    pub fn stow(&self) -> Result<(), DriverError> {
        sequencer::stow(&self.ctx)
    }

    pub fn is_calibrated(&self) -> bool {
        sequencer::is_calibrated(&self.ctx)
    }

    // ============================================================
    // 轨迹
    // ============================================================

    pub fn start_trajectory(&self) -> Result<(), DriverError> {
        trajectory::start(&self.ctx)
    }

    pub fn stop_trajectory(&self) {
        trajectory::stop(&self.ctx)
    }

    pub fn is_trajectory_executing(&self) -> bool {
        trajectory::is_executing(&self.ctx)
    }

    // ============================================================
    // 其他
    // ============================================================

    /// 设备句柄（设置目标、加载轨迹等）
    pub fn devices(&self) -> &DeviceSet {
        &self.ctx.devices
    }

    pub fn config(&self) -> &RobotConfig {
        &self.ctx.config
    }

    pub fn metrics(&self) -> &Arc<LoopMetrics> {
        &self.ctx.metrics
    }

    /// 状态钩子列表
    pub fn hooks(&self) -> &Arc<RwLock<HookManager>> {
        &self.ctx.hooks
    }

    /// 注册状态回调
    pub fn add_status_callback(&self, callback: Arc<dyn StatusCallback>) {
        self.ctx.hooks.write().add_callback(callback);
    }
}

impl std::fmt::Debug for Robot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Robot")
            .field("serial_no", &self.ctx.config.serial_no)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Drop for Robot {
    fn drop(&mut self) {
        self.stop();
    }
}
