//! Mock 设备
//!
//! 无硬件依赖的设备实现，用于测试编排逻辑。所有 mock 共享一个 [`Journal`]，
//! 按调用顺序记录每个设备收到的操作，测试据此断言顺序与次数。
//!
//! 硬件时钟按拉取次数模拟：第 n 次拉取的时钟读数为 `n * 40_000` 微秒。

use crate::{
    ClockReadings, Device, DeviceError, MobileBase, PowerBoard, PrismaticJoint, ServoChain,
    ServoJoint, SyncCapable, TrajectoryControl, TrajectoryJoint, WristBoard,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use smallvec::smallvec;
use std::sync::Arc;
use std::time::Duration;
use stretch_status::{ClockSource, SubsystemStatus};

/// 模拟硬件时钟步长（微秒）
pub const MOCK_CLOCK_STEP_US: u64 = 40_000;

/// 设备操作
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Startup,
    Stop,
    PullStatus,
    PushCommand,
    EnableSync,
    DisableSync,
    MotorSync,
    StatusSync,
    Beep,
    Home,
    MoveTo(f64),
    StartTrajectory(TrajectoryControl),
    StopTrajectory,
    PushTrajectory,
}

/// 一条操作记录
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub device: String,
    pub action: Action,
}

impl Event {
    /// 是否为指定设备的指定操作
    pub fn is(&self, device: &str, action: &Action) -> bool {
        self.device == device && &self.action == action
    }
}

/// 共享操作日志
#[derive(Debug, Clone, Default)]
pub struct Journal {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, device: &str, action: Action) {
        self.events.lock().push(Event {
            device: device.to_string(),
            action,
        });
    }

    /// 所有记录（副本）
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// 满足条件的记录数
    pub fn count_where(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().iter().filter(|&e| predicate(e)).count()
    }

    /// 指定设备、指定操作的次数
    pub fn count(&self, device: &str, action: &Action) -> usize {
        self.count_where(|e| e.is(device, action))
    }

    /// 第一条满足条件的记录下标
    pub fn index_of(&self, predicate: impl Fn(&Event) -> bool) -> Option<usize> {
        self.events.lock().iter().position(|e| predicate(e))
    }

    /// 按顺序列出满足条件的记录的设备名
    pub fn devices_where(&self, predicate: impl Fn(&Event) -> bool) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|&e| predicate(e))
            .map(|e| e.device.clone())
            .collect()
    }
}

/// 各 mock 共用的状态
#[derive(Debug)]
struct MockCore {
    name: String,
    journal: Journal,
    started: bool,
    startup_ok: bool,
    sync_enabled: bool,
    pulls: u64,
    failing_pulls: usize,
    /// 下一次拉取的阻塞时长
    slow_pull: Option<Duration>,
    status: Value,
}

impl MockCore {
    fn new(name: &str, journal: Journal) -> Self {
        Self {
            name: name.to_string(),
            journal,
            started: false,
            startup_ok: true,
            sync_enabled: false,
            pulls: 0,
            failing_pulls: 0,
            slow_pull: None,
            status: json!({}),
        }
    }

    fn record(&self, action: Action) {
        self.journal.record(&self.name, action);
    }

    fn startup(&mut self) -> bool {
        self.record(Action::Startup);
        self.started = self.startup_ok;
        self.startup_ok
    }

    fn stop(&mut self) {
        self.record(Action::Stop);
        self.started = false;
    }

    /// 拉取：注入的失败优先消耗，成功时用 `fields` 构造新状态
    fn pull(&mut self, fields: Value) -> Result<(), DeviceError> {
        self.record(Action::PullStatus);
        if let Some(delay) = self.slow_pull.take() {
            std::thread::sleep(delay);
        }
        if self.failing_pulls > 0 {
            self.failing_pulls -= 1;
            return Err(DeviceError::Transport(format!(
                "{}: simulated serial failure",
                self.name
            )));
        }
        self.pulls += 1;
        let mut status = json!({ "pulls": self.pulls, "sync_mode": self.sync_enabled });
        if let (Some(target), Value::Object(extra)) = (status.as_object_mut(), fields) {
            target.extend(extra);
        }
        self.status = status;
        Ok(())
    }

    fn clock(&self) -> u64 {
        self.pulls * MOCK_CLOCK_STEP_US
    }

    fn set_sync(&mut self, enabled: bool) {
        self.record(if enabled {
            Action::EnableSync
        } else {
            Action::DisableSync
        });
        self.sync_enabled = enabled;
    }
}

macro_rules! mock_control {
    ($ty:ty) => {
        impl $ty {
            /// 让接下来 `n` 次拉取返回传输错误
            pub fn fail_next_pulls(&mut self, n: usize) {
                self.core.failing_pulls = n;
            }

            /// 让下一次拉取阻塞 `delay`（模拟慢速串口读取）
            pub fn delay_next_pull(&mut self, delay: Duration) {
                self.core.slow_pull = Some(delay);
            }

            /// 设置 `startup()` 的结果
            pub fn set_startup_ok(&mut self, ok: bool) {
                self.core.startup_ok = ok;
            }

            /// 成功拉取次数
            pub fn pull_count(&self) -> u64 {
                self.core.pulls
            }

            pub fn is_started(&self) -> bool {
                self.core.started
            }
        }
    };
}

macro_rules! mock_sync {
    ($ty:ty) => {
        impl SyncCapable for $ty {
            fn enable_sync_mode(&mut self) {
                self.core.set_sync(true);
            }

            fn disable_sync_mode(&mut self) {
                self.core.set_sync(false);
            }

            fn sync_mode_enabled(&self) -> bool {
                self.core.sync_enabled
            }
        }
    };
}

// ============================================================
// Pimu
// ============================================================

/// Mock 电源/IMU 板
#[derive(Debug)]
pub struct MockPowerBoard {
    core: MockCore,
    failing_pushes: usize,
}

impl MockPowerBoard {
    pub fn new(journal: Journal) -> Self {
        Self {
            core: MockCore::new("pimu", journal),
            failing_pushes: 0,
        }
    }

    /// 让接下来 `n` 次 `push_command` 返回传输错误
    pub fn fail_next_pushes(&mut self, n: usize) {
        self.failing_pushes = n;
    }
}

mock_control!(MockPowerBoard);
mock_sync!(MockPowerBoard);

impl Device for MockPowerBoard {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn startup(&mut self) -> bool {
        self.core.startup()
    }

    fn stop(&mut self) {
        self.core.stop();
    }

    fn pull_status(&mut self) -> Result<(), DeviceError> {
        self.core.pull(json!({ "voltage": 12.0 }))
    }

    fn push_command(&mut self) -> Result<(), DeviceError> {
        self.core.record(Action::PushCommand);
        if self.failing_pushes > 0 {
            self.failing_pushes -= 1;
            return Err(DeviceError::Transport("pimu: simulated write failure".into()));
        }
        Ok(())
    }

    fn status(&self) -> SubsystemStatus {
        SubsystemStatus(self.core.status.clone())
    }

    fn clock_readings(&self) -> ClockReadings {
        if self.core.pulls == 0 {
            return ClockReadings::new();
        }
        smallvec![
            (ClockSource::HwSync, self.core.clock()),
            (ClockSource::PimuImu, self.core.clock()),
        ]
    }
}

impl PowerBoard for MockPowerBoard {
    fn trigger_motor_sync(&mut self) -> Result<(), DeviceError> {
        self.core.record(Action::MotorSync);
        Ok(())
    }

    fn trigger_status_sync(&mut self) -> Result<(), DeviceError> {
        self.core.record(Action::StatusSync);
        Ok(())
    }

    fn trigger_beep(&mut self) -> Result<(), DeviceError> {
        self.core.record(Action::Beep);
        Ok(())
    }
}

// ============================================================
// Wacc
// ============================================================

/// Mock 腕部加速度计板
#[derive(Debug)]
pub struct MockWristBoard {
    core: MockCore,
}

impl MockWristBoard {
    pub fn new(journal: Journal) -> Self {
        Self::named("wacc", journal)
    }

    /// 自定义名称（用于注册表替换实现的测试）
    pub fn named(name: &str, journal: Journal) -> Self {
        Self {
            core: MockCore::new(name, journal),
        }
    }
}

mock_control!(MockWristBoard);
mock_sync!(MockWristBoard);

impl Device for MockWristBoard {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn startup(&mut self) -> bool {
        self.core.startup()
    }

    fn stop(&mut self) {
        self.core.stop();
    }

    fn pull_status(&mut self) -> Result<(), DeviceError> {
        self.core.pull(json!({ "ax": 0.0, "ay": 0.0, "az": -9.8 }))
    }

    fn push_command(&mut self) -> Result<(), DeviceError> {
        self.core.record(Action::PushCommand);
        Ok(())
    }

    fn status(&self) -> SubsystemStatus {
        SubsystemStatus(self.core.status.clone())
    }

    fn clock_readings(&self) -> ClockReadings {
        if self.core.pulls == 0 {
            return ClockReadings::new();
        }
        smallvec![(ClockSource::WaccAcc, self.core.clock())]
    }
}

impl WristBoard for MockWristBoard {
    fn trigger_status_sync(&mut self) -> Result<(), DeviceError> {
        self.core.record(Action::StatusSync);
        Ok(())
    }
}

// ============================================================
// Base
// ============================================================

/// Mock 移动底盘
#[derive(Debug)]
pub struct MockBase {
    core: MockCore,
    trajectory_active: bool,
}

impl MockBase {
    pub fn new(journal: Journal) -> Self {
        Self {
            core: MockCore::new("base", journal),
            trajectory_active: false,
        }
    }

    pub fn set_trajectory_active(&mut self, active: bool) {
        self.trajectory_active = active;
    }
}

mock_control!(MockBase);
mock_sync!(MockBase);

impl Device for MockBase {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn startup(&mut self) -> bool {
        self.core.startup()
    }

    fn stop(&mut self) {
        self.core.stop();
    }

    fn pull_status(&mut self) -> Result<(), DeviceError> {
        self.core.pull(json!({ "x": 0.0, "y": 0.0, "theta": 0.0 }))
    }

    fn push_command(&mut self) -> Result<(), DeviceError> {
        self.core.record(Action::PushCommand);
        Ok(())
    }

    fn status(&self) -> SubsystemStatus {
        SubsystemStatus(self.core.status.clone())
    }

    fn clock_readings(&self) -> ClockReadings {
        if self.core.pulls == 0 {
            return ClockReadings::new();
        }
        smallvec![
            (ClockSource::LeftWheelEnc, self.core.clock()),
            (ClockSource::RightWheelEnc, self.core.clock()),
        ]
    }
}

impl TrajectoryJoint for MockBase {
    fn start_trajectory(&mut self, control: TrajectoryControl) -> Result<(), DeviceError> {
        self.core.record(Action::StartTrajectory(control));
        self.trajectory_active = true;
        Ok(())
    }

    fn stop_trajectory(&mut self) {
        self.core.record(Action::StopTrajectory);
        self.trajectory_active = false;
    }

    fn push_trajectory(&mut self) -> Result<(), DeviceError> {
        self.core.record(Action::PushTrajectory);
        Ok(())
    }

    fn trajectory_active(&self) -> bool {
        self.trajectory_active
    }
}

impl MobileBase for MockBase {}

// ============================================================
// Lift / Arm
// ============================================================

/// Mock 直线关节
///
/// 默认在 `push_command` 时立即到达目标位置并置位 `near_pos_setpoint`。
#[derive(Debug)]
pub struct MockPrismatic {
    core: MockCore,
    clock_source: ClockSource,
    position: f64,
    target: Option<f64>,
    near_pos_setpoint: bool,
    pos_calibrated: bool,
    converge_on_push: bool,
    trajectory_active: bool,
    home_delay: Duration,
    home_sync_states: Vec<bool>,
}

impl MockPrismatic {
    fn new(name: &str, clock_source: ClockSource, journal: Journal) -> Self {
        Self {
            core: MockCore::new(name, journal),
            clock_source,
            position: 0.0,
            target: None,
            near_pos_setpoint: true,
            pos_calibrated: false,
            converge_on_push: true,
            trajectory_active: false,
            home_delay: Duration::ZERO,
            home_sync_states: Vec::new(),
        }
    }

    pub fn lift(journal: Journal) -> Self {
        Self::new("lift", ClockSource::LiftEnc, journal)
    }

    pub fn arm(journal: Journal) -> Self {
        Self::new("arm", ClockSource::ArmEnc, journal)
    }

    pub fn set_position(&mut self, position: f64) {
        self.position = position;
    }

    pub fn set_pos_calibrated(&mut self, calibrated: bool) {
        self.pos_calibrated = calibrated;
    }

    /// 为 `false` 时关节永远不会到达目标（用于超时路径）
    pub fn set_converge_on_push(&mut self, converge: bool) {
        self.converge_on_push = converge;
    }

    pub fn set_trajectory_active(&mut self, active: bool) {
        self.trajectory_active = active;
    }

    /// `home()` 阻塞时长
    pub fn set_home_delay(&mut self, delay: Duration) {
        self.home_delay = delay;
    }

    /// 每次 `home()` 调用时观察到的同步模式状态
    pub fn home_sync_states(&self) -> &[bool] {
        &self.home_sync_states
    }
}

mock_control!(MockPrismatic);
mock_sync!(MockPrismatic);

impl Device for MockPrismatic {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn startup(&mut self) -> bool {
        self.core.startup()
    }

    fn stop(&mut self) {
        self.core.stop();
    }

    fn pull_status(&mut self) -> Result<(), DeviceError> {
        let fields = json!({
            "pos": self.position,
            "near_pos_setpoint": self.near_pos_setpoint,
            "pos_calibrated": self.pos_calibrated,
        });
        self.core.pull(fields)
    }

    fn push_command(&mut self) -> Result<(), DeviceError> {
        self.core.record(Action::PushCommand);
        if self.converge_on_push {
            if let Some(target) = self.target.take() {
                self.position = target;
                self.near_pos_setpoint = true;
            }
        }
        Ok(())
    }

    fn status(&self) -> SubsystemStatus {
        SubsystemStatus(self.core.status.clone())
    }

    fn clock_readings(&self) -> ClockReadings {
        if self.core.pulls == 0 {
            return ClockReadings::new();
        }
        smallvec![(self.clock_source, self.core.clock())]
    }
}

impl TrajectoryJoint for MockPrismatic {
    fn start_trajectory(&mut self, control: TrajectoryControl) -> Result<(), DeviceError> {
        self.core.record(Action::StartTrajectory(control));
        self.trajectory_active = true;
        Ok(())
    }

    fn stop_trajectory(&mut self) {
        self.core.record(Action::StopTrajectory);
        self.trajectory_active = false;
    }

    fn push_trajectory(&mut self) -> Result<(), DeviceError> {
        self.core.record(Action::PushTrajectory);
        Ok(())
    }

    fn trajectory_active(&self) -> bool {
        self.trajectory_active
    }
}

impl PrismaticJoint for MockPrismatic {
    fn home(&mut self) -> Result<(), DeviceError> {
        self.core.record(Action::Home);
        self.home_sync_states.push(self.core.sync_enabled);
        if !self.home_delay.is_zero() {
            std::thread::sleep(self.home_delay);
        }
        self.pos_calibrated = true;
        Ok(())
    }

    fn move_to(&mut self, position: f64) {
        self.core.record(Action::MoveTo(position));
        self.target = Some(position);
        self.near_pos_setpoint = false;
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn near_pos_setpoint(&self) -> bool {
        self.near_pos_setpoint
    }

    fn pos_calibrated(&self) -> bool {
        self.pos_calibrated
    }
}

// ============================================================
// Dynamixel
// ============================================================

/// Mock 舵机关节
#[derive(Debug)]
pub struct MockServoJoint {
    name: String,
    journal: Journal,
    position: f64,
    requires_calibration: bool,
    calibrated: bool,
    moving: bool,
    trajectory_active: bool,
}

impl MockServoJoint {
    pub fn new(name: &str, journal: Journal) -> Self {
        Self {
            name: name.to_string(),
            journal,
            position: 0.0,
            requires_calibration: false,
            calibrated: true,
            moving: false,
            trajectory_active: false,
        }
    }

    /// 需要标定的关节（初始未标定）
    pub fn calibrated_joint(name: &str, journal: Journal) -> Self {
        Self {
            requires_calibration: true,
            calibrated: false,
            ..Self::new(name, journal)
        }
    }

    pub fn set_moving(&mut self, moving: bool) {
        self.moving = moving;
    }

    pub fn set_calibrated(&mut self, calibrated: bool) {
        self.calibrated = calibrated;
    }

    pub fn set_trajectory_active(&mut self, active: bool) {
        self.trajectory_active = active;
    }

    fn record(&self, action: Action) {
        self.journal.record(&self.name, action);
    }
}

impl TrajectoryJoint for MockServoJoint {
    fn start_trajectory(&mut self, control: TrajectoryControl) -> Result<(), DeviceError> {
        self.record(Action::StartTrajectory(control));
        self.trajectory_active = true;
        Ok(())
    }

    fn stop_trajectory(&mut self) {
        self.record(Action::StopTrajectory);
        self.trajectory_active = false;
    }

    fn push_trajectory(&mut self) -> Result<(), DeviceError> {
        self.record(Action::PushTrajectory);
        Ok(())
    }

    fn trajectory_active(&self) -> bool {
        self.trajectory_active
    }
}

impl ServoJoint for MockServoJoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn move_to(&mut self, position: f64) -> Result<(), DeviceError> {
        self.record(Action::MoveTo(position));
        self.position = position;
        Ok(())
    }

    fn home(&mut self) -> Result<(), DeviceError> {
        self.record(Action::Home);
        self.calibrated = true;
        Ok(())
    }

    fn requires_calibration(&self) -> bool {
        self.requires_calibration
    }

    fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    fn is_moving(&self) -> bool {
        self.moving
    }

    fn position(&self) -> f64 {
        self.position
    }
}

/// Mock 舵机链
#[derive(Debug)]
pub struct MockServoChain {
    core: MockCore,
    joints: Vec<MockServoJoint>,
}

impl MockServoChain {
    pub fn new(name: &str, journal: Journal, joints: Vec<MockServoJoint>) -> Self {
        Self {
            core: MockCore::new(name, journal),
            joints,
        }
    }

    /// 头部：`head_pan`、`head_tilt`
    pub fn head(journal: Journal) -> Self {
        let joints = vec![
            MockServoJoint::new("head_pan", journal.clone()),
            MockServoJoint::new("head_tilt", journal.clone()),
        ];
        Self::new("head", journal, joints)
    }

    /// 末端执行器：`wrist_yaw`（需要标定），可选 `stretch_gripper`（需要标定）
    pub fn end_of_arm(journal: Journal, with_gripper: bool) -> Self {
        let mut joints = vec![MockServoJoint::calibrated_joint("wrist_yaw", journal.clone())];
        if with_gripper {
            joints.push(MockServoJoint::calibrated_joint(
                "stretch_gripper",
                journal.clone(),
            ));
        }
        Self::new("end_of_arm", journal, joints)
    }

    /// 具体类型的关节访问（测试控制用）
    pub fn mock_joint_mut(&mut self, name: &str) -> Option<&mut MockServoJoint> {
        self.joints.iter_mut().find(|j| j.name == name)
    }
}

mock_control!(MockServoChain);

impl Device for MockServoChain {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn startup(&mut self) -> bool {
        self.core.startup()
    }

    fn stop(&mut self) {
        self.core.stop();
    }

    fn pull_status(&mut self) -> Result<(), DeviceError> {
        let mut fields = serde_json::Map::new();
        for joint in &self.joints {
            fields.insert(
                joint.name.clone(),
                json!({ "pos": joint.position, "is_moving": joint.moving }),
            );
        }
        self.core.pull(Value::Object(fields))
    }

    fn push_command(&mut self) -> Result<(), DeviceError> {
        self.core.record(Action::PushCommand);
        Ok(())
    }

    fn status(&self) -> SubsystemStatus {
        SubsystemStatus(self.core.status.clone())
    }
}

impl ServoChain for MockServoChain {
    fn joint_names(&self) -> Vec<String> {
        self.joints.iter().map(|j| j.name.clone()).collect()
    }

    fn joint(&self, name: &str) -> Option<&dyn ServoJoint> {
        for joint in &self.joints {
            if joint.name == name {
                return Some(joint);
            }
        }
        None
    }

    fn joint_mut(&mut self, name: &str) -> Option<&mut dyn ServoJoint> {
        for joint in self.joints.iter_mut() {
            if joint.name == name {
                return Some(joint);
            }
        }
        None
    }
}
