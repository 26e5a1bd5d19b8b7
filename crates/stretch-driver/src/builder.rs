//! Builder 模式实现
//!
//! 提供链式构造 [`Robot`] 实例的便捷方式。

use crate::checks::PeriodicCheck;
use crate::config::RobotConfig;
use crate::context::RobotContext;
use crate::devices::DeviceSet;
use crate::error::DriverError;
use crate::reconciler::{TimestampReconciler, WallClockReconciler};
use crate::registry::WaccRegistry;
use crate::robot::Robot;
use stretch_device::{MobileBase, PowerBoard, PrismaticJoint, ServoChain, Shared, WristBoard};
use tracing::debug;

/// Robot Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use stretch_driver::{RobotBuilder, RobotConfig};
/// # fn devices() -> stretch_driver::DeviceSet { unimplemented!() }
///
/// let set = devices();
/// let mut robot = RobotBuilder::new()
///     .config(RobotConfig::default())
///     .pimu(set.pimu)
///     .base(set.base)
///     .lift(set.lift)
///     .arm(set.arm)
///     .head(set.head)
///     .wacc(set.wacc)
///     .end_of_arm(set.end_of_arm)
///     .build()
///     .unwrap();
/// robot.startup().unwrap();
/// ```
#[derive(Default)]
pub struct RobotBuilder {
    config: RobotConfig,
    pimu: Option<Shared<dyn PowerBoard>>,
    base: Option<Shared<dyn MobileBase>>,
    lift: Option<Shared<dyn PrismaticJoint>>,
    arm: Option<Shared<dyn PrismaticJoint>>,
    head: Option<Shared<dyn ServoChain>>,
    /// 标准腕部板（`custom_wacc` 为 `None` 时使用）
    wacc: Option<Shared<dyn WristBoard>>,
    end_of_arm: Option<Shared<dyn ServoChain>>,
    monitor: Option<Box<dyn PeriodicCheck>>,
    sentry: Option<Box<dyn PeriodicCheck>>,
    reconciler: Option<Box<dyn TimestampReconciler>>,
    wacc_registry: WaccRegistry,
}

impl RobotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: RobotConfig) -> Self {
        self.config = config;
        self
    }

    pub fn pimu(mut self, pimu: Shared<dyn PowerBoard>) -> Self {
        self.pimu = Some(pimu);
        self
    }

    pub fn base(mut self, base: Shared<dyn MobileBase>) -> Self {
        self.base = Some(base);
        self
    }

    pub fn lift(mut self, lift: Shared<dyn PrismaticJoint>) -> Self {
        self.lift = Some(lift);
        self
    }

    pub fn arm(mut self, arm: Shared<dyn PrismaticJoint>) -> Self {
        self.arm = Some(arm);
        self
    }

    pub fn head(mut self, head: Shared<dyn ServoChain>) -> Self {
        self.head = Some(head);
        self
    }

    pub fn wacc(mut self, wacc: Shared<dyn WristBoard>) -> Self {
        self.wacc = Some(wacc);
        self
    }

    pub fn end_of_arm(mut self, end_of_arm: Shared<dyn ServoChain>) -> Self {
        self.end_of_arm = Some(end_of_arm);
        self
    }

    /// 一次性设置全部设备
    pub fn devices(self, devices: DeviceSet) -> Self {
        self.pimu(devices.pimu)
            .base(devices.base)
            .lift(devices.lift)
            .arm(devices.arm)
            .head(devices.head)
            .wacc(devices.wacc)
            .end_of_arm(devices.end_of_arm)
    }

    pub fn monitor(mut self, monitor: impl PeriodicCheck + 'static) -> Self {
        self.monitor = Some(Box::new(monitor));
        self
    }

    pub fn sentry(mut self, sentry: impl PeriodicCheck + 'static) -> Self {
        self.sentry = Some(Box::new(sentry));
        self
    }

    /// 自定义时间戳对齐器（默认 [`WallClockReconciler`]）
    pub fn reconciler(mut self, reconciler: impl TimestampReconciler + 'static) -> Self {
        self.reconciler = Some(Box::new(reconciler));
        self
    }

    /// 可选腕部板实现注册表
    pub fn wacc_registry(mut self, registry: WaccRegistry) -> Self {
        self.wacc_registry = registry;
        self
    }

    /// 构建 Robot
    ///
    /// # 错误
    ///
    /// - 配置校验失败：`DriverError::Config`
    /// - `custom_wacc` 未注册：`DriverError::UnknownDevice`
    /// - 缺少必需设备：`DriverError::MissingDevice`
    pub fn build(self) -> Result<Robot, DriverError> {
        self.config.validate()?;

        let wacc = match &self.config.custom_wacc {
            Some(name) => {
                debug!("Using custom wacc implementation '{}'", name);
                self.wacc_registry.create(name, &self.config)?
            },
            None => self.wacc.ok_or(DriverError::MissingDevice("wacc"))?,
        };

        let devices = DeviceSet {
            pimu: self.pimu.ok_or(DriverError::MissingDevice("pimu"))?,
            base: self.base.ok_or(DriverError::MissingDevice("base"))?,
            lift: self.lift.ok_or(DriverError::MissingDevice("lift"))?,
            arm: self.arm.ok_or(DriverError::MissingDevice("arm"))?,
            head: self.head.ok_or(DriverError::MissingDevice("head"))?,
            wacc,
            end_of_arm: self.end_of_arm.ok_or(DriverError::MissingDevice("end_of_arm"))?,
        };

        let reconciler = self
            .reconciler
            .unwrap_or_else(|| Box::new(WallClockReconciler::new()));

        let ctx = RobotContext::new(devices, self.config, self.monitor, self.sentry, reconciler);
        Ok(Robot::from_context(ctx))
    }
}
