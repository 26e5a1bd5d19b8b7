//! 集成测试共用的 mock 设备组合
#![allow(dead_code)]

use stretch_device::mock::{
    Journal, MockBase, MockPowerBoard, MockPrismatic, MockServoChain, MockWristBoard,
};
use stretch_device::{Shared, shared};
use stretch_driver::{Robot, RobotBuilder, RobotConfig};

pub struct Rig {
    pub journal: Journal,
    pub pimu: Shared<MockPowerBoard>,
    pub base: Shared<MockBase>,
    pub lift: Shared<MockPrismatic>,
    pub arm: Shared<MockPrismatic>,
    pub head: Shared<MockServoChain>,
    pub wacc: Shared<MockWristBoard>,
    pub end_of_arm: Shared<MockServoChain>,
}

impl Rig {
    pub fn new() -> Self {
        let journal = Journal::new();
        Self {
            pimu: shared(MockPowerBoard::new(journal.clone())),
            base: shared(MockBase::new(journal.clone())),
            lift: shared(MockPrismatic::lift(journal.clone())),
            arm: shared(MockPrismatic::arm(journal.clone())),
            head: shared(MockServoChain::head(journal.clone())),
            wacc: shared(MockWristBoard::new(journal.clone())),
            end_of_arm: shared(MockServoChain::end_of_arm(journal.clone(), true)),
            journal,
        }
    }

    /// 填好全部设备的 builder
    pub fn builder(&self) -> RobotBuilder {
        RobotBuilder::new()
            .pimu(self.pimu.clone())
            .base(self.base.clone())
            .lift(self.lift.clone())
            .arm(self.arm.clone())
            .head(self.head.clone())
            .wacc(self.wacc.clone())
            .end_of_arm(self.end_of_arm.clone())
    }

    pub fn robot(&self, config: RobotConfig) -> Robot {
        self.builder().config(config).build().unwrap()
    }
}

/// 加速的轮询频率，关闭监控器与哨兵
pub fn fast_config() -> RobotConfig {
    let mut config = RobotConfig {
        use_monitor: false,
        use_sentry: false,
        sync_mode_enabled: false,
        ..RobotConfig::default()
    };
    config.non_dynamixel.rate_hz = 100.0;
    config.dynamixel.rate_hz = 200.0;
    config
}
