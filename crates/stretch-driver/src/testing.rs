//! 单元测试用的 mock 设备组合

use crate::config::RobotConfig;
use crate::context::RobotContext;
use crate::devices::DeviceSet;
use crate::reconciler::WallClockReconciler;
use stretch_device::mock::{
    Journal, MockBase, MockPowerBoard, MockPrismatic, MockServoChain, MockWristBoard,
};
use stretch_device::{Shared, shared};

pub(crate) struct MockRig {
    pub journal: Journal,
    pub pimu: Shared<MockPowerBoard>,
    pub base: Shared<MockBase>,
    pub lift: Shared<MockPrismatic>,
    pub arm: Shared<MockPrismatic>,
    pub head: Shared<MockServoChain>,
    pub wacc: Shared<MockWristBoard>,
    pub end_of_arm: Shared<MockServoChain>,
}

impl MockRig {
    pub fn new() -> Self {
        Self::with_gripper(true)
    }

    pub fn with_gripper(gripper: bool) -> Self {
        let journal = Journal::new();
        Self {
            pimu: shared(MockPowerBoard::new(journal.clone())),
            base: shared(MockBase::new(journal.clone())),
            lift: shared(MockPrismatic::lift(journal.clone())),
            arm: shared(MockPrismatic::arm(journal.clone())),
            head: shared(MockServoChain::head(journal.clone())),
            wacc: shared(MockWristBoard::new(journal.clone())),
            end_of_arm: shared(MockServoChain::end_of_arm(journal.clone(), gripper)),
            journal,
        }
    }

    pub fn devices(&self) -> DeviceSet {
        DeviceSet {
            pimu: self.pimu.clone(),
            base: self.base.clone(),
            lift: self.lift.clone(),
            arm: self.arm.clone(),
            head: self.head.clone(),
            wacc: self.wacc.clone(),
            end_of_arm: self.end_of_arm.clone(),
        }
    }

    pub fn context(&self, config: RobotConfig) -> RobotContext {
        RobotContext::new(
            self.devices(),
            config,
            None,
            None,
            Box::new(WallClockReconciler::new()),
        )
    }
}
