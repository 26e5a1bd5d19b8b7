//! 子系统状态与组合状态快照

use crate::timestamp::TimestampSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 机器人子系统
///
/// 前五个位于非 Dynamixel 总线，`Head` 与 `EndOfArm` 位于 Dynamixel 总线。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subsystem {
    Pimu,
    Base,
    Lift,
    Arm,
    Wacc,
    Head,
    EndOfArm,
}

impl Subsystem {
    /// 所有子系统
    pub const ALL: [Subsystem; 7] = [
        Subsystem::Pimu,
        Subsystem::Base,
        Subsystem::Lift,
        Subsystem::Arm,
        Subsystem::Wacc,
        Subsystem::Head,
        Subsystem::EndOfArm,
    ];

    /// 状态记录中的键名
    pub fn name(&self) -> &'static str {
        match self {
            Subsystem::Pimu => "pimu",
            Subsystem::Base => "base",
            Subsystem::Lift => "lift",
            Subsystem::Arm => "arm",
            Subsystem::Wacc => "wacc",
            Subsystem::Head => "head",
            Subsystem::EndOfArm => "end_of_arm",
        }
    }

    /// 是否由 Dynamixel 轮询线程拥有
    pub fn is_dynamixel(&self) -> bool {
        matches!(self, Subsystem::Head | Subsystem::EndOfArm)
    }

    /// 按键名查找
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.name() == name)
    }
}

/// 单个子系统的状态记录
///
/// 内容由设备决定，核心只按值拷贝。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubsystemStatus(pub Value);

impl SubsystemStatus {
    /// 空记录（`{}`）
    pub fn empty() -> Self {
        Self(Value::Object(Default::default()))
    }

    /// 读取顶层字段
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// 读取顶层浮点字段
    pub fn f64_field(&self, key: &str) -> Option<f64> {
        self.field(key).and_then(Value::as_f64)
    }

    /// 读取顶层布尔字段
    pub fn bool_field(&self, key: &str) -> Option<bool> {
        self.field(key).and_then(Value::as_bool)
    }

    /// 内部 JSON 值
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for SubsystemStatus {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// 组合状态快照
///
/// 覆盖所有子系统和时间戳。快照按值传递，调用方拿到的永远是副本。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeStatus {
    pub pimu: SubsystemStatus,
    pub base: SubsystemStatus,
    pub lift: SubsystemStatus,
    pub arm: SubsystemStatus,
    pub head: SubsystemStatus,
    pub wacc: SubsystemStatus,
    pub end_of_arm: SubsystemStatus,
    pub timestamps: TimestampSet,
}

impl Default for CompositeStatus {
    fn default() -> Self {
        Self {
            pimu: SubsystemStatus::empty(),
            base: SubsystemStatus::empty(),
            lift: SubsystemStatus::empty(),
            arm: SubsystemStatus::empty(),
            head: SubsystemStatus::empty(),
            wacc: SubsystemStatus::empty(),
            end_of_arm: SubsystemStatus::empty(),
            timestamps: TimestampSet::default(),
        }
    }
}

impl CompositeStatus {
    /// 读取子系统状态
    pub fn get(&self, subsystem: Subsystem) -> &SubsystemStatus {
        match subsystem {
            Subsystem::Pimu => &self.pimu,
            Subsystem::Base => &self.base,
            Subsystem::Lift => &self.lift,
            Subsystem::Arm => &self.arm,
            Subsystem::Wacc => &self.wacc,
            Subsystem::Head => &self.head,
            Subsystem::EndOfArm => &self.end_of_arm,
        }
    }

    /// 可变读取子系统状态
    pub fn get_mut(&mut self, subsystem: Subsystem) -> &mut SubsystemStatus {
        match subsystem {
            Subsystem::Pimu => &mut self.pimu,
            Subsystem::Base => &mut self.base,
            Subsystem::Lift => &mut self.lift,
            Subsystem::Arm => &mut self.arm,
            Subsystem::Wacc => &mut self.wacc,
            Subsystem::Head => &mut self.head,
            Subsystem::EndOfArm => &mut self.end_of_arm,
        }
    }

    /// 覆盖子系统状态
    pub fn set(&mut self, subsystem: Subsystem, status: SubsystemStatus) {
        *self.get_mut(subsystem) = status;
    }

    /// 非 Dynamixel 部分是否与 `other` 完全一致（含硬件时间戳）
    pub fn non_dynamixel_eq(&self, other: &CompositeStatus) -> bool {
        let subsystems_eq = Subsystem::ALL
            .iter()
            .filter(|s| !s.is_dynamixel())
            .all(|s| self.get(*s) == other.get(*s));
        let mut mine = self.timestamps;
        let mut theirs = other.timestamps;
        mine.dynamixel_wall_time = Default::default();
        theirs.dynamixel_wall_time = Default::default();
        subsystems_eq && mine == theirs
    }
}
