//! # Stretch Status
//!
//! 机器人本体状态数据模型（无硬件依赖）
//!
//! ## 模块
//!
//! - `timestamp`: 时钟来源与时间戳集合
//! - `composite`: 子系统状态与组合状态快照
//!
//! ## 所有权
//!
//! 每个子系统的状态记录由对应设备拥有，核心只做整体拷贝，不解释其内部字段。
//! 组合状态中的子系统以结构体字段表示，因此构造后任何子系统键都不会消失。

pub mod composite;
pub mod timestamp;

pub use composite::*;
pub use timestamp::*;
