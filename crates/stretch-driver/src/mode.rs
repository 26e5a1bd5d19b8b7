//! 同步模式定义
//!
//! 同步模式下，各设备缓存写入的命令，由 pimu 发出的硬件同步脉冲统一生效；
//! 非同步模式下，命令写入后立即生效。

use std::sync::atomic::{AtomicU8, Ordering};

/// 命令生效方式
///
/// - **Immediate**: 写入即生效
/// - **Buffered**: 缓存命令，等待电机同步脉冲；状态采样也由状态同步脉冲对齐
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SyncMode {
    /// 立即生效（默认）
    #[default]
    Immediate = 0,

    /// 缓存并等待硬件同步脉冲
    Buffered = 1,
}

impl SyncMode {
    /// 从 u8 转换
    ///
    /// 无效值返回 Immediate。
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Buffered,
            _ => Self::Immediate,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            Self::Buffered
        } else {
            Self::Immediate
        }
    }

    pub fn is_buffered(self) -> bool {
        self == Self::Buffered
    }
}

/// 同步模式（原子版本，用于线程间共享）
///
/// 非 Dynamixel 线程据此决定是否发出状态同步脉冲，调用方线程切换它。
#[derive(Debug)]
pub struct AtomicSyncMode {
    inner: AtomicU8,
}

impl AtomicSyncMode {
    pub fn new(mode: SyncMode) -> Self {
        Self {
            inner: AtomicU8::new(mode.as_u8()),
        }
    }

    /// 获取当前模式
    pub fn get(&self, ordering: Ordering) -> SyncMode {
        SyncMode::from_u8(self.inner.load(ordering))
    }

    /// 设置模式
    pub fn set(&self, mode: SyncMode, ordering: Ordering) {
        self.inner.store(mode.as_u8(), ordering);
    }

    /// 设置模式并返回旧值
    pub fn swap(&self, mode: SyncMode, ordering: Ordering) -> SyncMode {
        SyncMode::from_u8(self.inner.swap(mode.as_u8(), ordering))
    }
}

impl Default for AtomicSyncMode {
    fn default() -> Self {
        Self::new(SyncMode::Immediate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_mode_conversions() {
        assert_eq!(SyncMode::Immediate.as_u8(), 0);
        assert_eq!(SyncMode::Buffered.as_u8(), 1);
        assert_eq!(SyncMode::from_u8(1), SyncMode::Buffered);
        assert_eq!(SyncMode::from_u8(255), SyncMode::Immediate);
        assert_eq!(SyncMode::from_enabled(true), SyncMode::Buffered);
        assert!(!SyncMode::default().is_buffered());
    }

    #[test]
    fn test_atomic_sync_mode() {
        let mode = AtomicSyncMode::default();
        assert_eq!(mode.get(Ordering::Relaxed), SyncMode::Immediate);

        mode.set(SyncMode::Buffered, Ordering::Relaxed);
        assert!(mode.get(Ordering::Relaxed).is_buffered());

        let previous = mode.swap(SyncMode::Immediate, Ordering::AcqRel);
        assert_eq!(previous, SyncMode::Buffered);
        assert_eq!(mode.get(Ordering::Acquire), SyncMode::Immediate);
    }
}
