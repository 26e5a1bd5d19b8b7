//! 周期性检查（监控器 / 哨兵）
//!
//! 非 Dynamixel 线程按各自的降频系数调用 `step()`。
//! 具体的安全策略由实现方决定，核心只负责调度。

use stretch_status::CompositeStatus;

/// 周期性检查
pub trait PeriodicCheck: Send {
    /// 检查名（日志使用）
    fn name(&self) -> &str;

    /// 轮询线程启动前调用一次
    fn startup(&mut self) {}

    /// 以最新快照执行一步
    fn step(&mut self, status: &CompositeStatus);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingCheck {
        steps: usize,
    }

    impl PeriodicCheck for CountingCheck {
        fn name(&self) -> &str {
            "counter"
        }

        fn step(&mut self, _status: &CompositeStatus) {
            self.steps += 1;
        }
    }

    #[test]
    fn test_default_startup_is_noop() {
        let mut check = CountingCheck { steps: 0 };
        check.startup();
        check.step(&CompositeStatus::default());
        assert_eq!(check.steps, 1);
        assert_eq!(check.name(), "counter");
    }
}
