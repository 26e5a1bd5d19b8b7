//! 腕部板实现注册表
//!
//! 配置项 `custom_wacc` 按名称选择腕部板实现。可选实现在构建前注册到
//! [`WaccRegistry`]，构建时按名称创建；不使用全局状态。

use crate::config::RobotConfig;
use crate::error::DriverError;
use std::collections::BTreeMap;
use stretch_device::{Shared, WristBoard};

/// 腕部板工厂
pub type WaccFactory = Box<dyn Fn(&RobotConfig) -> Shared<dyn WristBoard> + Send + Sync>;

/// 腕部板实现注册表
#[derive(Default)]
pub struct WaccRegistry {
    factories: BTreeMap<String, WaccFactory>,
}

impl WaccRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工厂
    ///
    /// # 错误
    ///
    /// 同名实现已注册时返回 `DriverError::Config`。
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), DriverError>
    where
        F: Fn(&RobotConfig) -> Shared<dyn WristBoard> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(DriverError::Config(format!(
                "wacc implementation '{}' is already registered",
                name
            )));
        }
        self.factories.insert(name, Box::new(factory));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// 按名称创建实例
    ///
    /// # 错误
    ///
    /// 未注册时返回 `DriverError::UnknownDevice`。
    pub fn create(
        &self,
        name: &str,
        config: &RobotConfig,
    ) -> Result<Shared<dyn WristBoard>, DriverError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| DriverError::UnknownDevice(name.to_string()))?;
        Ok(factory(config))
    }

    /// 已注册的名称（有序）
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for WaccRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaccRegistry")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stretch_device::mock::{Journal, MockWristBoard};
    use stretch_device::{Device, shared};

    fn registry_with_sensor_wacc(journal: Journal) -> WaccRegistry {
        let mut registry = WaccRegistry::new();
        registry
            .register("wacc_with_sensor", move |_config: &RobotConfig| {
                shared(MockWristBoard::named("wacc_with_sensor", journal.clone()))
                    as Shared<dyn WristBoard>
            })
            .unwrap();
        registry
    }

    #[test]
    fn test_register_and_create() {
        let registry = registry_with_sensor_wacc(Journal::new());
        assert!(registry.contains("wacc_with_sensor"));

        let wacc = registry
            .create("wacc_with_sensor", &RobotConfig::default())
            .unwrap();
        assert_eq!(wacc.lock().name(), "wacc_with_sensor");
    }

    #[test]
    fn test_unknown_name() {
        let registry = WaccRegistry::new();
        match registry.create("missing", &RobotConfig::default()) {
            Err(DriverError::UnknownDevice(name)) => assert_eq!(name, "missing"),
            other => panic!("expected UnknownDevice, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let journal = Journal::new();
        let mut registry = registry_with_sensor_wacc(journal.clone());
        let result = registry.register("wacc_with_sensor", move |_config: &RobotConfig| {
            shared(MockWristBoard::new(journal.clone())) as Shared<dyn WristBoard>
        });
        assert!(matches!(result, Err(DriverError::Config(_))));
        assert_eq!(registry.names(), vec!["wacc_with_sensor"]);
    }
}
