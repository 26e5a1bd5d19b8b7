//! 驱动层错误类型定义

use stretch_device::DeviceError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 设备操作失败
    #[error("Device '{device}' error: {source}")]
    Device {
        device: &'static str,
        #[source]
        source: DeviceError,
    },

    /// 历史记录中不存在该 id（已被淘汰或尚未产生）
    #[error("Status id {id} not found (retained window: {oldest:?}..={newest:?})")]
    StatusNotFound {
        id: u64,
        oldest: Option<u64>,
        newest: Option<u64>,
    },

    /// 构建时缺少必需设备
    #[error("Missing required device: {0}")]
    MissingDevice(&'static str),

    /// 注册表中不存在该设备实现
    #[error("Unknown device implementation: {0}")]
    UnknownDevice(String),

    /// 配置无效
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// 配置解析失败
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    /// 轮询线程已在运行
    #[error("Robot is already running")]
    AlreadyRunning,

    /// 轮询线程未运行
    #[error("Robot is not running")]
    NotRunning,

    /// 线程创建失败
    #[error("Failed to spawn thread: {0}")]
    ThreadSpawn(String),

    /// 日志初始化失败
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl DriverError {
    /// 包装设备错误
    pub fn device(device: &'static str, source: DeviceError) -> Self {
        DriverError::Device { device, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::device("lift", DeviceError::Transport("crc mismatch".into()));
        assert_eq!(
            format!("{}", err),
            "Device 'lift' error: Transport error: crc mismatch"
        );

        let err = DriverError::StatusNotFound {
            id: 3,
            oldest: Some(10),
            newest: Some(34),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Status id 3 not found"), "{}", msg);

        assert_eq!(
            format!("{}", DriverError::MissingDevice("pimu")),
            "Missing required device: pimu"
        );
        assert_eq!(
            format!("{}", DriverError::AlreadyRunning),
            "Robot is already running"
        );
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;
        let err = DriverError::device("pimu", DeviceError::Timeout);
        let source = err.source().expect("device error has a source");
        assert_eq!(source.to_string(), "Operation timeout");
    }

    #[test]
    fn test_from_toml_error() {
        let parse: Result<toml::Value, _> = toml::from_str("serial_no = ");
        let err: DriverError = parse.unwrap_err().into();
        assert!(matches!(err, DriverError::ConfigParse(_)));
    }
}
