//! 日志初始化
//!
//! 库本身从不安装全局 subscriber，由应用在启动时调用 [`init_file_logging`]。
//! 日志文件按序列号与采集时间命名：`<serial_no>_monitor_<YYYYMMDDHHMM>.log`。

use crate::config::RobotConfig;
use crate::error::DriverError;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// 未设置 `RUST_LOG` 时的默认过滤级别
pub const DEFAULT_LOG_FILTER: &str = "info";

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
    pub serial_no: String,
    /// 同时输出到控制台
    pub log_to_console: bool,
    pub default_filter: String,
}

impl LoggingConfig {
    pub fn new(log_dir: impl Into<PathBuf>, serial_no: impl Into<String>) -> Self {
        Self {
            log_dir: log_dir.into(),
            serial_no: serial_no.into(),
            log_to_console: false,
            default_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    /// 从机器人配置派生
    pub fn from_robot_config(config: &RobotConfig, log_dir: impl AsRef<Path>) -> Self {
        Self {
            log_to_console: config.log_to_console,
            ..Self::new(log_dir.as_ref(), config.serial_no.clone())
        }
    }
}

/// 日志文件名
pub fn log_file_name(serial_no: &str, capture_time: &NaiveDateTime) -> String {
    format!("{}_monitor_{}.log", serial_no, capture_time.format("%Y%m%d%H%M"))
}

/// 安装文件日志（可选控制台输出）
///
/// 返回的 `WorkerGuard` 必须保持存活，drop 时刷新剩余日志。
///
/// # 错误
///
/// - 无法创建日志目录：`DriverError::Io`
/// - 全局 subscriber 已安装：`DriverError::Logging`
pub fn init_file_logging(config: &LoggingConfig) -> Result<(WorkerGuard, PathBuf), DriverError> {
    std::fs::create_dir_all(&config.log_dir)?;

    let capture_time = chrono::Local::now().naive_local();
    let file_name = log_file_name(&config.serial_no, &capture_time);
    let path = config.log_dir.join(&file_name);

    let appender = tracing_appender::rolling::never(&config.log_dir, &file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_thread_names(true);
    let console_layer = config
        .log_to_console
        .then(|| tracing_subscriber::fmt::layer().with_thread_names(true));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| DriverError::Logging(e.to_string()))?;

    Ok((guard, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_log_file_name() {
        let time = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 7, 59)
            .unwrap();
        assert_eq!(
            log_file_name("stretch-re2-1042", &time),
            "stretch-re2-1042_monitor_202403051407.log"
        );
    }

    #[test]
    fn test_from_robot_config() {
        let config = RobotConfig {
            serial_no: "stretch-re1-1001".to_string(),
            log_to_console: true,
            ..RobotConfig::default()
        };
        let logging = LoggingConfig::from_robot_config(&config, "/tmp/stretch-logs");
        assert_eq!(logging.serial_no, "stretch-re1-1001");
        assert!(logging.log_to_console);
        assert_eq!(logging.log_dir, PathBuf::from("/tmp/stretch-logs"));
        assert_eq!(logging.default_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_init_file_logging_writes_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig::new(dir.path().join("logs"), "stretch-re1-0042");

        let (guard, path) = init_file_logging(&config).unwrap();
        tracing::error!("file logging smoke test");
        drop(guard);

        assert_eq!(path.parent(), Some(dir.path().join("logs").as_path()));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("stretch-re1-0042_monitor_"));
        assert!(name.ends_with(".log"));
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("file logging smoke test"));

        // 全局 subscriber 只能安装一次
        assert!(matches!(
            init_file_logging(&config),
            Err(DriverError::Logging(_))
        ));
    }
}
