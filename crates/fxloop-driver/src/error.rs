//! 驱动层错误类型定义

use fxloop_devices::RegistryError;
use fxloop_signal::SignalError;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 设备注册表加载失败（没有可用设备）
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// 信号源构造失败
    #[error("Signal source error: {0}")]
    Signal(#[from] SignalError),

    /// 配置文件格式错误
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// 配置文件读取失败
    #[error("Config IO error: {0}")]
    Io(#[from] io::Error),

    /// 帧率非法（必须为有限正数）
    #[error("Invalid fps: {0} (must be > 0)")]
    InvalidFps(f64),

    /// 已被 kill 的任务不能再启动
    #[error("Task runner '{0}' was killed and cannot be restarted")]
    RunnerKilled(String),

    /// Orchestrator 已被 kill（终态）
    #[error("Orchestrator has been shut down")]
    Shutdown,

    /// 任务线程未在超时内退出
    #[error("Task runner '{name}' did not exit within {timeout:?}")]
    JoinTimeout { name: String, timeout: Duration },

    /// 任务线程 panic 后无法 join
    #[error("Task runner '{0}' thread panicked")]
    ThreadPanicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::InvalidFps(0.0);
        assert_eq!(err.to_string(), "Invalid fps: 0 (must be > 0)");

        let err = DriverError::RunnerKilled("desk".to_string());
        assert!(err.to_string().contains("'desk'"));

        let err = DriverError::JoinTimeout {
            name: "data".to_string(),
            timeout: Duration::from_secs(2),
        };
        assert!(err.to_string().contains("2s"));
    }

    #[test]
    fn test_from_registry_error() {
        let err: DriverError = RegistryError::NoValidDevices { skipped: 2 }.into();
        assert!(matches!(err, DriverError::Registry(_)));
        assert!(err.to_string().contains("2 skipped"));
    }
}
