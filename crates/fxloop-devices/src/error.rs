//! 设备层错误类型定义

use std::io;
use thiserror::Error;

/// 设备运行时错误
#[derive(Error, Debug)]
pub enum DeviceError {
    /// 底层 IO 错误（socket / 串口 / sysfs）
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// 设备不存在（路径不存在、地址无法解析、手柄未连接）
    #[error("Device not found: {0}")]
    NotFound(String),

    /// 不支持的串口波特率
    #[error("Unsupported baud rate: {0}")]
    UnsupportedBaud(u32),

    /// 串口 termios 配置失败
    #[cfg(target_os = "linux")]
    #[error("Serial configuration error: {0}")]
    Termios(#[from] nix::Error),
}

impl DeviceError {
    /// 是否为致命错误
    ///
    /// 致命错误会让设备任务自行终止；非致命错误（超时、缓冲区暂满、对端暂时拒绝）
    /// 只记录日志，下一帧继续尝试。
    pub fn is_fatal(&self) -> bool {
        match self {
            DeviceError::Io(e) => !matches!(
                e.kind(),
                io::ErrorKind::WouldBlock
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::Interrupted
                    | io::ErrorKind::ConnectionRefused
            ),
            _ => true,
        }
    }
}

/// 注册表加载错误（致命，进程应以非零状态退出）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// 配置中没有定义任何设备
    #[error("No devices defined in configuration")]
    NoDevices,

    /// 所有设备都被跳过（禁用或配置不完整）
    #[error("There's no device with complete configuration ({skipped} skipped)")]
    NoValidDevices { skipped: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_display() {
        let err = DeviceError::NotFound("/dev/ttyUSB9".to_string());
        assert_eq!(err.to_string(), "Device not found: /dev/ttyUSB9");

        let err = DeviceError::UnsupportedBaud(12345);
        assert!(err.to_string().contains("12345"));

        let err = RegistryError::NoValidDevices { skipped: 3 };
        assert!(err.to_string().contains("3 skipped"));
    }

    #[test]
    fn test_io_error_classification() {
        let transient = DeviceError::Io(io::Error::from(io::ErrorKind::WouldBlock));
        assert!(!transient.is_fatal());

        let refused = DeviceError::Io(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(!refused.is_fatal());

        let gone = DeviceError::Io(io::Error::from(io::ErrorKind::NotFound));
        assert!(gone.is_fatal());

        assert!(DeviceError::NotFound("pad".to_string()).is_fatal());
    }

    #[test]
    fn test_from_io_error() {
        let err: DeviceError = io::Error::from(io::ErrorKind::BrokenPipe).into();
        match err {
            DeviceError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            _ => panic!("Expected Io variant"),
        }
    }
}
