//! 信号层错误类型定义

use thiserror::Error;

/// 信号层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    /// 信号源配置非法（如 LED 数量为 0）
    #[error("Invalid source configuration: {0}")]
    InvalidConfig(String),

    /// 信号源暂时无法产出数据
    #[error("Signal source unavailable: {0}")]
    Unavailable(String),
}
