//! 引擎配置
//!
//! ```toml
//! fps = 60.0
//! source = { type = "rainbow", speed = 60.0 }
//!
//! [devices.desk]
//! type = "wled"
//! ip = "192.168.1.40"
//! leds = 60
//! fps = 30
//! ```
//!
//! 设备表保持原始 TOML 形式，由注册表按类型做键集合校验。
//! 每次 `reload` 都重新读取整个文件，不存在全局可变配置。

use crate::error::DriverError;
use crate::pacer::PacingMode;
use crate::timing::DEFAULT_TIMING_WINDOW;
use fxloop_signal::SourceConfig;
use serde::Deserialize;
use std::path::Path;
use toml::Table;

/// 默认全局帧率
pub const DEFAULT_FPS: f64 = 30.0;

fn default_fps() -> f64 {
    DEFAULT_FPS
}

/// 一代配置（整体传给 Orchestrator，reload 时整体替换）
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// 数据任务帧率，也是设备未指定 `fps` 时的默认值
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default)]
    pub source: SourceConfig,
    /// 原始设备表（声明顺序即注册顺序）
    #[serde(default)]
    pub devices: Table,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            source: SourceConfig::default(),
            devices: Table::new(),
        }
    }
}

impl EngineConfig {
    /// 从 TOML 文本解析
    pub fn from_toml_str(text: &str) -> Result<Self, DriverError> {
        let config: Self = toml::from_str(text)?;
        if !(config.fps.is_finite() && config.fps > 0.0) {
            return Err(DriverError::InvalidFps(config.fps));
        }
        Ok(config)
    }

    /// 读取并解析配置文件
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DriverError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

/// 运行期开关（来自命令行，进程生命周期内不变）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// 单线程模式（调试用）
    pub single_threaded: bool,
    /// 以 info 级别输出每秒帧耗时报告
    pub display_frametimes: bool,
    /// 任务跟不上目标帧率时输出警告
    pub performance_warnings: bool,
    /// 每个任务保留的耗时样本数
    pub timing_window: usize,
    pub pacing: PacingMode,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            single_threaded: false,
            display_frametimes: false,
            performance_warnings: true,
            timing_window: DEFAULT_TIMING_WINDOW,
            pacing: PacingMode::Park,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config.fps, DEFAULT_FPS);
        assert_eq!(config.source, SourceConfig::default());
        assert!(config.devices.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = EngineConfig::from_toml_str(
            r#"
fps = 60
source = { type = "solid", color = [1, 2, 3] }

[devices.b]
type = "wled"
ip = "10.0.0.2"
leds = 10

[devices.a]
type = "ds4"
device_num = 1
"#,
        )
        .unwrap();
        assert_eq!(config.fps, 60.0);
        assert_eq!(config.source, SourceConfig::Solid { color: [1, 2, 3] });
        let names: Vec<&String> = config.devices.keys().collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_invalid_fps() {
        assert!(matches!(
            EngineConfig::from_toml_str("fps = 0"),
            Err(DriverError::InvalidFps(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("fps = \"fast\""),
            Err(DriverError::Config(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = EngineConfig::load(dir.path().join("missing.toml"));
        assert!(matches!(result, Err(DriverError::Io(_))));
    }
}
