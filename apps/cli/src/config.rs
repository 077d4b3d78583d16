//! 配置文件定位与加载

use anyhow::{Context, Result};
use fxloop_driver::EngineConfig;
use std::path::{Path, PathBuf};

/// 当前目录下的默认配置文件名
pub const LOCAL_CONFIG: &str = "fxloop.toml";

/// 用户配置目录下的配置文件：`<config_dir>/fxloop/config.toml`
fn user_config() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push("fxloop");
    path.push("config.toml");
    Some(path)
}

/// 确定要使用的配置文件
///
/// 显式指定的路径优先；否则依次尝试 `./fxloop.toml` 和用户配置目录。
pub fn resolve(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.is_file() {
        return Ok(local);
    }
    match user_config() {
        Some(path) if path.is_file() => Ok(path),
        Some(path) => anyhow::bail!(
            "no configuration found (tried ./{} and {})",
            LOCAL_CONFIG,
            path.display()
        ),
        None => anyhow::bail!("no configuration found (tried ./{})", LOCAL_CONFIG),
    }
}

/// 读取并解析配置文件
pub fn load(path: &Path) -> Result<EngineConfig> {
    EngineConfig::load(path).with_context(|| format!("failed to load {}", path.display()))
}
