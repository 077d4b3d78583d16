//! DualShock 4 灯条（Linux sysfs LED 接口）
//!
//! hid-sony 驱动为每个手柄注册四个 LED 类节点：
//!
//! ```text
//! /sys/class/leds/0005:054C:05C4.0001:global
//! /sys/class/leds/0005:054C:05C4.0001:red
//! /sys/class/leds/0005:054C:05C4.0001:green
//! /sys/class/leds/0005:054C:05C4.0001:blue
//! ```
//!
//! 以 `:global` 节点做发现（排序后按 `device_num` 从 1 开始编号），
//! 颜色写入对应 `red` / `green` / `blue` 节点下的 `brightness` 文件。

use crate::error::DeviceError;
use crate::render::Renderer;
use fxloop_signal::{FrameProcessor, RGB8, Signal};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Sony 厂商号 + DualShock 4 产品号（一代 / 二代）
const CONTROLLER_IDS: [&str; 2] = [":054C:05C4.", ":054C:09CC."];
const GLOBAL_SUFFIX: &str = ":global";

/// 列出 `root` 下所有手柄的 `:global` 节点（已排序）
pub fn discover(root: &Path) -> Result<Vec<PathBuf>, DeviceError> {
    let mut found = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.ends_with(GLOBAL_SUFFIX) && CONTROLLER_IDS.iter().any(|id| name.contains(id)) {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found)
}

/// 灯条输出
#[derive(Debug)]
pub struct LightbarRenderer {
    channels: [PathBuf; 3],
    processor: FrameProcessor,
    last: Option<RGB8>,
}

impl LightbarRenderer {
    /// 按编号（从 1 开始）查找手柄
    pub fn discover(
        root: &Path,
        device_num: u32,
        processor: FrameProcessor,
    ) -> Result<Self, DeviceError> {
        let not_found = || {
            DeviceError::NotFound(format!(
                "no lightbar available for device_num {device_num}"
            ))
        };
        if !root.is_dir() {
            return Err(not_found());
        }
        let nodes = discover(root)?;
        let index = usize::try_from(device_num)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .ok_or_else(not_found)?;
        let global = nodes.get(index).ok_or_else(not_found)?;
        debug!("Lightbar {} bound to {}", device_num, global.display());
        Ok(Self::new(global, processor))
    }

    /// 从 `:global` 节点路径推导三个通道的 `brightness` 文件
    pub fn new(global: &Path, processor: FrameProcessor) -> Self {
        let stem = global.to_string_lossy();
        let prefix = stem.strip_suffix("global").unwrap_or(&stem);
        let channel = |color: &str| PathBuf::from(format!("{prefix}{color}")).join("brightness");
        Self {
            channels: [channel("red"), channel("green"), channel("blue")],
            processor,
            last: None,
        }
    }

    pub fn channels(&self) -> &[PathBuf; 3] {
        &self.channels
    }
}

impl Renderer for LightbarRenderer {
    fn render(&mut self, signal: &Signal) -> Result<(), DeviceError> {
        let color = self.processor.process_single(signal);
        // sysfs 写入开销较大，颜色不变时跳过
        if self.last == Some(color) {
            return Ok(());
        }
        for (path, value) in self.channels.iter().zip([color.r, color.g, color.b]) {
            fs::write(path, value.to_string())?;
        }
        self.last = Some(color);
        trace!("Lightbar set to {:?}", color);
        Ok(())
    }
}
