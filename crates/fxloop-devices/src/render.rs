//! 设备输出接口
//!
//! - [`Renderer`]：一个已连接的硬件句柄，只被对应的设备任务独占
//! - [`Connect`]：按设备描述打开硬件（注册的扩展点，测试中替换为桩实现）

use crate::error::DeviceError;
use crate::lightbar::LightbarRenderer;
use crate::serial::SerialRenderer;
use crate::spec::{DeviceKind, DeviceSpec};
use crate::wled::WledRenderer;
use fxloop_signal::Signal;
use std::path::PathBuf;

/// 设备输出
pub trait Renderer: Send {
    /// 处理并发送一帧
    ///
    /// 在设备任务的迭代内同步完成；返回致命错误（见 [`DeviceError::is_fatal`]）时
    /// 设备任务终止。
    fn render(&mut self, signal: &Signal) -> Result<(), DeviceError>;
}

/// 硬件连接器
///
/// 连接同时充当自检：打不开的设备在新一代启动前被禁用。
pub trait Connect: Send + Sync {
    fn connect(&self, spec: &DeviceSpec) -> Result<Box<dyn Renderer>, DeviceError>;
}

/// sysfs LED 类默认根目录
pub const DEFAULT_LEDS_ROOT: &str = "/sys/class/leds";

/// 默认连接器：按设备类型打开真实硬件
#[derive(Debug, Clone)]
pub struct HardwareConnector {
    /// 灯条发现所用的 sysfs 根目录
    pub leds_root: PathBuf,
}

impl Default for HardwareConnector {
    fn default() -> Self {
        Self {
            leds_root: PathBuf::from(DEFAULT_LEDS_ROOT),
        }
    }
}

impl Connect for HardwareConnector {
    fn connect(&self, spec: &DeviceSpec) -> Result<Box<dyn Renderer>, DeviceError> {
        let processor = spec.processor();
        Ok(match &spec.kind {
            DeviceKind::Wled { ip, port } => Box::new(WledRenderer::connect(ip, *port, processor)?),
            DeviceKind::Serial { path, baud } => {
                Box::new(SerialRenderer::open(path, *baud, processor)?)
            },
            DeviceKind::Lightbar { device_num } => Box::new(LightbarRenderer::discover(
                &self.leds_root,
                *device_num,
                processor,
            )?),
        })
    }
}
