//! 设备描述
//!
//! [`DeviceSpec`] 在加载（或 reload）时构造一次，运行期间只读，不需要加锁。

use fxloop_signal::FrameProcessor;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// 设备类型（注册表中的已注册类型）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    /// 网络灯带控制器（WLED UDP 实时协议）
    Wled,
    /// 串口灯带（Arduino 等，原始 RGB 字节流）
    Serial,
    /// 手柄灯条（DualShock 4，sysfs LED 接口）
    Lightbar,
}

impl DeviceType {
    /// 所有已注册类型
    pub const ALL: [DeviceType; 3] = [DeviceType::Wled, DeviceType::Serial, DeviceType::Lightbar];

    /// 配置中使用的类型名
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceType::Wled => "wled",
            DeviceType::Serial => "serial",
            DeviceType::Lightbar => "dualshock",
        }
    }

    /// 该类型必须提供的配置键
    pub fn required_keys(self) -> &'static [&'static str] {
        match self {
            DeviceType::Wled => &["ip", "leds"],
            DeviceType::Serial => &["path", "leds"],
            DeviceType::Lightbar => &["device_num"],
        }
    }
}

impl FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wled" => Ok(DeviceType::Wled),
            "serial" | "arduino" => Ok(DeviceType::Serial),
            "dualshock" | "ds4" => Ok(DeviceType::Lightbar),
            other => Err(format!(
                "invalid type \"{other}\", must be one of {:?}",
                DeviceType::ALL.map(DeviceType::as_str)
            )),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 设备类型及其专属地址参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceKind {
    Wled { ip: String, port: u16 },
    Serial { path: PathBuf, baud: u32 },
    Lightbar { device_num: u32 },
}

impl DeviceKind {
    pub fn device_type(&self) -> DeviceType {
        match self {
            DeviceKind::Wled { .. } => DeviceType::Wled,
            DeviceKind::Serial { .. } => DeviceType::Serial,
            DeviceKind::Lightbar { .. } => DeviceType::Lightbar,
        }
    }
}

/// 校验后的设备描述
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSpec {
    /// 唯一名称（配置表的键）
    pub name: String,
    pub kind: DeviceKind,
    /// LED 数量（灯条固定为 1）
    pub leds: usize,
    /// 亮度（0.0 ~ 1.0）
    pub brightness: f32,
    pub flip: bool,
    pub color_correction: bool,
    /// 色温（开尔文）
    pub color_temperature: Option<u16>,
    /// 饱和度倍数（0.0 ~ 2.0）
    pub saturation: f32,
    /// 目标帧率（> 0）
    pub fps: f64,
    pub enabled: bool,
}

impl DeviceSpec {
    /// 以默认参数创建设备描述（主要用于测试和程序化构造）
    pub fn new(name: impl Into<String>, kind: DeviceKind, leds: usize, fps: f64) -> Self {
        Self {
            name: name.into(),
            kind,
            leds,
            brightness: 1.0,
            flip: false,
            color_correction: false,
            color_temperature: None,
            saturation: 1.0,
            fps,
            enabled: true,
        }
    }

    pub fn device_type(&self) -> DeviceType {
        self.kind.device_type()
    }

    /// 该设备的帧处理参数
    pub fn processor(&self) -> FrameProcessor {
        FrameProcessor {
            leds: self.leds,
            flip: self.flip,
            brightness: self.brightness,
            saturation: self.saturation,
            color_temperature: self.color_temperature,
            color_correction: self.color_correction,
        }
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {} fps)", self.name, self.device_type(), self.fps)
    }
}
