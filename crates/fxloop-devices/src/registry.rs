//! 设备注册表
//!
//! 把配置文件中原始的 `[devices.*]` 表校验为 [`DeviceSpec`] 列表：
//!
//! 1. 显式 `enabled = false` 的条目直接跳过
//! 2. 未知类型告警并跳过
//! 3. 缺少类型必需键告警并跳过
//! 4. 可选键填充默认值
//! 5. 构造类型专属的地址参数
//!
//! 取值越界（亮度超出 0~1、fps ≤ 0、leds = 0、类型不符）按缺键处理。
//! 全部条目都被跳过时加载失败。

use crate::error::RegistryError;
use crate::spec::{DeviceKind, DeviceSpec, DeviceType};
use std::path::PathBuf;
use toml::{Table, Value};
use tracing::{debug, warn};

/// WLED 实时协议默认 UDP 端口
pub const DEFAULT_WLED_PORT: u16 = 21324;
/// 串口默认波特率
pub const DEFAULT_BAUD: u32 = 115_200;

/// 注册表加载时使用的全局默认值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegistryDefaults {
    /// 未指定 `fps` 的设备使用的帧率
    pub fps: f64,
}

impl Default for RegistryDefaults {
    fn default() -> Self {
        Self { fps: 30.0 }
    }
}

/// 校验后的设备表（按配置文件中的声明顺序）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceRegistry {
    devices: Vec<DeviceSpec>,
}

impl DeviceRegistry {
    /// 从原始设备表加载
    ///
    /// # 错误
    ///
    /// - [`RegistryError::NoDevices`]：设备表为空
    /// - [`RegistryError::NoValidDevices`]：没有任何条目通过校验
    pub fn load(table: &Table, defaults: RegistryDefaults) -> Result<Self, RegistryError> {
        if table.is_empty() {
            return Err(RegistryError::NoDevices);
        }

        let mut devices = Vec::with_capacity(table.len());
        let mut skipped = 0usize;

        for (name, value) in table {
            match parse_entry(name, value, defaults) {
                Ok(Some(spec)) => {
                    debug!("Registered device {}", spec);
                    devices.push(spec);
                },
                Ok(None) => {
                    debug!("Device {} is disabled, skipping", name);
                    skipped += 1;
                },
                Err(reason) => {
                    warn!("{}: {}, skipping", name, reason);
                    skipped += 1;
                },
            }
        }

        if devices.is_empty() {
            return Err(RegistryError::NoValidDevices { skipped });
        }
        Ok(Self { devices })
    }

    /// 从已构造的设备描述创建（测试和程序化使用）
    ///
    /// 不做键校验，但仍要求至少一个启用设备。
    pub fn from_specs(devices: Vec<DeviceSpec>) -> Result<Self, RegistryError> {
        if devices.is_empty() {
            return Err(RegistryError::NoDevices);
        }
        if !devices.iter().any(|d| d.enabled) {
            return Err(RegistryError::NoValidDevices {
                skipped: devices.len(),
            });
        }
        Ok(Self { devices })
    }

    /// 所有设备（含自检失败后被禁用的）
    pub fn iter(&self) -> impl Iterator<Item = &DeviceSpec> {
        self.devices.iter()
    }

    /// 启用的设备（注册顺序）
    pub fn enabled(&self) -> impl Iterator<Item = &DeviceSpec> {
        self.devices.iter().filter(|d| d.enabled)
    }

    pub fn get(&self, name: &str) -> Option<&DeviceSpec> {
        self.devices.iter().find(|d| d.name == name)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// 启用设备中最大的 LED 数量（共享信号的帧长度）
    pub fn max_leds(&self) -> usize {
        self.enabled().map(|d| d.leds).max().unwrap_or(0)
    }

    /// 自检失败时把设备标记为禁用
    ///
    /// 只在构造新一代（尚未启动任何任务）时调用。返回设备是否存在。
    pub fn mark_disabled(&mut self, name: &str) -> bool {
        match self.devices.iter_mut().find(|d| d.name == name) {
            Some(spec) => {
                spec.enabled = false;
                true
            },
            None => false,
        }
    }
}

/// 解析单个条目：`Ok(None)` 表示显式禁用，`Err` 携带跳过原因
#[allow(clippy::cast_possible_truncation)]
fn parse_entry(
    name: &str,
    value: &Value,
    defaults: RegistryDefaults,
) -> Result<Option<DeviceSpec>, String> {
    let entry = value
        .as_table()
        .ok_or_else(|| "device entry must be a table".to_string())?;

    if !opt_bool(entry, "enabled")?.unwrap_or(true) {
        return Ok(None);
    }

    let device_type: DeviceType = entry
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing device type".to_string())?
        .parse()?;

    let missing: Vec<&str> = device_type
        .required_keys()
        .iter()
        .copied()
        .filter(|key| !entry.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(format!(
            "configuration for {} device is incomplete, missing {:?}",
            device_type, missing
        ));
    }

    let (kind, leds) = match device_type {
        DeviceType::Wled => {
            let ip = req_str(entry, "ip")?.to_string();
            let port = match opt_uint(entry, "port")? {
                Some(p) => u16::try_from(p)
                    .ok()
                    .filter(|p| *p != 0)
                    .ok_or_else(|| format!("port out of range: {p}"))?,
                None => DEFAULT_WLED_PORT,
            };
            (DeviceKind::Wled { ip, port }, req_leds(entry)?)
        },
        DeviceType::Serial => {
            let path = PathBuf::from(req_str(entry, "path")?);
            let baud = match opt_uint(entry, "baud")? {
                Some(b) => u32::try_from(b)
                    .ok()
                    .filter(|b| *b != 0)
                    .ok_or_else(|| format!("baud out of range: {b}"))?,
                None => DEFAULT_BAUD,
            };
            (DeviceKind::Serial { path, baud }, req_leds(entry)?)
        },
        DeviceType::Lightbar => {
            let device_num = opt_uint(entry, "device_num")?
                .and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n >= 1)
                .ok_or_else(|| "device_num must be >= 1".to_string())?;
            (DeviceKind::Lightbar { device_num }, 1)
        },
    };

    let brightness = opt_float(entry, "brightness")?.unwrap_or(1.0);
    if !(0.0..=1.0).contains(&brightness) {
        return Err(format!("brightness must be within 0..=1, got {brightness}"));
    }

    let saturation = opt_float(entry, "saturation")?.unwrap_or(1.0);
    if !(0.0..=2.0).contains(&saturation) {
        return Err(format!("saturation must be within 0..=2, got {saturation}"));
    }

    let fps = opt_float(entry, "fps")?.unwrap_or(defaults.fps);
    if !(fps.is_finite() && fps > 0.0) {
        return Err(format!("fps must be > 0, got {fps}"));
    }

    let color_temperature = match opt_uint(entry, "color_temperature")? {
        Some(k) if (1000..=40_000).contains(&k) => u16::try_from(k).ok(),
        Some(k) => return Err(format!("color_temperature out of range: {k}")),
        None => None,
    };

    Ok(Some(DeviceSpec {
        name: name.to_string(),
        kind,
        leds,
        brightness: brightness as f32,
        flip: opt_bool(entry, "flip")?.unwrap_or(false),
        color_correction: opt_bool(entry, "color_correction")?.unwrap_or(false),
        color_temperature,
        saturation: saturation as f32,
        fps,
        enabled: true,
    }))
}

fn req_str<'a>(entry: &'a Table, key: &str) -> Result<&'a str, String> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("{key} must be a string"))
}

fn req_leds(entry: &Table) -> Result<usize, String> {
    opt_uint(entry, "leds")?
        .and_then(|n| usize::try_from(n).ok())
        .filter(|n| *n > 0)
        .ok_or_else(|| "leds must be > 0".to_string())
}

fn opt_bool(entry: &Table, key: &str) -> Result<Option<bool>, String> {
    match entry.get(key) {
        None => Ok(None),
        Some(Value::Boolean(b)) => Ok(Some(*b)),
        Some(other) => Err(format!("{key} must be a boolean, got {}", other.type_str())),
    }
}

fn opt_uint(entry: &Table, key: &str) -> Result<Option<u64>, String> {
    match entry.get(key) {
        None => Ok(None),
        Some(Value::Integer(i)) => u64::try_from(*i)
            .map(Some)
            .map_err(|_| format!("{key} must be non-negative, got {i}")),
        Some(other) => Err(format!("{key} must be an integer, got {}", other.type_str())),
    }
}

/// 浮点键同时接受整数写法（`fps = 30`）
#[allow(clippy::cast_precision_loss)]
fn opt_float(entry: &Table, key: &str) -> Result<Option<f64>, String> {
    match entry.get(key) {
        None => Ok(None),
        Some(Value::Float(f)) => Ok(Some(*f)),
        Some(Value::Integer(i)) => Ok(Some(*i as f64)),
        Some(other) => Err(format!("{key} must be a number, got {}", other.type_str())),
    }
}
