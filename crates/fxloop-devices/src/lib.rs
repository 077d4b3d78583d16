//! # fxloop-devices
//!
//! 设备层：把原始配置校验为不可变的 [`DeviceSpec`]，并为每种外设提供发送实现。
//!
//! - [`registry`]：设备注册表（按类型校验必需键、填充默认值、跳过非法条目）
//! - [`spec`]：设备描述（封闭的设备类型枚举，每种类型携带自己的地址参数）
//! - [`render`]：`Renderer` / `Connect` trait 与默认的硬件连接器
//! - [`wled`] / [`serial`] / [`lightbar`]：三种外设的线路编码与发送
//!
//! 每个 `Renderer` 只被对应设备的任务线程独占，不存在两个任务共享同一个硬件句柄。

mod error;
pub mod lightbar;
pub mod registry;
pub mod render;
pub mod serial;
pub mod spec;
pub mod wled;

pub use error::{DeviceError, RegistryError};
pub use registry::{DeviceRegistry, RegistryDefaults};
pub use render::{Connect, HardwareConnector, Renderer};
pub use spec::{DeviceKind, DeviceSpec, DeviceType};
