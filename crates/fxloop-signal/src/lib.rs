//! # fxloop-signal
//!
//! 信号层：数据生产阶段与设备阶段之间交换的纯数据类型。
//!
//! - [`Signal`]：一帧完整的颜色信号（RGB 数组 + 代数计数器）
//! - [`process`]：按设备参数对信号做重采样、翻转、亮度、色温、饱和度、色彩校正
//! - [`source`]：`SignalSource` trait 与内置信号源（solid / rainbow / breathe）
//!
//! 本 crate 不依赖线程、硬件或调度器，可以被驱动层和设备层同时使用。

mod error;
mod frame;
mod kelvin;
pub mod process;
pub mod source;

pub use error::SignalError;
pub use frame::Signal;
pub use kelvin::kelvin_to_rgb;
pub use process::{FrameProcessor, average, resample};
pub use smart_leds::RGB8;
pub use source::{SignalSource, SourceConfig};
