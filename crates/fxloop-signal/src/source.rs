//! 信号源
//!
//! 数据生产任务每次迭代调用一次 [`SignalSource::produce`]，其内部开销（截屏、FFT 等）
//! 对调度器不透明。本模块只提供可移植的内置信号源；截屏和音频频谱分析依赖平台采集栈，
//! 不在此实现，可以通过实现 `SignalSource` 接入。

use crate::error::SignalError;
use crate::frame::Signal;
use serde::Deserialize;
use smart_leds::RGB8;
use smart_leds::hsv::{Hsv, hsv2rgb};
use std::time::Instant;

/// 信号源接口（拉取式）
///
/// 实现者只被数据生产任务独占调用，不需要内部同步。
pub trait SignalSource: Send {
    /// 信号源名称（用于日志）
    fn name(&self) -> &str;

    /// 产出一帧新信号
    fn produce(&mut self) -> Result<Signal, SignalError>;
}

/// 信号源配置
///
/// ```toml
/// source = { type = "rainbow", speed = 90.0 }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    /// 纯色
    Solid { color: [u8; 3] },
    /// 沿灯带分布的色轮，按 `speed`（度/秒）旋转
    Rainbow {
        #[serde(default = "default_rainbow_speed")]
        speed: f32,
    },
    /// 单色呼吸，`period` 为一个呼吸周期（秒）
    Breathe {
        color: [u8; 3],
        #[serde(default = "default_breathe_period")]
        period: f32,
    },
}

fn default_rainbow_speed() -> f32 {
    60.0
}

fn default_breathe_period() -> f32 {
    4.0
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Rainbow {
            speed: default_rainbow_speed(),
        }
    }
}

impl SourceConfig {
    /// 构造信号源，`leds` 为输出帧长度（通常是所有启用设备的最大 LED 数）
    pub fn build(&self, leds: usize) -> Result<Box<dyn SignalSource>, SignalError> {
        if leds == 0 {
            return Err(SignalError::InvalidConfig(
                "signal length must be > 0".to_string(),
            ));
        }
        match *self {
            Self::Solid { color: [r, g, b] } => Ok(Box::new(SolidSource {
                frame: Signal::solid(leds, RGB8::new(r, g, b)),
            })),
            Self::Rainbow { speed } => {
                if !speed.is_finite() {
                    return Err(SignalError::InvalidConfig(format!(
                        "rainbow speed must be finite, got {speed}"
                    )));
                }
                Ok(Box::new(RainbowSource::new(leds, speed)))
            },
            Self::Breathe {
                color: [r, g, b],
                period,
            } => {
                if !(period.is_finite() && period > 0.0) {
                    return Err(SignalError::InvalidConfig(format!(
                        "breathe period must be > 0, got {period}"
                    )));
                }
                Ok(Box::new(BreatheSource {
                    leds,
                    color: RGB8::new(r, g, b),
                    period,
                    started: Instant::now(),
                }))
            },
        }
    }
}

/// 纯色信号源
struct SolidSource {
    frame: Signal,
}

impl SignalSource for SolidSource {
    fn name(&self) -> &str {
        "solid"
    }

    fn produce(&mut self) -> Result<Signal, SignalError> {
        Ok(self.frame.clone())
    }
}

/// 旋转色轮信号源
pub struct RainbowSource {
    leds: usize,
    speed: f32,
    offset_deg: f32,
    last: Option<Instant>,
}

impl RainbowSource {
    pub fn new(leds: usize, speed: f32) -> Self {
        Self {
            leds,
            speed,
            offset_deg: 0.0,
            last: None,
        }
    }

    /// 按给定相位渲染一帧（不推进时间）
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn render(&self, offset_deg: f32) -> Signal {
        let pixels = (0..self.leds)
            .map(|i| {
                let deg = (360.0 * i as f32 / self.leds as f32 + offset_deg).rem_euclid(360.0);
                hsv2rgb(Hsv {
                    hue: (deg * 256.0 / 360.0) as u8,
                    sat: 255,
                    val: 255,
                })
            })
            .collect();
        Signal::new(pixels)
    }
}

impl SignalSource for RainbowSource {
    fn name(&self) -> &str {
        "rainbow"
    }

    fn produce(&mut self) -> Result<Signal, SignalError> {
        let now = Instant::now();
        if let Some(last) = self.last {
            let dt = now.duration_since(last).as_secs_f32();
            self.offset_deg = (self.offset_deg + self.speed * dt).rem_euclid(360.0);
        }
        self.last = Some(now);
        Ok(self.render(self.offset_deg))
    }
}

/// 呼吸信号源
struct BreatheSource {
    leds: usize,
    color: RGB8,
    period: f32,
    started: Instant,
}

impl SignalSource for BreatheSource {
    fn name(&self) -> &str {
        "breathe"
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn produce(&mut self) -> Result<Signal, SignalError> {
        let t = self.started.elapsed().as_secs_f32();
        let level = (t * std::f32::consts::TAU / self.period).sin() * 0.5 + 0.5;
        let scale = |c: u8| (f32::from(c) * level) as u8;
        Ok(Signal::solid(
            self.leds,
            RGB8::new(scale(self.color.r), scale(self.color.g), scale(self.color.b)),
        ))
    }
}
