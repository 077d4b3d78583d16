//! 逐设备帧处理
//!
//! 设备任务从共享信号读到的是「全局」帧，需要按设备自身参数转换后才能发送：
//!
//! 1. 重采样到设备 LED 数量（分块平均）
//! 2. 翻转
//! 3. 饱和度
//! 4. 色温（逐通道乘法校正）
//! 5. 亮度
//! 6. WS2811 色彩校正（可选）
//!
//! 所有步骤都是纯函数，不持有任何硬件资源。

use crate::frame::Signal;
use crate::kelvin::kelvin_to_rgb;
use smart_leds::RGB8;

/// 把像素数组重采样为 `n` 个像素
///
/// - 源长度 >= `n`：按 `numpy.array_split` 语义分块（前 `len % n` 块多一个像素），每块取平均
/// - 源长度 < `n`：最近邻拉伸
/// - 源为空：返回 `n` 个黑色像素
pub fn resample(pixels: &[RGB8], n: usize) -> Vec<RGB8> {
    if n == 0 {
        return Vec::new();
    }
    let len = pixels.len();
    if len == 0 {
        return vec![RGB8::default(); n];
    }
    if len < n {
        return (0..n).map(|i| pixels[i * len / n]).collect();
    }

    let base = len / n;
    let extra = len % n;
    let mut out = Vec::with_capacity(n);
    let mut start = 0;
    for i in 0..n {
        let size = base + usize::from(i < extra);
        out.push(average(&pixels[start..start + size]));
        start += size;
    }
    out
}

/// 像素平均值（空切片返回黑色）
#[allow(clippy::cast_possible_truncation)]
pub fn average(pixels: &[RGB8]) -> RGB8 {
    if pixels.is_empty() {
        return RGB8::default();
    }
    let (mut r, mut g, mut b) = (0u64, 0u64, 0u64);
    for p in pixels {
        r += u64::from(p.r);
        g += u64::from(p.g);
        b += u64::from(p.b);
    }
    let n = pixels.len() as u64;
    RGB8::new((r / n) as u8, (g / n) as u8, (b / n) as u8)
}

/// 单设备帧处理参数
#[derive(Debug, Clone, PartialEq)]
pub struct FrameProcessor {
    /// 目标 LED 数量
    pub leds: usize,
    /// 是否翻转 LED 顺序
    pub flip: bool,
    /// 亮度（0.0 ~ 1.0）
    pub brightness: f32,
    /// 饱和度倍数（1.0 = 不变）
    pub saturation: f32,
    /// 色温（开尔文），None 表示不做白平衡
    pub color_temperature: Option<u16>,
    /// 是否启用 WS2811 色彩校正
    pub color_correction: bool,
}

impl Default for FrameProcessor {
    fn default() -> Self {
        Self {
            leds: 1,
            flip: false,
            brightness: 1.0,
            saturation: 1.0,
            color_temperature: None,
            color_correction: false,
        }
    }
}

impl FrameProcessor {
    /// 把一帧信号转换为设备可直接发送的像素数组（长度 = `leds`）
    pub fn process(&self, signal: &Signal) -> Vec<RGB8> {
        let mut pixels = resample(signal.pixels(), self.leds);
        if self.flip {
            pixels.reverse();
        }

        let tint = self.color_temperature.map(kelvin_to_rgb);
        for pixel in &mut pixels {
            if (self.saturation - 1.0).abs() > f32::EPSILON {
                *pixel = saturate(*pixel, self.saturation);
            }
            if let Some(tint) = tint {
                *pixel = RGB8::new(
                    scale8(pixel.r, tint.r),
                    scale8(pixel.g, tint.g),
                    scale8(pixel.b, tint.b),
                );
            }
            if self.brightness < 1.0 {
                *pixel = dim(*pixel, self.brightness);
            }
            if self.color_correction {
                *pixel = ws2811_correction(*pixel);
            }
        }
        pixels
    }

    /// 单色设备（如手柄灯条）：先整体平均，再走同样的处理流程
    pub fn process_single(&self, signal: &Signal) -> RGB8 {
        let single = Self {
            leds: 1,
            flip: false,
            ..self.clone()
        };
        let averaged = Signal::new(vec![average(signal.pixels())]);
        single.process(&averaged)[0]
    }
}

#[inline]
#[allow(clippy::cast_possible_truncation)]
fn scale8(value: u8, factor: u8) -> u8 {
    ((u16::from(value) * (u16::from(factor) + 1)) >> 8) as u8
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn dim(pixel: RGB8, brightness: f32) -> RGB8 {
    let k = brightness.clamp(0.0, 1.0);
    RGB8::new(
        (f32::from(pixel.r) * k) as u8,
        (f32::from(pixel.g) * k) as u8,
        (f32::from(pixel.b) * k) as u8,
    )
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn saturate(pixel: RGB8, saturation: f32) -> RGB8 {
    let (r, g, b) = (f32::from(pixel.r), f32::from(pixel.g), f32::from(pixel.b));
    let luma = 0.299 * r + 0.587 * g + 0.114 * b;
    let adjust = |c: f32| (luma + (c - luma) * saturation).clamp(0.0, 255.0) as u8;
    RGB8::new(adjust(r), adjust(g), adjust(b))
}

/// WS2811 灯带的经验色彩校正：压低绿色和蓝色通道
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn ws2811_correction(pixel: RGB8) -> RGB8 {
    let g = f32::from(pixel.g);
    let b = f32::from(pixel.b);
    RGB8::new(
        pixel.r,
        (g.sqrt().powf(1.825) + g / 100.0).min(255.0) as u8,
        (b.sqrt().powf(1.775) + b / 100.0).min(255.0) as u8,
    )
}
