//! 信号帧
//!
//! 数据生产任务每次迭代产出一个 [`Signal`]，由驱动层整体替换到共享信号中。
//! 帧一旦构造完成就不再修改，读取方拿到的永远是完整的一帧。

use smart_leds::RGB8;

/// 一帧颜色信号
///
/// - `pixels`: RGB 数组，长度通常等于所有启用设备中最大的 LED 数量
/// - `generation`: 由写入方递增的代数计数器，0 表示尚未产出过任何帧
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signal {
    generation: u64,
    pixels: Vec<RGB8>,
}

impl Signal {
    /// 从像素数组创建信号（代数为 0，由写入方在发布时打上代数）
    pub fn new(pixels: Vec<RGB8>) -> Self {
        Self {
            generation: 0,
            pixels,
        }
    }

    /// 创建长度为 `len` 的纯色信号
    pub fn solid(len: usize, color: RGB8) -> Self {
        Self::new(vec![color; len])
    }

    /// 设置代数（发布前由共享信号写入方调用）
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// 帧代数
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 像素数据
    pub fn pixels(&self) -> &[RGB8] {
        &self.pixels
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// 整帧校验和（FNV-1a，覆盖代数和全部像素字节）
    ///
    /// 用于并发读写测试中验证读到的帧没有被撕裂。
    pub fn checksum(&self) -> u64 {
        const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

        let mut hash = FNV_OFFSET;
        for byte in self.generation.to_le_bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        for pixel in &self.pixels {
            for byte in [pixel.r, pixel.g, pixel.b] {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(FNV_PRIME);
            }
        }
        hash
    }

    /// 扁平化为 `[r, g, b, r, g, b, ...]` 字节序列
    pub fn to_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| [p.r, p.g, p.b]).collect()
    }
}

impl From<Vec<RGB8>> for Signal {
    fn from(pixels: Vec<RGB8>) -> Self {
        Self::new(pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_default_is_empty() {
        let signal = Signal::default();
        assert!(signal.is_empty());
        assert_eq!(signal.generation(), 0);
    }

    #[test]
    fn test_signal_solid() {
        let signal = Signal::solid(4, RGB8::new(1, 2, 3));
        assert_eq!(signal.len(), 4);
        assert!(signal.pixels().iter().all(|p| *p == RGB8::new(1, 2, 3)));
        assert_eq!(signal.to_bytes(), vec![1, 2, 3, 1, 2, 3, 1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn test_checksum_depends_on_generation_and_pixels() {
        let a = Signal::solid(3, RGB8::new(10, 20, 30)).with_generation(1);
        let b = Signal::solid(3, RGB8::new(10, 20, 30)).with_generation(2);
        let c = Signal::solid(3, RGB8::new(10, 20, 31)).with_generation(1);

        assert_eq!(a.checksum(), a.clone().checksum());
        assert_ne!(a.checksum(), b.checksum());
        assert_ne!(a.checksum(), c.checksum());
    }
}
