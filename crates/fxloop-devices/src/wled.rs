//! WLED UDP 实时协议
//!
//! 协议格式（每个 UDP 包）：
//!
//! | 模式 | 头部 | 负载 |
//! |------|------|------|
//! | DRGB  | `[2, timeout]` | 最多 490 个 LED 的 `r, g, b` |
//! | DNRGB | `[4, timeout, start_hi, start_lo]` | 从 `start` 开始最多 489 个 LED |
//!
//! `timeout` 为控制器在收不到实时数据后恢复自身效果前等待的秒数。
//! LED 数超过单包 DRGB 上限时按 DNRGB 分片，所有分片在同一次迭代内同步发送。

use crate::error::DeviceError;
use crate::render::Renderer;
use fxloop_signal::{FrameProcessor, RGB8, Signal};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use tracing::trace;

/// DRGB 协议号
pub const PROTOCOL_DRGB: u8 = 2;
/// DNRGB 协议号
pub const PROTOCOL_DNRGB: u8 = 4;
/// 实时模式超时（秒）
pub const REALTIME_TIMEOUT_S: u8 = 5;
/// 单个 DRGB 包的 LED 上限
pub const DRGB_MAX_LEDS: usize = 490;
/// 单个 DNRGB 包的 LED 上限
pub const DNRGB_MAX_LEDS: usize = 489;

/// 编码一帧为一个或多个 UDP 包
pub fn encode(pixels: &[RGB8]) -> Vec<Vec<u8>> {
    if pixels.len() <= DRGB_MAX_LEDS {
        let mut packet = Vec::with_capacity(2 + pixels.len() * 3);
        packet.extend_from_slice(&[PROTOCOL_DRGB, REALTIME_TIMEOUT_S]);
        packet.extend(pixels.iter().flat_map(|p| [p.r, p.g, p.b]));
        return vec![packet];
    }

    pixels
        .chunks(DNRGB_MAX_LEDS)
        .enumerate()
        .map(|(i, chunk)| {
            // 总 LED 数可能超出 u16，超出部分的起始索引截断到 u16::MAX
            let start = u16::try_from(i * DNRGB_MAX_LEDS).unwrap_or(u16::MAX);
            let mut packet = Vec::with_capacity(4 + chunk.len() * 3);
            packet.push(PROTOCOL_DNRGB);
            packet.push(REALTIME_TIMEOUT_S);
            packet.extend_from_slice(&start.to_be_bytes());
            packet.extend(chunk.iter().flat_map(|p| [p.r, p.g, p.b]));
            packet
        })
        .collect()
}

/// WLED 输出
pub struct WledRenderer {
    socket: UdpSocket,
    target: SocketAddr,
    processor: FrameProcessor,
}

impl WledRenderer {
    /// 解析地址并绑定本地 UDP socket
    pub fn connect(ip: &str, port: u16, processor: FrameProcessor) -> Result<Self, DeviceError> {
        let target = (ip, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| DeviceError::NotFound(format!("{ip}:{port}")))?;
        let bind: SocketAddr = if target.is_ipv6() {
            SocketAddr::from(([0u16; 8], 0))
        } else {
            SocketAddr::from(([0u8; 4], 0))
        };
        let socket = UdpSocket::bind(bind)?;
        Ok(Self {
            socket,
            target,
            processor,
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl Renderer for WledRenderer {
    fn render(&mut self, signal: &Signal) -> Result<(), DeviceError> {
        let pixels = self.processor.process(signal);
        for packet in encode(&pixels) {
            self.socket.send_to(&packet, self.target)?;
        }
        trace!("Sent {} LEDs to {}", pixels.len(), self.target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_encode_drgb() {
        let packets = encode(&[RGB8::new(1, 2, 3), RGB8::new(4, 5, 6)]);
        assert_eq!(packets, vec![vec![2, 5, 1, 2, 3, 4, 5, 6]]);
    }

    #[test]
    fn test_encode_dnrgb_splits_large_strips() {
        let pixels = vec![RGB8::new(9, 9, 9); 1000];
        let packets = encode(&pixels);
        assert_eq!(packets.len(), 3);
        assert_eq!(&packets[0][..4], &[4, 5, 0, 0]);
        assert_eq!(packets[0].len(), 4 + 489 * 3);
        // 第二片从 489 开始
        assert_eq!(&packets[1][..4], &[4, 5, 0x01, 0xE9]);
        assert_eq!(packets[2].len(), 4 + (1000 - 2 * 489) * 3);
    }

    #[test]
    fn test_render_sends_processed_frame() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        let processor = FrameProcessor {
            leds: 2,
            flip: true,
            ..FrameProcessor::default()
        };
        let mut renderer = WledRenderer::connect("127.0.0.1", port, processor).unwrap();
        let signal = Signal::new(vec![RGB8::new(10, 0, 0), RGB8::new(0, 20, 0)]);
        renderer.render(&signal).unwrap();

        let mut buf = [0u8; 64];
        let n = receiver.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[2, 5, 0, 20, 0, 10, 0, 0]);
    }
}
