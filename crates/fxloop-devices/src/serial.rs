//! 串口灯带
//!
//! 线路格式为裸 RGB 字节流：每帧 `leds * 3` 个字节，没有帧头和校验。
//! 接收端（Arduino 等）按 LED 数量自行分帧。

use crate::error::DeviceError;
use crate::render::Renderer;
use fxloop_signal::{FrameProcessor, Signal};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, trace};

/// 串口输出
pub struct SerialRenderer {
    port: Box<dyn Write + Send>,
    processor: FrameProcessor,
}

impl SerialRenderer {
    /// 打开串口并配置为 raw 模式
    pub fn open(path: &Path, baud: u32, processor: FrameProcessor) -> Result<Self, DeviceError> {
        if !path.exists() {
            return Err(DeviceError::NotFound(path.display().to_string()));
        }
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        #[cfg(target_os = "linux")]
        configure(&file, baud)?;
        #[cfg(not(target_os = "linux"))]
        let _ = baud;

        debug!("Opened serial port {} at {} baud", path.display(), baud);
        Ok(Self::with_writer(file, processor))
    }

    /// 使用任意字节输出（已配置好的端口、管道等）
    pub fn with_writer(port: impl Write + Send + 'static, processor: FrameProcessor) -> Self {
        Self {
            port: Box::new(port),
            processor,
        }
    }
}

impl Renderer for SerialRenderer {
    fn render(&mut self, signal: &Signal) -> Result<(), DeviceError> {
        let pixels = self.processor.process(signal);
        let bytes: Vec<u8> = pixels.iter().flat_map(|p| [p.r, p.g, p.b]).collect();
        self.port.write_all(&bytes)?;
        self.port.flush()?;
        trace!("Wrote {} bytes to serial port", bytes.len());
        Ok(())
    }
}

/// termios：raw 模式 + 波特率
#[cfg(target_os = "linux")]
fn configure(file: &std::fs::File, baud: u32) -> Result<(), DeviceError> {
    use nix::sys::termios::{SetArg, cfmakeraw, cfsetspeed, tcgetattr, tcsetattr};

    let rate = baud_rate(baud).ok_or(DeviceError::UnsupportedBaud(baud))?;
    let mut termios = tcgetattr(file)?;
    cfmakeraw(&mut termios);
    cfsetspeed(&mut termios, rate)?;
    tcsetattr(file, SetArg::TCSANOW, &termios)?;
    Ok(())
}

#[cfg(target_os = "linux")]
fn baud_rate(baud: u32) -> Option<nix::sys::termios::BaudRate> {
    use nix::sys::termios::BaudRate;

    Some(match baud {
        9600 => BaudRate::B9600,
        19_200 => BaudRate::B19200,
        38_400 => BaudRate::B38400,
        57_600 => BaudRate::B57600,
        115_200 => BaudRate::B115200,
        230_400 => BaudRate::B230400,
        460_800 => BaudRate::B460800,
        500_000 => BaudRate::B500000,
        921_600 => BaudRate::B921600,
        1_000_000 => BaudRate::B1000000,
        _ => return None,
    })
}
