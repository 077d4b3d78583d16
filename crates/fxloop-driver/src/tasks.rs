//! 数据任务与设备任务
//!
//! - [`DataTask`]：调用信号源产出一帧并发布到共享信号
//! - [`DeviceTask`]：读取最新帧，交给设备的 `Renderer` 同步发送
//!
//! 两者都是普通的 [`Task`]，既可以各自放进独立的运行器，也可以由单线程模式轮流调用。

use crate::runner::{Task, TaskStatus};
use crate::signal::{SharedSignal, SignalPublisher};
use fxloop_devices::{DeviceError, Renderer};
use fxloop_signal::SignalSource;
use tracing::{error, trace, warn};

/// 数据任务名称
pub const DATA_TASK_NAME: &str = "data";

/// 数据生产任务
pub struct DataTask {
    source: Box<dyn SignalSource>,
    publisher: SignalPublisher,
}

impl DataTask {
    pub fn new(source: Box<dyn SignalSource>, publisher: SignalPublisher) -> Self {
        Self { source, publisher }
    }
}

impl Task for DataTask {
    fn name(&self) -> &str {
        DATA_TASK_NAME
    }

    fn step(&mut self) -> TaskStatus {
        match self.source.produce() {
            Ok(signal) => {
                let generation = self.publisher.publish(signal);
                trace!("Published frame {} from {}", generation, self.source.name());
            },
            // 信号源失败不影响设备任务，它们继续发送上一帧
            Err(e) => warn!("Signal source '{}' failed: {}", self.source.name(), e),
        }
        TaskStatus::Continue
    }
}

/// 设备输出任务
pub struct DeviceTask {
    name: String,
    renderer: Box<dyn Renderer>,
    signal: SharedSignal,
}

impl DeviceTask {
    pub fn new(name: impl Into<String>, renderer: Box<dyn Renderer>, signal: SharedSignal) -> Self {
        Self {
            name: name.into(),
            renderer,
            signal,
        }
    }
}

impl Task for DeviceTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self) -> TaskStatus {
        let frame = self.signal.load();
        match self.renderer.render(&frame) {
            Ok(()) => TaskStatus::Continue,
            Err(e) => classify(&self.name, &e),
        }
    }
}

/// 致命错误终止设备任务，临时错误只记录
fn classify(name: &str, e: &DeviceError) -> TaskStatus {
    if e.is_fatal() {
        error!("Device '{}' failed: {}, disabling it", name, e);
        TaskStatus::Terminate
    } else {
        warn!("Device '{}': {}", name, e);
        TaskStatus::Continue
    }
}
