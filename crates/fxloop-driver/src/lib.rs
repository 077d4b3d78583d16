//! # fxloop-driver
//!
//! 调度层：一个数据生产任务 + 每个启用设备一个输出任务，各自按独立帧率运行。
//!
//! - [`runner`]：任务运行器（独立线程、启动 / 暂停 / kill、panic 隔离）
//! - [`pacer`]：帧定时（睡眠时长与超时判定）
//! - [`signal`]：共享信号（单写多读，`ArcSwap` 整帧替换）
//! - [`tasks`]：数据任务与设备任务
//! - [`single_threaded`]：单线程调试模式
//! - [`monitor`] / [`timing`]：每秒耗时报告
//! - [`orchestrator`]：一代运行状态的生命周期管理（start / stop / reload / kill）
//!
//! # 数据流
//!
//! ```text
//! SignalSource ─▶ DataTask ─▶ SharedSignal ─┬─▶ DeviceTask(desk)  ─▶ Renderer
//!                                           ├─▶ DeviceTask(shelf) ─▶ Renderer
//!                                           └─▶ DeviceTask(pad)   ─▶ Renderer
//! ```
//!
//! 设备任务之间没有任何同步，每个设备按自己的时钟运行；数据任务超时不会对设备任务产生背压。

pub mod bench;
mod config;
mod error;
pub mod monitor;
pub mod orchestrator;
pub mod pacer;
pub mod runner;
pub mod signal;
pub mod single_threaded;
pub mod state;
pub mod tasks;
pub mod timing;

pub use bench::bench_source;
pub use config::{DEFAULT_FPS, EngineConfig, RunOptions};
pub use error::DriverError;
pub use orchestrator::{Orchestrator, OrchestratorBuilder, OrchestratorState, OrchestratorStatus};
pub use pacer::{FramePacer, Pace, PacingMode};
pub use runner::{RunnerHandle, Task, TaskRunner, TaskStatus, TimingProbe, task_fn};
pub use signal::{SharedSignal, SignalPublisher, shared_signal};
pub use state::{AtomicRunnerState, RunnerState};
pub use timing::{FrameTimes, TaskTiming};
