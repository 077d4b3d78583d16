//! Orchestrator
//!
//! 持有一代（generation）完整的运行状态：设备注册表、共享信号、数据任务运行器、
//! 每个启用设备一个运行器，以及每秒一次的管理任务。
//!
//! # 状态机
//!
//! ```text
//! Constructed ──start──▶ Running ◀──start/stop──▶ Stopped
//!      │                    │                        │
//!      └────────────────── kill ─────────────────────┴──▶ Killed
//! ```
//!
//! # reload
//!
//! 1. 先做纯校验（配置解析、注册表、信号源构造），失败时旧一代保持运行
//! 2. 停止、kill 并 join 旧一代的所有线程（释放串口等独占硬件）
//! 3. 连接新一代硬件（连接失败的设备被禁用），创建运行器并启动

use crate::config::{EngineConfig, RunOptions};
use crate::error::DriverError;
use crate::monitor::{MONITOR_INTERVAL, Monitor, TimingReport};
use crate::pacer::FramePacer;
use crate::runner::{DEFAULT_JOIN_TIMEOUT, RunnerHandle, TaskRunner, TimingProbe};
use crate::signal::{SharedSignal, shared_signal};
use crate::single_threaded::RoundRobin;
use crate::state::RunnerState;
use crate::tasks::{DataTask, DeviceTask};
use crate::timing::TaskTiming;
use arc_swap::ArcSwap;
use fxloop_devices::{Connect, DeviceRegistry, HardwareConnector, RegistryDefaults};
use fxloop_signal::{SignalError, SignalSource, SourceConfig};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 信号源构造函数：`(配置, 帧长度)`
pub type SourceFactory = Arc<
    dyn Fn(&SourceConfig, usize) -> Result<Box<dyn SignalSource>, SignalError> + Send + Sync,
>;

/// Orchestrator 状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    /// 配置已校验，线程尚未创建
    Constructed,
    Running,
    Stopped,
    Killed,
}

impl OrchestratorState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Constructed => "constructed",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Killed => "killed",
        }
    }
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 校验通过、尚未连接硬件的一代配置
struct Prepared {
    data_pacer: FramePacer,
    registry: DeviceRegistry,
    // 与 registry.iter() 顺序一一对应
    device_pacers: Vec<FramePacer>,
    source: Box<dyn SignalSource>,
}

/// 纯校验：不打开任何硬件
fn prepare(config: &EngineConfig, factory: &SourceFactory) -> Result<Prepared, DriverError> {
    let data_pacer = FramePacer::from_fps(config.fps)?;
    let registry = DeviceRegistry::load(&config.devices, RegistryDefaults { fps: config.fps })?;
    let device_pacers = registry
        .iter()
        .map(|spec| FramePacer::from_fps(spec.fps))
        .collect::<Result<Vec<_>, _>>()?;
    let source = factory(&config.source, registry.max_leds())?;
    Ok(Prepared {
        data_pacer,
        registry,
        device_pacers,
        source,
    })
}

/// 一代运行状态
struct Generation {
    id: u64,
    registry: DeviceRegistry,
    signal: SharedSignal,
    /// 多线程模式：数据任务 + 每设备一个；单线程模式：一个 tick 运行器
    runners: Vec<TaskRunner>,
    /// 单线程模式下 tick 内的各阶段（多线程模式为空）
    stages: Vec<TimingProbe>,
    monitor: TaskRunner,
}

impl Generation {
    /// 启动或恢复所有存活的运行器
    ///
    /// 已自行终止（Killed）的设备运行器被跳过，不影响其余运行器恢复；
    /// 其他启动失败只返回第一个错误，剩余运行器照常启动。
    fn start(&mut self) -> Result<(), DriverError> {
        let mut first_error = None;
        for runner in self.runners.iter_mut().chain(std::iter::once(&mut self.monitor)) {
            if runner.state() == RunnerState::Killed {
                debug!("Skipping terminated task '{}'", runner.name());
                continue;
            }
            if let Err(e) = runner.start() {
                error!("{}", e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn stop(&self) {
        for runner in &self.runners {
            runner.stop();
        }
        self.monitor.stop();
    }

    /// stop → kill → join
    fn shutdown(mut self) {
        self.stop();
        for runner in &self.runners {
            runner.kill();
        }
        self.monitor.kill();

        for runner in self.runners.iter_mut().chain(std::iter::once(&mut self.monitor)) {
            if let Err(e) = runner.join(DEFAULT_JOIN_TIMEOUT) {
                error!("{}", e);
            }
        }
        debug!("Generation {} shut down", self.id);
    }

    fn handles(&self) -> Vec<RunnerHandle> {
        self.runners.iter().map(TaskRunner::handle).collect()
    }

    /// 每个任务的名称与状态；单线程模式下额外列出 tick 内的各阶段
    fn task_states(&self) -> Vec<(String, RunnerState)> {
        let mut tasks: Vec<_> = self
            .runners
            .iter()
            .map(|r| (r.name().to_string(), r.state()))
            .collect();
        let tick = self.runners.first().map_or(RunnerState::Killed, TaskRunner::state);
        tasks.extend(self.stages.iter().map(|stage| {
            let state = if stage.is_retired() {
                RunnerState::Killed
            } else {
                tick
            };
            (stage.name().to_string(), state)
        }));
        tasks
    }
}

enum Phase {
    Constructed(Prepared),
    Running(Generation),
    Stopped(Generation),
    Killed,
}

/// Orchestrator 构造器
pub struct OrchestratorBuilder {
    options: RunOptions,
    connector: Arc<dyn Connect>,
    source_factory: SourceFactory,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self {
            options: RunOptions::default(),
            connector: Arc::new(HardwareConnector::default()),
            source_factory: Arc::new(|config: &SourceConfig, leds: usize| config.build(leds)),
        }
    }
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// 替换硬件连接器
    pub fn connector(mut self, connector: impl Connect + 'static) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    /// 替换信号源构造函数
    pub fn source_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&SourceConfig, usize) -> Result<Box<dyn SignalSource>, SignalError>
            + Send
            + Sync
            + 'static,
    {
        self.source_factory = Arc::new(factory);
        self
    }

    /// 校验配置并构造（不创建任何线程，不打开硬件）
    ///
    /// # 错误
    ///
    /// 没有可用设备、帧率非法或信号源无法构造时返回错误，调用方应以非零状态退出。
    pub fn build(self, config: EngineConfig) -> Result<Orchestrator, DriverError> {
        let prepared = prepare(&config, &self.source_factory)?;
        Ok(Orchestrator {
            options: self.options,
            connector: self.connector,
            source_factory: self.source_factory,
            phase: Phase::Constructed(prepared),
            report: Arc::new(ArcSwap::from_pointee(Vec::new())),
            next_id: 1,
        })
    }
}

/// 设备循环调度器
pub struct Orchestrator {
    options: RunOptions,
    connector: Arc<dyn Connect>,
    source_factory: SourceFactory,
    phase: Phase,
    report: TimingReport,
    next_id: u64,
}

impl Orchestrator {
    /// 使用默认硬件连接器构造
    pub fn new(config: EngineConfig, options: RunOptions) -> Result<Self, DriverError> {
        OrchestratorBuilder::new().options(options).build(config)
    }

    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    pub fn state(&self) -> OrchestratorState {
        match self.phase {
            Phase::Constructed(_) => OrchestratorState::Constructed,
            Phase::Running(_) => OrchestratorState::Running,
            Phase::Stopped(_) => OrchestratorState::Stopped,
            Phase::Killed => OrchestratorState::Killed,
        }
    }

    /// 启动（幂等）；对暂停中的一代等价于恢复
    pub fn start(&mut self) -> Result<(), DriverError> {
        match std::mem::replace(&mut self.phase, Phase::Killed) {
            Phase::Constructed(prepared) => {
                let mut generation = self.launch(prepared);
                let result = generation.start();
                self.phase = Phase::Running(generation);
                result
            },
            Phase::Stopped(mut generation) => {
                let result = generation.start();
                info!("Resumed generation {}", generation.id);
                self.phase = Phase::Running(generation);
                result
            },
            running @ Phase::Running(_) => {
                self.phase = running;
                Ok(())
            },
            Phase::Killed => Err(DriverError::Shutdown),
        }
    }

    /// 暂停所有任务（可恢复，幂等）
    pub fn stop(&mut self) {
        match std::mem::replace(&mut self.phase, Phase::Killed) {
            Phase::Running(generation) => {
                generation.stop();
                info!("Stopped generation {}", generation.id);
                self.phase = Phase::Stopped(generation);
            },
            other => self.phase = other,
        }
    }

    /// 用新配置替换当前一代
    ///
    /// 新配置校验失败时返回错误，旧一代不受影响。
    pub fn reload(&mut self, config: EngineConfig) -> Result<(), DriverError> {
        if matches!(self.phase, Phase::Killed) {
            return Err(DriverError::Shutdown);
        }
        let prepared = prepare(&config, &self.source_factory)?;

        match std::mem::replace(&mut self.phase, Phase::Killed) {
            Phase::Running(old) | Phase::Stopped(old) => old.shutdown(),
            Phase::Constructed(_) | Phase::Killed => {},
        }

        let mut generation = self.launch(prepared);
        let result = generation.start();
        info!("Reloaded configuration, generation {} running", generation.id);
        self.phase = Phase::Running(generation);
        result
    }

    /// 终止当前一代所有任务（终态，幂等）
    pub fn kill(&mut self) {
        match std::mem::replace(&mut self.phase, Phase::Killed) {
            Phase::Running(generation) | Phase::Stopped(generation) => generation.shutdown(),
            Phase::Constructed(_) | Phase::Killed => {},
        }
    }

    /// 当前一代的编号（尚未启动时为 None）
    pub fn generation(&self) -> Option<u64> {
        self.current().map(|g| g.id)
    }

    /// 当前设备注册表
    pub fn registry(&self) -> Option<&DeviceRegistry> {
        match &self.phase {
            Phase::Constructed(prepared) => Some(&prepared.registry),
            Phase::Running(g) | Phase::Stopped(g) => Some(&g.registry),
            Phase::Killed => None,
        }
    }

    /// 当前一代的共享信号
    pub fn signal(&self) -> Option<SharedSignal> {
        self.current().map(|g| g.signal.clone())
    }

    /// 当前一代的运行器句柄（不含管理任务）
    pub fn runner_handles(&self) -> Vec<RunnerHandle> {
        self.current().map(Generation::handles).unwrap_or_default()
    }

    /// 最近一次耗时报告
    pub fn report(&self) -> Arc<Vec<TaskTiming>> {
        self.report.load_full()
    }

    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            state: self.state(),
            generation: self.generation(),
            tasks: self.current().map(Generation::task_states).unwrap_or_default(),
            disabled: self
                .registry()
                .map(|r| {
                    r.iter()
                        .filter(|d| !d.enabled)
                        .map(|d| d.name.clone())
                        .collect()
                })
                .unwrap_or_default(),
            timings: self.report().as_ref().clone(),
        }
    }

    fn current(&self) -> Option<&Generation> {
        match &self.phase {
            Phase::Running(g) | Phase::Stopped(g) => Some(g),
            Phase::Constructed(_) | Phase::Killed => None,
        }
    }

    /// 连接硬件并创建运行器（不启动）
    fn launch(&mut self, prepared: Prepared) -> Generation {
        let Prepared {
            data_pacer,
            mut registry,
            device_pacers,
            source,
        } = prepared;

        let leds = registry.max_leds();
        let (publisher, signal) = shared_signal(leds);

        let candidates: Vec<_> = registry
            .iter()
            .cloned()
            .zip(device_pacers)
            .filter(|(spec, _)| spec.enabled)
            .collect();

        let mut devices = Vec::with_capacity(candidates.len());
        for (spec, pacer) in candidates {
            match self.connector.connect(&spec) {
                Ok(renderer) => {
                    debug!("Connected {}", spec);
                    devices.push((DeviceTask::new(&spec.name, renderer, signal.clone()), pacer));
                },
                Err(e) => {
                    warn!("{}: self-test failed ({}), disabling it", spec.name, e);
                    registry.mark_disabled(&spec.name);
                },
            }
        }
        if devices.is_empty() {
            warn!("No device passed self-test, only the data stage will run");
        }

        let RunOptions {
            single_threaded,
            display_frametimes,
            performance_warnings,
            timing_window,
            pacing,
        } = self.options;

        let data = DataTask::new(source, publisher);
        let mut runners = Vec::with_capacity(devices.len() + 1);
        let mut probes = Vec::with_capacity(devices.len() + 1);
        let mut stages = Vec::new();

        if single_threaded {
            let mut tick = RoundRobin::new(data_pacer.period(), timing_window);
            probes.push(tick.push(Box::new(data)));
            for (task, _) in devices {
                probes.push(tick.push(Box::new(task)));
            }
            stages.clone_from(&probes);
            runners.push(
                TaskRunner::new(tick, data_pacer)
                    .with_pacing(pacing)
                    .with_timing_window(timing_window),
            );
        } else {
            runners.push(
                TaskRunner::new(data, data_pacer)
                    .with_pacing(pacing)
                    .with_timing_window(timing_window),
            );
            for (task, pacer) in devices {
                runners.push(
                    TaskRunner::new(task, pacer)
                        .with_pacing(pacing)
                        .with_timing_window(timing_window),
                );
            }
            probes.extend(runners.iter().map(TaskRunner::probe));
        }

        let monitor = TaskRunner::new(
            Monitor::new(probes, Arc::clone(&self.report))
                .display_frametimes(display_frametimes)
                .performance_warnings(performance_warnings),
            FramePacer::new(MONITOR_INTERVAL),
        );

        let id = self.next_id;
        self.next_id += 1;
        info!(
            "Generation {}: {} device(s) enabled, {} LEDs, {}",
            id,
            registry.enabled().count(),
            leds,
            if single_threaded {
                "single-threaded"
            } else {
                "multi-threaded"
            }
        );

        Generation {
            id,
            registry,
            signal,
            runners,
            stages,
            monitor,
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.kill();
    }
}

/// `status` 命令输出
#[derive(Debug, Clone)]
pub struct OrchestratorStatus {
    pub state: OrchestratorState,
    pub generation: Option<u64>,
    /// 任务名称及其状态（运行器顺序；单线程模式下随后列出 tick 内各阶段）
    pub tasks: Vec<(String, RunnerState)>,
    /// 被禁用（自检失败）的设备
    pub disabled: Vec<String>,
    pub timings: Vec<TaskTiming>,
}

impl fmt::Display for OrchestratorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.generation {
            Some(id) => writeln!(f, "state: {} (generation {})", self.state, id)?,
            None => writeln!(f, "state: {}", self.state)?,
        }
        for (name, state) in &self.tasks {
            writeln!(f, "  {name}: {state}")?;
        }
        for name in &self.disabled {
            writeln!(f, "  {name}: disabled")?;
        }
        for timing in &self.timings {
            writeln!(f, "  {timing}")?;
        }
        Ok(())
    }
}
