//! 任务运行器
//!
//! [`TaskRunner`] 把一个可重复执行的 [`Task`] 放到独立线程中按固定周期运行：
//!
//! - `start()`：首次调用时创建线程（每个实例只创建一次），之后对暂停中的任务等价于 `resume()`
//! - `stop()`：当前迭代结束后在条件变量上挂起，不忙等
//! - `kill()`：终态，线程在下一次检查时退出（包括在定时睡眠中被唤醒）
//! - `join(timeout)`：有界等待线程退出
//!
//! 任务内 panic 在运行器边界被 `catch_unwind` 捕获，只终止该任务本身。
//!
//! # 定时
//!
//! 以锚点（next tick）计算睡眠时长，而不是「本帧耗时 + 固定睡眠」，
//! 因此长时间运行不会累积漂移；超时时把锚点重置到当前时间，不追帧。

use crate::error::DriverError;
use crate::pacer::{FramePacer, Pace, PacingMode};
use crate::state::{AtomicRunnerState, RunnerState};
use crate::timing::{DEFAULT_TIMING_WINDOW, FrameTimes, TaskTiming};
use parking_lot::{Condvar, Mutex};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace};

/// Drop 时等待线程退出的超时
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// 精确定时模式下单次 `spin_sleep` 的上限
const PRECISE_SLEEP_CHUNK: Duration = Duration::from_millis(100);

/// 单次迭代的返回值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// 继续下一次迭代
    Continue,
    /// 终止任务（运行器随即 kill 自身）
    Terminate,
}

/// 可重复执行的任务
///
/// 实现者只被所属运行器的线程调用，不需要内部同步。
pub trait Task: Send {
    /// 任务名称（用于日志和耗时报告）
    fn name(&self) -> &str;

    /// 执行一次迭代
    fn step(&mut self) -> TaskStatus;
}

/// 闭包任务
pub struct FnTask<F> {
    name: String,
    f: F,
}

impl<F> Task for FnTask<F>
where
    F: FnMut() -> TaskStatus + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self) -> TaskStatus {
        (self.f)()
    }
}

/// 用闭包构造任务
pub fn task_fn<F>(name: impl Into<String>, f: F) -> FnTask<F>
where
    F: FnMut() -> TaskStatus + Send,
{
    FnTask {
        name: name.into(),
        f,
    }
}

/// 一个任务的耗时统计入口（运行器线程写，管理任务读）
#[derive(Debug, Clone)]
pub struct TimingProbe {
    name: Arc<str>,
    period: Duration,
    times: Arc<Mutex<FrameTimes>>,
    /// 单线程模式下子任务被移除后置位
    retired: Arc<AtomicBool>,
}

impl TimingProbe {
    pub fn new(name: &str, period: Duration, window: usize) -> Self {
        Self {
            name: Arc::from(name),
            period,
            times: Arc::new(Mutex::new(FrameTimes::new(window))),
            retired: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn record(&self, duration: Duration, overrun: bool) {
        self.times.lock().record(duration, overrun);
    }

    /// 生成本窗口报告并清空
    pub fn drain(&self) -> TaskTiming {
        self.times.lock().drain(&self.name, self.period)
    }

    /// 标记对应的任务已终止，不再有新样本
    pub fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }

    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }
}

/// 运行器与其线程之间的共享状态
struct RunnerShared {
    name: String,
    state: AtomicRunnerState,
    // 只用于条件变量，状态本身是原子的
    lock: Mutex<()>,
    wake: Condvar,
    probe: TimingProbe,
    invocations: AtomicU64,
}

/// `wait_active` 的结果
enum Wake {
    /// 一直处于运行状态
    Ready,
    /// 从暂停中恢复（需要重置定时锚点）
    Resumed,
    Killed,
}

impl RunnerShared {
    fn stop(&self) -> bool {
        self.state
            .compare_exchange(RunnerState::Running, RunnerState::Stopped)
            .is_ok()
    }

    fn resume(&self) -> bool {
        let _guard = self.lock.lock();
        let resumed = self
            .state
            .compare_exchange(RunnerState::Stopped, RunnerState::Running)
            .is_ok();
        if resumed {
            self.wake.notify_all();
        }
        resumed
    }

    fn kill(&self) -> RunnerState {
        let _guard = self.lock.lock();
        let previous = self.state.kill();
        self.wake.notify_all();
        previous
    }

    /// 暂停时挂起，直到恢复或被 kill
    fn wait_active(&self) -> Wake {
        let mut guard = self.lock.lock();
        let mut waited = false;
        loop {
            match self.state.get() {
                RunnerState::Running if waited => return Wake::Resumed,
                RunnerState::Running => return Wake::Ready,
                RunnerState::Killed => return Wake::Killed,
                RunnerState::Idle | RunnerState::Stopped => {
                    waited = true;
                    self.wake.wait(&mut guard);
                },
            }
        }
    }

    /// 睡眠到 `deadline`，返回线程是否仍应继续
    fn sleep_until(&self, deadline: Instant, pacing: PacingMode) -> bool {
        match pacing {
            PacingMode::Park => {
                let mut guard = self.lock.lock();
                while self.state.get() != RunnerState::Killed && Instant::now() < deadline {
                    let _ = self.wake.wait_until(&mut guard, deadline);
                }
            },
            PacingMode::Precise => {
                // 分段睡眠，kill 延迟不超过一个分段
                while self.state.get() != RunnerState::Killed {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    spin_sleep::sleep((deadline - now).min(PRECISE_SLEEP_CHUNK));
                }
            },
        }
        self.state.get() != RunnerState::Killed
    }
}

/// 任务运行器
pub struct TaskRunner {
    shared: Arc<RunnerShared>,
    pacer: FramePacer,
    pacing: PacingMode,
    task: Option<Box<dyn Task>>,
    thread: Option<JoinHandle<()>>,
}

impl TaskRunner {
    /// 创建运行器（不启动线程）
    pub fn new(task: impl Task + 'static, pacer: FramePacer) -> Self {
        Self::from_boxed(Box::new(task), pacer)
    }

    pub fn from_boxed(task: Box<dyn Task>, pacer: FramePacer) -> Self {
        let name = task.name().to_string();
        let probe = TimingProbe::new(&name, pacer.period(), DEFAULT_TIMING_WINDOW);
        Self {
            shared: Arc::new(RunnerShared {
                name,
                state: AtomicRunnerState::new(RunnerState::Idle),
                lock: Mutex::new(()),
                wake: Condvar::new(),
                probe,
                invocations: AtomicU64::new(0),
            }),
            pacer,
            pacing: PacingMode::default(),
            task: Some(task),
            thread: None,
        }
    }

    /// 设置睡眠策略（启动前有效）
    pub fn with_pacing(mut self, pacing: PacingMode) -> Self {
        self.pacing = pacing;
        self
    }

    /// 设置耗时环形缓冲区容量（启动前有效）
    pub fn with_timing_window(self, window: usize) -> Self {
        *self.shared.probe.times.lock() = FrameTimes::new(window);
        self
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn period(&self) -> Duration {
        self.pacer.period()
    }

    pub fn state(&self) -> RunnerState {
        self.shared.state.get()
    }

    pub fn is_alive(&self) -> bool {
        self.state().is_alive()
    }

    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    /// 可跨线程持有的控制句柄
    pub fn handle(&self) -> RunnerHandle {
        RunnerHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// 启动（或恢复）
    ///
    /// # 错误
    ///
    /// - [`DriverError::RunnerKilled`]：运行器已被 kill，需要重新构造
    /// - [`DriverError::Io`]：线程创建失败
    pub fn start(&mut self) -> Result<(), DriverError> {
        match self.shared.state.get() {
            RunnerState::Killed => Err(DriverError::RunnerKilled(self.shared.name.clone())),
            RunnerState::Running => Ok(()),
            RunnerState::Stopped => {
                self.shared.resume();
                Ok(())
            },
            RunnerState::Idle => self.spawn(),
        }
    }

    fn spawn(&mut self) -> Result<(), DriverError> {
        let Some(task) = self.task.take() else {
            return Err(DriverError::RunnerKilled(self.shared.name.clone()));
        };
        if self
            .shared
            .state
            .compare_exchange(RunnerState::Idle, RunnerState::Running)
            .is_err()
        {
            // 启动前被 kill
            return Err(DriverError::RunnerKilled(self.shared.name.clone()));
        }

        let shared = Arc::clone(&self.shared);
        let pacer = self.pacer;
        let pacing = self.pacing;
        let spawned = thread::Builder::new()
            .name(format!("fx-{}", self.shared.name))
            .spawn(move || run_loop(shared, task, pacer, pacing));

        match spawned {
            Ok(handle) => {
                self.thread = Some(handle);
                debug!(
                    "Task '{}' started ({:?} period, {:?} pacing)",
                    self.shared.name,
                    pacer.period(),
                    pacing
                );
                Ok(())
            },
            Err(e) => {
                self.shared.state.kill();
                Err(DriverError::Io(e))
            },
        }
    }

    /// 暂停（幂等）
    pub fn stop(&self) {
        if self.shared.stop() {
            debug!("Task '{}' stopped", self.shared.name);
        }
    }

    /// 恢复暂停中的任务（不重新创建线程）
    pub fn resume(&self) {
        if self.shared.resume() {
            debug!("Task '{}' resumed", self.shared.name);
        }
    }

    /// 终止（幂等，对从未启动的运行器同样安全）
    pub fn kill(&self) {
        if self.shared.kill() != RunnerState::Killed {
            debug!("Task '{}' killed", self.shared.name);
        }
    }

    /// 等待线程退出
    ///
    /// 不会自动 kill；未启动或已 join 过的运行器直接返回 `Ok`。
    pub fn join(&mut self, timeout: Duration) -> Result<(), DriverError> {
        let Some(handle) = self.thread.take() else {
            return Ok(());
        };
        match handle.join_timeout(timeout) {
            Ok(()) => Ok(()),
            Err(JoinError::Timeout) => Err(DriverError::JoinTimeout {
                name: self.shared.name.clone(),
                timeout,
            }),
            Err(JoinError::Panicked) => Err(DriverError::ThreadPanicked(self.shared.name.clone())),
        }
    }

    /// 耗时统计入口
    pub fn probe(&self) -> TimingProbe {
        self.shared.probe.clone()
    }

    /// 累计迭代次数
    pub fn invocations(&self) -> u64 {
        self.shared.invocations.load(Ordering::Relaxed)
    }
}

impl Drop for TaskRunner {
    fn drop(&mut self) {
        self.shared.kill();
        if let Err(e) = self.join(DEFAULT_JOIN_TIMEOUT) {
            error!("{}", e);
        }
    }
}

/// 运行器控制句柄（可克隆，可跨线程）
#[derive(Clone)]
pub struct RunnerHandle {
    shared: Arc<RunnerShared>,
}

impl RunnerHandle {
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn state(&self) -> RunnerState {
        self.shared.state.get()
    }

    pub fn is_alive(&self) -> bool {
        self.state().is_alive()
    }

    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    pub fn stop(&self) {
        self.shared.stop();
    }

    pub fn resume(&self) {
        self.shared.resume();
    }

    pub fn kill(&self) {
        self.shared.kill();
    }

    pub fn invocations(&self) -> u64 {
        self.shared.invocations.load(Ordering::Relaxed)
    }

    pub fn probe(&self) -> TimingProbe {
        self.shared.probe.clone()
    }
}

impl std::fmt::Debug for RunnerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerHandle")
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .finish()
    }
}

/// 任务线程主循环
fn run_loop(
    shared: Arc<RunnerShared>,
    mut task: Box<dyn Task>,
    pacer: FramePacer,
    pacing: PacingMode,
) {
    #[cfg(feature = "realtime")]
    raise_priority(&shared.name);

    let mut next_tick = Instant::now();

    loop {
        match shared.wait_active() {
            Wake::Ready => {},
            // 暂停期间不追帧
            Wake::Resumed => next_tick = Instant::now(),
            Wake::Killed => break,
        }

        let slot_start = next_tick;
        let started = Instant::now();
        let status = match panic::catch_unwind(AssertUnwindSafe(|| task.step())) {
            Ok(status) => status,
            Err(payload) => {
                error!(
                    "Task '{}' panicked: {}",
                    shared.name,
                    panic_message(payload.as_ref())
                );
                TaskStatus::Terminate
            },
        };
        let elapsed = started.elapsed();
        shared.invocations.fetch_add(1, Ordering::Relaxed);

        let now = Instant::now();
        let pace = pacer.pace(now.saturating_duration_since(slot_start));
        shared.probe.record(elapsed, pace.is_overrun());

        if status == TaskStatus::Terminate {
            debug!("Task '{}' terminated", shared.name);
            shared.kill();
            break;
        }

        match pace {
            Pace::Sleep(remaining) => {
                next_tick = now + remaining;
                if !shared.sleep_until(next_tick, pacing) {
                    break;
                }
            },
            Pace::Overrun { elapsed, target } => {
                trace!(
                    "Task '{}' overrun: {:?} > {:?} target",
                    shared.name, elapsed, target
                );
                next_tick = now;
            },
        }
    }

    trace!("Task '{}' thread exiting", shared.name);
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

#[cfg(feature = "realtime")]
fn raise_priority(name: &str) {
    use thread_priority::{ThreadPriority, set_current_thread_priority};

    if let Err(e) = set_current_thread_priority(ThreadPriority::Max) {
        tracing::warn!("Failed to raise priority of task '{}': {:?}", name, e);
    }
}

enum JoinError {
    Timeout,
    Panicked,
}

/// 带超时的 `JoinHandle::join`
///
/// 由看门狗线程执行阻塞 join，主线程在 channel 上限时等待。
/// 超时后看门狗线程继续存在，进程退出时由操作系统回收。
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> Result<(), JoinError>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> Result<(), JoinError> {
        use crossbeam_channel::{RecvTimeoutError, bounded};

        let (tx, rx) = bounded(1);
        thread::spawn(move || {
            let _ = tx.send(self.join().is_ok());
        });

        match rx.recv_timeout(timeout) {
            Ok(true) => Ok(()),
            Ok(false) | Err(RecvTimeoutError::Disconnected) => Err(JoinError::Panicked),
            Err(RecvTimeoutError::Timeout) => Err(JoinError::Timeout),
        }
    }
}
