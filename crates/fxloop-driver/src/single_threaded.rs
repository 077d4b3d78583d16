//! 单线程模式
//!
//! 调试用：每个全局 tick 内按注册顺序同步执行一次数据任务和所有设备任务。
//! 各设备的独立帧率被忽略，所有阶段都跟随全局帧率。
//! 每个子任务仍然各自记录耗时，报告格式与多线程模式一致。

use crate::runner::{Task, TaskStatus, TimingProbe};
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// 单线程模式下整体 tick 的任务名称
pub const TICK_TASK_NAME: &str = "tick";

struct Stage {
    task: Box<dyn Task>,
    probe: TimingProbe,
}

/// 轮询组合任务
pub struct RoundRobin {
    stages: Vec<Stage>,
    period: Duration,
    window: usize,
}

impl RoundRobin {
    /// `period` 为全局 tick 周期，`window` 为每个子任务的耗时缓冲区容量
    pub fn new(period: Duration, window: usize) -> Self {
        Self {
            stages: Vec::new(),
            period,
            window,
        }
    }

    /// 追加一个子任务（执行顺序即追加顺序），返回其耗时统计入口
    pub fn push(&mut self, task: Box<dyn Task>) -> TimingProbe {
        let probe = TimingProbe::new(task.name(), self.period, self.window);
        self.stages.push(Stage {
            task,
            probe: probe.clone(),
        });
        probe
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// 执行一个 tick
    ///
    /// 返回 `Terminate` 的子任务被移除，其余子任务不受影响；全部移除后整体终止。
    pub fn tick(&mut self) -> TaskStatus {
        let period = self.period;
        self.stages.retain_mut(|stage| {
            let started = Instant::now();
            // 与独立运行器一致：panic 只移除该子任务
            let status = panic::catch_unwind(AssertUnwindSafe(|| stage.task.step()))
                .unwrap_or_else(|_| {
                    error!("Stage '{}' panicked", stage.task.name());
                    TaskStatus::Terminate
                });
            let elapsed = started.elapsed();
            stage.probe.record(elapsed, elapsed >= period);
            if status == TaskStatus::Terminate {
                debug!("Stage '{}' terminated", stage.task.name());
                stage.probe.retire();
                return false;
            }
            true
        });

        if self.stages.is_empty() {
            TaskStatus::Terminate
        } else {
            TaskStatus::Continue
        }
    }
}

impl Task for RoundRobin {
    fn name(&self) -> &str {
        TICK_TASK_NAME
    }

    fn step(&mut self) -> TaskStatus {
        self.tick()
    }
}
