//! 管理任务
//!
//! 每秒运行一次，只做观测：收集所有任务的耗时窗口，生成报告，写日志，然后清空窗口。
//! 不参与任何调度决策，也不会对超时的任务降频。

use crate::runner::{Task, TaskStatus, TimingProbe};
use crate::timing::TaskTiming;
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 管理任务名称
pub const MONITOR_TASK_NAME: &str = "monitor";
/// 管理任务周期
pub const MONITOR_INTERVAL: Duration = Duration::from_secs(1);

/// 最近一次耗时报告（可跨线程读取）
pub type TimingReport = Arc<ArcSwap<Vec<TaskTiming>>>;

/// 耗时报告任务
pub struct Monitor {
    probes: Vec<TimingProbe>,
    report: TimingReport,
    display_frametimes: bool,
    performance_warnings: bool,
    primed: bool,
}

impl Monitor {
    pub fn new(probes: Vec<TimingProbe>, report: TimingReport) -> Self {
        Self {
            probes,
            report,
            display_frametimes: false,
            performance_warnings: true,
            primed: false,
        }
    }

    /// 以 info 级别输出每个任务的帧耗时（否则为 debug）
    pub fn display_frametimes(mut self, enabled: bool) -> Self {
        self.display_frametimes = enabled;
        self
    }

    /// 任务跟不上目标帧率时输出警告
    pub fn performance_warnings(mut self, enabled: bool) -> Self {
        self.performance_warnings = enabled;
        self
    }

    /// 收集一次报告
    pub fn collect(&self) -> Vec<TaskTiming> {
        let timings: Vec<TaskTiming> = self.probes.iter().map(TimingProbe::drain).collect();

        for timing in &timings {
            if self.display_frametimes {
                info!("{}", timing);
            } else {
                debug!("{}", timing);
            }
            if self.performance_warnings && timing.overruns > 0 {
                warn!(
                    "'{}' can't keep up: {} of {} frames exceeded the {:.2} ms target",
                    timing.name,
                    timing.overruns,
                    timing.invocations,
                    timing.target.as_secs_f64() * 1000.0
                );
            }
        }

        self.report.store(Arc::new(timings.clone()));
        timings
    }
}

impl Task for Monitor {
    fn name(&self) -> &str {
        MONITOR_TASK_NAME
    }

    fn step(&mut self) -> TaskStatus {
        if self.primed {
            self.collect();
        } else {
            // 首次运行时各任务刚启动，只重置窗口
            for probe in &self.probes {
                probe.drain();
            }
            self.primed = true;
        }
        TaskStatus::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_drains_and_stores() {
        let probe = TimingProbe::new("desk", Duration::from_millis(10), 16);
        probe.record(Duration::from_millis(2), false);
        probe.record(Duration::from_millis(12), true);

        let report: TimingReport = Arc::new(ArcSwap::from_pointee(Vec::new()));
        let monitor = Monitor::new(vec![probe.clone()], Arc::clone(&report))
            .display_frametimes(true)
            .performance_warnings(false);

        let timings = monitor.collect();
        assert_eq!(timings.len(), 1);
        assert_eq!(timings[0].invocations, 2);
        assert_eq!(timings[0].overruns, 1);
        assert_eq!(timings[0].mean, Duration::from_millis(7));
        assert_eq!(report.load().len(), 1);

        // 窗口已清空
        assert_eq!(probe.drain().invocations, 0);
    }
}
