//! 帧耗时统计
//!
//! 每个任务持有一个 [`FrameTimes`]：最近 K 次迭代耗时的环形缓冲区，加上窗口内的调用 / 超时计数。
//! 管理任务每秒调用一次 [`FrameTimes::drain`] 生成 [`TaskTiming`] 报告并开始新窗口。
//!
//! 只用于诊断，不参与任何调度决策。

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

/// 默认环形缓冲区容量
pub const DEFAULT_TIMING_WINDOW: usize = 120;

/// 单任务耗时窗口
#[derive(Debug)]
pub struct FrameTimes {
    samples: VecDeque<Duration>,
    capacity: usize,
    invocations: u64,
    overruns: u64,
    window_start: Instant,
}

impl FrameTimes {
    /// `capacity` 为 0 时按 1 处理
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            invocations: 0,
            overruns: 0,
            window_start: Instant::now(),
        }
    }

    /// 记录一次迭代
    pub fn record(&mut self, duration: Duration, overrun: bool) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(duration);
        self.invocations += 1;
        if overrun {
            self.overruns += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// 生成报告并清空窗口
    pub fn drain(&mut self, name: &str, target: Duration) -> TaskTiming {
        let now = Instant::now();
        let window = now.duration_since(self.window_start);
        let report = TaskTiming::from_samples(
            name,
            target,
            self.samples.iter().copied(),
            self.invocations,
            self.overruns,
            window,
        );
        self.samples.clear();
        self.invocations = 0;
        self.overruns = 0;
        self.window_start = now;
        report
    }
}

/// 单任务在一个统计窗口内的耗时报告
#[derive(Debug, Clone, PartialEq)]
pub struct TaskTiming {
    pub name: String,
    /// 目标周期
    pub target: Duration,
    /// 窗口内迭代次数
    pub invocations: u64,
    /// 窗口内超时次数
    pub overruns: u64,
    /// 平均单帧耗时（最近 K 次）
    pub mean: Duration,
    pub min: Duration,
    pub max: Duration,
    /// 实际帧率（窗口内迭代次数 / 窗口时长）
    pub effective_fps: f64,
}

impl TaskTiming {
    /// 从耗时样本计算报告
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn from_samples(
        name: &str,
        target: Duration,
        samples: impl IntoIterator<Item = Duration>,
        invocations: u64,
        overruns: u64,
        window: Duration,
    ) -> Self {
        let mut count = 0u32;
        let mut total = Duration::ZERO;
        let mut min = Duration::MAX;
        let mut max = Duration::ZERO;
        for sample in samples {
            count += 1;
            total += sample;
            min = min.min(sample);
            max = max.max(sample);
        }
        let (mean, min) = if count == 0 {
            (Duration::ZERO, Duration::ZERO)
        } else {
            (total / count, min)
        };
        let secs = window.as_secs_f64();
        let effective_fps = if secs > 0.0 {
            invocations as f64 / secs
        } else {
            0.0
        };
        Self {
            name: name.to_string(),
            target,
            invocations,
            overruns,
            mean,
            min,
            max,
            effective_fps,
        }
    }

    /// 目标帧率
    pub fn target_fps(&self) -> f64 {
        let secs = self.target.as_secs_f64();
        if secs > 0.0 { 1.0 / secs } else { 0.0 }
    }
}

impl fmt::Display for TaskTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.1}/{:.1} fps, mean {:.2} ms, max {:.2} ms",
            self.name,
            self.effective_fps,
            self.target_fps(),
            self.mean.as_secs_f64() * 1000.0,
            self.max.as_secs_f64() * 1000.0,
        )?;
        if self.overruns > 0 {
            write!(f, ", {} overruns", self.overruns)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_keeps_last_k() {
        let mut times = FrameTimes::new(3);
        for ms in [1, 2, 3, 4, 5] {
            times.record(Duration::from_millis(ms), false);
        }
        assert_eq!(times.len(), 3);

        let report = times.drain("data", Duration::from_millis(10));
        // 只保留 3, 4, 5
        assert_eq!(report.mean, Duration::from_millis(4));
        assert_eq!(report.min, Duration::from_millis(3));
        assert_eq!(report.max, Duration::from_millis(5));
        // 调用计数覆盖整个窗口
        assert_eq!(report.invocations, 5);
        assert!(times.is_empty());
    }

    #[test]
    fn test_drain_resets_counters() {
        let mut times = FrameTimes::new(10);
        times.record(Duration::from_millis(20), true);
        let first = times.drain("desk", Duration::from_millis(10));
        assert_eq!(first.overruns, 1);

        let second = times.drain("desk", Duration::from_millis(10));
        assert_eq!(second.invocations, 0);
        assert_eq!(second.overruns, 0);
        assert_eq!(second.mean, Duration::ZERO);
    }

    #[test]
    fn test_effective_fps() {
        let samples = vec![Duration::from_millis(1); 30];
        let report = TaskTiming::from_samples(
            "desk",
            Duration::from_millis(33),
            samples,
            30,
            0,
            Duration::from_secs(1),
        );
        assert!((report.effective_fps - 30.0).abs() < 1e-9);
        assert!(report.to_string().starts_with("desk: 30.0/30.3 fps"));
        assert!(!report.to_string().contains("overruns"));
    }

    #[test]
    fn test_zero_capacity_treated_as_one() {
        let mut times = FrameTimes::new(0);
        times.record(Duration::from_millis(1), false);
        times.record(Duration::from_millis(2), false);
        assert_eq!(times.len(), 1);
    }
}
