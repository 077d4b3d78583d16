//! 数据阶段基准测试
//!
//! 同步调用信号源 N 次，统计单次耗时（平均 / 最小 / 最大），用于评估某个信号源能支撑的帧率。

use crate::timing::TaskTiming;
use fxloop_signal::{SignalError, SignalSource};
use std::time::{Duration, Instant};
use tracing::debug;

/// 运行基准测试
///
/// 任一次 `produce` 失败即中止并返回该错误。
pub fn bench_source(
    source: &mut dyn SignalSource,
    cycles: usize,
) -> Result<TaskTiming, SignalError> {
    let mut samples = Vec::with_capacity(cycles);
    let started = Instant::now();
    for _ in 0..cycles {
        let t = Instant::now();
        let frame = source.produce()?;
        samples.push(t.elapsed());
        debug!("Produced {} pixels", frame.len());
    }
    let window = started.elapsed();

    Ok(TaskTiming::from_samples(
        source.name(),
        Duration::ZERO,
        samples,
        cycles as u64,
        0,
        window,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxloop_signal::SourceConfig;

    #[test]
    fn test_bench_counts_cycles() {
        let mut source = SourceConfig::Solid { color: [1, 2, 3] }.build(8).unwrap();
        let report = bench_source(source.as_mut(), 25).unwrap();
        assert_eq!(report.invocations, 25);
        assert_eq!(report.name, "solid");
        assert!(report.min <= report.mean && report.mean <= report.max);
    }

    #[test]
    fn test_bench_zero_cycles() {
        let mut source = SourceConfig::default().build(8).unwrap();
        let report = bench_source(source.as_mut(), 0).unwrap();
        assert_eq!(report.invocations, 0);
        assert_eq!(report.mean, Duration::ZERO);
    }
}
