//! 帧定时
//!
//! [`FramePacer`] 只做纯计算：给定目标周期和本帧耗时，返回应睡眠的时长或超时（overrun）。
//! 真正的睡眠由任务线程按 [`PacingMode`] 执行。
//!
//! 超时不致命，也不做任何降频：下一帧立即开始。

use crate::error::DriverError;
use serde::Deserialize;
use std::time::Duration;

/// 睡眠策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacingMode {
    /// 条件变量定时等待（默认，kill 可立即唤醒）
    #[default]
    Park,
    /// `spin_sleep` 高精度睡眠（亚毫秒级抖动，占用更多 CPU，睡眠期间不响应 kill）
    Precise,
}

/// 单帧定时结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// 需要睡眠的时长
    Sleep(Duration),
    /// 本帧耗时超过目标周期
    Overrun { elapsed: Duration, target: Duration },
}

impl Pace {
    pub fn is_overrun(&self) -> bool {
        matches!(self, Pace::Overrun { .. })
    }
}

/// 帧定时器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePacer {
    period: Duration,
}

impl FramePacer {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    /// 从帧率构造（周期 = 1 / fps）
    pub fn from_fps(fps: f64) -> Result<Self, DriverError> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(DriverError::InvalidFps(fps));
        }
        Ok(Self::new(Duration::from_secs_f64(1.0 / fps)))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 计算本帧之后的动作
    pub fn pace(&self, elapsed: Duration) -> Pace {
        if elapsed < self.period {
            Pace::Sleep(self.period - elapsed)
        } else {
            Pace::Overrun {
                elapsed,
                target: self.period,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_from_fps() {
        let pacer = FramePacer::from_fps(50.0).unwrap();
        let diff = pacer.period().abs_diff(Duration::from_millis(20));
        assert!(diff < Duration::from_micros(1));
        assert!(FramePacer::from_fps(0.0).is_err());
        assert!(FramePacer::from_fps(-1.0).is_err());
        assert!(FramePacer::from_fps(f64::NAN).is_err());
        assert!(FramePacer::from_fps(f64::INFINITY).is_err());
    }

    #[test]
    fn test_pace_sleep_and_overrun() {
        let pacer = FramePacer::new(Duration::from_millis(10));
        assert_eq!(
            pacer.pace(Duration::from_millis(3)),
            Pace::Sleep(Duration::from_millis(7))
        );
        // 恰好等于周期也算超时
        assert_eq!(
            pacer.pace(Duration::from_millis(10)),
            Pace::Overrun {
                elapsed: Duration::from_millis(10),
                target: Duration::from_millis(10)
            }
        );
    }

    proptest! {
        #[test]
        fn prop_sleep_plus_elapsed_equals_period(
            period_us in 1u64..1_000_000,
            elapsed_us in 0u64..2_000_000,
        ) {
            let period = Duration::from_micros(period_us);
            let elapsed = Duration::from_micros(elapsed_us);
            match FramePacer::new(period).pace(elapsed) {
                Pace::Sleep(d) => {
                    prop_assert!(elapsed < period);
                    prop_assert_eq!(d + elapsed, period);
                }
                Pace::Overrun { elapsed: e, target } => {
                    prop_assert!(elapsed >= period);
                    prop_assert_eq!(e, elapsed);
                    prop_assert_eq!(target, period);
                }
            }
        }

        #[test]
        fn prop_sleep_never_exceeds_period(
            period_us in 1u64..1_000_000,
            elapsed_us in 0u64..2_000_000,
        ) {
            let period = Duration::from_micros(period_us);
            if let Pace::Sleep(d) = FramePacer::new(period).pace(Duration::from_micros(elapsed_us)) {
                prop_assert!(d <= period);
                prop_assert!(d > Duration::ZERO);
            }
        }
    }
}
