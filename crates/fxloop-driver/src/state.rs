//! 任务状态定义
//!
//! 状态机：`Idle → Running ⇄ Stopped → Killed`。
//! alive / active 两个标志都由同一个原子状态字节派生，不会出现不一致的组合。

use std::sync::atomic::{AtomicU8, Ordering};

/// 任务运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum RunnerState {
    /// 已构造，线程尚未启动
    #[default]
    Idle = 0,
    /// 线程存活，按周期执行
    Running = 1,
    /// 线程存活，在条件变量上挂起
    Stopped = 2,
    /// 线程已退出或即将退出，不可恢复
    Killed = 3,
}

impl RunnerState {
    /// 从 u8 转换，无效值视为 Killed
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Stopped,
            _ => Self::Killed,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// 线程存活（运行或暂停）
    pub fn is_alive(self) -> bool {
        matches!(self, Self::Running | Self::Stopped)
    }

    /// 正在执行迭代
    pub fn is_active(self) -> bool {
        self == Self::Running
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Killed => "killed",
        }
    }
}

impl std::fmt::Display for RunnerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 任务状态（原子版本，用于线程间共享）
#[derive(Debug, Default)]
pub struct AtomicRunnerState {
    inner: AtomicU8,
}

impl AtomicRunnerState {
    pub fn new(state: RunnerState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    pub fn get(&self) -> RunnerState {
        RunnerState::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub fn set(&self, state: RunnerState) {
        self.inner.store(state.as_u8(), Ordering::Release);
    }

    /// 比较并交换，成功返回 `Ok(旧值)`，失败返回 `Err(当前值)`
    pub fn compare_exchange(
        &self,
        current: RunnerState,
        new: RunnerState,
    ) -> Result<RunnerState, RunnerState> {
        self.inner
            .compare_exchange(
                current.as_u8(),
                new.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(RunnerState::from_u8)
            .map_err(RunnerState::from_u8)
    }

    /// 进入 Killed（终态，任何状态都可进入），返回之前的状态
    pub fn kill(&self) -> RunnerState {
        RunnerState::from_u8(
            self.inner
                .swap(RunnerState::Killed.as_u8(), Ordering::AcqRel),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_derived_from_state() {
        assert!(!RunnerState::Idle.is_alive());
        assert!(RunnerState::Running.is_alive() && RunnerState::Running.is_active());
        assert!(RunnerState::Stopped.is_alive() && !RunnerState::Stopped.is_active());
        assert!(!RunnerState::Killed.is_alive() && !RunnerState::Killed.is_active());
    }

    #[test]
    fn test_from_u8_roundtrip() {
        for state in [
            RunnerState::Idle,
            RunnerState::Running,
            RunnerState::Stopped,
            RunnerState::Killed,
        ] {
            assert_eq!(RunnerState::from_u8(state.as_u8()), state);
        }
        assert_eq!(RunnerState::from_u8(200), RunnerState::Killed);
    }

    #[test]
    fn test_compare_exchange() {
        let state = AtomicRunnerState::new(RunnerState::Running);
        assert_eq!(
            state.compare_exchange(RunnerState::Running, RunnerState::Stopped),
            Ok(RunnerState::Running)
        );
        assert_eq!(
            state.compare_exchange(RunnerState::Running, RunnerState::Stopped),
            Err(RunnerState::Stopped)
        );
        assert_eq!(state.kill(), RunnerState::Stopped);
        assert_eq!(state.get(), RunnerState::Killed);
    }
}
