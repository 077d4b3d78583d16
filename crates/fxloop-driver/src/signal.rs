//! 共享信号
//!
//! 数据任务（唯一写入方）与设备任务（多个读取方）之间唯一的跨任务状态。
//! 每次发布都是一次完整帧的原子指针替换（`ArcSwap`），读取方永远不会看到写了一半的帧；
//! 读取方可能连续多次读到同一帧，这是预期行为。

use arc_swap::ArcSwap;
use fxloop_signal::{RGB8, Signal};
use std::sync::Arc;

/// 创建一对写入端 / 读取端，初始帧为 `leds` 个黑色像素（代数 0）
pub fn shared_signal(leds: usize) -> (SignalPublisher, SharedSignal) {
    let cell = Arc::new(ArcSwap::from_pointee(Signal::solid(leds, RGB8::default())));
    (
        SignalPublisher {
            cell: Arc::clone(&cell),
            generation: 0,
        },
        SharedSignal { cell },
    )
}

/// 写入端（不可克隆，保证单写入方）
pub struct SignalPublisher {
    cell: Arc<ArcSwap<Signal>>,
    generation: u64,
}

impl SignalPublisher {
    /// 发布新帧，返回其代数（从 1 开始单调递增）
    pub fn publish(&mut self, signal: Signal) -> u64 {
        self.generation += 1;
        self.cell
            .store(Arc::new(signal.with_generation(self.generation)));
        self.generation
    }

    /// 最近一次发布的代数
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// 读取端（可克隆，每个设备任务持有一份）
#[derive(Clone)]
pub struct SharedSignal {
    cell: Arc<ArcSwap<Signal>>,
}

impl SharedSignal {
    /// 读取最新的完整帧（无锁，不阻塞写入方）
    pub fn load(&self) -> Arc<Signal> {
        self.cell.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.cell.load().generation()
    }
}

impl std::fmt::Debug for SharedSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSignal")
            .field("generation", &self.generation())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_frame_is_black() {
        let (_publisher, signal) = shared_signal(4);
        let frame = signal.load();
        assert_eq!(frame.generation(), 0);
        assert_eq!(frame.len(), 4);
        assert!(frame.pixels().iter().all(|p| *p == RGB8::default()));
    }

    #[test]
    fn test_publish_stamps_generation() {
        let (mut publisher, signal) = shared_signal(1);
        // 写入方传入的代数被覆盖
        let g1 = publisher.publish(Signal::solid(1, RGB8::new(1, 1, 1)).with_generation(99));
        let g2 = publisher.publish(Signal::solid(1, RGB8::new(2, 2, 2)));
        assert_eq!((g1, g2), (1, 2));
        assert_eq!(signal.generation(), 2);
        assert_eq!(signal.load().pixels()[0], RGB8::new(2, 2, 2));
    }

    #[test]
    fn test_reader_keeps_old_frame_alive() {
        let (mut publisher, signal) = shared_signal(1);
        publisher.publish(Signal::solid(1, RGB8::new(5, 5, 5)));
        let held = signal.load();
        publisher.publish(Signal::solid(1, RGB8::new(6, 6, 6)));
        assert_eq!(held.pixels()[0], RGB8::new(5, 5, 5));
        assert_eq!(signal.load().pixels()[0], RGB8::new(6, 6, 6));
    }
}
