//! TaskRunner 定时与生命周期测试

use fxloop_driver::{FramePacer, RunnerState, TaskRunner, TaskStatus, task_fn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_mean_interval_matches_period() {
    const PERIOD: Duration = Duration::from_millis(20);
    const ITERATIONS: usize = 100;

    let stamps = Arc::new(Mutex::new(Vec::with_capacity(ITERATIONS)));
    let recorded = Arc::clone(&stamps);
    let mut runner = TaskRunner::new(
        task_fn("stamp", move || {
            let mut stamps = recorded.lock();
            stamps.push(Instant::now());
            if stamps.len() >= ITERATIONS {
                TaskStatus::Terminate
            } else {
                TaskStatus::Continue
            }
        }),
        FramePacer::new(PERIOD),
    );
    runner.start().unwrap();
    runner.join(Duration::from_secs(10)).unwrap();

    let stamps = stamps.lock();
    assert_eq!(stamps.len(), ITERATIONS);
    let total = stamps[ITERATIONS - 1].duration_since(stamps[0]);
    let mean = total / (ITERATIONS as u32 - 1);
    let tolerance = PERIOD / 20;
    assert!(
        mean.abs_diff(PERIOD) <= tolerance,
        "mean interval {:?} outside {:?} ± {:?}",
        mean,
        PERIOD,
        tolerance
    );
}

#[test]
fn test_kill_while_sleeping() {
    let counter = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&counter);
    // 周期远大于测试时长，线程几乎全程处于定时睡眠中
    let mut runner = TaskRunner::new(
        task_fn("sleeper", move || {
            c.fetch_add(1, Ordering::SeqCst);
            TaskStatus::Continue
        }),
        FramePacer::new(Duration::from_secs(30)),
    );
    runner.start().unwrap();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    let killed_at = Instant::now();
    runner.kill();
    // kill 唤醒睡眠，线程应立即退出
    runner.join(Duration::from_secs(1)).unwrap();
    assert!(killed_at.elapsed() < Duration::from_secs(1));

    thread::sleep(Duration::from_millis(50));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(runner.state(), RunnerState::Killed);
    assert!(!runner.is_alive());
}

#[test]
fn test_terminate_on_first_invocation() {
    let counter = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&counter);
    let mut runner = TaskRunner::new(
        task_fn("once", move || {
            c.fetch_add(1, Ordering::SeqCst);
            TaskStatus::Terminate
        }),
        FramePacer::new(Duration::from_millis(1)),
    );
    let handle = runner.handle();
    runner.start().unwrap();

    // 一个轮询周期内变为不存活
    let deadline = Instant::now() + Duration::from_millis(100);
    while handle.is_alive() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    assert!(!handle.is_alive());

    thread::sleep(Duration::from_millis(30));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(runner.start().is_err());
}

#[test]
fn test_stopped_runner_can_be_killed() {
    let counter = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&counter);
    let mut runner = TaskRunner::new(
        task_fn("paused", move || {
            c.fetch_add(1, Ordering::SeqCst);
            TaskStatus::Continue
        }),
        FramePacer::new(Duration::from_millis(2)),
    );
    runner.start().unwrap();
    runner.stop();
    thread::sleep(Duration::from_millis(20));
    let paused = counter.load(Ordering::SeqCst);

    // 挂起在条件变量上的线程也能被 kill 唤醒
    runner.kill();
    runner.join(Duration::from_secs(1)).unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), paused);
}

#[test]
fn test_drop_joins_thread() {
    let running = Arc::new(AtomicUsize::new(0));
    let r = Arc::clone(&running);
    {
        let mut runner = TaskRunner::new(
            task_fn("dropped", move || {
                r.fetch_add(1, Ordering::SeqCst);
                TaskStatus::Continue
            }),
            FramePacer::new(Duration::from_millis(1)),
        );
        runner.start().unwrap();
        thread::sleep(Duration::from_millis(10));
    }
    let after_drop = running.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(running.load(Ordering::SeqCst), after_drop);
}
