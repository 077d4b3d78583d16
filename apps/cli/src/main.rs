//! # fxloop
//!
//! LED 设备循环调度器的命令行入口。
//!
//! ```bash
//! fxloop --config fxloop.toml --display-frametimes
//! fxloop bench --cycles 1000
//! ```

mod config;
mod shell;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fxloop_devices::{DeviceRegistry, RegistryDefaults};
use fxloop_driver::{Orchestrator, PacingMode, RunOptions, bench_source};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// fxloop - 按设备独立帧率驱动 WLED / 串口灯带 / DualShock 灯条
#[derive(Parser, Debug)]
#[command(name = "fxloop")]
#[command(about = "Concurrent device-loop scheduler for LED peripherals", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件（默认 ./fxloop.toml，其次为用户配置目录下的 fxloop/config.toml）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 所有阶段在一个线程里轮流执行（调试用）
    #[arg(short = 't', long)]
    single_threaded: bool,

    /// 每秒输出一次各任务的帧耗时
    #[arg(long)]
    display_frametimes: bool,

    /// 关闭帧率不足警告
    #[arg(short = 'w', long)]
    no_performance_warnings: bool,

    /// 使用自旋 + 睡眠的精确定时（更准，但更耗 CPU）
    #[arg(long)]
    precise_timing: bool,

    /// 启动后不自动运行，等待 `start` 命令
    #[arg(long)]
    no_autostart: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 同步运行数据阶段 N 次并统计耗时
    Bench {
        /// 运行次数
        #[arg(short = 'n', long, default_value_t = 1000)]
        cycles: usize,

        /// 帧长度（默认取配置中最大的设备 LED 数）
        #[arg(long)]
        leds: Option<usize>,
    },
}

impl Cli {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            single_threaded: self.single_threaded,
            display_frametimes: self.display_frametimes,
            performance_warnings: !self.no_performance_warnings,
            pacing: if self.precise_timing {
                PacingMode::Precise
            } else {
                PacingMode::Park
            },
            ..RunOptions::default()
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fxloop=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let path = config::resolve(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Bench { cycles, leds }) => bench(&path, cycles, leds),
        None => run(&cli, path),
    }
}

/// 加载配置、构造 Orchestrator 并进入 Shell
fn run(cli: &Cli, path: PathBuf) -> Result<()> {
    let engine = config::load(&path)?;
    info!("Loaded {}", path.display());

    let mut orchestrator = Orchestrator::new(engine, cli.run_options())
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    if !cli.no_autostart {
        orchestrator.start().context("failed to start device loops")?;
    }

    shell::Session::new(orchestrator, path).run()
}

fn bench(path: &std::path::Path, cycles: usize, leds: Option<usize>) -> Result<()> {
    let engine = config::load(path)?;
    let leds = match leds {
        Some(n) => n,
        None => DeviceRegistry::load(&engine.devices, RegistryDefaults { fps: engine.fps })
            .with_context(|| format!("invalid devices in {}", path.display()))?
            .max_leds(),
    };

    let mut source = engine.source.build(leds).context("failed to build signal source")?;
    let timing = bench_source(source.as_mut(), cycles).context("signal source failed")?;

    println!("{} x{} ({} LEDs)", timing.name, timing.invocations, leds);
    println!("  mean: {:.3} ms", timing.mean.as_secs_f64() * 1000.0);
    println!("  min:  {:.3} ms", timing.min.as_secs_f64() * 1000.0);
    println!("  max:  {:.3} ms", timing.max.as_secs_f64() * 1000.0);
    Ok(())
}
