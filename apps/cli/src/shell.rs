//! 交互式 Shell
//!
//! 专用输入线程持有 rustyline `Editor`（保留历史记录），通过有界通道把输入交给主线程；
//! Ctrl+C 也经同一通道送达，主线程据此 kill 全部任务并退出。

use crate::config;
use anyhow::Result;
use crossbeam_channel::{Receiver, Sender, bounded};
use fxloop_driver::Orchestrator;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::str::FromStr;
use std::thread;
use tracing::{debug, warn};

const HISTORY_FILE: &str = ".fxloop_history";

/// Shell 命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Reload,
    Status,
    Help,
    Exit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "reload" => Ok(Self::Reload),
            "status" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "exit" | "quit" => Ok(Self::Exit),
            other => Err(format!("unknown command '{other}', type 'help'")),
        }
    }
}

/// 输入线程送往主线程的事件
#[derive(Debug)]
enum Input {
    Line(String),
    Interrupt,
    Eof,
}

/// 启动输入线程
fn spawn_input(tx: Sender<Input>) -> Result<thread::JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("fxloop-input".into())
        .spawn(move || {
            let mut rl = match DefaultEditor::new() {
                Ok(rl) => rl,
                Err(e) => {
                    warn!("Failed to initialize readline: {}", e);
                    let _ = tx.send(Input::Eof);
                    return;
                },
            };
            rl.load_history(HISTORY_FILE).ok();

            loop {
                match rl.readline("fxloop> ") {
                    Ok(line) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            continue;
                        }
                        let _ = rl.add_history_entry(line.as_str());
                        if tx.send(Input::Line(line)).is_err() {
                            break;
                        }
                    },
                    Err(ReadlineError::Interrupted) => {
                        let _ = tx.send(Input::Interrupt);
                    },
                    Err(ReadlineError::Eof) => {
                        let _ = tx.send(Input::Eof);
                        break;
                    },
                    Err(e) => {
                        warn!("Readline error: {}", e);
                        let _ = tx.send(Input::Eof);
                        break;
                    },
                }
            }
            rl.save_history(HISTORY_FILE).ok();
        })?;
    Ok(handle)
}

/// Shell 会话：持有 Orchestrator 与配置文件路径
pub struct Session {
    orchestrator: Orchestrator,
    config_path: PathBuf,
}

impl Session {
    pub fn new(orchestrator: Orchestrator, config_path: PathBuf) -> Self {
        Self {
            orchestrator,
            config_path,
        }
    }

    /// 执行一条命令，返回 `false` 表示退出
    pub fn execute(&mut self, command: Command) -> bool {
        match command {
            Command::Start => match self.orchestrator.start() {
                Ok(()) => println!("running"),
                Err(e) => eprintln!("start failed: {e}"),
            },
            Command::Stop => {
                self.orchestrator.stop();
                println!("stopped");
            },
            Command::Reload => match self.reload() {
                Ok(()) => println!("reloaded {}", self.config_path.display()),
                Err(e) => eprintln!("reload failed: {e:#}"),
            },
            Command::Status => print!("{}", self.orchestrator.status()),
            Command::Help => print_help(),
            Command::Exit => {
                self.orchestrator.kill();
                return false;
            },
        }
        true
    }

    /// 重新读取配置文件并替换当前一代；失败时旧一代继续运行
    fn reload(&mut self) -> Result<()> {
        let config = config::load(&self.config_path)?;
        self.orchestrator.reload(config)?;
        Ok(())
    }

    /// 主循环：直到 `exit`、EOF 或 Ctrl+C
    pub fn run(mut self) -> Result<()> {
        let (tx, rx) = bounded::<Input>(10);

        let interrupt = tx.clone();
        ctrlc::set_handler(move || {
            let _ = interrupt.send(Input::Interrupt);
        })?;
        let _input = spawn_input(tx)?;

        println!("fxloop v{} - type 'help' for commands", env!("CARGO_PKG_VERSION"));
        self.event_loop(&rx);
        Ok(())
    }

    fn event_loop(&mut self, rx: &Receiver<Input>) {
        while let Ok(input) = rx.recv() {
            let line = match input {
                Input::Line(line) => line,
                Input::Interrupt | Input::Eof => {
                    debug!("Input closed, shutting down");
                    self.orchestrator.kill();
                    return;
                },
            };
            let command = match line.parse::<Command>() {
                Ok(command) => command,
                Err(e) => {
                    eprintln!("{e}");
                    continue;
                },
            };
            // 命令 panic 不应拖垮 Shell
            match panic::catch_unwind(AssertUnwindSafe(|| self.execute(command))) {
                Ok(true) => {},
                Ok(false) => return,
                Err(_) => eprintln!("command '{line}' panicked"),
            }
        }
        self.orchestrator.kill();
    }
}

fn print_help() {
    println!("commands:");
    println!("  start   start or resume all device loops");
    println!("  stop    pause all device loops");
    println!("  reload  re-read the configuration file and restart");
    println!("  status  show task states and the last frame-time report");
    println!("  help    show this message");
    println!("  exit    stop everything and quit");
}
