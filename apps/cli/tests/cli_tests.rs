//! fxloop 二进制的退出码与 Shell 行为测试

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

const WLED_CONFIG: &str = r#"
fps = 30
source = { type = "solid", color = [255, 80, 0] }

[devices.desk]
type = "wled"
ip = "127.0.0.1"
port = 21399
leds = 8
"#;

fn write_config(contents: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fxloop.toml");
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}

fn fxloop() -> Command {
    Command::cargo_bin("fxloop").unwrap()
}

#[test]
fn test_help() {
    fxloop()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--single-threaded"))
        .stdout(predicate::str::contains("--no-performance-warnings"));
}

#[test]
fn test_missing_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    fxloop()
        .arg("--config")
        .arg(dir.path().join("missing.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.toml"));
}

#[test]
fn test_no_valid_devices_fails() {
    let (_dir, path) = write_config(
        r#"
[devices.broken]
type = "wled"
leds = 8
"#,
    );
    fxloop().arg("--config").arg(&path).write_stdin("exit\n").assert().failure();
}

#[test]
fn test_empty_device_table_fails() {
    let (_dir, path) = write_config("fps = 30\n");
    fxloop().arg("--config").arg(&path).write_stdin("exit\n").assert().failure();
}

#[test]
fn test_exit_command_shuts_down_cleanly() {
    let (_dir, path) = write_config(WLED_CONFIG);
    fxloop()
        .arg("--config")
        .arg(&path)
        .write_stdin("status\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("state: running"))
        .stdout(predicate::str::contains("desk"));
}

#[test]
fn test_eof_exits() {
    let (_dir, path) = write_config(WLED_CONFIG);
    fxloop().arg("--config").arg(&path).write_stdin("").assert().success();
}

#[test]
fn test_no_autostart_then_start_stop() {
    let (_dir, path) = write_config(WLED_CONFIG);
    fxloop()
        .args(["--no-autostart", "-t", "--config"])
        .arg(&path)
        .write_stdin("status\nstart\nstop\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("state: constructed"))
        .stdout(predicate::str::contains("running"))
        .stdout(predicate::str::contains("stopped"));
}

#[test]
fn test_malformed_config_fails() {
    let (_dir, path) = write_config("fps = [");
    fxloop()
        .arg("--config")
        .arg(&path)
        .write_stdin("exit\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("fxloop.toml"));
}

#[test]
fn test_reload_starts_new_generation() {
    let (_dir, path) = write_config(WLED_CONFIG);
    fxloop()
        .arg("--config")
        .arg(&path)
        .write_stdin("reload\nstatus\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("reloaded"))
        .stdout(predicate::str::contains("generation 2"));
}

#[test]
fn test_unknown_command_is_reported() {
    let (_dir, path) = write_config(WLED_CONFIG);
    fxloop()
        .arg("--config")
        .arg(&path)
        .write_stdin("jump\nexit\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("unknown command"));
}

#[test]
fn test_bench_prints_statistics() {
    let (_dir, path) = write_config(WLED_CONFIG);
    fxloop()
        .args(["bench", "--cycles", "20", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("solid x20 (8 LEDs)"))
        .stdout(predicate::str::contains("mean:"));
}
