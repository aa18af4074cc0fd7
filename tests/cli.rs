mod common;

use std::process::Stdio;
use std::thread;
use std::time::Duration;

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::{contains, is_match};

use common::test_monitor::TestMonitor;

fn running_pid(stdout: &str) -> i32 {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix("Running PID "))
        .and_then(|pid| pid.trim().parse().ok())
        .unwrap_or_else(|| panic!("no pid in {stdout:?}"))
}

#[test]
fn usage_errors_exit_with_one() {
    for args in [
        &[][..],
        &["execute"][..],
        &["execute", "-x", "ls"][..],
        &["stats-time"][..],
        &["stats-command", "ls"][..],
        &["stats-uniq"][..],
        &["restart"][..],
    ] {
        Command::cargo_bin("tracer")
            .unwrap()
            .args(args)
            .assert()
            .code(1)
            .stderr(contains("Usage"));
    }
}

#[test]
fn help_exits_with_zero() {
    Command::cargo_bin("tracer")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("stats-command"));
}

#[test]
fn execute_then_query_stats() {
    let monitor = TestMonitor::launch().unwrap();

    let output = monitor
        .send_command(&["execute", "-u", "echo", "traced"])
        .success()
        .stdout(contains("traced\n"))
        .stdout(is_match(r"Ended in \d+ ms\n$").unwrap())
        .get_output()
        .stdout
        .clone();
    let pid = running_pid(&String::from_utf8(output).unwrap());

    monitor
        .send_command(&["stats-time", &pid.to_string()])
        .success()
        .stdout(is_match(r"^Total execution time is \d+ ms\n$").unwrap());
    monitor
        .send_command(&["stats-command", "echo", &pid.to_string(), "999999"])
        .success()
        .stdout("echo was executed 1 times\n");
    monitor
        .send_command(&["stats-uniq", &pid.to_string()])
        .success()
        .stdout("echo\n");
}

#[test]
fn execute_pipeline_prints_last_stage_output() {
    let monitor = TestMonitor::launch().unwrap();

    let output = monitor
        .send_command(&["execute", "-p", "echo hi | tr a-z A-Z | cat"])
        .success()
        .stdout(contains("HI\n"))
        .stdout(contains("Ended in "))
        .get_output()
        .stdout
        .clone();
    let pid = running_pid(&String::from_utf8(output).unwrap());

    monitor
        .send_command(&["stats-uniq", &pid.to_string()])
        .success()
        .stdout("echo hi | tr a-z A-Z | cat\n");
}

#[test]
fn status_shows_sleeping_program() {
    let monitor = TestMonitor::launch().unwrap();

    let mut sleeper = std::process::Command::new(cargo_bin("tracer"))
        .env(task_monitor::config::FIFO_DIR_ENV, monitor.fifo_dir())
        .args(["execute", "-u", "sleep", "1"])
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();

    let mut status = String::new();
    for _ in 0..100 {
        status = monitor.query("status");
        if !status.is_empty() {
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    assert!(
        is_match(r"^\d+ sleep \d+\n$").unwrap().eval(&status),
        "unexpected status {status:?}"
    );

    let output = sleeper.wait_with_output().unwrap();
    assert!(output.status.success());
    let pid = running_pid(&String::from_utf8(output.stdout).unwrap());
    assert!(status.starts_with(&format!("{pid} sleep ")));
}

#[test]
fn query_without_monitor_reader_fails_on_missing_fifo() {
    let dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("tracer")
        .unwrap()
        .env(task_monitor::config::FIFO_DIR_ENV, dir.path())
        .arg("status")
        .assert()
        .code(1)
        .stderr(contains("Error:"));
}

#[test]
fn monitor_requires_output_dir() {
    Command::cargo_bin("monitor")
        .unwrap()
        .assert()
        .code(1)
        .stderr(contains("Usage"));
}
