// tests/cli.rs
mod common;

use common::{one_shot_server, write_request};
use std::{fs, process::Command};
use tempfile::tempdir;

const BIN: &str = env!("CARGO_BIN_EXE_sistat_wages");

#[test]
fn missing_request_exits_1_and_logs_not_found() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("run.log");
    let output = dir.path().join("out.xlsx");

    let status = Command::new(BIN)
        .env_remove("RUST_LOG")
        .arg("--request")
        .arg(dir.path().join("absent.json"))
        .arg("--output")
        .arg(&output)
        .arg("--log-file")
        .arg(&log)
        // nothing listens here; the run must stop before any request
        .args(["--endpoint", "http://127.0.0.1:9/never"])
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(1));
    let logged = fs::read_to_string(&log).unwrap();
    assert!(logged.contains("ERROR"), "{logged}");
    assert!(logged.contains("NotFound"), "{logged}");
    assert!(!output.exists());
}

#[test]
fn bad_status_exits_1_and_logs_network_error() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("run.log");
    let output = dir.path().join("out.xlsx");
    let (url, server) = one_shot_server("404 Not Found", "no such table");

    let status = Command::new(BIN)
        .env_remove("RUST_LOG")
        .arg("--request")
        .arg(write_request(dir.path()))
        .arg("--output")
        .arg(&output)
        .arg("--log-file")
        .arg(&log)
        .args(["--endpoint", &url])
        .status()
        .unwrap();
    server.join().unwrap();

    assert_eq!(status.code(), Some(1));
    let logged = fs::read_to_string(&log).unwrap();
    assert!(logged.contains("NetworkError"), "{logged}");
    assert!(!output.exists());
}

#[test]
fn successful_run_exits_0() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("run.log");
    let output = dir.path().join("out.xlsx");
    let (url, server) = one_shot_server("200 OK", common::WAGES_CSV);

    let status = Command::new(BIN)
        .env_remove("RUST_LOG")
        .arg("--request")
        .arg(write_request(dir.path()))
        .arg("--output")
        .arg(&output)
        .arg("--log-file")
        .arg(&log)
        .args(["--endpoint", &url])
        .status()
        .unwrap();
    server.join().unwrap();

    assert_eq!(status.code(), Some(0));
    assert!(output.exists());
    let table = sistat_wages::sheet::read_xlsx(&output).unwrap();
    assert_eq!(table.len(), 2);
}

#[test]
fn bad_config_file_exits_1() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.yaml");
    let log = dir.path().join("run.log");
    fs::write(&cfg, "timeout_secs: 0\n").unwrap();

    let status = Command::new(BIN)
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(&cfg)
        .arg("--log-file")
        .arg(&log)
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(1));
    assert!(fs::read_to_string(&log).unwrap().contains("ConfigError"));
}

#[test]
fn bad_flag_value_exits_1_and_logs_config_error() {
    for bad in [["--timeout", "ten"], ["--endpoint", "not a url"]] {
        let dir = tempdir().unwrap();
        let log = dir.path().join("run.log");

        let status = Command::new(BIN)
            .env_remove("RUST_LOG")
            .args(bad)
            .arg("--log-file")
            .arg(&log)
            .status()
            .unwrap();

        assert_eq!(status.code(), Some(1), "{bad:?}");
        let logged = fs::read_to_string(&log).unwrap();
        assert!(logged.contains("ConfigError"), "{logged}");
    }
}

#[test]
fn flag_overrides_invalid_yaml_value() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.yaml");
    let log = dir.path().join("run.log");
    let output = dir.path().join("out.xlsx");
    fs::write(&cfg, "timeout_secs: 0\n").unwrap();
    let (url, server) = one_shot_server("200 OK", common::WAGES_CSV);

    let status = Command::new(BIN)
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(&cfg)
        .args(["--timeout", "5", "--endpoint", &url])
        .arg("--request")
        .arg(write_request(dir.path()))
        .arg("--output")
        .arg(&output)
        .arg("--log-file")
        .arg(&log)
        .status()
        .unwrap();
    server.join().unwrap();

    assert_eq!(status.code(), Some(0));
    assert!(output.exists());
}
