use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::{TempDir, tempdir};

const BASE: &str = r#"
[sensor]
kind = "vl53l0x"
min_distance_cm = 3.0
max_distance_cm = 40.0

[pins]
# trigger/echo are only read by the ultrasonic driver
trigger = 13
echo = 12
light = 4

[timing]
activation_ms = 50
timeout_ms = 3000
poll_interval_ms = 10

[light]
use_fade = false
"#;

fn write_config(dir: &TempDir, toml: &str) -> PathBuf {
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn with_kind(kind: &str) -> String {
    BASE.replace(r#"kind = "vl53l0x""#, &format!(r#"kind = "{kind}""#))
}

fn mirror(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("mirror").unwrap();
    cmd.arg("--config")
        .arg(cfg)
        .arg("--log-level")
        .arg("error")
        .env_remove("RUST_LOG")
        .env_remove("MIRROR_TEST_SIM_TIMEOUT")
        .env_remove("MIRROR_TEST_SIM_DISTANCE_CM");
    cmd
}

#[test]
fn help_prints_usage() {
    Command::cargo_bin("mirror")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn sensors_lists_both_kinds() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, BASE);
    mirror(&cfg)
        .arg("sensors")
        .assert()
        .success()
        .stdout(predicate::str::contains("ultrasonic").and(predicate::str::contains("vl53l0x")));
}

#[rstest]
#[case("vl53l0x")]
#[case("ultrasonic")]
fn measure_reports_simulated_distance(#[case] kind: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, &with_kind(kind));
    mirror(&cfg)
        .args(["measure", "--count", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0: 20.0 cm present=true"))
        .stdout(predicate::str::contains("1: 20.0 cm present=true"));
}

#[test]
fn measure_out_of_band_is_not_present() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, BASE);
    mirror(&cfg)
        .env("MIRROR_TEST_SIM_DISTANCE_CM", "55")
        .arg("measure")
        .assert()
        .success()
        .stdout(predicate::str::contains("55.0 cm present=false"));
}

#[rstest]
#[case("vl53l0x", "out_of_range")]
#[case("ultrasonic", "timeout")]
fn measure_failure_prints_sentinel(#[case] kind: &str, #[case] failure: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, &with_kind(kind));
    mirror(&cfg)
        .env("MIRROR_TEST_SIM_TIMEOUT", "1")
        .arg("measure")
        .assert()
        .success()
        .stdout(predicate::str::contains("-1.0 cm present=false"));

    let out = mirror(&cfg)
        .env("MIRROR_TEST_SIM_TIMEOUT", "1")
        .args(["--json", "measure"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["distance_cm"], -1.0);
    assert_eq!(v["valid"], false);
    assert_eq!(v["failure"], failure);
}

#[test]
fn unknown_sensor_kind_exits_3_and_lists_kinds() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, &with_kind("lidar"));
    mirror(&cfg)
        .arg("measure")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("'lidar'"))
        .stderr(predicate::str::contains("ultrasonic, vl53l0x"));
}

#[test]
fn unknown_sensor_kind_json_error() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, &with_kind("lidar"));
    let out = mirror(&cfg).args(["--json", "run"]).output().unwrap();
    assert_eq!(out.status.code(), Some(3));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["reason"], "UnknownSensorKind");
}

#[rstest]
#[case("max_distance_cm = 40.0", "max_distance_cm = 2.0", "max_distance_cm")]
#[case("poll_interval_ms = 10", "poll_interval_ms = 0", "poll_interval_ms")]
#[case("light = 4", "", "light")]
fn invalid_config_exits_4(#[case] from: &str, #[case] to: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, &BASE.replace(from, to));
    mirror(&cfg)
        .arg("measure")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Configuration problem"))
        .stderr(predicate::str::contains(needle));
}

#[test]
fn missing_config_file_exits_4() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    mirror(&missing)
        .arg("sensors")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("nope.toml"));
}

#[test]
fn run_activates_once_when_someone_stays() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, &with_kind("ultrasonic"));
    mirror(&cfg)
        .args(["run", "--iterations", "30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("polls=30"))
        .stdout(predicate::str::contains("activations=1 "))
        .stdout(predicate::str::contains("deactivations=0 "));
}

#[test]
fn run_with_empty_scene_never_activates() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, &with_kind("ultrasonic"));
    mirror(&cfg)
        .env("MIRROR_TEST_SIM_TIMEOUT", "1")
        .args(["run", "--iterations", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("activations=0 "))
        .stdout(predicate::str::contains("failed_readings=10 "));
}

#[test]
fn run_json_summary_is_parseable() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, BASE);
    let out = mirror(&cfg)
        .args(["--json", "run", "--iterations", "20"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["polls"], 20);
    assert_eq!(v["activations"], 1);
    assert_eq!(v["state"], "active");
    assert_eq!(v["light_on"], true);
}

#[test]
fn self_check_prints_ok() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, BASE);
    mirror(&cfg)
        .arg("self-check")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("OK: sensor=vl53l0x reading=20.0 cm"));
}
