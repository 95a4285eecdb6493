use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_config(dir: &tempfile::TempDir, toml: &str) -> PathBuf {
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn json_line(out: &[u8], key: &str) -> serde_json::Value {
    let text = String::from_utf8_lossy(out);
    let line = text
        .lines()
        .find(|l| l.contains(&format!("\"{key}\"")))
        .unwrap_or_else(|| panic!("no JSON line with {key}; output was: {text}"));
    serde_json::from_str(line).expect("valid JSON")
}

#[rstest]
#[case(20, 100, 150, 150)]
#[case(20, 300, 75, 225)]
#[case(10, 20, 500, 100)]
fn timing_json_schema(
    #[case] rate: u32,
    #[case] ie: u32,
    #[case] inhale: u64,
    #[case] exhale: u64,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[timing]\ntick_period_us = 10000\n");

    let mut cmd = Command::cargo_bin("vent_cli").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("timing")
        .arg("--rate")
        .arg(rate.to_string())
        .arg("--ie")
        .arg(ie.to_string());

    let out = cmd.assert().success().get_output().stdout.clone();
    let v = json_line(&out, "ticks_per_inhale");
    assert_eq!(v["rate"].as_u64(), Some(u64::from(rate)));
    assert_eq!(v["ie_ratio_x100"].as_u64(), Some(u64::from(ie)));
    assert_eq!(v["tick_period_us"].as_u64(), Some(10_000));
    assert_eq!(v["ticks_per_inhale"].as_u64(), Some(inhale));
    assert_eq!(v["ticks_per_exhale"].as_u64(), Some(exhale));
    assert_eq!(v["inhale_ms"].as_u64(), Some(inhale * 10));
    assert_eq!(v["exhale_ms"].as_u64(), Some(exhale * 10));
}

#[test]
fn config_error_json_has_reason_and_message() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[editor]\npoll_interval_ms = 0\n");

    let mut cmd = Command::cargo_bin("vent_cli").unwrap();
    cmd.arg("--json").arg("--config").arg(&cfg).arg("self-check");

    let out = cmd.assert().code(2).get_output().stderr.clone();
    let v = json_line(&out, "reason");
    assert_eq!(v["reason"], "Config");
    let msg = v["message"].as_str().unwrap();
    assert!(msg.contains("editor.poll_interval_ms"), "message was: {msg}");
}

#[test]
fn run_summary_json_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    let mut cmd = Command::cargo_bin("vent_cli").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("run")
        .arg("--duration-ms")
        .arg("300");

    let out = cmd.assert().success().get_output().stdout.clone();
    let v = json_line(&out, "breaths");
    assert!(v["breaths"].as_u64().unwrap() >= 1);
    for key in [
        "triggered_breaths",
        "commits",
        "pickups",
        "missed_deadlines",
        "ticks",
        "elapsed_ms",
    ] {
        assert!(v[key].as_u64().is_some(), "missing {key}: {v}");
    }
    assert_eq!(v["mode"], "IPPV");
    assert_eq!(v["respiratory_rate"].as_u64(), Some(20));
    assert_eq!(v["commits"].as_u64(), Some(0));
}

/// A scripted operator edits the rate through the knob; the controller
/// picks the commit up at the next inhale start.
#[test]
fn scripted_edit_is_committed_and_picked_up() {
    let dir = tempdir().unwrap();
    let cfg = write_config(
        &dir,
        r#"
[parameters.respiratory_rate]
min = 10
max = 30
default = 30
step = 1

[editor]
entry_hold_ms = 200
poll_interval_ms = 2
"#,
    );

    let mut cmd = Command::cargo_bin("vent_cli").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("run")
        .arg("--duration-ms")
        .arg("4500")
        .arg("--sim-set-rate")
        .arg("24");

    let out = cmd.assert().success().get_output().stdout.clone();
    let v = json_line(&out, "breaths");
    assert_eq!(v["respiratory_rate"].as_u64(), Some(24), "summary: {v}");
    assert_eq!(v["commits"].as_u64(), Some(1), "summary: {v}");
    assert_eq!(v["pickups"].as_u64(), Some(1), "summary: {v}");
}
