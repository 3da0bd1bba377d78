//! E2E integration tests for the `conductor` binary.
//!
//! Spawns the real binary against definitions files in a temp project
//! root. Command output goes to stdout; tracing and errors to stderr.

mod common;

use common::{conductor_cmd, write_file, HOME_DEFINITIONS};
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

// ─── check ─────────────────────────────────────────────────────────

#[test]
fn check_accepts_valid_definitions() {
    let (mut cmd, dir) = conductor_cmd();
    let file = write_file(&dir, "home.toml", HOME_DEFINITIONS);
    cmd.arg("check")
        .arg(&file)
        .assert()
        .success()
        .stdout(contains("ok (4 systems, 0 conflict pairs, 1 rules, 1 scenarios)"))
        .stdout(contains("warning").not());
}

#[test]
fn check_rejects_invalid_category() {
    let (mut cmd, dir) = conductor_cmd();
    let file = write_file(
        &dir,
        "bad.toml",
        "[[systems]]\nname = \"toaster\"\ncategory = \"kitchen\"\n",
    );
    cmd.arg("check")
        .arg(&file)
        .assert()
        .failure()
        .stderr(contains("invalid category 'kitchen'"));
}

#[test]
fn check_rejects_unknown_scenario_reference() {
    let (mut cmd, dir) = conductor_cmd();
    let file = write_file(
        &dir,
        "bad.toml",
        r#"
[[rules]]
id = "bedtime"
condition = { kind = "always" }
action = { kind = "trigger_scenario", scenario = "missing" }
"#,
    );
    cmd.arg("check")
        .arg(&file)
        .assert()
        .failure()
        .stderr(contains("unknown scenario 'missing'"));
}

#[test]
fn check_warns_about_cycles() {
    let (mut cmd, dir) = conductor_cmd();
    let file = write_file(
        &dir,
        "cycle.toml",
        r#"
[[systems]]
name = "a"
category = "household"
dependencies = ["b"]

[[systems]]
name = "b"
category = "household"
dependencies = ["a"]
"#,
    );
    cmd.arg("check")
        .arg(&file)
        .assert()
        .success()
        .stdout(contains("ok (2 systems"))
        .stdout(contains("warning: dependency cycle"));
}

#[test]
fn missing_file_fails() {
    let (mut cmd, dir) = conductor_cmd();
    cmd.arg("check")
        .arg(dir.path().join("nope.toml"))
        .assert()
        .failure()
        .stderr(contains("failed to read definitions file"));
}

// ─── startup-order ─────────────────────────────────────────────────

#[test]
fn startup_order_lists_dependencies_first() {
    let (mut cmd, dir) = conductor_cmd();
    let file = write_file(&dir, "home.toml", HOME_DEFINITIONS);
    let output = cmd
        .arg("startup-order")
        .arg(&file)
        .output()
        .expect("run startup-order");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let names: Vec<&str> = stdout
        .lines()
        .filter_map(|line| line.split_once(". ").map(|(_, name)| name.trim()))
        .collect();
    assert_eq!(names.len(), 4);
    let pos = |name: &str| names.iter().position(|n| *n == name).expect("listed");
    assert_eq!(pos("power"), 0);
    assert!(pos("network") < pos("security"));
    assert!(pos("power") < pos("hvac"));
}

// ─── config ────────────────────────────────────────────────────────

#[test]
fn config_reflects_cli_overrides() {
    let (mut cmd, _dir) = conductor_cmd();
    cmd.args(["--max-depth", "42", "config"])
        .assert()
        .success()
        .stdout(contains("max_depth = 42"))
        .stdout(contains("confidence_threshold = 0.6"));
}

#[test]
fn config_reads_project_file() {
    let (mut cmd, dir) = conductor_cmd();
    std::fs::create_dir_all(dir.path().join(".conductor")).expect("create project config dir");
    write_file(&dir, ".conductor/config.toml", "[queue]\nmax_attempts = 7\n");
    cmd.arg("config")
        .assert()
        .success()
        .stdout(contains("max_attempts = 7"));
}

#[test]
fn invalid_threshold_override_fails() {
    let (mut cmd, _dir) = conductor_cmd();
    cmd.args(["--confidence-threshold", "0.2", "config"])
        .assert()
        .failure()
        .stderr(contains("Config error"));
}

// ─── run ───────────────────────────────────────────────────────────

#[test]
fn run_starts_and_stops_after_duration() {
    let (mut cmd, dir) = conductor_cmd();
    let file = write_file(&dir, "home.toml", HOME_DEFINITIONS);
    cmd.arg("-v")
        .arg("run")
        .arg("-f")
        .arg(&file)
        .args(["--duration", "1"])
        .assert()
        .success()
        .stdout(contains("conductor v"))
        .stdout(contains("4 systems, 1 rules, 1 scenarios"))
        .stdout(contains("stopped:"))
        .stderr(contains("orchestration started"));
}

#[test]
fn run_without_definitions() {
    let (mut cmd, _dir) = conductor_cmd();
    cmd.args(["run", "--duration", "1"])
        .assert()
        .success()
        .stdout(contains("0 systems, 0 rules, 0 scenarios"));
}

#[test]
fn log_file_receives_debug_output() {
    let (mut cmd, dir) = conductor_cmd();
    let file = write_file(&dir, "home.toml", HOME_DEFINITIONS);
    let log = dir.path().join("conductor.log");
    cmd.arg("--log-file")
        .arg(&log)
        .arg("check")
        .arg(&file)
        .assert()
        .success();
    let contents = std::fs::read_to_string(&log).expect("log file written");
    assert!(contents.contains("system registered"));
}
