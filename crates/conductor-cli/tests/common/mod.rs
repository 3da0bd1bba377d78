//! Shared E2E test helpers for `conductor` binary tests.

use assert_cmd::cargo::cargo_bin_cmd;
use std::path::PathBuf;
use std::time::Duration;

/// Default timeout for CLI tests.
pub const TIMEOUT: Duration = Duration::from_secs(20);

/// Environment overrides that would leak into the resolved config.
const CONFIG_VARS: &[&str] = &[
    "CONDUCTOR_CONFIDENCE_THRESHOLD",
    "CONDUCTOR_QUEUE_MAX_DEPTH",
    "CONDUCTOR_DISPATCH_TIMEOUT_MS",
    "CONDUCTOR_HEARTBEAT_TIMEOUT_MS",
    "RUST_LOG",
];

pub const HOME_DEFINITIONS: &str = r#"
[[systems]]
name = "power"
category = "infrastructure"
priority = 10

[[systems]]
name = "hvac"
category = "climate"
priority = 9
dependencies = ["power"]

[[systems]]
name = "security"
category = "security"
priority = 8
dependencies = ["network"]

[[systems]]
name = "network"
category = "infrastructure"
dependencies = ["power"]

[[rules]]
id = "always-heat"
priority = 9
condition = { kind = "always" }
action = { kind = "dispatch", target = "hvac", action_type = "activate-heating" }

[[scenarios]]
name = "good-night"
actions = [{ target = "hvac", action_type = "eco-mode" }]
"#;

/// Build a Command for the `conductor` binary isolated in a fresh
/// project root. Returns (command, _guard); keep the guard alive for
/// the test's duration.
pub fn conductor_cmd() -> (assert_cmd::Command, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("create temp project root");
    let mut cmd: assert_cmd::Command = cargo_bin_cmd!("conductor");
    cmd.timeout(TIMEOUT);
    for var in CONFIG_VARS {
        cmd.env_remove(var);
    }
    cmd.args([
        "--no-global-config",
        "-C",
        tmp.path().to_str().expect("valid utf8"),
    ]);
    (cmd, tmp)
}

/// Writes `contents` to `name` inside the project root.
pub fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("write test file");
    path
}
