//! Daemon start/stop/status round trips (§7 user-visible failure behavior,
//! idempotency of drop/dispose applied to the daemon lifecycle itself).

use crate::prelude::*;

#[test]
fn status_reports_not_running_before_start() {
    let project = Project::new();
    project.schmux().args(&["status"]).passes().stdout_has("not running");
}

#[test]
fn start_is_idempotent() {
    let project = Project::new();
    project.schmux().args(&["start"]).passes().stdout_has("started");
    project.schmux().args(&["start"]).passes().stdout_has("already running");
    project.schmux().args(&["status"]).passes().stdout_has("running");
}

#[test]
fn stop_without_a_running_daemon_is_a_no_op() {
    let project = Project::new();
    project.schmux().args(&["stop"]).passes().stdout_has("not running");
}

#[test]
fn stop_after_start_leaves_no_pid_file() {
    let project = Project::new();
    project.schmux().args(&["start"]).passes();
    project.schmux().args(&["stop"]).passes().stdout_has("stopped");
    assert!(!project.state_path().join("schmuxd.pid").exists());
    project.schmux().args(&["status"]).passes().stdout_has("not running");
}
