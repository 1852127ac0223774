// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Finds, starts, and stops the `schmuxd` background process.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use crate::client::ClientError;
use crate::env;

pub const STARTUP_MARKER_PREFIX: &str = "--- schmuxd: starting (pid: ";

pub fn daemon_dir() -> Result<PathBuf, ClientError> {
    env::state_dir()
}

pub fn pid_path() -> Result<PathBuf, ClientError> {
    Ok(daemon_dir()?.join("schmuxd.pid"))
}

pub fn log_path() -> Result<PathBuf, ClientError> {
    Ok(daemon_dir()?.join("schmuxd.log"))
}

/// Locate the `schmuxd` binary: env override, then (debug builds only) a sibling
/// path derived from `CARGO_MANIFEST_DIR`, then a sibling of the running executable,
/// then a `PATH` lookup.
pub fn find_schmuxd_binary() -> Option<PathBuf> {
    if let Some(path) = env::daemon_binary() {
        return Some(PathBuf::from(path));
    }

    let current_exe = std::env::current_exe().ok();

    // Only trust CARGO_MANIFEST_DIR if the running CLI is itself a debug
    // build, identified by its own executable path. This avoids picking up
    // a dev binary when a release CLI inherits the env var from a dev shell.
    let is_debug_build =
        current_exe.as_deref().and_then(|p| p.to_str()).is_some_and(|s| s.contains("target/debug"));

    if is_debug_build {
        if let Some(manifest_dir) = env::cargo_manifest_dir() {
            let candidate = Path::new(&manifest_dir).join("../../target/debug/schmuxd");
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    if let Some(dir) = current_exe.as_deref().and_then(Path::parent) {
        let candidate = dir.join("schmuxd");
        if candidate.exists() {
            return Some(candidate);
        }
    }

    which_on_path("schmuxd")
}

fn which_on_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(name);
        candidate.is_file().then_some(candidate)
    })
}

pub fn start_daemon_background() -> Result<(), ClientError> {
    let binary = find_schmuxd_binary()
        .ok_or_else(|| ClientError::DaemonStartFailed("could not locate schmuxd binary".into()))?;
    std::process::Command::new(binary)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    Ok(())
}

pub fn read_daemon_pid() -> Result<Option<u32>, ClientError> {
    let path = pid_path()?;
    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(content.trim().parse::<u32>().ok()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn cleanup_stale_pid() -> Result<(), ClientError> {
    let path = pid_path()?;
    if path.exists() {
        std::fs::remove_file(&path)?;
    }
    Ok(())
}

fn kill_signal(signal: &str, pid: u32) -> bool {
    std::process::Command::new("kill")
        .args([signal, &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

pub fn process_exists(pid: u32) -> bool {
    kill_signal("-0", pid)
}

pub fn force_kill_daemon(pid: u32) -> bool {
    kill_signal("-9", pid)
}

pub fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    !process_exists(pid)
}

pub fn stop_daemon_sync(pid: u32, timeout: Duration) -> bool {
    kill_signal("-15", pid);
    if wait_for_exit(pid, timeout) {
        return true;
    }
    force_kill_daemon(pid);
    wait_for_exit(pid, Duration::from_secs(2))
}

/// Parse the daemon log for `ERROR` lines following the most recent startup marker.
pub fn parse_startup_error(log_content: &str) -> Option<String> {
    let last_marker = log_content.rfind(STARTUP_MARKER_PREFIX)?;
    let tail = &log_content[last_marker..];
    tail.lines()
        .filter(|line| line.contains("ERROR"))
        .next_back()
        .map(|line| line.to_string())
}

pub fn read_startup_error() -> Option<String> {
    let path = log_path().ok()?;
    let content = std::fs::read_to_string(path).ok()?;
    parse_startup_error(&content)
}

pub fn wrap_with_startup_error(base: ClientError) -> ClientError {
    match read_startup_error() {
        Some(detail) => ClientError::DaemonStartFailed(detail),
        None => base,
    }
}
