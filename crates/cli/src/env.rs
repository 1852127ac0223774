// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::client::ClientError;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

/// Resolve state directory: SCHMUX_STATE_DIR > XDG_STATE_HOME/schmux > ~/.local/state/schmux.
/// Duplicated from `schmux-daemon`'s own resolution rather than shared, since the CLI and
/// daemon communicate over HTTP, not a shared in-process type.
pub fn state_dir() -> Result<PathBuf, ClientError> {
    if let Ok(dir) = std::env::var("SCHMUX_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("schmux"));
    }
    let home = std::env::var("HOME").map_err(|_| ClientError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/schmux"))
}

pub fn daemon_binary() -> Option<String> {
    std::env::var("SCHMUX_DAEMON_BINARY").ok()
}

pub fn cargo_manifest_dir() -> Option<String> {
    std::env::var("CARGO_MANIFEST_DIR").ok()
}

pub fn timeout_connect_ms() -> Option<Duration> {
    parse_duration_ms("SCHMUX_TIMEOUT_CONNECT_MS")
}

pub fn timeout_exit_ms() -> Option<Duration> {
    parse_duration_ms("SCHMUX_TIMEOUT_EXIT_MS")
}

pub fn connect_poll_ms() -> Option<Duration> {
    parse_duration_ms("SCHMUX_CONNECT_POLL_MS")
}
