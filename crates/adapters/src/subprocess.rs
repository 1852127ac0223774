// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers. Every adapter operation carries a
//! caller-supplied deadline (§4.1): a deadline expiry surfaces as a
//! timeout error, never a hang.

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Default timeout for TMX commands (create/kill/capture/send-keys/list).
pub const TMX_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for git/worktree operations.
pub const WORKTREE_TIMEOUT: Duration = Duration::from_secs(60);

/// Default timeout for a loopback TCP dial when probing preview health.
pub const PREVIEW_DIAL_TIMEOUT: Duration = Duration::from_secs(2);

/// Run a subprocess command with a timeout. The child is killed on drop if
/// the timeout elapses (tokio's `Child` drop behavior), so no orphaned
/// process outlives a timed-out call.
pub async fn run_with_timeout(mut cmd: Command, timeout: Duration, description: &str) -> Result<Output, String> {
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(io_err)) => Err(format!("{description} failed: {io_err}")),
        Err(_elapsed) => Err(format!("{description} timed out after {}s", timeout.as_secs())),
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
