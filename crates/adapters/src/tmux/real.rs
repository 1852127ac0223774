// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concrete TMX adapter shelling out to the `tmux` binary.

use super::{TmxAdapter, TmxError};
use crate::subprocess::{run_with_timeout, TMX_TIMEOUT};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

/// Shells out to `tmux`. `binary` defaults to `"tmux"` but can be overridden
/// in tests or when the binary lives outside `$PATH`.
#[derive(Debug, Clone)]
pub struct TmxCli {
    binary: String,
}

impl Default for TmxCli {
    fn default() -> Self {
        Self { binary: "tmux".to_string() }
    }
}

impl TmxCli {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.kill_on_drop(true);
        cmd
    }

    async fn run(&self, cmd: Command, deadline: Duration, description: &str) -> Result<std::process::Output, TmxError> {
        run_with_timeout(cmd, deadline, description).await.map_err(|msg| {
            if msg.contains("timed out") {
                TmxError::Timeout(deadline)
            } else {
                TmxError::CommandFailed(msg)
            }
        })
    }
}

#[async_trait]
impl TmxAdapter for TmxCli {
    async fn create(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        env: &[(String, String)],
        deadline: Duration,
    ) -> Result<(), TmxError> {
        let mut tmux = self.command();
        tmux.args(["new-session", "-d", "-s", name, "-c"]);
        tmux.arg(cwd);
        for (key, value) in env {
            tmux.arg("-e").arg(format!("{key}={value}"));
        }
        tmux.arg(cmd);
        let output = self.run(tmux, deadline, &format!("tmux new-session {name}")).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(TmxError::SpawnFailed(String::from_utf8_lossy(&output.stderr).trim().to_string()))
        }
    }

    async fn exists(&self, target: &str, deadline: Duration) -> Result<bool, TmxError> {
        let mut tmux = self.command();
        tmux.args(["has-session", "-t", target]);
        let output = self.run(tmux, deadline, &format!("tmux has-session {target}")).await?;
        Ok(output.status.success())
    }

    async fn kill(&self, target: &str, deadline: Duration) -> Result<(), TmxError> {
        let mut tmux = self.command();
        tmux.args(["kill-session", "-t", target]);
        let output = self.run(tmux, deadline, &format!("tmux kill-session {target}")).await?;
        if output.status.success() || String::from_utf8_lossy(&output.stderr).contains("can't find session") {
            Ok(())
        } else {
            Err(TmxError::CommandFailed(String::from_utf8_lossy(&output.stderr).trim().to_string()))
        }
    }

    async fn list(&self, deadline: Duration) -> Result<Vec<String>, TmxError> {
        let mut tmux = self.command();
        tmux.args(["list-sessions", "-F", "#{session_name}"]);
        let output = self.run(tmux, deadline, "tmux list-sessions").await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("no server running") || stderr.contains("no current session") {
                return Ok(Vec::new());
            }
            return Err(TmxError::CommandFailed(stderr.trim().to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|line| line.to_string())
            .collect())
    }

    async fn capture_pane(&self, target: &str, deadline: Duration) -> Result<String, TmxError> {
        let mut tmux = self.command();
        tmux.args(["capture-pane", "-p", "-S", "-", "-t", target]);
        let output = self.run(tmux, deadline, &format!("tmux capture-pane {target}")).await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(TmxError::NotFound(target.to_string()))
        }
    }

    async fn send_keys(&self, target: &str, text: &str, deadline: Duration) -> Result<(), TmxError> {
        let mut tmux = self.command();
        tmux.args(["send-keys", "-t", target, "-l", "--", text]);
        let output = self.run(tmux, deadline, &format!("tmux send-keys {target}")).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(TmxError::CommandFailed(String::from_utf8_lossy(&output.stderr).trim().to_string()))
        }
    }

    async fn send_enter(&self, target: &str, deadline: Duration) -> Result<(), TmxError> {
        let mut tmux = self.command();
        tmux.args(["send-keys", "-t", target, "Enter"]);
        let output = self.run(tmux, deadline, &format!("tmux send-keys Enter {target}")).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(TmxError::CommandFailed(String::from_utf8_lossy(&output.stderr).trim().to_string()))
        }
    }

    async fn get_pane_pid(&self, target: &str, deadline: Duration) -> Result<u32, TmxError> {
        let mut tmux = self.command();
        tmux.args(["list-panes", "-t", target, "-F", "#{pane_pid}"]);
        let output = self.run(tmux, deadline, &format!("tmux list-panes {target}")).await?;
        if !output.status.success() {
            return Err(TmxError::NotFound(target.to_string()));
        }
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .and_then(|line| line.trim().parse::<u32>().ok())
            .ok_or_else(|| TmxError::CommandFailed(format!("no pane pid for {target}")))
    }
}

impl TmxCli {
    pub fn default_timeout() -> Duration {
        TMX_TIMEOUT
    }
}

#[cfg(test)]
#[path = "real_tests.rs"]
mod tests;
