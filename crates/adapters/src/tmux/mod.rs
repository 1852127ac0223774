// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TMX adapter (§4.1): a stateless façade over the multiplexer binary.
//! Every operation runs under a caller-supplied deadline; expiry surfaces
//! as [`TmxError::Timeout`], never a hang.

mod real;

pub use real::TmxCli;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeTmx, TmxCall};

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TmxError {
    #[error("target not found: {0}")]
    NotFound(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

/// A stateless façade over the terminal multiplexer CLI.
#[async_trait]
pub trait TmxAdapter: Clone + Send + Sync + 'static {
    /// Create a detached session named `name` running `cmd` in `cwd`.
    async fn create(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        env: &[(String, String)],
        deadline: Duration,
    ) -> Result<(), TmxError>;

    async fn exists(&self, target: &str, deadline: Duration) -> Result<bool, TmxError>;

    /// Best-effort: killing an already-dead target is not an error (§7 idempotent dispose).
    async fn kill(&self, target: &str, deadline: Duration) -> Result<(), TmxError>;

    async fn list(&self, deadline: Duration) -> Result<Vec<String>, TmxError>;

    /// Capture the pane from scrollback start through the visible region.
    async fn capture_pane(&self, target: &str, deadline: Duration) -> Result<String, TmxError>;

    /// Send keys, shell-escaped as literal text (no key-name interpretation).
    async fn send_keys(&self, target: &str, text: &str, deadline: Duration) -> Result<(), TmxError>;

    /// Send the symbolic `Enter` key.
    async fn send_enter(&self, target: &str, deadline: Duration) -> Result<(), TmxError>;

    async fn get_pane_pid(&self, target: &str, deadline: Duration) -> Result<u32, TmxError>;
}

/// Extract the session name from a stored attach command, honoring both
/// quoted and unquoted forms, e.g. `tmux attach -t 'my session'` or
/// `tmux attach-session -t my-session`.
pub fn parse_attach_command(attach_cmd: &str) -> Option<String> {
    let mut tokens = attach_cmd.split_whitespace();
    while let Some(tok) = tokens.next() {
        if tok == "-t" {
            let rest = attach_cmd.splitn(2, "-t ").nth(1)?.trim_start();
            return Some(parse_next_arg(rest));
        }
    }
    None
}

fn parse_next_arg(rest: &str) -> String {
    if let Some(stripped) = rest.strip_prefix('\'') {
        stripped.split('\'').next().unwrap_or(stripped).to_string()
    } else if let Some(stripped) = rest.strip_prefix('"') {
        stripped.split('"').next().unwrap_or(stripped).to_string()
    } else {
        rest.split_whitespace().next().unwrap_or("").to_string()
    }
}

#[cfg(test)]
mod parse_attach_tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        unquoted = { "tmux attach -t my-session", Some("my-session") },
        single_quoted = { "tmux attach -t 'my session'", Some("my session") },
        double_quoted = { "tmux attach -t \"my session\"", Some("my session") },
        session_attach_verb = { "tmux attach-session -t work", Some("work") },
        no_target = { "tmux attach", None },
    )]
    fn extracts_session_name(input: &str, expected: Option<&str>) {
        assert_eq!(parse_attach_command(input), expected.map(|s| s.to_string()));
    }
}
