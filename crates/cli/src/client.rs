// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::daemon_process::{
    cleanup_stale_pid, daemon_dir, read_daemon_pid, read_startup_error, start_daemon_background,
    stop_daemon_sync, wrap_with_startup_error,
};
use crate::env;

pub fn timeout_connect() -> Duration {
    env::timeout_connect_ms().unwrap_or(Duration::from_secs(5))
}

pub fn timeout_exit() -> Duration {
    env::timeout_exit_ms().unwrap_or(Duration::from_secs(2))
}

pub fn poll_interval() -> Duration {
    env::connect_poll_ms().unwrap_or(Duration::from_millis(50))
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not running")]
    DaemonNotRunning,

    #[error("failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("timed out waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("{kind}: {message}")]
    Rejected { kind: String, message: String },

    #[error("unexpected response from daemon")]
    UnexpectedResponse,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not determine state directory")]
    NoStateDir,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    kind: String,
}

/// Mirrors the subset of `schmux_daemon::Config` the CLI needs to reach the
/// daemon's HTTP surface, read directly from `config.toml` rather than
/// shared as a dependency.
#[derive(Debug, Deserialize)]
struct BindAddrOnly {
    bind_addr: SocketAddr,
}

fn default_bind_addr() -> SocketAddr {
    "127.0.0.1:7337".parse().unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 7337)))
}

fn resolve_bind_addr() -> Result<SocketAddr, ClientError> {
    let config_path = daemon_dir()?.join("config.toml");
    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str::<BindAddrOnly>(&content) {
            Ok(parsed) => Ok(parsed.bind_addr),
            Err(_) => Ok(default_bind_addr()),
        },
        Err(_) => Ok(default_bind_addr()),
    }
}

pub struct DaemonClient {
    base_url: String,
    http: reqwest::Client,
}

impl DaemonClient {
    /// For action commands: auto-start with version check, max one restart per process.
    pub async fn for_action() -> Result<Self, ClientError> {
        Self::connect_or_start_once().await
    }

    /// For query commands: connect only, never restart. If the daemon is the
    /// wrong version or absent, there's nothing useful to query anyway.
    pub async fn for_query() -> Result<Self, ClientError> {
        Self::connect().await
    }

    async fn connect_or_start_once() -> Result<Self, ClientError> {
        static RESTARTED: AtomicBool = AtomicBool::new(false);

        if RESTARTED.load(Ordering::SeqCst) {
            return Self::connect_or_start().await;
        }

        if Self::version_mismatch()? {
            RESTARTED.store(true, Ordering::SeqCst);
            Self::restart_for_version_mismatch()?;
        }

        Self::connect_or_start().await
    }

    fn version_mismatch() -> Result<bool, ClientError> {
        let version_path = daemon_dir()?.join("schmuxd.version");
        match std::fs::read_to_string(&version_path) {
            Ok(daemon_version) => Ok(daemon_version.trim() != env!("CARGO_PKG_VERSION")),
            Err(_) => Ok(false),
        }
    }

    fn restart_for_version_mismatch() -> Result<(), ClientError> {
        eprintln!(
            "warn: daemon version does not match cli version {}, restarting daemon",
            env!("CARGO_PKG_VERSION")
        );
        if let Some(pid) = read_daemon_pid()? {
            stop_daemon_sync(pid, timeout_exit());
            cleanup_stale_pid()?;
        }
        Ok(())
    }

    /// Connect to daemon, auto-starting it if not running.
    pub async fn connect_or_start() -> Result<Self, ClientError> {
        match Self::connect().await {
            Ok(client) if client.probe_healthy().await => Ok(client),
            Ok(_) => {
                // Pid file present but daemon unresponsive: clean up and restart.
                cleanup_stale_pid()?;
                start_daemon_background()?;
                Self::connect_with_retry(timeout_connect()).await
            }
            Err(ClientError::DaemonNotRunning) => {
                start_daemon_background()?;
                Self::connect_with_retry(timeout_connect()).await
            }
            Err(e) => Err(wrap_with_startup_error(e)),
        }
    }

    /// Connect to an existing daemon, no auto-start.
    pub async fn connect() -> Result<Self, ClientError> {
        if read_daemon_pid()?.is_none() {
            return Err(ClientError::DaemonNotRunning);
        }
        let base_url = format!("http://{}", resolve_bind_addr()?);
        Ok(Self { base_url, http: reqwest::Client::new() })
    }

    async fn probe_healthy(&self) -> bool {
        self.http
            .get(format!("{}/api/healthz", self.base_url))
            .timeout(Duration::from_millis(300))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn connect_with_retry(timeout: Duration) -> Result<Self, ClientError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            match Self::connect().await {
                Ok(client) if client.probe_healthy().await => return Ok(client),
                Ok(_) => tokio::time::sleep(poll_interval()).await,
                Err(ClientError::DaemonNotRunning) => tokio::time::sleep(poll_interval()).await,
                Err(e) => return Err(wrap_with_startup_error(e)),
            }
        }
        if let Some(detail) = read_startup_error() {
            return Err(ClientError::DaemonStartFailed(detail));
        }
        Err(ClientError::DaemonStartTimeout)
    }

    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        if response.status().is_success() {
            return Ok(response);
        }
        match response.json::<ErrorBody>().await {
            Ok(body) => Err(ClientError::Rejected { kind: body.kind, message: body.error }),
            Err(_) => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn healthz(&self) -> Result<HealthView, ClientError> {
        let response = self.http.get(format!("{}/api/healthz", self.base_url)).send().await?;
        let response = Self::check_response(response).await?;
        Ok(response.json().await?)
    }

    pub async fn list_sessions(&self) -> Result<Vec<WorkspaceView>, ClientError> {
        let response = self.http.get(format!("{}/api/sessions", self.base_url)).send().await?;
        let response = Self::check_response(response).await?;
        let body: SessionsBody = response.json().await?;
        Ok(body.workspaces)
    }

    pub async fn list_workspaces(&self) -> Result<Vec<WorkspaceView>, ClientError> {
        let response = self.http.get(format!("{}/api/workspaces", self.base_url)).send().await?;
        let response = Self::check_response(response).await?;
        let body: SessionsBody = response.json().await?;
        Ok(body.workspaces)
    }

    pub async fn spawn(&self, body: &SpawnRequest) -> Result<Vec<SpawnResult>, ClientError> {
        let response =
            self.http.post(format!("{}/api/spawn", self.base_url)).json(body).send().await?;
        let response = Self::check_response(response).await?;
        Ok(response.json().await?)
    }

    pub async fn dispose(&self, session_id: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .post(format!("{}/api/dispose/{}", self.base_url, session_id))
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }

    pub async fn refresh_overlay(&self, workspace_id: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .post(format!("{}/api/workspaces/{}/refresh-overlay", self.base_url, workspace_id))
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct SpawnRequest {
    pub repo: Option<String>,
    pub workspace_id: Option<String>,
    pub branch: String,
    pub prompt: Option<String>,
    pub nickname: Option<String>,
    pub targets: std::collections::HashMap<String, u32>,
}

#[derive(Debug, Deserialize)]
pub struct SpawnResult {
    pub session_id: String,
    pub workspace_id: String,
}

#[derive(Debug, Deserialize)]
struct SessionsBody {
    workspaces: Vec<WorkspaceView>,
}

#[derive(Debug, Deserialize)]
pub struct HealthView {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Mirrors `schmux_engine::broadcaster::SessionSnapshot`'s JSON shape,
/// redeclared locally since the HTTP boundary is the CLI's only contract
/// with the daemon and that type is not a published dependency of the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionTargetView {
    Local { tmux_session: String },
    Remote { host: String, window_id: String, pane_id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub id: String,
    pub target: SessionTargetView,
    pub nickname: Option<String>,
    pub running: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_output_at: Option<chrono::DateTime<chrono::Utc>>,
    pub nudge_state: String,
    pub nudge_summary: Option<String>,
    pub nudge_seq: u64,
}

/// Mirrors `schmux_engine::broadcaster::WorkspaceSnapshot`'s JSON shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceView {
    pub id: String,
    pub repo: String,
    pub branch: String,
    pub short_repo: String,
    pub path: String,
    pub session_count: usize,
    pub sessions: Vec<SessionView>,
    pub git_ahead: u32,
    pub git_behind: u32,
    pub git_dirty: bool,
    pub git_lines_added: u32,
    pub git_lines_removed: u32,
    pub git_files_changed: u32,
}
