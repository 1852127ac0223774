// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration (§1a ambient). Resolves the state directory from
//! the environment, then loads everything else from `config.toml` under
//! it, following the teacher's `Config::load()` idiom in
//! `daemon::lifecycle`.

use schmux_core::{AgentDescriptor, Flavor};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine state directory: set SCHMUX_STATE_DIR or HOME")]
    NoStateDir,
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A configured repository: the name operators refer to it by (`repo` in
/// spawn requests) mapped to its clone URL or local path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoEntry {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub state_dir: PathBuf,
    #[serde(skip)]
    pub lock_path: PathBuf,
    #[serde(skip)]
    pub version_path: PathBuf,
    #[serde(skip)]
    pub log_path: PathBuf,
    #[serde(skip)]
    pub state_path: PathBuf,
    #[serde(skip)]
    pub data_path: PathBuf,
    #[serde(skip)]
    pub nudge_path: PathBuf,

    pub bind_addr: SocketAddr,
    pub tmx_binary: String,
    pub repos: Vec<RepoEntry>,
    pub agents: Vec<AgentDescriptor>,
    pub flavors: Vec<Flavor>,

    pub nudge_poll_interval_ms: u64,
    pub nudge_debounce_ms: u64,
    pub terminal_tick_ms: u64,
    pub broadcaster_debounce_ms: u64,

    pub preview_per_workspace_cap: usize,
    pub preview_global_cap: usize,
    pub preview_idle_timeout_secs: i64,
    pub preview_stale_grace_secs: i64,

    pub remote_expiry_default_secs: i64,
}

impl Config {
    /// Resolve the state directory, then load `config.toml` from it if
    /// present (falling back to defaults), and fill in every derived path.
    pub fn load() -> Result<Self, ConfigError> {
        let state_dir = state_dir()?;
        let config_path = state_dir.join("config.toml");

        let mut config = if config_path.exists() {
            let text = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read { path: config_path.clone(), source })?;
            toml::from_str(&text).map_err(|source| ConfigError::Parse { path: config_path.clone(), source })?
        } else {
            Config::defaults()
        };

        config.state_dir = state_dir.clone();
        config.lock_path = state_dir.join("schmuxd.pid");
        config.version_path = state_dir.join("schmuxd.version");
        config.log_path = state_dir.join("schmuxd.log");
        config.state_path = state_dir.join("state.json");
        config.data_path = state_dir.join("data");
        config.nudge_path = state_dir.join("nudges");
        Ok(config)
    }

    fn defaults() -> Self {
        Self {
            state_dir: PathBuf::new(),
            lock_path: PathBuf::new(),
            version_path: PathBuf::new(),
            log_path: PathBuf::new(),
            state_path: PathBuf::new(),
            data_path: PathBuf::new(),
            nudge_path: PathBuf::new(),
            bind_addr: default_bind_addr(),
            tmx_binary: "tmux".to_string(),
            repos: Vec::new(),
            agents: Vec::new(),
            flavors: Vec::new(),
            nudge_poll_interval_ms: 500,
            nudge_debounce_ms: 100,
            terminal_tick_ms: 100,
            broadcaster_debounce_ms: 500,
            preview_per_workspace_cap: 4,
            preview_global_cap: 32,
            preview_idle_timeout_secs: 1800,
            preview_stale_grace_secs: 30,
            remote_expiry_default_secs: 3600,
        }
    }

    pub fn repo_url(&self, name: &str) -> Option<&str> {
        self.repos.iter().find(|r| r.name == name).map(|r| r.url.as_str())
    }

    pub fn agent(&self, name: &str) -> Option<&AgentDescriptor> {
        self.agents.iter().find(|a| a.name == name)
    }
}

fn default_bind_addr() -> SocketAddr {
    "127.0.0.1:7337".parse().unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 7337)))
}

/// `SCHMUX_STATE_DIR` > `$XDG_STATE_HOME/schmux` > `~/.local/state/schmux`.
fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("SCHMUX_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("schmux"));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/schmux"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
