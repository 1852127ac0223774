// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Preview: an on-demand loopback reverse proxy to a forwarded workspace port.

use crate::workspace::WorkspaceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    pub struct PreviewId;
}

/// Health of the upstream as last observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreviewStatus {
    Ready,
    Degraded { last_error: String },
}

impl fmt::Display for PreviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviewStatus::Ready => write!(f, "ready"),
            PreviewStatus::Degraded { last_error } => write!(f, "degraded: {last_error}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preview {
    pub id: PreviewId,
    pub workspace_id: WorkspaceId,
    pub upstream_host: String,
    pub upstream_port: u16,
    /// Ephemeral: the loopback port schmux listens on. Zeroed on reload
    /// until the listener is re-bound.
    #[serde(skip)]
    pub assigned_port: Option<u16>,
    #[serde(skip, default = "default_status")]
    pub status: PreviewStatus,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub last_healthy_at: Option<DateTime<Utc>>,
}

fn default_status() -> PreviewStatus {
    PreviewStatus::Degraded {
        last_error: "not yet probed".into(),
    }
}

/// Loopback hostnames a preview upstream is permitted to target.
pub const ALLOWED_UPSTREAM_HOSTS: &[&str] = &["127.0.0.1", "::1", "localhost"];

pub fn is_loopback_host(host: &str) -> bool {
    ALLOWED_UPSTREAM_HOSTS.contains(&host)
}

impl Preview {
    pub fn new(workspace_id: WorkspaceId, upstream_host: impl Into<String>, upstream_port: u16, now: DateTime<Utc>) -> Self {
        Self {
            id: PreviewId::new(),
            workspace_id,
            upstream_host: upstream_host.into(),
            upstream_port,
            assigned_port: None,
            status: default_status(),
            created_at: now,
            last_used_at: now,
            last_healthy_at: None,
        }
    }

    pub fn matches(&self, workspace_id: &WorkspaceId, host: &str, port: u16) -> bool {
        &self.workspace_id == workspace_id && self.upstream_host == host && self.upstream_port == port
    }

    pub fn is_idle(&self, now: DateTime<Utc>, idle_timeout: chrono::Duration) -> bool {
        now - self.last_used_at >= idle_timeout
    }

    pub fn is_stale(&self, now: DateTime<Utc>, stale_grace: chrono::Duration) -> bool {
        match self.last_healthy_at {
            Some(t) => now - t >= stale_grace,
            None => now - self.created_at >= stale_grace,
        }
    }
}

#[cfg(test)]
#[path = "preview_tests.rs"]
mod tests;
