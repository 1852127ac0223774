// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace identifier, location, and derived git status.
//!
//! A workspace is an isolated checkout (git worktree) for one branch. It
//! outlives the sessions that run inside it; at most one session may hold
//! the exclusive-prep lock while the workspace is being materialized, but
//! many sessions may coexist once prep completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a workspace instance.
    pub struct WorkspaceId;
}

/// Where a workspace's files physically live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkspaceLocation {
    /// A git worktree on the daemon's own filesystem.
    Local { path: PathBuf },
    /// A directory on a connected remote host, resolved via its flavor.
    Remote {
        host: crate::remote_host::RemoteHostId,
        path: PathBuf,
    },
}

impl WorkspaceLocation {
    pub fn is_local(&self) -> bool {
        matches!(self, WorkspaceLocation::Local { .. })
    }

    pub fn path(&self) -> &PathBuf {
        match self {
            WorkspaceLocation::Local { path } | WorkspaceLocation::Remote { path, .. } => path,
        }
    }
}

/// Lifecycle status of workspace materialization (bare-clone + worktree prep).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkspaceStatus {
    #[default]
    Preparing,
    Ready,
    Failed {
        reason: String,
    },
}

impl fmt::Display for WorkspaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkspaceStatus::Preparing => write!(f, "preparing"),
            WorkspaceStatus::Ready => write!(f, "ready"),
            WorkspaceStatus::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Derived git status for a workspace, recomputed by the git-status poll loop.
/// Ephemeral: not part of the durable persisted subset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitStatus {
    pub ahead: u32,
    pub behind: u32,
    pub dirty: bool,
    pub lines_added: u32,
    pub lines_removed: u32,
    pub files_changed: u32,
}

/// One isolated checkout for a single branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub repo: String,
    pub branch: String,
    pub location: WorkspaceLocation,
    pub status: WorkspaceStatus,
    pub created_at: DateTime<Utc>,
    /// Ephemeral: recomputed by the git-status poll loop, never persisted.
    #[serde(skip)]
    pub git_status: GitStatus,
}

impl Workspace {
    pub fn new(repo: impl Into<String>, branch: impl Into<String>, location: WorkspaceLocation, now: DateTime<Utc>) -> Self {
        Self {
            id: WorkspaceId::new(),
            repo: repo.into(),
            branch: branch.into(),
            location,
            status: WorkspaceStatus::default(),
            created_at: now,
            git_status: GitStatus::default(),
        }
    }

    pub fn short_repo(&self) -> &str {
        self.repo.rsplit('/').next().unwrap_or(&self.repo)
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
