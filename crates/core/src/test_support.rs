// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test-only builders for other crates' tests (enabled via the `test-support` feature).

use crate::session::{Session, SessionTarget};
use crate::workspace::{Workspace, WorkspaceLocation};
use chrono::Utc;
use std::path::PathBuf;

pub fn fake_workspace(repo: &str, branch: &str, path: impl Into<PathBuf>) -> Workspace {
    Workspace::new(repo, branch, WorkspaceLocation::Local { path: path.into() }, Utc::now())
}

pub fn fake_local_session(workspace_id: crate::workspace::WorkspaceId, agent: &str, tmux_session: &str) -> Session {
    Session::new(
        workspace_id,
        agent,
        SessionTarget::Local { tmux_session: tmux_session.into() },
        Utc::now(),
    )
}
