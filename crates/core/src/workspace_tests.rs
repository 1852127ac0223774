// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;

#[test]
fn short_repo_strips_owner_prefix() {
    let ws = Workspace::new(
        "org/my-repo",
        "main",
        WorkspaceLocation::Local { path: "/tmp/x".into() },
        Utc::now(),
    );
    assert_eq!(ws.short_repo(), "my-repo");
}

#[test]
fn short_repo_without_slash_is_unchanged() {
    let ws = Workspace::new("my-repo", "main", WorkspaceLocation::Local { path: "/tmp/x".into() }, Utc::now());
    assert_eq!(ws.short_repo(), "my-repo");
}

#[test]
fn new_workspace_starts_preparing() {
    let ws = Workspace::new("r", "b", WorkspaceLocation::Local { path: "/tmp/x".into() }, Utc::now());
    assert_eq!(ws.status, WorkspaceStatus::Preparing);
    assert!(ws.location.is_local());
}
