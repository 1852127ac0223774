// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use schmux_core::test_support::fake_workspace;
use std::io::Write;
use tempfile::tempdir;

#[test]
fn load_missing_file_returns_default() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("state.json");
    let state = load(&path).expect("load");
    assert!(state.workspaces.is_empty());
}

#[test]
fn save_then_load_roundtrips() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("state.json");

    let mut state = DurableState::default();
    let ws = fake_workspace("org/repo", "main", dir.path().join("ws"));
    let id = ws.id.clone();
    state.workspaces.insert(id.clone(), ws);

    save(&state, &path).expect("save");
    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());

    let loaded = load(&path).expect("load");
    assert_eq!(loaded.workspaces.len(), 1);
    assert!(loaded.workspaces.contains_key(&id));
}

#[test]
fn corrupt_file_is_moved_aside_and_load_starts_fresh() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("state.json");
    let mut f = File::create(&path).expect("create");
    f.write_all(b"not json").expect("write");

    let state = load(&path).expect("load falls back");
    assert!(state.workspaces.is_empty());
    assert!(path.with_extension("bak").exists());
}
