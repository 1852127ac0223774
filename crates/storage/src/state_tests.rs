// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use schmux_core::test_support::{fake_local_session, fake_workspace};
use schmux_core::{Flavor, FlavorId, RemoteHost, RemoteHostStatus, VcsKind};

#[test]
fn workspace_roundtrip_and_find_by_repo_branch() {
    let store = StateStore::in_memory();
    let ws = fake_workspace("org/repo", "main", "/tmp/ws");
    let id = ws.id.clone();
    store.put_workspace(ws);

    assert!(store.get_workspace(&id).is_some());
    assert!(store.find_workspace("org/repo", "main").is_some());
    assert!(store.find_workspace("org/repo", "other").is_none());
    assert_eq!(store.list_workspaces().len(), 1);
}

#[test]
fn update_workspace_missing_returns_error() {
    let store = StateStore::in_memory();
    let result = store.update_workspace(&schmux_core::WorkspaceId::new(), |_| {});
    assert!(matches!(result, Err(StateError::WorkspaceNotFound(_))));
}

#[test]
fn prep_lock_is_exclusive_per_workspace() {
    let store = StateStore::in_memory();
    let id = schmux_core::WorkspaceId::new();
    assert!(store.try_lock_prep(&id));
    assert!(!store.try_lock_prep(&id), "second spawn must not win the lock");
    store.release_prep_lock(&id);
    assert!(store.try_lock_prep(&id), "lock is reusable after release");
}

#[test]
fn dispose_is_idempotent() {
    let store = StateStore::in_memory();
    let ws = fake_workspace("org/repo", "main", "/tmp/ws");
    let session = fake_local_session(ws.id.clone(), "claude", "schmux-abc");
    let sid = session.id.clone();
    store.put_session(session);

    store.remove_session(&sid);
    store.remove_session(&sid); // second remove must not panic or error
    assert!(store.get_session(&sid).is_none());
}

#[test]
fn sessions_for_workspace_filters_correctly() {
    let store = StateStore::in_memory();
    let ws_a = fake_workspace("org/repo", "a", "/tmp/a");
    let ws_b = fake_workspace("org/repo", "b", "/tmp/b");
    store.put_session(fake_local_session(ws_a.id.clone(), "claude", "s1"));
    store.put_session(fake_local_session(ws_b.id.clone(), "claude", "s2"));

    assert_eq!(store.sessions_for_workspace(&ws_a.id).len(), 1);
    assert_eq!(store.sessions_for_workspace(&ws_b.id).len(), 1);
}

#[test]
fn at_most_one_active_remote_host_per_flavor() {
    let store = StateStore::in_memory();
    let flavor = FlavorId::from_string("work");
    let now = chrono::Utc::now();

    let mut old = RemoteHost::new(flavor.clone(), now, chrono::Duration::hours(1));
    old.status = RemoteHostStatus::Expired;
    store.put_remote_host(old);

    let fresh = RemoteHost::new(flavor.clone(), now, chrono::Duration::hours(1));
    let fresh_id = fresh.id.clone();
    store.put_remote_host(fresh);

    let active = store.active_remote_host_for_flavor(&flavor).expect("one active host");
    assert_eq!(active.id, fresh_id);
}

#[test]
fn save_load_roundtrips_durable_subset_and_zeros_ephemeral() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("state.json");

    let store = StateStore::load(path.clone()).expect("load empty");
    let ws = fake_workspace("org/repo", "main", dir.path().join("ws"));
    let ws_id = ws.id.clone();
    store.put_workspace(ws);

    let flavor = Flavor {
        id: FlavorId::from_string("work"),
        connect_command: "ssh work tmux -C".into(),
        workspace_root: "/home/dev".into(),
        vcs: VcsKind::Git,
    };
    store.set_flavors(vec![flavor]);

    let mut host = RemoteHost::new(FlavorId::from_string("work"), chrono::Utc::now(), chrono::Duration::hours(1));
    host.status = RemoteHostStatus::Connected;
    let host_id = host.id.clone();
    store.put_remote_host(host);

    store.persist().expect("persist");

    let reloaded = StateStore::load(path).expect("reload");
    assert!(reloaded.get_workspace(&ws_id).is_some());
    assert_eq!(reloaded.list_flavors().len(), 1);

    let reloaded_host = reloaded.get_remote_host(&host_id).expect("host persisted");
    assert_eq!(reloaded_host.status, RemoteHostStatus::Connecting, "ephemeral status zeroed on load");
}

#[tokio::test]
async fn mutations_signal_the_broadcast_token() {
    let store = StateStore::in_memory();
    let mut rx = store.subscribe_tokens();
    let before = *rx.borrow_and_update();

    store.put_workspace(fake_workspace("org/repo", "main", "/tmp/ws"));
    rx.changed().await.expect("sender alive");
    let after = *rx.borrow_and_update();
    assert_ne!(before, after);
}
