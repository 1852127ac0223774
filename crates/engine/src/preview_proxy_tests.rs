// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use schmux_core::{FakeClock, Workspace, WorkspaceLocation};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener as TokioTcpListener;

fn limits() -> PreviewLimits {
    PreviewLimits {
        per_workspace: 2,
        global: 4,
        idle_timeout: chrono::Duration::hours(1),
        stale_grace: chrono::Duration::seconds(5),
    }
}

fn manager() -> (PreviewManager, StateStore, WorkspaceId) {
    let store = StateStore::in_memory();
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(chrono::Utc::now()));
    let workspace = Workspace::new("org/repo", "main", WorkspaceLocation::Local { path: "/tmp/ws".into() }, chrono::Utc::now());
    let workspace_id = workspace.id.clone();
    store.put_workspace(workspace);
    (PreviewManager::new(store.clone(), clock, limits()), store, workspace_id)
}

async fn echo_upstream() -> u16 {
    let listener = TokioTcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        loop {
            let (mut conn, _) = match listener.accept().await {
                Ok(pair) => pair,
                Err(_) => break,
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                loop {
                    match conn.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if conn.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });
    port
}

#[tokio::test]
async fn create_or_get_rejects_non_loopback_host() {
    let (mgr, _store, ws) = manager();
    let err = mgr.create_or_get(&ws, "example.com", 8080).await.unwrap_err();
    assert!(matches!(err, EngineError::Io(_)));
}

#[tokio::test]
async fn create_or_get_rejects_zero_port() {
    let (mgr, _store, ws) = manager();
    let err = mgr.create_or_get(&ws, "127.0.0.1", 0).await.unwrap_err();
    assert!(matches!(err, EngineError::Io(_)));
}

#[tokio::test]
async fn create_or_get_allocates_listener_and_proxies_bytes() {
    let (mgr, _store, ws) = manager();
    let upstream_port = echo_upstream().await;

    let preview = mgr.create_or_get(&ws, "127.0.0.1", upstream_port).await.expect("create");
    assert_eq!(preview.status, schmux_core::PreviewStatus::Ready);
    let assigned = preview.assigned_port.expect("assigned port");

    let mut conn = TcpStream::connect(("127.0.0.1", assigned)).await.expect("connect to proxy");
    conn.write_all(b"ping").await.unwrap();
    let mut buf = [0u8; 4];
    conn.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"ping");
}

#[tokio::test]
async fn second_call_with_same_triple_reuses_preview() {
    let (mgr, _store, ws) = manager();
    let upstream_port = echo_upstream().await;

    let first = mgr.create_or_get(&ws, "127.0.0.1", upstream_port).await.expect("first");
    let second = mgr.create_or_get(&ws, "127.0.0.1", upstream_port).await.expect("second");
    assert_eq!(first.id, second.id);
    assert_eq!(first.assigned_port, second.assigned_port);
}

#[tokio::test]
async fn per_workspace_cap_is_enforced() {
    let (mgr, _store, ws) = manager();
    let p1 = echo_upstream().await;
    let p2 = echo_upstream().await;
    let p3 = echo_upstream().await;

    mgr.create_or_get(&ws, "127.0.0.1", p1).await.expect("first");
    mgr.create_or_get(&ws, "127.0.0.1", p2).await.expect("second");
    let err = mgr.create_or_get(&ws, "127.0.0.1", p3).await.unwrap_err();
    assert!(matches!(err, EngineError::Io(_)));
}

#[tokio::test]
async fn reconcile_reaps_unreachable_preview_past_stale_grace() {
    let (mgr, store, ws) = manager();
    // Nothing is listening on this port; the initial dial fails, so the
    // preview starts degraded and is immediately past its (backdated) grace.
    let preview = mgr.create_or_get(&ws, "127.0.0.1", 1).await.expect("create degraded");
    store.update_preview(&preview.id, |p| p.created_at = chrono::Utc::now() - chrono::Duration::hours(1)).unwrap();

    mgr.reconcile_once().await;

    assert!(store.get_preview(&preview.id).is_none());
    assert!(mgr.assigned_port(&preview.id).is_none());
}

#[tokio::test]
async fn reconcile_reaps_idle_preview() {
    let limits = PreviewLimits { idle_timeout: chrono::Duration::seconds(0), ..limits() };
    let store = StateStore::in_memory();
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(chrono::Utc::now()));
    let workspace = Workspace::new("org/repo", "main", WorkspaceLocation::Local { path: "/tmp/ws".into() }, chrono::Utc::now());
    let ws = workspace.id.clone();
    store.put_workspace(workspace);
    let mgr = PreviewManager::new(store.clone(), clock, limits);

    let upstream_port = echo_upstream().await;
    let preview = mgr.create_or_get(&ws, "127.0.0.1", upstream_port).await.expect("create");

    mgr.reconcile_once().await;

    assert!(store.get_preview(&preview.id).is_none());
}
