// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Preview proxy (§4.8): on-demand loopback reverse proxy listeners for
//! forwarded workspace ports.

use crate::error::EngineError;
use parking_lot::Mutex;
use schmux_adapters::PREVIEW_DIAL_TIMEOUT;
use schmux_core::{is_loopback_host, Clock, Preview, PreviewId, PreviewStatus, WorkspaceId};
use schmux_storage::StateStore;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::copy_bidirectional;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Per-workspace and global caps, and the idle/stale reap windows. Supplied
/// by the daemon's configuration.
#[derive(Debug, Clone)]
pub struct PreviewLimits {
    pub per_workspace: usize,
    pub global: usize,
    pub idle_timeout: chrono::Duration,
    pub stale_grace: chrono::Duration,
}

struct Listener {
    port: u16,
    cancel: CancellationToken,
}

pub struct PreviewManager {
    store: StateStore,
    clock: Arc<dyn Clock>,
    limits: PreviewLimits,
    listeners: Mutex<HashMap<PreviewId, Listener>>,
}

impl PreviewManager {
    pub fn new(store: StateStore, clock: Arc<dyn Clock>, limits: PreviewLimits) -> Self {
        Self { store, clock, limits, listeners: Mutex::new(HashMap::new()) }
    }

    /// Returns the existing preview for `(workspace, host, port)` after
    /// confirming liveness, or allocates a new loopback listener and proxy.
    pub async fn create_or_get(&self, workspace_id: &WorkspaceId, host: &str, port: u16) -> Result<Preview, EngineError> {
        if !is_loopback_host(host) {
            return Err(EngineError::Io(std::io::Error::other(format!("preview host '{host}' is not loopback"))));
        }
        if port == 0 {
            return Err(EngineError::Io(std::io::Error::other("preview port must be in 1..=65535")));
        }

        let workspace = self.store.get_workspace(workspace_id).ok_or_else(|| schmux_storage::StateError::WorkspaceNotFound(workspace_id.clone()))?;
        if !workspace.location.is_local() {
            return Err(EngineError::Io(std::io::Error::other("preview upstream must be on a local workspace")));
        }

        if let Some(existing) = self.store.find_preview(workspace_id, host, port) {
            self.probe_and_update(&existing.id, host, port).await;
            return Ok(self.store.get_preview(&existing.id).unwrap_or(existing));
        }

        if self.store.previews_for_workspace(workspace_id).len() >= self.limits.per_workspace {
            return Err(EngineError::Io(std::io::Error::other("per-workspace preview cap reached")));
        }
        if self.store.list_previews().len() >= self.limits.global {
            return Err(EngineError::Io(std::io::Error::other("global preview cap reached")));
        }

        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let assigned_port = listener.local_addr()?.port();

        let mut preview = Preview::new(workspace_id.clone(), host, port, self.clock.now());
        preview.assigned_port = Some(assigned_port);
        let preview_id = preview.id.clone();

        let cancel = CancellationToken::new();
        spawn_accept_loop(listener, host.to_string(), port, cancel.clone());
        self.listeners.lock().insert(preview_id.clone(), Listener { port: assigned_port, cancel });

        self.store.put_preview(preview);
        self.probe_and_update(&preview_id, host, port).await;

        info!(workspace = %workspace_id, host, port, assigned_port, "preview proxy created");
        Ok(self.store.get_preview(&preview_id).ok_or_else(|| schmux_storage::StateError::PreviewNotFound(preview_id.clone()))?)
    }

    async fn probe_and_update(&self, id: &PreviewId, host: &str, port: u16) {
        let now = self.clock.now();
        match dial(host, port).await {
            Ok(()) => {
                let _ = self.store.update_preview(id, |p| {
                    p.status = PreviewStatus::Ready;
                    p.last_healthy_at = Some(now);
                });
            }
            Err(err) => {
                let _ = self.store.update_preview(id, |p| {
                    p.status = PreviewStatus::Degraded { last_error: err.to_string() };
                });
            }
        }
    }

    /// Marks a preview as used, extending its idle window.
    pub fn touch(&self, id: &PreviewId) {
        let now = self.clock.now();
        let _ = self.store.update_preview(id, |p| p.last_used_at = now);
    }

    /// Re-probes every preview, then reaps idle or persistently-unreachable
    /// ones. Driven by the daemon's scheduler, not a self-spawned loop.
    pub async fn reconcile_once(&self) {
        let now = self.clock.now();
        for preview in self.store.list_previews() {
            self.probe_and_update(&preview.id, &preview.upstream_host, preview.upstream_port).await;

            let current = self.store.get_preview(&preview.id).unwrap_or(preview);
            if current.is_idle(now, self.limits.idle_timeout) {
                self.reap(&current.id, "idle timeout").await;
            } else if current.is_stale(now, self.limits.stale_grace) {
                self.reap(&current.id, "unreachable past stale grace").await;
            } else if !self.listeners.lock().contains_key(&current.id) {
                // Listener task is gone (e.g. bind failure survivor state);
                // the store entry can no longer be proxied.
                self.reap(&current.id, "listener missing").await;
            }
        }

        // The reverse direction: a listener with no backing store entry,
        // which should only happen if a reap raced a restart.
        let orphaned: Vec<PreviewId> = {
            let listeners = self.listeners.lock();
            listeners.keys().filter(|id| self.store.get_preview(id).is_none()).cloned().collect()
        };
        for id in orphaned {
            if let Some(listener) = self.listeners.lock().remove(&id) {
                listener.cancel.cancel();
            }
        }
    }

    async fn reap(&self, id: &PreviewId, reason: &str) {
        if let Some(listener) = self.listeners.lock().remove(id) {
            listener.cancel.cancel();
            warn!(preview = %id, port = listener.port, reason, "preview reaped");
        }
        self.store.remove_preview(id);
    }

    pub fn assigned_port(&self, id: &PreviewId) -> Option<u16> {
        self.listeners.lock().get(id).map(|l| l.port)
    }
}

async fn dial(host: &str, port: u16) -> std::io::Result<()> {
    let addr = format!("{host}:{port}");
    tokio::time::timeout(PREVIEW_DIAL_TIMEOUT, TcpStream::connect(addr))
        .await
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "preview dial timed out"))??;
    Ok(())
}

fn spawn_accept_loop(listener: TcpListener, upstream_host: String, upstream_port: u16, cancel: CancellationToken) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = listener.accept() => {
                    match accepted {
                        Ok((conn, peer)) => spawn_connection(conn, peer, upstream_host.clone(), upstream_port),
                        Err(err) => {
                            warn!(error = %err, "preview listener accept failed");
                            break;
                        }
                    }
                }
            }
        }
    });
}

fn spawn_connection(mut downstream: TcpStream, peer: SocketAddr, upstream_host: String, upstream_port: u16) {
    tokio::spawn(async move {
        let upstream = match TcpStream::connect((upstream_host.as_str(), upstream_port)).await {
            Ok(stream) => stream,
            Err(err) => {
                warn!(peer = %peer, error = %err, "preview upstream connect failed");
                return;
            }
        };
        let mut upstream = upstream;
        if let Err(err) = copy_bidirectional(&mut downstream, &mut upstream).await {
            warn!(peer = %peer, error = %err, "preview proxy connection ended with error");
        }
    });
}

#[cfg(test)]
#[path = "preview_proxy_tests.rs"]
mod tests;
