// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote connection manager (§4.6): one control-mode subprocess per
//! flavor, connected idempotently behind a keyed single-flight lock,
//! reconciled against the session store by window/pane id only.

use crate::error::EngineError;
use parking_lot::Mutex;
use schmux_adapters::{ControlClient, ControlEvent, ControlModeError, KeyedLock, OutputEvent};
use schmux_core::{Clock, Flavor, FlavorId, RemoteHost, RemoteHostId, RemoteHostStatus, SessionState, SessionTarget};
use schmux_storage::StateStore;
use std::collections::{HashMap, HashSet};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::mpsc;
use tracing::{info, warn};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const RECONCILE_TIMEOUT: Duration = Duration::from_secs(5);

/// A live control-mode connection for one flavor. Output and notification
/// receivers are handed out once, to whichever consumer (the terminal hub)
/// attaches first.
pub struct RemoteConnection {
    host_id: RemoteHostId,
    client: ControlClient,
    output_rx: AsyncMutex<Option<mpsc::Receiver<OutputEvent>>>,
    notif_rx: AsyncMutex<Option<mpsc::Receiver<ControlEvent>>>,
}

impl RemoteConnection {
    pub fn client(&self) -> &ControlClient {
        &self.client
    }

    pub fn host_id(&self) -> &RemoteHostId {
        &self.host_id
    }

    pub async fn take_output_receiver(&self) -> Option<mpsc::Receiver<OutputEvent>> {
        self.output_rx.lock().await.take()
    }

    pub async fn take_notification_receiver(&self) -> Option<mpsc::Receiver<ControlEvent>> {
        self.notif_rx.lock().await.take()
    }
}

pub struct RemoteManager {
    store: StateStore,
    connections: Arc<Mutex<HashMap<FlavorId, Arc<RemoteConnection>>>>,
    connect_locks: KeyedLock<FlavorId>,
    clock: Arc<dyn Clock>,
    default_ttl: chrono::Duration,
}

impl RemoteManager {
    pub fn new(store: StateStore, clock: Arc<dyn Clock>, default_ttl: chrono::Duration) -> Self {
        Self {
            store,
            connections: Arc::new(Mutex::new(HashMap::new())),
            connect_locks: KeyedLock::new(),
            clock,
            default_ttl,
        }
    }

    pub fn connection(&self, flavor_id: &FlavorId) -> Option<Arc<RemoteConnection>> {
        self.connections.lock().get(flavor_id).cloned()
    }

    /// Idempotent and race-safe: concurrent callers observe a single
    /// subprocess. Launches the flavor's connect command, waits for the
    /// control-mode readiness latch, then runs the handshake before
    /// exposing the connection as `connected`.
    pub async fn connect(&self, flavor: &Flavor) -> Result<RemoteHostId, EngineError> {
        if let Some(host_id) = self.already_connected(&flavor.id) {
            return Ok(host_id);
        }

        let _guard = self.connect_locks.lock(flavor.id.clone()).await;
        if let Some(host_id) = self.already_connected(&flavor.id) {
            return Ok(host_id);
        }

        // A previous connection for this flavor may have died without ever
        // being swept (subprocess exit marks it `Disconnected`, not
        // `Expired`). Expire it before minting a new host so at most one
        // non-expired host per flavor id ever exists.
        if let Some(stale) = self.store.active_remote_host_for_flavor(&flavor.id) {
            let _ = self.store.update_remote_host(&stale.id, |h| h.status = RemoteHostStatus::Expired);
        }

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&flavor.connect_command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child.stdout.take().ok_or_else(|| std::io::Error::other("connect command has no stdout"))?;
        let stdin = child.stdin.take().ok_or_else(|| std::io::Error::other("connect command has no stdin"))?;

        let (client, output_rx, notif_rx) = ControlClient::spawn(stdout, stdin);
        if tokio::time::timeout(HANDSHAKE_TIMEOUT, client.wait_ready()).await.is_err() {
            client.close().await;
            return Err(EngineError::ControlMode(ControlModeError::Timeout(HANDSHAKE_TIMEOUT)));
        }

        let hostname = client
            .execute("display-message -p '#{host}'", HANDSHAKE_TIMEOUT)
            .await
            .map(|body| body.trim().to_string())
            .ok();

        let host = RemoteHost::new(flavor.id.clone(), self.clock.now(), self.default_ttl);
        let host_id = host.id.clone();
        self.store.put_remote_host(host);
        self.store.update_remote_host(&host_id, |h| {
            h.status = RemoteHostStatus::Connected;
            h.hostname = hostname;
        })?;

        let connection = Arc::new(RemoteConnection {
            host_id: host_id.clone(),
            client,
            output_rx: AsyncMutex::new(Some(output_rx)),
            notif_rx: AsyncMutex::new(Some(notif_rx)),
        });
        self.connections.lock().insert(flavor.id.clone(), connection);
        self.spawn_exit_watcher(flavor.id.clone(), host_id.clone(), child);

        info!(flavor = %flavor.id, host = %host_id, "remote connection established");
        Ok(host_id)
    }

    fn already_connected(&self, flavor_id: &FlavorId) -> Option<RemoteHostId> {
        let host = self.store.active_remote_host_for_flavor(flavor_id)?;
        if host.status == RemoteHostStatus::Connected && self.connections.lock().contains_key(flavor_id) {
            Some(host.id)
        } else {
            None
        }
    }

    fn spawn_exit_watcher(&self, flavor_id: FlavorId, host_id: RemoteHostId, mut child: Child) {
        let store = self.store.clone();
        let connections = self.connections.clone();
        tokio::spawn(async move {
            let _ = child.wait().await;
            connections.lock().remove(&flavor_id);
            mark_disconnected(&store, &host_id);
        });
    }

    /// Enumerate each connection's live window/pane ids and cross-reference
    /// the session store by id only (never by name). A remote session whose
    /// recorded ids no longer exist is marked stopped.
    pub async fn reconcile_once(&self) {
        let conns: Vec<Arc<RemoteConnection>> = self.connections.lock().values().cloned().collect();
        for conn in conns {
            let body = match conn.client.execute("list-panes -a -F '#{window_id} #{pane_id}'", RECONCILE_TIMEOUT).await {
                Ok(body) => body,
                Err(err) => {
                    warn!(host = %conn.host_id, error = %err, "remote reconcile list-panes failed");
                    continue;
                }
            };
            let live: HashSet<(String, String)> = body
                .lines()
                .filter_map(|line| {
                    let mut parts = line.split_whitespace();
                    Some((parts.next()?.to_string(), parts.next()?.to_string()))
                })
                .collect();

            for session in self.store.list_sessions() {
                let SessionTarget::Remote { host, window_id, pane_id } = &session.target else {
                    continue;
                };
                if host != conn.host_id() || session.state.is_terminal() || session.state == SessionState::Stopped {
                    continue;
                }
                if !live.contains(&(window_id.clone(), pane_id.clone())) {
                    let _ = self.store.update_session(&session.id, |s| s.state = SessionState::Stopped);
                }
            }
        }
    }

    /// Mark hosts past `expires_at` as expired, tear down their subprocess,
    /// and park (rather than dispose) sessions they were carrying.
    pub async fn sweep_expired(&self) {
        let now = self.clock.now();
        for host in self.store.list_remote_hosts() {
            if host.status != RemoteHostStatus::Expired && host.is_expired(now) {
                self.expire_host(&host).await;
            }
        }
    }

    async fn expire_host(&self, host: &RemoteHost) {
        let _ = self.store.update_remote_host(&host.id, |h| h.status = RemoteHostStatus::Expired);

        let flavor_id = {
            let conns = self.connections.lock();
            conns.iter().find(|(_, c)| c.host_id == host.id).map(|(k, _)| k.clone())
        };
        if let Some(flavor_id) = flavor_id {
            if let Some(conn) = self.connections.lock().remove(&flavor_id) {
                conn.client.close().await;
            }
        }

        for session in self.store.list_sessions() {
            if matches!(&session.target, SessionTarget::Remote { host: h, .. } if h == &host.id) {
                let _ = self.store.update_session(&session.id, |s| s.state = SessionState::RunningDetached);
            }
        }
        info!(host = %host.id, "remote host expired");
    }
}

fn mark_disconnected(store: &StateStore, host_id: &RemoteHostId) {
    let _ = store.update_remote_host(host_id, |h| h.status = RemoteHostStatus::Disconnected);
    for session in store.list_sessions() {
        if matches!(&session.target, SessionTarget::Remote { host, .. } if host == host_id) {
            let _ = store.update_session(&session.id, |s| s.state = SessionState::Stopped);
        }
    }
    warn!(host = %host_id, "remote connection subprocess exited, sessions marked stopped");
}

#[cfg(test)]
#[path = "remote_manager_tests.rs"]
mod tests;
