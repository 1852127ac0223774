// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The canonical in-memory state store (§4.4). A single `parking_lot`
//! write lock serializes every mutation; readers get defensive clones so
//! nothing outside this module ever sees a torn read. Every mutation
//! enqueues a non-blocking broadcast token so the state broadcaster (§4.9)
//! can coalesce many writes into one dashboard snapshot.

use crate::durable::DurableState;
use crate::persist::{self, PersistError};
use parking_lot::RwLock;
use schmux_core::{Preview, PreviewId, RemoteHost, RemoteHostId, Session, SessionId, Workspace, WorkspaceId};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("workspace {0} not found")]
    WorkspaceNotFound(WorkspaceId),
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
    #[error("remote host {0} not found")]
    RemoteHostNotFound(RemoteHostId),
    #[error("preview {0} not found")]
    PreviewNotFound(PreviewId),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

#[derive(Default)]
struct Inner {
    workspaces: HashMap<WorkspaceId, Workspace>,
    sessions: HashMap<SessionId, Session>,
    remote_hosts: HashMap<RemoteHostId, RemoteHost>,
    previews: HashMap<PreviewId, Preview>,
    flavors: HashMap<schmux_core::FlavorId, schmux_core::Flavor>,
    /// Workspaces currently held under the exclusive-prep lock (§3).
    prep_locks: HashSet<WorkspaceId>,
}

/// Process-wide canonical state. Cheap to clone (an `Arc` handle).
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<RwLock<Inner>>,
    state_path: Option<PathBuf>,
    /// Capacity-1 broadcast token: the broadcaster drains and coalesces.
    token_tx: watch::Sender<u64>,
}

impl StateStore {
    /// Create an empty, unpersisted store (used by tests and one-shot tools).
    pub fn in_memory() -> Self {
        let (token_tx, _rx) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            state_path: None,
            token_tx,
        }
    }

    /// Load durable state from `state_path` (or start empty if absent) and
    /// bind future `persist()` calls to that path.
    pub fn load(state_path: PathBuf) -> Result<Self, StateError> {
        let durable = persist::load(&state_path)?;
        let (token_tx, _rx) = watch::channel(0);
        Ok(Self {
            inner: Arc::new(RwLock::new(Inner {
                workspaces: durable.workspaces,
                sessions: durable.sessions,
                remote_hosts: durable.remote_hosts,
                previews: HashMap::new(),
                flavors: durable.flavors,
                prep_locks: HashSet::new(),
            })),
            state_path: Some(state_path),
            token_tx,
        })
    }

    /// Subscribe to the broadcast-token watch channel (§4.9 reads this).
    pub fn subscribe_tokens(&self) -> watch::Receiver<u64> {
        self.token_tx.subscribe()
    }

    fn signal(&self) {
        self.token_tx.send_modify(|t| *t = t.wrapping_add(1));
    }

    /// Atomically persist the durable subset. A no-op if this store was
    /// created via `in_memory()`.
    pub fn persist(&self) -> Result<(), StateError> {
        let Some(path) = &self.state_path else {
            return Ok(());
        };
        let g = self.inner.read();
        let durable = DurableState {
            workspaces: g.workspaces.clone(),
            sessions: g.sessions.clone(),
            remote_hosts: g.remote_hosts.clone(),
            flavors: g.flavors.clone(),
        };
        drop(g);
        persist::save(&durable, path)?;
        Ok(())
    }

    // ---- workspaces ----

    pub fn put_workspace(&self, workspace: Workspace) {
        let mut g = self.inner.write();
        g.workspaces.insert(workspace.id.clone(), workspace);
        drop(g);
        self.signal();
    }

    pub fn get_workspace(&self, id: &WorkspaceId) -> Option<Workspace> {
        self.inner.read().workspaces.get(id).cloned()
    }

    pub fn find_workspace(&self, repo: &str, branch: &str) -> Option<Workspace> {
        self.inner
            .read()
            .workspaces
            .values()
            .find(|w| w.repo == repo && w.branch == branch)
            .cloned()
    }

    pub fn list_workspaces(&self) -> Vec<Workspace> {
        self.inner.read().workspaces.values().cloned().collect()
    }

    pub fn update_workspace<F: FnOnce(&mut Workspace)>(&self, id: &WorkspaceId, f: F) -> Result<(), StateError> {
        let mut g = self.inner.write();
        let ws = g.workspaces.get_mut(id).ok_or_else(|| StateError::WorkspaceNotFound(id.clone()))?;
        f(ws);
        drop(g);
        self.signal();
        Ok(())
    }

    pub fn remove_workspace(&self, id: &WorkspaceId) {
        let mut g = self.inner.write();
        g.workspaces.remove(id);
        g.prep_locks.remove(id);
        drop(g);
        self.signal();
    }

    /// Try to take the exclusive-prep lock for `id`. Returns `false` if
    /// another spawn already holds it (§3 invariant).
    pub fn try_lock_prep(&self, id: &WorkspaceId) -> bool {
        self.inner.write().prep_locks.insert(id.clone())
    }

    pub fn release_prep_lock(&self, id: &WorkspaceId) {
        self.inner.write().prep_locks.remove(id);
    }

    // ---- sessions ----

    pub fn put_session(&self, session: Session) {
        let mut g = self.inner.write();
        g.sessions.insert(session.id.clone(), session);
        drop(g);
        self.signal();
    }

    pub fn get_session(&self, id: &SessionId) -> Option<Session> {
        self.inner.read().sessions.get(id).cloned()
    }

    pub fn list_sessions(&self) -> Vec<Session> {
        self.inner.read().sessions.values().cloned().collect()
    }

    pub fn sessions_for_workspace(&self, workspace_id: &WorkspaceId) -> Vec<Session> {
        self.inner
            .read()
            .sessions
            .values()
            .filter(|s| &s.workspace_id == workspace_id)
            .cloned()
            .collect()
    }

    pub fn update_session<F: FnOnce(&mut Session)>(&self, id: &SessionId, f: F) -> Result<(), StateError> {
        let mut g = self.inner.write();
        let session = g.sessions.get_mut(id).ok_or_else(|| StateError::SessionNotFound(id.clone()))?;
        f(session);
        drop(g);
        self.signal();
        Ok(())
    }

    /// Idempotent: removing a session that's already gone is not an error (§7).
    pub fn remove_session(&self, id: &SessionId) {
        let mut g = self.inner.write();
        g.sessions.remove(id);
        drop(g);
        self.signal();
    }

    // ---- remote hosts ----

    pub fn put_remote_host(&self, host: RemoteHost) {
        let mut g = self.inner.write();
        g.remote_hosts.insert(host.id.clone(), host);
        drop(g);
        self.signal();
    }

    pub fn get_remote_host(&self, id: &RemoteHostId) -> Option<RemoteHost> {
        self.inner.read().remote_hosts.get(id).cloned()
    }

    pub fn list_remote_hosts(&self) -> Vec<RemoteHost> {
        self.inner.read().remote_hosts.values().cloned().collect()
    }

    /// The single non-expired host for a flavor, if any (§3 invariant 3).
    pub fn active_remote_host_for_flavor(&self, flavor_id: &schmux_core::FlavorId) -> Option<RemoteHost> {
        self.inner
            .read()
            .remote_hosts
            .values()
            .find(|h| &h.flavor_id == flavor_id && !h.status.is_terminalish())
            .cloned()
    }

    pub fn update_remote_host<F: FnOnce(&mut RemoteHost)>(&self, id: &RemoteHostId, f: F) -> Result<(), StateError> {
        let mut g = self.inner.write();
        let host = g.remote_hosts.get_mut(id).ok_or_else(|| StateError::RemoteHostNotFound(id.clone()))?;
        f(host);
        drop(g);
        self.signal();
        Ok(())
    }

    // ---- previews ----

    pub fn put_preview(&self, preview: Preview) {
        let mut g = self.inner.write();
        g.previews.insert(preview.id.clone(), preview);
        drop(g);
        self.signal();
    }

    pub fn get_preview(&self, id: &PreviewId) -> Option<Preview> {
        self.inner.read().previews.get(id).cloned()
    }

    pub fn list_previews(&self) -> Vec<Preview> {
        self.inner.read().previews.values().cloned().collect()
    }

    pub fn previews_for_workspace(&self, workspace_id: &WorkspaceId) -> Vec<Preview> {
        self.inner
            .read()
            .previews
            .values()
            .filter(|p| &p.workspace_id == workspace_id)
            .cloned()
            .collect()
    }

    pub fn find_preview(&self, workspace_id: &WorkspaceId, host: &str, port: u16) -> Option<Preview> {
        self.inner
            .read()
            .previews
            .values()
            .find(|p| p.matches(workspace_id, host, port))
            .cloned()
    }

    pub fn update_preview<F: FnOnce(&mut Preview)>(&self, id: &PreviewId, f: F) -> Result<(), StateError> {
        let mut g = self.inner.write();
        let preview = g.previews.get_mut(id).ok_or_else(|| StateError::PreviewNotFound(id.clone()))?;
        f(preview);
        drop(g);
        self.signal();
        Ok(())
    }

    pub fn remove_preview(&self, id: &PreviewId) {
        let mut g = self.inner.write();
        g.previews.remove(id);
        drop(g);
        self.signal();
    }

    // ---- flavors (config-sourced, read-mostly) ----

    pub fn set_flavors(&self, flavors: Vec<schmux_core::Flavor>) {
        let mut g = self.inner.write();
        g.flavors = flavors.into_iter().map(|f| (f.id.clone(), f)).collect();
        drop(g);
        self.signal();
    }

    pub fn get_flavor(&self, id: &schmux_core::FlavorId) -> Option<schmux_core::Flavor> {
        self.inner.read().flavors.get(id).cloned()
    }

    pub fn list_flavors(&self) -> Vec<schmux_core::Flavor> {
        self.inner.read().flavors.values().cloned().collect()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
