// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State broadcaster (§4.9): one task reads the store's broadcast-token
//! watch channel, debounces bursts of mutations into a single dispatch, and
//! fans the canonical workspace snapshot out to every dashboard subscriber.

use parking_lot::Mutex;
use schmux_core::{Session, SessionTarget, Workspace};
use schmux_storage::StateStore;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

/// Debounce window for coalescing bursts of store mutations into one
/// dispatch. Matches §4.9's default.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);
const SUBSCRIBER_QUEUE_DEPTH: usize = 32;

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: schmux_core::SessionId,
    pub target: SessionTarget,
    pub nickname: Option<String>,
    pub running: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_output_at: Option<chrono::DateTime<chrono::Utc>>,
    pub nudge_state: schmux_core::NudgeState,
    pub nudge_summary: Option<String>,
    pub nudge_seq: u64,
}

impl From<&Session> for SessionSnapshot {
    fn from(s: &Session) -> Self {
        Self {
            id: s.id.clone(),
            target: s.target.clone(),
            nickname: s.nickname.clone(),
            running: s.state.is_running(),
            created_at: s.created_at,
            last_output_at: s.last_output_at,
            nudge_state: s.nudge_state,
            nudge_summary: s.nudge_summary.clone(),
            nudge_seq: s.nudge_seq,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceSnapshot {
    pub id: schmux_core::WorkspaceId,
    pub repo: String,
    pub branch: String,
    pub short_repo: String,
    pub path: std::path::PathBuf,
    pub session_count: usize,
    pub sessions: Vec<SessionSnapshot>,
    pub git_ahead: u32,
    pub git_behind: u32,
    pub git_dirty: bool,
    pub git_lines_added: u32,
    pub git_lines_removed: u32,
    pub git_files_changed: u32,
}

impl WorkspaceSnapshot {
    fn build(workspace: &Workspace, sessions: Vec<&Session>) -> Self {
        let sessions: Vec<SessionSnapshot> = sessions.into_iter().map(SessionSnapshot::from).collect();
        Self {
            id: workspace.id.clone(),
            repo: workspace.repo.clone(),
            branch: workspace.branch.clone(),
            short_repo: workspace.short_repo().to_string(),
            path: workspace.location.path().clone(),
            session_count: sessions.len(),
            sessions,
            git_ahead: workspace.git_status.ahead,
            git_behind: workspace.git_status.behind,
            git_dirty: workspace.git_status.dirty,
            git_lines_added: workspace.git_status.lines_added,
            git_lines_removed: workspace.git_status.lines_removed,
            git_files_changed: workspace.git_status.files_changed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardMessage {
    Sessions { workspaces: Vec<WorkspaceSnapshot> },
}

/// Builds the same workspace-with-embedded-sessions shape the dashboard
/// websocket pushes, for the plain HTTP reads (`GET /api/sessions`,
/// `GET /api/workspaces`) that the protocol section calls out as sharing it.
pub fn workspace_snapshots(store: &StateStore) -> Vec<WorkspaceSnapshot> {
    let sessions = store.list_sessions();
    store
        .list_workspaces()
        .iter()
        .map(|w| {
            let owned: Vec<&Session> = sessions.iter().filter(|s| s.workspace_id == w.id).collect();
            WorkspaceSnapshot::build(w, owned)
        })
        .collect()
}

pub struct Broadcaster {
    store: StateStore,
    subscribers: Mutex<HashMap<u64, mpsc::Sender<Arc<DashboardMessage>>>>,
    next_subscriber_id: AtomicU64,
}

impl Broadcaster {
    pub fn new(store: StateStore) -> Arc<Self> {
        Arc::new(Self { store, subscribers: Mutex::new(HashMap::new()), next_subscriber_id: AtomicU64::new(0) })
    }

    /// Spawns the single dispatch loop. Call once per broadcaster instance.
    pub fn spawn_dispatch_loop(self: &Arc<Self>, debounce: Duration) {
        let this = self.clone();
        tokio::spawn(async move {
            let mut tokens = this.store.subscribe_tokens();
            loop {
                if tokens.changed().await.is_err() {
                    break;
                }
                // Debounce: bundle any further mutations that land within
                // the window into this same dispatch.
                tokio::time::sleep(debounce).await;
                tokens.borrow_and_update();
                this.dispatch();
            }
        });
    }

    /// Registers a new subscriber and immediately hands it a full snapshot.
    pub fn subscribe(&self) -> (u64, mpsc::Receiver<Arc<DashboardMessage>>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_DEPTH);
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let snapshot = Arc::new(self.snapshot());
        let _ = tx.try_send(snapshot);
        self.subscribers.lock().insert(id, tx);
        (id, rx)
    }

    pub fn unsubscribe(&self, id: u64) {
        self.subscribers.lock().remove(&id);
    }

    fn snapshot(&self) -> DashboardMessage {
        DashboardMessage::Sessions { workspaces: workspace_snapshots(&self.store) }
    }

    /// Builds the current snapshot and fans it out; a subscriber whose
    /// queue is full is disconnected rather than blocked on or resynced.
    fn dispatch(&self) {
        let message = Arc::new(self.snapshot());
        let mut subs = self.subscribers.lock();
        subs.retain(|_, tx| match tx.try_send(message.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("dashboard subscriber queue full, disconnecting");
                false
            }
        });
    }
}

#[cfg(test)]
#[path = "broadcaster_tests.rs"]
mod tests;
