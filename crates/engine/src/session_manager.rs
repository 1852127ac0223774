// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session manager (§4.5): the spawn pipeline, the liveness poll, dispose,
//! and nudge wiring.

use crate::error::EngineError;
use parking_lot::Mutex;
use schmux_adapters::{install_hook_file, NotifyAdapter, NudgeWatcher, TmxAdapter, WorktreeManager, STATUS_FILE_ENV, TMX_TIMEOUT};
use schmux_core::{
    AgentDescriptor, AgentKind, Clock, Session, SessionId, SessionState, SessionTarget, Workspace, WorkspaceId,
    WorkspaceLocation, WorkspaceStatus,
};
use schmux_storage::{StateError, StateStore};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Where to run a newly spawned session.
#[derive(Clone)]
pub enum WorkspaceTarget {
    Existing(WorkspaceId),
    New { repo: String, branch: String },
}

pub struct SpawnRequest {
    pub workspace: WorkspaceTarget,
    pub agent: AgentDescriptor,
    pub nickname: Option<String>,
    pub prompt: Option<String>,
}

pub struct SpawnResult {
    pub session_id: SessionId,
    pub workspace_id: WorkspaceId,
}

pub struct SessionManager<T: TmxAdapter, N: NotifyAdapter> {
    store: StateStore,
    tmx: T,
    worktrees: Arc<WorktreeManager>,
    notifier: N,
    clock: Arc<dyn Clock>,
    nudge_dir: PathBuf,
    nudge_watchers: Mutex<HashMap<SessionId, NudgeWatcher>>,
}

impl<T: TmxAdapter, N: NotifyAdapter> SessionManager<T, N> {
    pub fn new(store: StateStore, tmx: T, worktrees: Arc<WorktreeManager>, notifier: N, clock: Arc<dyn Clock>, nudge_dir: PathBuf) -> Self {
        Self { store, tmx, worktrees, notifier, clock, nudge_dir, nudge_watchers: Mutex::new(HashMap::new()) }
    }

    /// Steps 1-7 of §4.5. Any failure after the TMX session is created rolls
    /// the session back.
    pub async fn spawn(&self, req: SpawnRequest) -> Result<SpawnResult, EngineError> {
        let (workspace_id, repo, branch) = self.resolve_workspace_record(&req.workspace)?;

        if !self.store.try_lock_prep(&workspace_id) {
            return Err(EngineError::WorkspacePrepInProgress(workspace_id.to_string()));
        }

        let result = self.spawn_locked(&req, &workspace_id, &repo, &branch).await;
        self.store.release_prep_lock(&workspace_id);

        if let Err(err) = &result {
            let _ = self.store.update_workspace(&workspace_id, |ws| {
                ws.status = WorkspaceStatus::Failed { reason: err.to_string() };
            });
        }
        result
    }

    /// Best-effort, idempotent by id (§7). Releasing a prep lock that isn't
    /// held is a no-op, guarding against a crash mid-spawn leaving it stuck.
    pub async fn dispose(&self, session_id: &SessionId) -> Result<(), EngineError> {
        let Some(session) = self.store.get_session(session_id) else {
            return Ok(());
        };
        if let SessionTarget::Local { tmux_session } = &session.target {
            if let Err(err) = self.tmx.kill(tmux_session, TMX_TIMEOUT).await {
                warn!(session_id = %session_id, error = %err, "tmx kill failed during dispose, continuing");
            }
        }
        self.stop_nudge_watcher(session_id);
        self.store.release_prep_lock(&session.workspace_id);
        self.store.remove_session(session_id);
        self.store.persist()?;
        Ok(())
    }

    /// `IsRunning(s)`: cached PID alive via signal 0, else falls back to
    /// TMX existence.
    pub async fn is_running(&self, session: &Session) -> bool {
        if let Some(pid) = session.pid {
            if process_alive(pid) {
                return true;
            }
        }
        match &session.target {
            SessionTarget::Local { tmux_session } => self.tmx.exists(tmux_session, TMX_TIMEOUT).await.unwrap_or(false),
            SessionTarget::Remote { .. } => true,
        }
    }

    /// One liveness sweep over every non-terminal session, downgrading to
    /// `stopped` on a liveness flip. Call this from a daemon-owned interval.
    pub async fn poll_liveness_once(&self) {
        for session in self.store.list_sessions() {
            if session.state.is_terminal() || session.state == SessionState::Stopped {
                continue;
            }
            if !self.is_running(&session).await {
                if self.store.update_session(&session.id, |s| s.state = SessionState::Stopped).is_ok() {
                    info!(session_id = %session.id, "session liveness flipped to stopped");
                }
            }
        }
    }

    fn resolve_workspace_record(&self, target: &WorkspaceTarget) -> Result<(WorkspaceId, String, String), EngineError> {
        match target {
            WorkspaceTarget::Existing(id) => {
                let ws = self.store.get_workspace(id).ok_or_else(|| StateError::WorkspaceNotFound(id.clone()))?;
                Ok((ws.id, ws.repo, ws.branch))
            }
            WorkspaceTarget::New { repo, branch } => {
                if let Some(existing) = self.store.find_workspace(repo, branch) {
                    return Ok((existing.id, existing.repo, existing.branch));
                }
                let placeholder = PathBuf::new();
                let workspace = Workspace::new(repo.clone(), branch.clone(), WorkspaceLocation::Local { path: placeholder }, self.clock.now());
                let id = workspace.id.clone();
                self.store.put_workspace(workspace);
                Ok((id, repo.clone(), branch.clone()))
            }
        }
    }

    async fn spawn_locked(
        &self,
        req: &SpawnRequest,
        workspace_id: &WorkspaceId,
        repo: &str,
        branch: &str,
    ) -> Result<SpawnResult, EngineError> {
        let workspace_path = self.worktrees.prep(workspace_id, repo, branch).await?;
        self.store.update_workspace(workspace_id, |ws| {
            ws.location = WorkspaceLocation::Local { path: workspace_path.clone() };
            ws.status = WorkspaceStatus::Ready;
        })?;

        if req.agent.kind().supports_lifecycle_hook() {
            install_hook_file(&workspace_path, hook_tool_dir_name(&req.agent.kind()))?;
        }

        let session_id = SessionId::new();
        let tmux_name = format!("schmux-{}", session_id.short(10));
        let nudge_path = self.nudge_dir.join(format!("{}.status", session_id.as_str()));
        let env = vec![(STATUS_FILE_ENV.to_string(), nudge_path.display().to_string())];
        let command = build_command_line(&req.agent.binary, &req.agent.interactive_argv());

        self.tmx.create(&tmux_name, &workspace_path, &command, &env, TMX_TIMEOUT).await?;

        match self.finish_spawn(req, &tmux_name, &nudge_path, session_id.clone(), workspace_id.clone()).await {
            Ok(()) => Ok(SpawnResult { session_id, workspace_id: workspace_id.clone() }),
            Err(err) => {
                let _ = self.tmx.kill(&tmux_name, TMX_TIMEOUT).await;
                Err(err)
            }
        }
    }

    async fn finish_spawn(
        &self,
        req: &SpawnRequest,
        tmux_name: &str,
        nudge_path: &Path,
        session_id: SessionId,
        workspace_id: WorkspaceId,
    ) -> Result<(), EngineError> {
        if let Some(prompt) = &req.prompt {
            self.tmx.send_keys(tmux_name, prompt, TMX_TIMEOUT).await?;
            self.tmx.send_enter(tmux_name, TMX_TIMEOUT).await?;
        }
        let pid = self.tmx.get_pane_pid(tmux_name, TMX_TIMEOUT).await?;

        let session = Session {
            id: session_id.clone(),
            workspace_id,
            agent: req.agent.name.clone(),
            nickname: req.nickname.clone(),
            state: SessionState::Running,
            created_at: self.clock.now(),
            last_output_at: None,
            nudge_seq: 0,
            nudge_state: schmux_core::NudgeState::Empty,
            nudge_summary: None,
            target: SessionTarget::Local { tmux_session: tmux_name.to_string() },
            pid: Some(pid),
        };
        self.store.put_session(session);
        self.store.persist()?;

        self.start_nudge_watcher(session_id, nudge_path.to_path_buf());
        Ok(())
    }

    fn start_nudge_watcher(&self, session_id: SessionId, path: PathBuf) {
        let (watcher, mut rx) = NudgeWatcher::spawn(path);
        self.nudge_watchers.lock().insert(session_id.clone(), watcher);
        let store = self.store.clone();
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                let demands_attention = update.state.demands_attention();
                let message = update.message.clone();
                let applied = store.update_session(&session_id, |s| s.apply_nudge(update.state, update.message));
                if applied.is_err() {
                    // session was disposed while the watcher was mid-flight
                    break;
                }
                if demands_attention {
                    let body = message.unwrap_or_else(|| "needs attention".to_string());
                    if let Err(err) = notifier.notify(&format!("{session_id}"), &body).await {
                        warn!(session_id = %session_id, error = %err, "nudge notification failed");
                    }
                }
            }
        });
    }

    fn stop_nudge_watcher(&self, session_id: &SessionId) {
        if let Some(watcher) = self.nudge_watchers.lock().remove(session_id) {
            watcher.stop();
        }
    }
}

fn hook_tool_dir_name(kind: &AgentKind) -> &'static str {
    match kind {
        AgentKind::Claude => "claude",
        AgentKind::Coder => "coder",
        AgentKind::Other(_) => "agent",
    }
}

fn build_command_line(binary: &str, argv: &[String]) -> String {
    let mut parts = vec![binary.to_string()];
    parts.extend(argv.iter().cloned());
    parts.join(" ")
}

fn process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(test)]
#[path = "session_manager_tests.rs"]
mod tests;
