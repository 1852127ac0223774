// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP surface (§6): the loopback REST+WS API the CLI and dashboard speak.
//! No separate Unix-socket protocol, unlike the teacher's `daemon::listener`
//! — a full REST+WS surface already covers every verb the CLI needs.

mod error;
mod ws;

pub use error::AppError;

use crate::config::Config;
use crate::lifecycle::{DaemonState, Notifier, Tmx};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::RwLock;
use schmux_core::{SessionId, WorkspaceId};
use schmux_engine::{workspace_snapshots, Broadcaster, PreviewManager, RemoteManager, SessionManager, SpawnRequest, TerminalHub, WorkspaceSnapshot, WorkspaceTarget};
use schmux_storage::StateStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub store: StateStore,
    pub config: Arc<RwLock<Config>>,
    pub sessions: Arc<SessionManager<Tmx, Notifier>>,
    pub remote: Arc<RemoteManager>,
    pub terminal: Arc<TerminalHub<Tmx>>,
    pub previews: Arc<PreviewManager>,
    pub broadcaster: Arc<Broadcaster>,
    pub start: Instant,
}

impl AppState {
    pub fn new(daemon: &DaemonState) -> Self {
        Self {
            store: daemon.store.clone(),
            config: Arc::new(RwLock::new(daemon.config.clone())),
            sessions: daemon.sessions.clone(),
            remote: daemon.remote.clone(),
            terminal: daemon.terminal.clone(),
            previews: daemon.previews.clone(),
            broadcaster: daemon.broadcaster.clone(),
            start: daemon.start_time,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/healthz", get(healthz))
        .route("/api/config", get(get_config).put(put_config))
        .route("/api/sessions", get(get_sessions))
        .route("/api/spawn", post(post_spawn))
        .route("/api/dispose/{id}", post(post_dispose))
        .route("/api/workspaces", get(get_workspaces))
        .route("/api/workspaces/{id}/refresh-overlay", post(post_refresh_overlay))
        .route("/api/diff/{workspace_id}", get(get_diff))
        .route("/ws/dashboard", get(ws::dashboard_ws))
        .route("/ws/terminal/{session_id}", get(ws::terminal_ws))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    version: &'static str,
    uptime_secs: u64,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthBody> {
    Json(HealthBody { status: "ok", version: crate::lifecycle::DAEMON_VERSION, uptime_secs: state.start.elapsed().as_secs() })
}

async fn get_config(State(state): State<AppState>) -> Json<Config> {
    Json(state.config.read().clone())
}

async fn put_config(State(state): State<AppState>, Json(incoming): Json<Config>) -> Result<Json<Config>, AppError> {
    let merged = {
        let mut current = state.config.write();
        let paths = current.clone();
        *current = incoming;
        current.state_dir = paths.state_dir;
        current.lock_path = paths.lock_path;
        current.version_path = paths.version_path;
        current.log_path = paths.log_path;
        current.state_path = paths.state_path;
        current.data_path = paths.data_path;
        current.nudge_path = paths.nudge_path;
        current.clone()
    };

    state.store.set_flavors(merged.flavors.clone());
    let toml_text = toml::to_string_pretty(&merged).map_err(|e| AppError::bad_request(e.to_string()))?;
    tokio::fs::write(merged.state_dir.join("config.toml"), toml_text).await.map_err(|e| AppError::bad_request(e.to_string()))?;

    Ok(Json(merged))
}

#[derive(Serialize)]
struct SessionsBody {
    workspaces: Vec<WorkspaceSnapshot>,
}

async fn get_sessions(State(state): State<AppState>) -> Json<SessionsBody> {
    Json(SessionsBody { workspaces: workspace_snapshots(&state.store) })
}

async fn get_workspaces(State(state): State<AppState>) -> Json<SessionsBody> {
    Json(SessionsBody { workspaces: workspace_snapshots(&state.store) })
}

#[derive(Deserialize)]
struct SpawnBody {
    repo: Option<String>,
    workspace_id: Option<String>,
    branch: String,
    prompt: Option<String>,
    nickname: Option<String>,
    targets: HashMap<String, u32>,
}

#[derive(Serialize)]
struct SpawnResultBody {
    session_id: String,
    workspace_id: String,
}

async fn post_spawn(State(state): State<AppState>, Json(body): Json<SpawnBody>) -> Result<Json<Vec<SpawnResultBody>>, AppError> {
    let mut workspace = match (&body.workspace_id, &body.repo) {
        (Some(id), _) => WorkspaceTarget::Existing(WorkspaceId::from_string(id.clone())),
        (None, Some(repo)) => {
            let url = state.config.read().repo_url(repo).map(str::to_string).ok_or_else(|| AppError::bad_request(format!("unknown repo '{repo}'")))?;
            WorkspaceTarget::New { repo: url, branch: body.branch.clone() }
        }
        (None, None) => return Err(AppError::bad_request("spawn requires 'repo' or 'workspace_id'")),
    };

    if body.targets.is_empty() {
        return Err(AppError::bad_request("spawn requires at least one entry in 'targets'"));
    }

    let mut results = Vec::new();
    for (agent_name, count) in &body.targets {
        let agent = state.config.read().agent(agent_name).cloned().ok_or_else(|| AppError::bad_request(format!("unknown agent '{agent_name}'")))?;
        for _ in 0..*count {
            let req = SpawnRequest { workspace: workspace.clone(), agent: agent.clone(), nickname: body.nickname.clone(), prompt: body.prompt.clone() };
            let result = state.sessions.spawn(req).await?;
            workspace = WorkspaceTarget::Existing(result.workspace_id.clone());
            results.push(SpawnResultBody { session_id: result.session_id.to_string(), workspace_id: result.workspace_id.to_string() });
        }
    }
    Ok(Json(results))
}

async fn post_dispose(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, AppError> {
    state.sessions.dispose(&SessionId::from_string(id)).await?;
    Ok(StatusCode::OK)
}

async fn post_refresh_overlay(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<schmux_core::GitStatus>, AppError> {
    let workspace_id = WorkspaceId::from_string(id);
    let workspace = state.store.get_workspace(&workspace_id).ok_or_else(|| AppError::not_found(format!("workspace {workspace_id} not found")))?;
    if !workspace.location.is_local() {
        return Err(AppError::bad_request("refresh-overlay requires a local workspace"));
    }
    let status = schmux_engine::refresh_git_status(workspace.location.path()).await?;
    state.store.update_workspace(&workspace_id, |w| w.git_status = status.clone())?;
    Ok(Json(status))
}

async fn get_diff(State(state): State<AppState>, Path(workspace_id): Path<String>) -> Result<Json<schmux_engine::WorkspaceDiff>, AppError> {
    let workspace_id = WorkspaceId::from_string(workspace_id);
    let workspace = state.store.get_workspace(&workspace_id).ok_or_else(|| AppError::not_found(format!("workspace {workspace_id} not found")))?;
    if !workspace.location.is_local() {
        return Err(AppError::bad_request("diff requires a local workspace"));
    }
    let diff = schmux_engine::compute_diff(workspace.location.path()).await?;
    Ok(Json(diff))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
