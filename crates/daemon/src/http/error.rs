// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP error mapping (§7): every handler error becomes a
//! `{error: string, kind: string}` JSON body with an appropriate status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use schmux_engine::EngineError;
use schmux_storage::StateError;
use serde::Serialize;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Engine(EngineError),
    State(StateError),
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::Engine(EngineError::WorkspacePrepInProgress(msg)) => (StatusCode::CONFLICT, "workspace_prep_in_progress", msg),
            AppError::Engine(EngineError::OneShotUnsupported(msg)) => (StatusCode::BAD_REQUEST, "one_shot_unsupported", msg),
            AppError::Engine(EngineError::DiffFailed(msg)) => (StatusCode::BAD_GATEWAY, "diff_failed", msg),
            AppError::Engine(EngineError::State(err)) => return AppError::State(err).into_response(),
            AppError::Engine(err) => (StatusCode::INTERNAL_SERVER_ERROR, "engine_error", err.to_string()),
            AppError::State(StateError::WorkspaceNotFound(id)) => (StatusCode::NOT_FOUND, "workspace_not_found", id.to_string()),
            AppError::State(StateError::SessionNotFound(id)) => (StatusCode::NOT_FOUND, "session_not_found", id.to_string()),
            AppError::State(StateError::RemoteHostNotFound(id)) => (StatusCode::NOT_FOUND, "remote_host_not_found", id.to_string()),
            AppError::State(StateError::PreviewNotFound(id)) => (StatusCode::NOT_FOUND, "preview_not_found", id.to_string()),
            AppError::State(err) => (StatusCode::INTERNAL_SERVER_ERROR, "state_error", err.to_string()),
        };
        (status, Json(ErrorBody { error: message, kind: kind.to_string() })).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        AppError::Engine(err)
    }
}

impl From<StateError> for AppError {
    fn from(err: StateError) -> Self {
        AppError::State(err)
    }
}
