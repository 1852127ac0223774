// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crate-wide error type for the orchestration layer.

use schmux_adapters::{ControlModeError, HookError, TmxError, WorktreeError};
use schmux_core::{AgentError, CoreError};
use schmux_storage::StateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Tmx(#[from] TmxError),
    #[error(transparent)]
    Worktree(#[from] WorktreeError),
    #[error(transparent)]
    ControlMode(#[from] ControlModeError),
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error(transparent)]
    Hook(#[from] HookError),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("another spawn is already preparing workspace {0}")]
    WorkspacePrepInProgress(String),
    #[error("one-shot invocation unsupported for agent '{0}'")]
    OneShotUnsupported(String),
    #[error("git diff failed: {0}")]
    DiffFailed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
