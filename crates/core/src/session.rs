// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identifier, target, and state machine.
//!
//! A session is one agent process attached to a workspace, running inside
//! one TMX target (a local tmux session, or a window/pane on a connected
//! remote host).

use crate::remote_host::RemoteHostId;
use crate::workspace::WorkspaceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Unique identifier for a session instance.
    pub struct SessionId;
}

/// Where a session's TMX target lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionTarget {
    Local { tmux_session: String },
    Remote {
        host: RemoteHostId,
        window_id: String,
        pane_id: String,
    },
}

impl SessionTarget {
    pub fn is_local(&self) -> bool {
        matches!(self, SessionTarget::Local { .. })
    }
}

impl fmt::Display for SessionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionTarget::Local { tmux_session } => write!(f, "{tmux_session}"),
            SessionTarget::Remote { host, window_id, pane_id } => {
                write!(f, "{host}:{window_id}.{pane_id}")
            }
        }
    }
}

/// Session lifecycle state. `Disposed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Spawning,
    Running,
    /// Riding a remote host that has gone `disconnected`; parked rather
    /// than disposed, per the configurable expired-remote-host policy.
    RunningDetached,
    Stopped,
    Disposed,
}

impl SessionState {
    /// The coarse `running` | `stopped` the dashboard shows (§3).
    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Spawning | SessionState::Running | SessionState::RunningDetached)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Disposed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Spawning => "spawning",
            SessionState::Running => "running",
            SessionState::RunningDetached => "running-detached",
            SessionState::Stopped => "stopped",
            SessionState::Disposed => "disposed",
        };
        write!(f, "{s}")
    }
}

/// Resolved nudge state, derived from the last line the agent wrote to
/// `$SCHMUX_STATUS_FILE`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NudgeState {
    #[default]
    Empty,
    Working,
    NeedsInput,
    NeedsTesting,
    Completed,
    Error,
}

impl NudgeState {
    /// States that should play a once-per-`nudge_seq` notification.
    pub fn demands_attention(&self) -> bool {
        matches!(self, NudgeState::NeedsInput | NudgeState::Error | NudgeState::NeedsTesting)
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "working" => Some(NudgeState::Working),
            "completed" => Some(NudgeState::Completed),
            "needs_input" => Some(NudgeState::NeedsInput),
            "needs_testing" => Some(NudgeState::NeedsTesting),
            "error" => Some(NudgeState::Error),
            _ => None,
        }
    }
}

impl fmt::Display for NudgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NudgeState::Empty => "",
            NudgeState::Working => "working",
            NudgeState::NeedsInput => "needs_input",
            NudgeState::NeedsTesting => "needs_testing",
            NudgeState::Completed => "completed",
            NudgeState::Error => "error",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub workspace_id: WorkspaceId,
    pub agent: String,
    pub nickname: Option<String>,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub last_output_at: Option<DateTime<Utc>>,
    pub nudge_seq: u64,
    pub nudge_state: NudgeState,
    pub nudge_summary: Option<String>,
    pub target: SessionTarget,
    /// Cached agent PID; ephemeral but stored durably to speed reattach
    /// after a daemon restart.
    pub pid: Option<u32>,
}

impl Session {
    pub fn new(workspace_id: WorkspaceId, agent: impl Into<String>, target: SessionTarget, now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            workspace_id,
            agent: agent.into(),
            nickname: None,
            state: SessionState::Spawning,
            created_at: now,
            last_output_at: None,
            nudge_seq: 0,
            nudge_state: NudgeState::Empty,
            nudge_summary: None,
            target,
            pid: None,
        }
    }

    pub fn apply_nudge(&mut self, state: NudgeState, summary: Option<String>) {
        self.nudge_seq += 1;
        self.nudge_state = state;
        self.nudge_summary = summary;
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
