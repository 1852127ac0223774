// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::workspace::WorkspaceId;
use yare::parameterized;

fn new_session() -> Session {
    Session::new(
        WorkspaceId::new(),
        "claude",
        SessionTarget::Local { tmux_session: "schmux-abc".into() },
        Utc::now(),
    )
}

#[parameterized(
    spawning = { SessionState::Spawning, true },
    running = { SessionState::Running, true },
    running_detached = { SessionState::RunningDetached, true },
    stopped = { SessionState::Stopped, false },
    disposed = { SessionState::Disposed, false },
)]
fn is_running_matches_spec(state: SessionState, expected: bool) {
    assert_eq!(state.is_running(), expected);
}

#[test]
fn disposed_is_terminal() {
    assert!(SessionState::Disposed.is_terminal());
    assert!(!SessionState::Stopped.is_terminal());
}

#[parameterized(
    needs_input = { NudgeState::NeedsInput, true },
    error = { NudgeState::Error, true },
    needs_testing = { NudgeState::NeedsTesting, true },
    working = { NudgeState::Working, false },
    completed = { NudgeState::Completed, false },
    empty = { NudgeState::Empty, false },
)]
fn demands_attention_matches_spec(state: NudgeState, expected: bool) {
    assert_eq!(state.demands_attention(), expected);
}

#[test]
fn apply_nudge_increments_seq_every_call() {
    let mut session = new_session();
    assert_eq!(session.nudge_seq, 0);
    session.apply_nudge(NudgeState::Working, None);
    assert_eq!(session.nudge_seq, 1);
    session.apply_nudge(NudgeState::NeedsInput, Some("waiting on you".into()));
    assert_eq!(session.nudge_seq, 2);
    assert_eq!(session.nudge_state, NudgeState::NeedsInput);
    assert_eq!(session.nudge_summary.as_deref(), Some("waiting on you"));
}

#[test]
fn nudge_state_parse_rejects_unknown_tags() {
    assert_eq!(NudgeState::parse("working"), Some(NudgeState::Working));
    assert_eq!(NudgeState::parse("bogus"), None);
}

#[test]
fn local_target_display_is_bare_session_name() {
    let target = SessionTarget::Local { tmux_session: "schmux-abc".into() };
    assert_eq!(target.to_string(), "schmux-abc");
    assert!(target.is_local());
}
