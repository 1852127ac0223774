// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concrete adapters over the outside world: the multiplexer binary, the
//! remote control-mode protocol, git worktrees, desktop notifications, and
//! the per-session nudge status file.

pub mod agent;
pub mod control_mode;
pub mod notify;
pub mod nudge;
pub mod subprocess;
pub mod tmux;
pub mod worktree;

pub use agent::{install_hook_file, HookError, STATUS_FILE_ENV};
pub use control_mode::{parse_line, unescape_octal, ControlClient, ControlEvent, ControlLine, ControlModeError, OutputEvent};
pub use notify::{DesktopNotifyAdapter, NoOpNotifyAdapter, NotifyAdapter, NotifyError};
pub use nudge::{NudgeUpdate, NudgeWatcher};
pub use subprocess::{run_with_timeout, PREVIEW_DIAL_TIMEOUT, TMX_TIMEOUT, WORKTREE_TIMEOUT};
pub use tmux::{parse_attach_command, TmxAdapter, TmxCli, TmxError};
pub use worktree::{KeyedLock, WorktreeError, WorktreeManager};

#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifyAdapter, NotifyCall};
#[cfg(any(test, feature = "test-support"))]
pub use tmux::{FakeTmx, TmxCall};
