// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flavor: a named recipe for opening a remote control-mode connection.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifier for a configured remote flavor (also its config-file key).
    pub struct FlavorId;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VcsKind {
    Git,
}

/// A named recipe for connecting to a remote host: how to launch the
/// control-mode subprocess, and where remote workspaces live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flavor {
    pub id: FlavorId,
    /// Shell command template that launches the remote TMX control-mode
    /// subprocess, e.g. `ssh work-box tmux -C new-session -A -s schmux`.
    pub connect_command: String,
    /// Base directory under which remote workspaces are created.
    pub workspace_root: String,
    pub vcs: VcsKind,
}
