// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The durable subset of state (§6 "Persistent state file"): workspaces,
//! sessions, remote hosts (minus ephemeral status), and configured flavors.
//! Previews are intentionally excluded — they are bounded, reapable, and
//! reconstructed fresh on every daemon start (§4.8).

use schmux_core::{Flavor, FlavorId, RemoteHost, RemoteHostId, Session, SessionId, Workspace, WorkspaceId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The on-disk shape of the state file. Ephemeral fields on each entity
/// carry `#[serde(skip)]` so `Default`s are substituted transparently on
/// deserialize, per §4.4 ("`Load` ... leaves ephemeral fields at their
/// zero value").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DurableState {
    pub workspaces: HashMap<WorkspaceId, Workspace>,
    pub sessions: HashMap<SessionId, Session>,
    pub remote_hosts: HashMap<RemoteHostId, RemoteHost>,
    pub flavors: HashMap<FlavorId, Flavor>,
}
