// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote host: an active control-mode connection to a remote TMX instance.

use crate::flavor::FlavorId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Unique identifier for a remote host connection.
    pub struct RemoteHostId;
}

/// Connection status. Ephemeral: reset to `Connecting` on daemon restart,
/// never restored from the persisted durable subset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteHostStatus {
    #[default]
    Connecting,
    Connected,
    Disconnected,
    Expired,
}

impl fmt::Display for RemoteHostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteHostStatus::Connecting => write!(f, "connecting"),
            RemoteHostStatus::Connected => write!(f, "connected"),
            RemoteHostStatus::Disconnected => write!(f, "disconnected"),
            RemoteHostStatus::Expired => write!(f, "expired"),
        }
    }
}

impl RemoteHostStatus {
    pub fn is_terminalish(&self) -> bool {
        matches!(self, RemoteHostStatus::Expired)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteHost {
    pub id: RemoteHostId,
    pub flavor_id: FlavorId,
    pub hostname: Option<String>,
    /// Ephemeral: always `Connecting` immediately after `Load`; the
    /// connection manager re-establishes and re-observes real status.
    #[serde(skip)]
    pub status: RemoteHostStatus,
    pub connected_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RemoteHost {
    pub fn new(flavor_id: FlavorId, now: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            id: RemoteHostId::new(),
            flavor_id,
            hostname: None,
            status: RemoteHostStatus::Connecting,
            connected_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
#[path = "remote_host_tests.rs"]
mod tests;
