// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::workspace::WorkspaceId;
use yare::parameterized;

#[parameterized(
    loopback_v4 = { "127.0.0.1", true },
    loopback_v6 = { "::1", true },
    localhost = { "localhost", true },
    lan_ip = { "192.168.1.5", false },
    hostname = { "example.com", false },
)]
fn checks_loopback_host(host: &str, expected: bool) {
    assert_eq!(is_loopback_host(host), expected);
}

#[test]
fn matches_checks_all_three_keys() {
    let ws = WorkspaceId::new();
    let preview = Preview::new(ws.clone(), "127.0.0.1", 3000, Utc::now());
    assert!(preview.matches(&ws, "127.0.0.1", 3000));
    assert!(!preview.matches(&ws, "127.0.0.1", 3001));
    assert!(!preview.matches(&WorkspaceId::new(), "127.0.0.1", 3000));
}

#[test]
fn is_idle_after_timeout() {
    let now = Utc::now();
    let preview = Preview::new(WorkspaceId::new(), "127.0.0.1", 3000, now - chrono::Duration::minutes(10));
    assert!(preview.is_idle(now, chrono::Duration::minutes(5)));
    assert!(!preview.is_idle(now, chrono::Duration::minutes(20)));
}

#[test]
fn is_stale_uses_last_healthy_or_created() {
    let created = Utc::now() - chrono::Duration::minutes(5);
    let mut preview = Preview::new(WorkspaceId::new(), "127.0.0.1", 3000, created);
    assert!(preview.is_stale(Utc::now(), chrono::Duration::minutes(1)));

    preview.last_healthy_at = Some(Utc::now());
    assert!(!preview.is_stale(Utc::now(), chrono::Duration::minutes(1)));
}
