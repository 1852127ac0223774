// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::flavor::FlavorId;

#[test]
fn new_host_starts_connecting_and_not_expired() {
    let now = Utc::now();
    let host = RemoteHost::new(FlavorId::from_string("work"), now, chrono::Duration::hours(8));
    assert_eq!(host.status, RemoteHostStatus::Connecting);
    assert!(!host.is_expired(now));
}

#[test]
fn is_expired_once_ttl_elapses() {
    let now = Utc::now();
    let host = RemoteHost::new(FlavorId::from_string("work"), now, chrono::Duration::seconds(1));
    assert!(host.is_expired(now + chrono::Duration::seconds(2)));
}
