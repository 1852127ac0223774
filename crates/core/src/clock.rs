// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wall-clock abstraction so liveness polls, nudge debounce, preview staleness,
//! and remote expiry are deterministic under test.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A source of wall-clock time and monotonic instants.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    fn instant(&self) -> Instant;
}

/// Real clock backed by the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }
}

/// Deterministic clock for tests: starts at a fixed instant and only moves
/// when explicitly advanced.
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeClockState>>,
}

struct FakeClockState {
    now: DateTime<Utc>,
    instant: Instant,
}

impl FakeClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeClockState {
                now,
                instant: Instant::now(),
            })),
        }
    }

    pub fn advance(&self, delta: Duration) {
        let mut g = self.inner.lock();
        g.now += chrono::Duration::from_std(delta).unwrap_or_default();
        g.instant += delta;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        self.inner.lock().now
    }

    fn instant(&self) -> Instant {
        self.inner.lock().instant
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
