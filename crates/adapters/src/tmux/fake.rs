// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory TMX double for engine-level tests: no real tmux process is spawned.

use super::{TmxAdapter, TmxError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum TmxCall {
    Create { name: String, cwd: PathBuf, cmd: String },
    Exists { target: String },
    Kill { target: String },
    List,
    CapturePane { target: String },
    SendKeys { target: String, text: String },
    SendEnter { target: String },
    GetPanePid { target: String },
}

struct FakeSession {
    pane_pid: u32,
    output: String,
}

struct FakeTmxState {
    sessions: HashMap<String, FakeSession>,
    calls: Vec<TmxCall>,
    next_pid: u32,
}

/// Fake [`TmxAdapter`]. Sessions created via [`FakeTmx::create`] are tracked
/// in memory; `capture_pane` returns whatever was last injected via
/// [`FakeTmx::set_output`], followed by a log of keys sent.
#[derive(Clone)]
pub struct FakeTmx {
    inner: Arc<Mutex<FakeTmxState>>,
}

impl Default for FakeTmx {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeTmxState {
                sessions: HashMap::new(),
                calls: Vec::new(),
                next_pid: 1000,
            })),
        }
    }
}

impl FakeTmx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<TmxCall> {
        self.inner.lock().calls.clone()
    }

    pub fn set_output(&self, target: &str, output: impl Into<String>) {
        if let Some(session) = self.inner.lock().sessions.get_mut(target) {
            session.output = output.into();
        }
    }

    pub fn session_count(&self) -> usize {
        self.inner.lock().sessions.len()
    }
}

#[async_trait]
impl TmxAdapter for FakeTmx {
    async fn create(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        _env: &[(String, String)],
        _deadline: Duration,
    ) -> Result<(), TmxError> {
        let mut state = self.inner.lock();
        state.calls.push(TmxCall::Create { name: name.to_string(), cwd: cwd.to_path_buf(), cmd: cmd.to_string() });
        let pid = state.next_pid;
        state.next_pid += 1;
        state.sessions.insert(name.to_string(), FakeSession { pane_pid: pid, output: String::new() });
        Ok(())
    }

    async fn exists(&self, target: &str, _deadline: Duration) -> Result<bool, TmxError> {
        let mut state = self.inner.lock();
        state.calls.push(TmxCall::Exists { target: target.to_string() });
        Ok(state.sessions.contains_key(target))
    }

    async fn kill(&self, target: &str, _deadline: Duration) -> Result<(), TmxError> {
        let mut state = self.inner.lock();
        state.calls.push(TmxCall::Kill { target: target.to_string() });
        state.sessions.remove(target);
        Ok(())
    }

    async fn list(&self, _deadline: Duration) -> Result<Vec<String>, TmxError> {
        let mut state = self.inner.lock();
        state.calls.push(TmxCall::List);
        Ok(state.sessions.keys().cloned().collect())
    }

    async fn capture_pane(&self, target: &str, _deadline: Duration) -> Result<String, TmxError> {
        let mut state = self.inner.lock();
        state.calls.push(TmxCall::CapturePane { target: target.to_string() });
        state
            .sessions
            .get(target)
            .map(|s| s.output.clone())
            .ok_or_else(|| TmxError::NotFound(target.to_string()))
    }

    async fn send_keys(&self, target: &str, text: &str, _deadline: Duration) -> Result<(), TmxError> {
        let mut state = self.inner.lock();
        state.calls.push(TmxCall::SendKeys { target: target.to_string(), text: text.to_string() });
        if state.sessions.contains_key(target) {
            Ok(())
        } else {
            Err(TmxError::NotFound(target.to_string()))
        }
    }

    async fn send_enter(&self, target: &str, _deadline: Duration) -> Result<(), TmxError> {
        let mut state = self.inner.lock();
        state.calls.push(TmxCall::SendEnter { target: target.to_string() });
        if state.sessions.contains_key(target) {
            Ok(())
        } else {
            Err(TmxError::NotFound(target.to_string()))
        }
    }

    async fn get_pane_pid(&self, target: &str, _deadline: Duration) -> Result<u32, TmxError> {
        let mut state = self.inner.lock();
        state.calls.push(TmxCall::GetPanePid { target: target.to_string() });
        state.sessions.get(target).map(|s| s.pane_pid).ok_or_else(|| TmxError::NotFound(target.to_string()))
    }
}
