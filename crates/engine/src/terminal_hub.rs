// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal stream hub (§4.7): one producer loop per session polling the
//! pane, broadcasting append/full frames to viewer subscribers with a
//! coalesce-to-full overflow policy, and serializing keystroke ingress.

use crate::error::EngineError;
use crate::remote_manager::RemoteManager;
use parking_lot::Mutex;
use schmux_adapters::TmxAdapter;
use schmux_core::{SessionId, SessionState, SessionTarget};
use schmux_storage::{StateError, StateStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Default producer tick. Within the 50-150ms band §4.7 calls for.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);
const SUBSCRIBER_QUEUE_DEPTH: usize = 256;
const PANE_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub enum TerminalFrame {
    Append(String),
    Full(String),
}

enum PaneSource<T: TmxAdapter> {
    Local { tmx: T, target: String },
    Remote { remote: Arc<RemoteManager>, flavor: schmux_core::FlavorId, pane_id: String },
}

impl<T: TmxAdapter> PaneSource<T> {
    async fn capture(&self) -> Result<String, EngineError> {
        match self {
            PaneSource::Local { tmx, target } => Ok(tmx.capture_pane(target, PANE_DEADLINE).await?),
            PaneSource::Remote { remote, flavor, pane_id } => {
                let conn = remote.connection(flavor).ok_or_else(|| EngineError::Io(std::io::Error::other("remote connection not found")))?;
                Ok(conn.client().execute(&format!("capture-pane -p -S - -t {pane_id}"), PANE_DEADLINE).await?)
            }
        }
    }

    async fn send_keys(&self, text: &str) -> Result<(), EngineError> {
        match self {
            PaneSource::Local { tmx, target } => {
                tmx.send_keys(target, text, PANE_DEADLINE).await?;
                Ok(())
            }
            PaneSource::Remote { remote, flavor, pane_id } => {
                let conn = remote.connection(flavor).ok_or_else(|| EngineError::Io(std::io::Error::other("remote connection not found")))?;
                let command = format!("send-keys -l -t {pane_id} -- {}", tmux_quote(text));
                conn.client().execute(&command, PANE_DEADLINE).await?;
                Ok(())
            }
        }
    }
}

fn tmux_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "'\\''"))
}

struct Subscriber {
    tx: mpsc::Sender<TerminalFrame>,
    paused: Arc<AtomicBool>,
    needs_full: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
}

struct StreamEntry<T: TmxAdapter> {
    subscribers: Mutex<HashMap<u64, Subscriber>>,
    next_subscriber_id: AtomicU64,
    cancel: CancellationToken,
    source: Arc<PaneSource<T>>,
}

pub struct TerminalHub<T: TmxAdapter> {
    store: StateStore,
    tmx: T,
    remote: Arc<RemoteManager>,
    tick: Duration,
    streams: Arc<Mutex<HashMap<SessionId, Arc<StreamEntry<T>>>>>,
}

impl<T: TmxAdapter> TerminalHub<T> {
    pub fn new(store: StateStore, tmx: T, remote: Arc<RemoteManager>, tick: Duration) -> Self {
        Self { store, tmx, remote, tick, streams: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Subscribe a new viewer. Lazily starts the session's producer loop on
    /// first attach.
    pub async fn attach(&self, session_id: &SessionId) -> Result<(u64, mpsc::Receiver<TerminalFrame>), EngineError> {
        let entry = self.ensure_stream(session_id).await?;
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_DEPTH);
        let id = entry.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        entry.subscribers.lock().insert(
            id,
            Subscriber {
                tx,
                paused: Arc::new(AtomicBool::new(false)),
                needs_full: Arc::new(AtomicBool::new(false)),
                dropped: Arc::new(AtomicU64::new(0)),
            },
        );
        Ok((id, rx))
    }

    pub fn detach(&self, session_id: &SessionId, subscriber_id: u64) {
        if let Some(entry) = self.streams.lock().get(session_id).cloned() {
            entry.subscribers.lock().remove(&subscriber_id);
        }
    }

    /// Toggles delivery for one subscriber without affecting the producer.
    pub fn set_paused(&self, session_id: &SessionId, subscriber_id: u64, paused: bool) {
        if let Some(entry) = self.streams.lock().get(session_id).cloned() {
            if let Some(sub) = entry.subscribers.lock().get(&subscriber_id) {
                sub.paused.store(paused, Ordering::Relaxed);
            }
        }
    }

    pub async fn send_input(&self, session_id: &SessionId, text: &str) -> Result<(), EngineError> {
        let entry = self.ensure_stream(session_id).await?;
        entry.source.send_keys(text).await
    }

    async fn ensure_stream(&self, session_id: &SessionId) -> Result<Arc<StreamEntry<T>>, EngineError> {
        if let Some(entry) = self.streams.lock().get(session_id).cloned() {
            return Ok(entry);
        }
        let session = self.store.get_session(session_id).ok_or_else(|| StateError::SessionNotFound(session_id.clone()))?;
        let source = Arc::new(self.resolve_source(&session.target)?);
        let entry = Arc::new(StreamEntry {
            subscribers: Mutex::new(HashMap::new()),
            next_subscriber_id: AtomicU64::new(0),
            cancel: CancellationToken::new(),
            source,
        });
        self.streams.lock().insert(session_id.clone(), entry.clone());
        spawn_producer(self.store.clone(), self.streams.clone(), session_id.clone(), entry.clone(), self.tick);
        Ok(entry)
    }

    fn resolve_source(&self, target: &SessionTarget) -> Result<PaneSource<T>, EngineError> {
        match target {
            SessionTarget::Local { tmux_session } => Ok(PaneSource::Local { tmx: self.tmx.clone(), target: tmux_session.clone() }),
            SessionTarget::Remote { host, pane_id, .. } => {
                let flavor = self
                    .store
                    .list_remote_hosts()
                    .into_iter()
                    .find(|h| &h.id == host)
                    .map(|h| h.flavor_id)
                    .ok_or_else(|| EngineError::Io(std::io::Error::other("remote host not found for session")))?;
                Ok(PaneSource::Remote { remote: self.remote.clone(), flavor, pane_id: pane_id.clone() })
            }
        }
    }
}

fn spawn_producer<T: TmxAdapter>(
    store: StateStore,
    streams: Arc<Mutex<HashMap<SessionId, Arc<StreamEntry<T>>>>>,
    session_id: SessionId,
    entry: Arc<StreamEntry<T>>,
    tick: Duration,
) {
    tokio::spawn(async move {
        let mut prior = String::new();
        loop {
            tokio::select! {
                _ = entry.cancel.cancelled() => break,
                _ = tokio::time::sleep(tick) => {}
            }

            let current = match entry.source.capture().await {
                Ok(text) => text,
                Err(err) => {
                    warn!(session_id = %session_id, error = %err, "terminal producer capture failed");
                    continue;
                }
            };

            let frame = if let Some(suffix) = current.strip_prefix(prior.as_str()) {
                TerminalFrame::Append(suffix.to_string())
            } else {
                TerminalFrame::Full(current.clone())
            };
            broadcast(&entry, &frame, &current);
            prior = current;

            let should_stop = match store.get_session(&session_id) {
                Some(session) => matches!(session.state, SessionState::Stopped | SessionState::Disposed),
                None => true,
            };
            if should_stop {
                broadcast(&entry, &TerminalFrame::Full(prior.clone()), &prior);
                break;
            }
        }
        streams.lock().remove(&session_id);
    });
}

fn broadcast<T: TmxAdapter>(entry: &StreamEntry<T>, frame: &TerminalFrame, full: &str) {
    let mut subs = entry.subscribers.lock();
    subs.retain(|_, sub| {
        if sub.paused.load(Ordering::Relaxed) {
            return true;
        }
        let outgoing = if sub.needs_full.swap(false, Ordering::AcqRel) {
            TerminalFrame::Full(full.to_string())
        } else {
            frame.clone()
        };
        match sub.tx.try_send(outgoing) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                sub.needs_full.store(true, Ordering::Release);
                let dropped = sub.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped.is_power_of_two() {
                    warn!(total_dropped = dropped, "terminal subscriber queue saturated, forcing full resync");
                }
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    });
}

#[cfg(test)]
#[path = "terminal_hub_tests.rs"]
mod tests;
