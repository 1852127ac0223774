// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-mode client: assigns monotonic command ids, writes commands to
//! the subprocess stdin, and routes each `%begin`/`%end`/`%error` response
//! back to the caller that issued it.

use super::parser::{parse_line, ControlEvent, ControlLine};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ControlModeError {
    #[error("command timed out after {0:?}")]
    Timeout(Duration),
    #[error("command failed: {0}")]
    CommandFailed(String),
    #[error("client closed")]
    Closed,
    #[error("io error: {0}")]
    Io(String),
}

type ResponseResult = Result<String, String>;

/// Output events channel item: `(pane_id, unescaped bytes)`.
pub type OutputEvent = (String, Vec<u8>);

struct Shared {
    next_id: AtomicU64,
    pending: parking_lot::Mutex<HashMap<u64, oneshot::Sender<ResponseResult>>>,
    stdin: AsyncMutex<Box<dyn AsyncWrite + Unpin + Send>>,
    ready: Notify,
    ready_fired: AtomicBool,
    closed: AtomicBool,
    dropped_responses: AtomicU64,
    dropped_output: AtomicU64,
    dropped_notifications: AtomicU64,
}

/// A client bound to one remote's control-mode subprocess.
pub struct ControlClient {
    shared: Arc<Shared>,
    dispatcher: AsyncMutex<Option<JoinHandle<()>>>,
}

impl ControlClient {
    /// Spawn the dispatcher task over `stdout`/`stdin`. Returns the client
    /// plus receivers for the output-events and notification-events channels.
    pub fn spawn<R, W>(stdout: R, stdin: W) -> (Self, mpsc::Receiver<OutputEvent>, mpsc::Receiver<ControlEvent>)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let shared = Arc::new(Shared {
            next_id: AtomicU64::new(0),
            pending: parking_lot::Mutex::new(HashMap::new()),
            stdin: AsyncMutex::new(Box::new(stdin)),
            ready: Notify::new(),
            ready_fired: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            dropped_responses: AtomicU64::new(0),
            dropped_output: AtomicU64::new(0),
            dropped_notifications: AtomicU64::new(0),
        });

        let (output_tx, output_rx) = mpsc::channel(4096);
        let (notif_tx, notif_rx) = mpsc::channel(1024);

        let dispatcher_shared = shared.clone();
        let handle = tokio::spawn(async move {
            run_dispatcher(dispatcher_shared, stdout, output_tx, notif_tx).await;
        });

        (Self { shared, dispatcher: AsyncMutex::new(Some(handle)) }, output_rx, notif_rx)
    }

    /// Resolves once the first `%`-prefixed line has been observed.
    pub async fn wait_ready(&self) {
        if self.shared.ready_fired.load(Ordering::Acquire) {
            return;
        }
        self.shared.ready.notified().await;
    }

    pub fn is_ready(&self) -> bool {
        self.shared.ready_fired.load(Ordering::Acquire)
    }

    /// Send `command` and await its response body, unregistering the
    /// per-command channel on every exit path.
    pub async fn execute(&self, command: &str, deadline: Duration) -> Result<String, ControlModeError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(ControlModeError::Closed);
        }
        let (tx, rx) = oneshot::channel();

        // Allocate the id and write the command inside the same stdin
        // critical section so id order matches the order TMX actually
        // observes commands on the control socket.
        let (id, write_result) = {
            let mut stdin = self.shared.stdin.lock().await;
            let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
            self.shared.pending.lock().insert(id, tx);
            let mut line = command.as_bytes().to_vec();
            line.push(b'\n');
            let result = stdin.write_all(&line).await.and_then(|_| stdin.flush().await);
            (id, result)
        };
        if let Err(err) = write_result {
            self.shared.pending.lock().remove(&id);
            return Err(ControlModeError::Io(err.to_string()));
        }

        let outcome = tokio::time::timeout(deadline, rx).await;
        self.shared.pending.lock().remove(&id);
        match outcome {
            Ok(Ok(Ok(body))) => Ok(body),
            Ok(Ok(Err(body))) => Err(ControlModeError::CommandFailed(body)),
            Ok(Err(_recv_dropped)) => Err(ControlModeError::Closed),
            Err(_elapsed) => Err(ControlModeError::Timeout(deadline)),
        }
    }

    pub fn dropped_response_count(&self) -> u64 {
        self.shared.dropped_responses.load(Ordering::Relaxed)
    }

    pub fn dropped_output_count(&self) -> u64 {
        self.shared.dropped_output.load(Ordering::Relaxed)
    }

    /// Tear down the dispatcher and all registered channels.
    pub async fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        if let Some(handle) = self.dispatcher.lock().await.take() {
            handle.abort();
        }
        self.shared.pending.lock().clear();
    }
}

async fn run_dispatcher<R>(
    shared: Arc<Shared>,
    stdout: R,
    output_tx: mpsc::Sender<OutputEvent>,
    notif_tx: mpsc::Sender<ControlEvent>,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut lines = BufReader::new(stdout).lines();
    let mut current_response: Option<(u64, Vec<String>)> = None;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "control-mode stream read error");
                break;
            }
        };

        let parsed = parse_line(&line);
        if !matches!(parsed, ControlLine::Body(_)) && !shared.ready_fired.swap(true, Ordering::AcqRel) {
            shared.ready.notify_waiters();
        }

        match parsed {
            ControlLine::Body(text) => {
                if let Some((_, body)) = current_response.as_mut() {
                    body.push(text);
                }
            }
            ControlLine::Begin { id, .. } => {
                current_response = Some((id, Vec::new()));
            }
            ControlLine::End { id, .. } => {
                finish_response(&shared, &mut current_response, id, Ok(()));
            }
            ControlLine::Error { id, .. } => {
                finish_response(&shared, &mut current_response, id, Err(()));
            }
            ControlLine::Output { pane_id, data } => {
                if output_tx.try_send((pane_id, data)).is_err() {
                    let dropped = shared.dropped_output.fetch_add(1, Ordering::Relaxed) + 1;
                    log_drop_at_exponential_interval(dropped, "output");
                }
            }
            ControlLine::Notification(event) => {
                if notif_tx.try_send(event).is_err() {
                    let dropped = shared.dropped_notifications.fetch_add(1, Ordering::Relaxed) + 1;
                    log_drop_at_exponential_interval(dropped, "notification");
                }
            }
        }
    }

    shared.closed.store(true, Ordering::Release);
    let pending: Vec<_> = shared.pending.lock().drain().collect();
    for (_, tx) in pending {
        let _ = tx.send(Err("control-mode stream closed".to_string()));
    }
}

fn finish_response(shared: &Shared, current: &mut Option<(u64, Vec<String>)>, id: u64, outcome: Result<(), ()>) {
    let body = match current.take() {
        Some((open_id, lines)) if open_id == id => lines.join("\n"),
        _ => String::new(),
    };
    let sender = shared.pending.lock().remove(&id);
    match sender {
        Some(tx) => {
            let result = if outcome.is_ok() { Ok(body) } else { Err(body) };
            if tx.send(result).is_err() {
                let dropped = shared.dropped_responses.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(command_id = id, total_dropped = dropped, "control-mode response dropped: receiver gone");
            }
        }
        None => {
            let dropped = shared.dropped_responses.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(command_id = id, total_dropped = dropped, "control-mode response dropped: no registered caller");
        }
    }
}

fn log_drop_at_exponential_interval(count: u64, channel: &str) {
    if count.is_power_of_two() {
        warn!(channel, total_dropped = count, "control-mode channel saturated, dropping");
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
