// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watches a session's `$SCHMUX_STATUS_FILE` (§4.5, §6) and emits a
//! [`NudgeUpdate`] for every new `STATE [message]` line the agent appends.
//! Uses `notify` for the fast path and a poll fallback so a watcher that
//! misses an event (network filesystems, some CI sandboxes) still converges.

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use schmux_core::NudgeState;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default interval for the poll-fallback timer.
pub const POLL_FALLBACK_INTERVAL: Duration = Duration::from_millis(500);
/// Debounce window: multiple fs-event wakeups within this window collapse
/// into a single read of the status file.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NudgeUpdate {
    pub state: NudgeState,
    pub message: Option<String>,
}

pub struct NudgeWatcher {
    handle: JoinHandle<()>,
    _fs_watcher: Option<RecommendedWatcher>,
}

impl NudgeWatcher {
    /// Start watching `path`. Returns the watcher handle (drop to stop) and
    /// a receiver of parsed updates, one per new line with a recognized state.
    pub fn spawn(path: PathBuf) -> (Self, mpsc::Receiver<NudgeUpdate>) {
        let (tx, rx) = mpsc::channel(64);
        let (wake_tx, mut wake_rx) = mpsc::channel::<()>(16);

        let fs_watcher = build_fs_watcher(&path, wake_tx.clone());

        let poll_path = path.clone();
        let handle = tokio::spawn(async move {
            let mut offset: u64 = 0;
            let mut ticker = tokio::time::interval(POLL_FALLBACK_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    woken = wake_rx.recv() => {
                        if woken.is_none() {
                            break;
                        }
                        // debounce: drain any further wakeups that land within the window
                        tokio::time::sleep(DEBOUNCE_WINDOW).await;
                        while wake_rx.try_recv().is_ok() {}
                    }
                }
                match read_new_lines(&poll_path, &mut offset).await {
                    Ok(lines) => {
                        for line in lines {
                            if let Some(update) = parse_status_line(&line) {
                                if tx.send(update).await.is_err() {
                                    return;
                                }
                            }
                        }
                    }
                    Err(err) => debug!(path = %poll_path.display(), error = %err, "nudge status file unreadable"),
                }
            }
        });

        (Self { handle, _fs_watcher: fs_watcher }, rx)
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

fn build_fs_watcher(path: &PathBuf, wake_tx: mpsc::Sender<()>) -> Option<RecommendedWatcher> {
    let parent = path.parent()?.to_path_buf();
    let target = path.clone();
    let mut watcher = match notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res {
            if event.paths.iter().any(|p| p == &target) {
                let _ = wake_tx.try_send(());
            }
        }
    }) {
        Ok(w) => w,
        Err(err) => {
            warn!(error = %err, "failed to construct fs watcher, falling back to polling only");
            return None;
        }
    };
    if let Err(err) = watcher.watch(&parent, RecursiveMode::NonRecursive) {
        warn!(path = %parent.display(), error = %err, "failed to watch nudge status directory");
        return None;
    }
    Some(watcher)
}

async fn read_new_lines(path: &PathBuf, offset: &mut u64) -> std::io::Result<Vec<String>> {
    use tokio::io::{AsyncReadExt, AsyncSeekExt};

    let mut file = match tokio::fs::File::open(path).await {
        Ok(f) => f,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };
    let len = file.metadata().await?.len();
    if len < *offset {
        // file was truncated or replaced; restart from the beginning
        *offset = 0;
    }
    file.seek(std::io::SeekFrom::Start(*offset)).await?;
    let mut buf = String::new();
    file.read_to_string(&mut buf).await?;
    *offset += buf.len() as u64;

    Ok(buf.lines().map(str::to_string).collect())
}

fn parse_status_line(line: &str) -> Option<NudgeUpdate> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let tag = parts.next()?;
    let state = NudgeState::parse(tag)?;
    let message = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    Some(NudgeUpdate { state, message })
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
