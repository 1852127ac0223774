// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup/shutdown sequence, grounded on the teacher's
//! `daemon::lifecycle`: the exclusive pidfile-style lock is acquired
//! *before* anything else durable is touched, so a second `schmuxd`
//! invocation fails fast instead of racing the first one's state load.
//!
//! Unlike the teacher, there is no WAL/snapshot pair to replay — the state
//! store persists its durable subset directly on every mutation, so
//! startup is a single `StateStore::load()`.

use crate::config::{Config, ConfigError};
use fs2::FileExt;
use schmux_adapters::{DesktopNotifyAdapter, TmxCli, WorktreeManager};
use schmux_core::{Clock, SystemClock};
use schmux_engine::{Broadcaster, PreviewLimits, PreviewManager, RemoteManager, SessionManager, TerminalHub};
use schmux_storage::{StateError, StateStore};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::info;

pub const DAEMON_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir { path: PathBuf, source: std::io::Error },
    #[error("another schmuxd is already running (pid {pid:?}, version {version:?})")]
    LockFailed { pid: Option<u32>, version: Option<String> },
    #[error("failed to write pid file: {0}")]
    Pid(std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Tmx = TmxCli;
pub type Notifier = DesktopNotifyAdapter;

/// Everything a running daemon needs, wired together once at startup.
pub struct DaemonState {
    pub config: Config,
    pub store: StateStore,
    pub sessions: Arc<SessionManager<Tmx, Notifier>>,
    pub remote: Arc<RemoteManager>,
    pub terminal: Arc<TerminalHub<Tmx>>,
    pub previews: Arc<PreviewManager>,
    pub broadcaster: Arc<Broadcaster>,
    pub worktrees: Arc<WorktreeManager>,
    pub start_time: Instant,
    /// Kept alive for the process lifetime; the `flock` releases on drop.
    _lock_file: File,
}

/// Acquire the lock, create the state tree, load durable state, and wire
/// up every engine component. On `Err(LockFailed)`, the caller must not
/// call `cleanup_on_failure` (another daemon owns the directory).
pub fn startup(config: Config) -> Result<DaemonState, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir).map_err(|source| LifecycleError::CreateDir { path: config.state_dir.clone(), source })?;

    let lock_file = acquire_lock(&config.lock_path)?;
    write_pid_file(&lock_file, std::process::id())?;

    std::fs::create_dir_all(&config.data_path).map_err(|source| LifecycleError::CreateDir { path: config.data_path.clone(), source })?;
    std::fs::create_dir_all(&config.nudge_path).map_err(|source| LifecycleError::CreateDir { path: config.nudge_path.clone(), source })?;
    std::fs::write(&config.version_path, DAEMON_VERSION)?;

    let store = StateStore::load(config.state_path.clone())?;
    store.set_flavors(config.flavors.clone());

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let tmx = TmxCli::with_binary(config.tmx_binary.clone());
    let notifier = DesktopNotifyAdapter::new();
    let worktrees = Arc::new(WorktreeManager::new(&config.data_path));

    let sessions = Arc::new(SessionManager::new(store.clone(), tmx.clone(), worktrees.clone(), notifier, clock.clone(), config.nudge_path.clone()));
    let remote = Arc::new(RemoteManager::new(store.clone(), clock.clone(), chrono::Duration::seconds(config.remote_expiry_default_secs)));
    let terminal = Arc::new(TerminalHub::new(store.clone(), tmx.clone(), remote.clone(), Duration::from_millis(config.terminal_tick_ms)));
    let previews = Arc::new(PreviewManager::new(
        store.clone(),
        clock.clone(),
        PreviewLimits {
            per_workspace: config.preview_per_workspace_cap,
            global: config.preview_global_cap,
            idle_timeout: chrono::Duration::seconds(config.preview_idle_timeout_secs),
            stale_grace: chrono::Duration::seconds(config.preview_stale_grace_secs),
        },
    ));
    let broadcaster = Broadcaster::new(store.clone());
    broadcaster.spawn_dispatch_loop(Duration::from_millis(config.broadcaster_debounce_ms));

    info!(state_dir = %config.state_dir.display(), bind_addr = %config.bind_addr, "schmuxd starting");

    Ok(DaemonState {
        config,
        store,
        sessions,
        remote,
        terminal,
        previews,
        broadcaster,
        worktrees,
        start_time: Instant::now(),
        _lock_file: lock_file,
    })
}

impl DaemonState {
    /// Persist durable state. Called on graceful shutdown and periodically.
    pub fn shutdown(&self) -> Result<(), LifecycleError> {
        self.store.persist()?;
        let _ = std::fs::remove_file(&self.config.version_path);
        info!("schmuxd shut down cleanly");
        Ok(())
    }
}

/// Remove the lock/version files after a failed startup, so the next
/// attempt doesn't have to wait out a stale lock. Never call this after
/// `LockFailed` — that means a live daemon still holds the lock.
pub fn cleanup_on_failure(config: &Config) {
    let _ = std::fs::remove_file(&config.lock_path);
    let _ = std::fs::remove_file(&config.version_path);
}

fn acquire_lock(lock_path: &std::path::Path) -> Result<File, LifecycleError> {
    let file = OpenOptions::new().create(true).write(true).truncate(false).open(lock_path)?;
    if file.try_lock_exclusive().is_err() {
        let (pid, version) = read_lock_metadata(lock_path);
        return Err(LifecycleError::LockFailed { pid, version });
    }
    Ok(file)
}

fn write_pid_file(mut file: &File, pid: u32) -> Result<(), LifecycleError> {
    use std::io::Seek;
    file.set_len(0).map_err(LifecycleError::Pid)?;
    file.seek(std::io::SeekFrom::Start(0)).map_err(LifecycleError::Pid)?;
    write!(file, "{pid}").map_err(LifecycleError::Pid)?;
    file.flush().map_err(LifecycleError::Pid)?;
    Ok(())
}

/// Best-effort read of the pid/version of whichever daemon holds the lock,
/// purely for the human-readable "already running" message.
fn read_lock_metadata(lock_path: &std::path::Path) -> (Option<u32>, Option<String>) {
    let pid = std::fs::read_to_string(lock_path).ok().and_then(|s| s.trim().parse().ok());
    let version_path = lock_path.with_file_name("schmuxd.version");
    let mut version = String::new();
    let version = File::open(&version_path).ok().and_then(|mut f| f.read_to_string(&mut version).ok().map(|_| version.trim().to_string()));
    (pid, version)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
