// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! schmuxd: background process that owns the session/workspace state and
//! serves the loopback HTTP/WS API the CLI and dashboard speak.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::time::Duration;

use schmux_daemon::{cleanup_on_failure, startup, Config, DaemonState, LifecycleError, DAEMON_VERSION};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("schmuxd {DAEMON_VERSION}");
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("usage: schmuxd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;
    rotate_log_if_needed(&config.log_path);
    write_startup_marker(&config)?;
    let log_guard = setup_logging(&config)?;

    info!("starting schmuxd");

    let daemon = match startup(config.clone()) {
        Ok(d) => d,
        Err(LifecycleError::LockFailed { pid, version }) => {
            eprintln!("schmuxd is already running");
            if let Some(pid) = pid {
                eprintln!("  pid: {pid}");
            }
            if let Some(version) = version {
                if version == DAEMON_VERSION {
                    eprintln!("  version: {version}");
                } else {
                    eprintln!("  version: {version} (outdated — current: {DAEMON_VERSION})");
                }
            }
            std::process::exit(1);
        }
        Err(e) => {
            write_startup_error(&config, &e);
            error!("failed to start daemon: {}", e);
            drop(log_guard);
            cleanup_on_failure(&config);
            return Err(e.into());
        }
    };

    spawn_liveness_loop(&daemon);
    spawn_remote_loop(&daemon);
    spawn_preview_loop(&daemon);

    let app_state = schmux_daemon::http::AppState::new(&daemon);
    let router = schmux_daemon::http::router(app_state);
    let listener = tokio::net::TcpListener::bind(daemon.config.bind_addr).await?;

    info!(bind_addr = %daemon.config.bind_addr, "schmuxd ready");
    println!("READY");

    if let Err(e) = axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await {
        error!("http server error: {}", e);
    }

    daemon.shutdown()?;
    info!("schmuxd stopped");
    Ok(())
}

/// Resolves once SIGTERM or SIGINT arrives, used to drive axum's graceful
/// shutdown.
async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to install SIGTERM handler: {}", e);
            return;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to install SIGINT handler: {}", e);
            return;
        }
    };
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("received SIGINT, shutting down..."),
    }
}

fn print_help() {
    println!("schmuxd {DAEMON_VERSION}");
    println!("Background process that owns schmux session/workspace state.");
    println!();
    println!("USAGE:");
    println!("    schmuxd");
    println!();
    println!("schmuxd is typically started by the `schmux` CLI and should not");
    println!("be invoked directly. It serves a loopback HTTP/WS API used by");
    println!("`schmux` and the dashboard.");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
}

/// Liveness poll: detects sessions whose tmux target has disappeared or
/// whose process has exited, per §4.5.
fn spawn_liveness_loop(daemon: &DaemonState) {
    let sessions = daemon.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(2));
        loop {
            interval.tick().await;
            sessions.poll_liveness_once().await;
        }
    });
}

/// Remote host reconnection and expiry sweep, per §4.6.
fn spawn_remote_loop(daemon: &DaemonState) {
    let remote = daemon.remote.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        loop {
            interval.tick().await;
            remote.reconcile_once().await;
            remote.sweep_expired().await;
        }
    });
}

/// Preview proxy idle/stale reconciliation, per §4.8.
fn spawn_preview_loop(daemon: &DaemonState) {
    let previews = daemon.previews.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(10));
        loop {
            interval.tick().await;
            previews.reconcile_once().await;
        }
    });
}

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`]. Best-effort:
/// rotation failures are silently ignored so the daemon still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

const STARTUP_MARKER_PREFIX: &str = "--- schmuxd: starting (pid: ";

fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&config.log_path)?;
    writeln!(file, "{}{}) ---\n", STARTUP_MARKER_PREFIX, std::process::id())?;
    Ok(())
}

fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;
    let Ok(mut file) = std::fs::OpenOptions::new().create(true).append(true).open(&config.log_path) else {
        return;
    };
    let _ = writeln!(file, "ERROR failed to start daemon: {error}");
}

fn setup_logging(config: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::Io(std::io::Error::other("log path has no parent")))?,
        config.log_path.file_name().ok_or(LifecycleError::Io(std::io::Error::other("log path has no file name")))?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(non_blocking)).init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
