// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use anyhow::{anyhow, Result};

use crate::client::{ClientError, DaemonClient};
use crate::daemon_process::{
    cleanup_stale_pid, find_schmuxd_binary, read_daemon_pid, start_daemon_background,
    stop_daemon_sync,
};
use crate::output::OutputFormat;
use crate::DEV_MODE_RESTART_CODE;

pub async fn start() -> Result<()> {
    if let Ok(client) = DaemonClient::connect().await {
        if let Ok(health) = client.healthz().await {
            println!("daemon already running (uptime: {})", format_uptime(health.uptime_secs));
            return Ok(());
        }
    }

    match DaemonClient::connect_or_start().await {
        Ok(_) => {
            println!("daemon started");
            Ok(())
        }
        Err(e) => Err(anyhow!("{e}")),
    }
}

pub async fn stop(kill: bool) -> Result<()> {
    match daemon_stop(kill).await {
        Ok(true) => {
            println!("daemon stopped");
            Ok(())
        }
        Ok(false) => {
            println!("daemon not running");
            Ok(())
        }
        Err(e) => Err(anyhow!("failed to stop daemon: {e}")),
    }
}

/// Stop the daemon if a pid file names a live process. Returns whether a
/// daemon was actually stopped.
async fn daemon_stop(kill: bool) -> Result<bool, ClientError> {
    let Some(pid) = read_daemon_pid()? else {
        return Ok(false);
    };
    let timeout =
        if kill { std::time::Duration::from_millis(1) } else { crate::client::timeout_exit() };
    stop_daemon_sync(pid, timeout);
    cleanup_stale_pid()?;
    Ok(true)
}

pub async fn status(format: OutputFormat) -> Result<()> {
    let not_running = || {
        match format {
            OutputFormat::Text => println!("daemon not running"),
            OutputFormat::Json => println!(r#"{{"status":"not_running"}}"#),
        }
        Ok(())
    };

    let client = match DaemonClient::connect().await {
        Ok(c) => c,
        Err(_) => return not_running(),
    };

    let health = match client.healthz().await {
        Ok(h) => h,
        Err(ClientError::DaemonNotRunning) => return not_running(),
        Err(e) => return Err(anyhow!("{e}")),
    };

    match format {
        OutputFormat::Text => {
            println!("status: running");
            println!("version: {}", health.version);
            println!("uptime: {}", format_uptime(health.uptime_secs));
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "status": "running",
                "version": health.version,
                "uptime_secs": health.uptime_secs,
            });
            println!("{obj}");
        }
    }
    Ok(())
}

/// Run the daemon process itself. This is what `start_daemon_background`
/// spawns when the daemon isn't already running; operators can also invoke
/// it directly to run schmuxd attached to a terminal.
pub async fn daemon_run(background: bool, dev_proxy: bool, dev_mode: bool) -> Result<()> {
    if background {
        start_daemon_background()?;
        return Ok(());
    }

    let binary = find_schmuxd_binary().ok_or_else(|| anyhow!("could not locate schmuxd binary"))?;

    loop {
        let mut command = std::process::Command::new(&binary);
        if dev_proxy {
            command.env("SCHMUX_DEV_PROXY", "1");
        }
        let status = command.status()?;
        let code = status.code().unwrap_or(1);
        if dev_mode && code == DEV_MODE_RESTART_CODE {
            println!("schmuxd requested a dev-mode restart, relaunching");
            continue;
        }
        if !status.success() {
            return Err(anyhow!("schmuxd exited with status {status}"));
        }
        return Ok(());
    }
}

fn format_uptime(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    if hours > 0 {
        format!("{hours}h {mins}m {secs}s")
    } else if mins > 0 {
        format!("{mins}m {secs}s")
    } else {
        format!("{secs}s")
    }
}
