// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider authentication. Schmux does not implement its own OAuth flow;
//! it shells out to each provider's own CLI, the same way the tmux adapter
//! shells out to `tmux` rather than reimplementing a terminal multiplexer.

use anyhow::{anyhow, Result};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum AuthCommand {
    /// Authenticate with GitHub via the `gh` CLI
    Github,
}

pub async fn run(command: AuthCommand) -> Result<()> {
    match command {
        AuthCommand::Github => github().await,
    }
}

async fn github() -> Result<()> {
    let status = std::process::Command::new("gh").args(["auth", "status"]).status();
    if matches!(status, Ok(s) if s.success()) {
        println!("already authenticated with github");
        return Ok(());
    }

    let status = std::process::Command::new("gh")
        .args(["auth", "login"])
        .status()
        .map_err(|e| anyhow!("could not run `gh auth login`: {e}"))?;
    if !status.success() {
        return Err(anyhow!("gh auth login exited with status {status}"));
    }
    Ok(())
}
