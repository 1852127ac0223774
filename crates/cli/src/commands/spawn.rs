// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use clap::Args;

use crate::client::{DaemonClient, SpawnRequest};
use crate::output::OutputFormat;

#[derive(Args)]
pub struct SpawnArgs {
    /// Agent to run (must name an entry in the daemon's configured agents)
    #[arg(short = 'a', long)]
    agent: String,

    /// Initial prompt to hand the agent
    #[arg(short = 'p', long)]
    prompt: Option<String>,

    /// Path to an existing workspace to spawn into
    #[arg(short = 'w', long, conflicts_with = "repo")]
    workspace_path: Option<String>,

    /// Repo to clone a fresh worktree from
    #[arg(short = 'r', long, conflicts_with = "workspace_path")]
    repo: Option<String>,

    /// Branch to create the new worktree from (only with --repo)
    #[arg(short = 'b', long)]
    branch: Option<String>,

    /// Human-friendly label for the session
    #[arg(short = 'n', long)]
    nickname: Option<String>,

    #[arg(long)]
    json: bool,
}

pub async fn run(args: SpawnArgs, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_action().await?;

    let workspace_id = match &args.workspace_path {
        Some(path) => Some(resolve_workspace_id(&client, path).await?),
        None => None,
    };

    if workspace_id.is_none() && args.repo.is_none() {
        return Err(anyhow!("spawn requires --workspace-path or --repo"));
    }

    let mut targets = HashMap::new();
    targets.insert(args.agent.clone(), 1);

    let request = SpawnRequest {
        repo: args.repo.clone(),
        workspace_id,
        branch: args.branch.clone().unwrap_or_default(),
        prompt: args.prompt.clone(),
        nickname: args.nickname.clone(),
        targets,
    };

    let results = client.spawn(&request).await?;
    let format = if args.json { OutputFormat::Json } else { format };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(&results.iter().map(|r| serde_json::json!({
                "session_id": r.session_id,
                "workspace_id": r.workspace_id,
            })).collect::<Vec<_>>())?);
        }
        OutputFormat::Text => {
            for result in &results {
                println!("session {} spawned in workspace {}", result.session_id, result.workspace_id);
            }
        }
    }
    Ok(())
}

async fn resolve_workspace_id(client: &DaemonClient, path: &str) -> Result<String> {
    let canonical = std::fs::canonicalize(path).map(|p| p.display().to_string()).unwrap_or_else(|_| path.to_string());
    let workspaces = client.list_workspaces().await?;
    workspaces
        .into_iter()
        .find(|w| w.path == canonical || w.path == path)
        .map(|w| w.id)
        .ok_or_else(|| anyhow!("no workspace found at path '{path}'"))
}
