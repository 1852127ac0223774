// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use anyhow::Result;

use crate::client::{DaemonClient, WorkspaceView};
use crate::color;
use crate::output::{format_time_ago, OutputFormat};

pub async fn run(format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_query().await?;
    let workspaces = client.list_workspaces().await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(&workspaces)?);
        }
        OutputFormat::Text => print_table(&workspaces),
    }
    Ok(())
}

fn print_table(workspaces: &[WorkspaceView]) {
    if workspaces.is_empty() {
        println!("no workspaces");
        return;
    }

    let id_w = workspaces
        .iter()
        .flat_map(|w| w.sessions.iter().map(|s| s.id.len()))
        .max()
        .unwrap_or(0)
        .max("SESSION".len());
    let repo_w = workspaces.iter().map(|w| w.short_repo.len()).max().unwrap_or(0).max("REPO".len());
    let branch_w = workspaces.iter().map(|w| w.branch.len()).max().unwrap_or(0).max("BRANCH".len());

    println!(
        "{} {} {} {} {}",
        color::header(&pad("SESSION", id_w)),
        color::header(&pad("REPO", repo_w)),
        color::header(&pad("BRANCH", branch_w)),
        color::header(&pad("STATE", 14)),
        color::header("LAST OUTPUT"),
    );

    for workspace in workspaces {
        if workspace.sessions.is_empty() {
            println!(
                "{} {} {} {}",
                pad("-", id_w),
                pad(&workspace.short_repo, repo_w),
                pad(&workspace.branch, branch_w),
                color::muted("(no sessions)"),
            );
            continue;
        }
        for session in &workspace.sessions {
            let state = if session.running { &session.nudge_state } else { "stopped" };
            let last_output = session
                .last_output_at
                .map(format_time_ago)
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{} {} {} {} {}",
                pad(&session.id, id_w),
                pad(&workspace.short_repo, repo_w),
                pad(&workspace.branch, branch_w),
                pad(&color::status(state), 14),
                last_output,
            );
        }
    }
}

fn pad(s: &str, width: usize) -> String {
    format!("{s:<width$}")
}
