// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use anyhow::{anyhow, Result};

use crate::client::{DaemonClient, SessionTargetView};

pub async fn run(session_id: &str) -> Result<()> {
    let client = DaemonClient::for_query().await?;
    let workspaces = client.list_workspaces().await?;
    let session = workspaces
        .iter()
        .flat_map(|w| &w.sessions)
        .find(|s| s.id == session_id)
        .ok_or_else(|| anyhow!("no such session '{session_id}'"))?;

    match &session.target {
        SessionTargetView::Local { tmux_session } => {
            let status = std::process::Command::new("tmux")
                .args(["attach", "-t", tmux_session])
                .status()?;
            if !status.success() {
                return Err(anyhow!("tmux attach exited with status {status}"));
            }
            Ok(())
        }
        SessionTargetView::Remote { host, .. } => Err(anyhow!(
            "session '{session_id}' runs on remote host '{host}'; attach directly from the dashboard terminal instead"
        )),
    }
}
