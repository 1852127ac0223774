// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use anyhow::Result;

use crate::client::DaemonClient;

pub async fn run(workspace_id: &str) -> Result<()> {
    let client = DaemonClient::for_action().await?;
    client.refresh_overlay(workspace_id).await?;
    println!("refreshed diff overlay for workspace {workspace_id}");
    Ok(())
}
