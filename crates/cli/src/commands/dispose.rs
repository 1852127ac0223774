// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use anyhow::Result;

use crate::client::DaemonClient;

pub async fn run(session_id: &str) -> Result<()> {
    let client = DaemonClient::for_action().await?;
    client.dispose(session_id).await?;
    println!("session {session_id} disposed");
    Ok(())
}
