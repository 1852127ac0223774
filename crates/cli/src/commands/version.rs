// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use anyhow::Result;

use crate::client::DaemonClient;

pub async fn run() -> Result<()> {
    println!("schmux {}", env!("CARGO_PKG_VERSION"));
    match DaemonClient::for_query().await.ok() {
        Some(client) => match client.healthz().await {
            Ok(health) => println!("schmuxd {}", health.version),
            Err(_) => println!("schmuxd not running"),
        },
        None => println!("schmuxd not running"),
    }
    Ok(())
}
