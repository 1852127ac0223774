// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Self-update is out of scope: schmux does not download or replace its own
//! binary. This verb exists to give operators a clear pointer to how they
//! actually get a new version.

use anyhow::Result;

pub async fn run() -> Result<()> {
    println!("schmux {} (self-update is not supported)", env!("CARGO_PKG_VERSION"));
    println!("reinstall via your package manager or `cargo install schmux` to upgrade");
    Ok(())
}
