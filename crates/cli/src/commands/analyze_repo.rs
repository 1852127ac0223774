// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Quick repository inspection an operator can run before spawning against
//! it: recent commits, branch count, and rough size, read directly via
//! `git` rather than a cloned-and-parsed copy.

use anyhow::{anyhow, Result};
use clap::Args;

use crate::output::OutputFormat;

#[derive(Args)]
pub struct AnalyzeRepoArgs {
    /// Path or URL of the repo to inspect
    repo: String,

    /// Number of recent commits to summarize
    #[arg(long, default_value_t = 10)]
    depth: usize,
}

pub async fn run(args: AnalyzeRepoArgs, format: OutputFormat) -> Result<()> {
    let path = std::path::Path::new(&args.repo);
    if !path.exists() {
        return Err(anyhow!("'{}' is not a local path; clone it first to analyze", args.repo));
    }

    let branch_count = git_lines(path, &["branch", "--list"])?.len();
    let log = git_lines(path, &["log", &format!("-{}", args.depth), "--pretty=%h %s"])?;
    let dirty = !git_lines(path, &["status", "--porcelain"])?.is_empty();

    match format {
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "repo": args.repo,
                "branch_count": branch_count,
                "dirty": dirty,
                "recent_commits": log,
            });
            println!("{obj}");
        }
        OutputFormat::Text => {
            println!("repo: {}", args.repo);
            println!("branches: {branch_count}");
            println!("dirty: {dirty}");
            println!("recent commits:");
            for line in &log {
                println!("  {line}");
            }
        }
    }
    Ok(())
}

fn git_lines(repo: &std::path::Path, args: &[&str]) -> Result<Vec<String>> {
    let output = std::process::Command::new("git").arg("-C").arg(repo).args(args).output()?;
    if !output.status.success() {
        return Err(anyhow!("git {:?} failed: {}", args, String::from_utf8_lossy(&output.stderr)));
    }
    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}
