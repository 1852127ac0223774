// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace diff (§6 `GET /api/diff/:workspaceId`). Shells out to `git`
//! under a deadline, the same idiom `WorktreeManager` uses for every other
//! git invocation it makes.

use crate::error::EngineError;
use schmux_adapters::run_with_timeout;
use schmux_core::GitStatus;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

const DIFF_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize)]
pub struct DiffFile {
    pub old_path: Option<String>,
    pub new_path: String,
    pub lines_added: u32,
    pub lines_removed: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceDiff {
    pub files: Vec<DiffFile>,
}

/// Diffs a workspace's working tree against `HEAD` and appends untracked
/// files, each counted as wholly added.
pub async fn compute(workspace_path: &Path) -> Result<WorkspaceDiff, EngineError> {
    let mut files = tracked_changes(workspace_path).await?;
    files.extend(untracked_files(workspace_path).await?);
    Ok(WorkspaceDiff { files })
}

async fn tracked_changes(workspace_path: &Path) -> Result<Vec<DiffFile>, EngineError> {
    let mut cmd = git_command(workspace_path);
    cmd.args(["diff", "--numstat", "-M", "HEAD"]);
    let output = run(cmd, "git diff --numstat").await?;
    if !output.status.success() {
        return Err(EngineError::DiffFailed(String::from_utf8_lossy(&output.stderr).trim().to_string()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).lines().filter_map(parse_numstat_line).collect())
}

async fn untracked_files(workspace_path: &Path) -> Result<Vec<DiffFile>, EngineError> {
    let mut cmd = git_command(workspace_path);
    cmd.args(["ls-files", "--others", "--exclude-standard"]);
    let output = run(cmd, "git ls-files").await?;
    if !output.status.success() {
        return Err(EngineError::DiffFailed(String::from_utf8_lossy(&output.stderr).trim().to_string()));
    }

    let mut files = Vec::new();
    for path in String::from_utf8_lossy(&output.stdout).lines() {
        let lines_added = tokio::fs::read_to_string(workspace_path.join(path)).await.map(|s| s.lines().count() as u32).unwrap_or(0);
        files.push(DiffFile { old_path: None, new_path: path.to_string(), lines_added, lines_removed: 0 });
    }
    Ok(files)
}

/// Parses one `git diff --numstat` line: `<added>\t<removed>\t<path>`, where
/// a rename reads as `old => new` (optionally with a `{old => new}` common
/// prefix, which we don't bother unwinding since `new_path` is all callers need).
fn parse_numstat_line(line: &str) -> Option<DiffFile> {
    let mut parts = line.splitn(3, '\t');
    let added = parts.next()?;
    let removed = parts.next()?;
    let path = parts.next()?;
    let (old_path, new_path) = match path.split_once(" => ") {
        Some((old, new)) => (Some(old.trim_start_matches('{').to_string()), new.trim_end_matches('}').to_string()),
        None => (None, path.to_string()),
    };
    Some(DiffFile {
        old_path,
        new_path,
        lines_added: added.parse().unwrap_or(0),
        lines_removed: removed.parse().unwrap_or(0),
    })
}

/// Recomputes a workspace's `GitStatus` (§6 `refresh-overlay`): file/line
/// counts from [`compute`], ahead/behind from `rev-list` against the
/// upstream if one is configured. A missing upstream leaves ahead/behind
/// at zero rather than failing the whole refresh.
pub async fn refresh_git_status(workspace_path: &Path) -> Result<GitStatus, EngineError> {
    let diff = compute(workspace_path).await?;
    let files_changed = diff.files.len() as u32;
    let lines_added = diff.files.iter().map(|f| f.lines_added).sum();
    let lines_removed = diff.files.iter().map(|f| f.lines_removed).sum();

    let mut rev_cmd = git_command(workspace_path);
    rev_cmd.args(["rev-list", "--left-right", "--count", "HEAD...@{upstream}"]);
    let (ahead, behind) = match run(rev_cmd, "git rev-list").await {
        Ok(output) if output.status.success() => parse_ahead_behind(&String::from_utf8_lossy(&output.stdout)),
        _ => (0, 0),
    };

    Ok(GitStatus { ahead, behind, dirty: files_changed > 0, lines_added, lines_removed, files_changed })
}

fn parse_ahead_behind(body: &str) -> (u32, u32) {
    let mut parts = body.split_whitespace();
    let ahead = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    let behind = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    (ahead, behind)
}

fn git_command(workspace_path: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.kill_on_drop(true);
    cmd.arg("-C").arg(workspace_path);
    cmd
}

async fn run(cmd: Command, description: &str) -> Result<std::process::Output, EngineError> {
    run_with_timeout(cmd, DIFF_TIMEOUT, description).await.map_err(EngineError::DiffFailed)
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
