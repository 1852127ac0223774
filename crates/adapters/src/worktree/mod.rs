// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worktree manager (§4.3): maintains a bare clone per repo on disk and
//! adds a worktree per (repo, branch). Prep is idempotent and guarded by a
//! per-workspace mutex so concurrent spawns on a new workspace never race git.

mod keyed_lock;

use crate::subprocess::{run_with_timeout, WORKTREE_TIMEOUT};
pub use keyed_lock::KeyedLock;
use schmux_core::WorkspaceId;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum WorktreeError {
    #[error("git command failed: {0}")]
    GitFailed(String),
    #[error("git command timed out")]
    Timeout,
    #[error("no default branch found for origin")]
    NoDefaultBranch,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct WorktreeManager {
    bare_clones_root: PathBuf,
    worktrees_root: PathBuf,
    scratch_root: PathBuf,
    prep_locks: KeyedLock<WorkspaceId>,
    timeout: Duration,
}

impl WorktreeManager {
    pub fn new(data_root: &Path) -> Self {
        Self {
            bare_clones_root: data_root.join("bare"),
            worktrees_root: data_root.join("worktrees"),
            scratch_root: data_root.join("scratch"),
            prep_locks: KeyedLock::new(),
            timeout: WORKTREE_TIMEOUT,
        }
    }

    /// Idempotent prep: ensure the bare clone exists and is fetched, ensure
    /// `branch` exists (created from origin's default branch if missing),
    /// add the worktree. Returns the worktree's path on disk.
    pub async fn prep(&self, workspace_id: &WorkspaceId, repo_url: &str, branch: &str) -> Result<PathBuf, WorktreeError> {
        let _guard = self.prep_locks.lock(workspace_id.clone()).await;

        let bare_path = self.ensure_bare_clone(repo_url).await?;
        self.ensure_branch(&bare_path, branch).await?;
        let worktree_path = self.worktrees_root.join(workspace_id.as_str());
        self.add_worktree(&bare_path, branch, &worktree_path).await?;
        Ok(worktree_path)
    }

    /// Removes the worktree from disk. Only called on explicit workspace
    /// dispose; a normal session dispose leaves it in place for diff review.
    pub async fn remove(&self, workspace_id: &WorkspaceId, repo_url: &str) -> Result<(), WorktreeError> {
        let _guard = self.prep_locks.lock(workspace_id.clone()).await;
        let bare_path = self.bare_path_for(repo_url);
        let worktree_path = self.worktrees_root.join(workspace_id.as_str());
        if !worktree_path.exists() {
            return Ok(());
        }
        let mut cmd = self.git_command(&bare_path);
        cmd.args(["worktree", "remove", "--force"]).arg(&worktree_path);
        let output = self.run(cmd, "git worktree remove").await?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("is not a working tree") {
                Ok(())
            } else {
                Err(WorktreeError::GitFailed(stderr.trim().to_string()))
            }
        }
    }

    /// Run `f` against a temp worktree created under a dedicated scratch
    /// base, removing it with `force` once `f` completes.
    pub async fn with_scratch_worktree<F, Fut, T>(&self, repo_url: &str, branch: &str, f: F) -> Result<T, WorktreeError>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let bare_path = self.ensure_bare_clone(repo_url).await?;
        self.ensure_branch(&bare_path, branch).await?;
        tokio::fs::create_dir_all(&self.scratch_root).await?;
        let scratch_path = self.scratch_root.join(uuid::Uuid::new_v4().to_string());

        let mut add_cmd = self.git_command(&bare_path);
        add_cmd.args(["worktree", "add", "--detach"]).arg(&scratch_path).arg(branch);
        let output = self.run(add_cmd, "git worktree add (scratch)").await?;
        if !output.status.success() {
            return Err(WorktreeError::GitFailed(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }

        let result = f(scratch_path.clone()).await;

        let mut remove_cmd = self.git_command(&bare_path);
        remove_cmd.args(["worktree", "remove", "--force"]).arg(&scratch_path);
        if let Err(err) = self.run(remove_cmd, "git worktree remove (scratch)").await {
            warn!(path = %scratch_path.display(), error = %err, "failed to remove scratch worktree");
        }

        Ok(result)
    }

    async fn ensure_bare_clone(&self, repo_url: &str) -> Result<PathBuf, WorktreeError> {
        let bare_path = self.bare_path_for(repo_url);
        if bare_path.exists() {
            let mut cmd = self.git_command(&bare_path);
            cmd.args(["fetch", "--all", "--prune"]);
            let output = self.run(cmd, "git fetch").await?;
            if !output.status.success() {
                return Err(WorktreeError::GitFailed(String::from_utf8_lossy(&output.stderr).trim().to_string()));
            }
            return Ok(bare_path);
        }

        tokio::fs::create_dir_all(&self.bare_clones_root).await?;
        let mut cmd = Command::new("git");
        cmd.kill_on_drop(true);
        cmd.args(["clone", "--bare", repo_url]).arg(&bare_path);
        let output = self.run(cmd, "git clone --bare").await?;
        if output.status.success() {
            info!(repo = repo_url, path = %bare_path.display(), "bare clone created");
            Ok(bare_path)
        } else {
            Err(WorktreeError::GitFailed(String::from_utf8_lossy(&output.stderr).trim().to_string()))
        }
    }

    async fn ensure_branch(&self, bare_path: &Path, branch: &str) -> Result<(), WorktreeError> {
        let mut verify = self.git_command(bare_path);
        verify.args(["rev-parse", "--verify", "--quiet"]).arg(format!("refs/heads/{branch}"));
        let output = self.run(verify, "git rev-parse").await?;
        if output.status.success() {
            return Ok(());
        }

        let mut default_ref = self.git_command(bare_path);
        default_ref.args(["symbolic-ref", "refs/remotes/origin/HEAD"]);
        let output = self.run(default_ref, "git symbolic-ref").await?;
        if !output.status.success() {
            return Err(WorktreeError::NoDefaultBranch);
        }
        let default_branch = String::from_utf8_lossy(&output.stdout)
            .trim()
            .strip_prefix("refs/remotes/origin/")
            .ok_or(WorktreeError::NoDefaultBranch)?
            .to_string();

        let mut create = self.git_command(bare_path);
        create.args(["branch", branch]).arg(format!("origin/{default_branch}"));
        let output = self.run(create, "git branch").await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(WorktreeError::GitFailed(String::from_utf8_lossy(&output.stderr).trim().to_string()))
        }
    }

    async fn add_worktree(&self, bare_path: &Path, branch: &str, worktree_path: &Path) -> Result<(), WorktreeError> {
        if worktree_path.exists() {
            return Ok(());
        }
        tokio::fs::create_dir_all(&self.worktrees_root).await?;
        let mut cmd = self.git_command(bare_path);
        cmd.args(["worktree", "add"]).arg(worktree_path).arg(branch);
        let output = self.run(cmd, "git worktree add").await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(WorktreeError::GitFailed(String::from_utf8_lossy(&output.stderr).trim().to_string()))
        }
    }

    fn bare_path_for(&self, repo_url: &str) -> PathBuf {
        let digest = repo_slug(repo_url);
        self.bare_clones_root.join(format!("{digest}.git"))
    }

    fn git_command(&self, git_dir: &Path) -> Command {
        let mut cmd = Command::new("git");
        cmd.kill_on_drop(true);
        cmd.arg("--git-dir").arg(git_dir);
        cmd
    }

    async fn run(&self, cmd: Command, description: &str) -> Result<std::process::Output, WorktreeError> {
        run_with_timeout(cmd, self.timeout, description).await.map_err(|msg| {
            if msg.contains("timed out") {
                WorktreeError::Timeout
            } else {
                WorktreeError::GitFailed(msg)
            }
        })
    }
}

/// A filesystem-safe slug derived from a repo URL, stable across calls.
fn repo_slug(repo_url: &str) -> String {
    repo_url
        .trim_end_matches(".git")
        .rsplit('/')
        .next()
        .unwrap_or(repo_url)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
