// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::process::Command as StdCommand;
use tempfile::tempdir;

fn git_available() -> bool {
    StdCommand::new("git").arg("--version").output().map(|o| o.status.success()).unwrap_or(false)
}

fn run(dir: &Path, args: &[&str]) {
    let status = StdCommand::new("git").current_dir(dir).args(args).status().unwrap();
    assert!(status.success(), "git {args:?} failed");
}

fn init_repo(dir: &Path) {
    run(dir, &["init", "--initial-branch=main"]);
    run(dir, &["config", "user.email", "test@example.com"]);
    run(dir, &["config", "user.name", "test"]);
    std::fs::write(dir.join("README.md"), "hello\n").unwrap();
    run(dir, &["add", "."]);
    run(dir, &["commit", "-m", "initial"]);
}

#[tokio::test]
async fn compute_reports_modified_tracked_file() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let root = tempdir().expect("tempdir");
    init_repo(root.path());
    std::fs::write(root.path().join("README.md"), "hello\nworld\n").unwrap();

    let diff = compute(root.path()).await.expect("compute");

    assert_eq!(diff.files.len(), 1);
    assert_eq!(diff.files[0].new_path, "README.md");
    assert_eq!(diff.files[0].lines_added, 1);
    assert_eq!(diff.files[0].lines_removed, 0);
    assert!(diff.files[0].old_path.is_none());
}

#[tokio::test]
async fn compute_reports_untracked_file_as_fully_added() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let root = tempdir().expect("tempdir");
    init_repo(root.path());
    std::fs::write(root.path().join("NEW.md"), "a\nb\nc\n").unwrap();

    let diff = compute(root.path()).await.expect("compute");

    assert_eq!(diff.files.len(), 1);
    assert_eq!(diff.files[0].new_path, "NEW.md");
    assert_eq!(diff.files[0].lines_added, 3);
    assert_eq!(diff.files[0].lines_removed, 0);
}

#[tokio::test]
async fn compute_is_empty_for_clean_worktree() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let root = tempdir().expect("tempdir");
    init_repo(root.path());

    let diff = compute(root.path()).await.expect("compute");

    assert!(diff.files.is_empty());
}

#[tokio::test]
async fn refresh_git_status_reports_dirty_with_line_totals() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let root = tempdir().expect("tempdir");
    init_repo(root.path());
    std::fs::write(root.path().join("README.md"), "hello\nworld\n").unwrap();

    let status = refresh_git_status(root.path()).await.expect("refresh_git_status");

    assert!(status.dirty);
    assert_eq!(status.files_changed, 1);
    assert_eq!(status.lines_added, 1);
    assert_eq!(status.ahead, 0);
    assert_eq!(status.behind, 0);
}

#[tokio::test]
async fn refresh_git_status_is_clean_for_untouched_worktree() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let root = tempdir().expect("tempdir");
    init_repo(root.path());

    let status = refresh_git_status(root.path()).await.expect("refresh_git_status");

    assert!(!status.dirty);
    assert_eq!(status.files_changed, 0);
}
