//! Scenario 1 (Spawn-dispose) plus the Spawn->Dispose->Spawn round-trip law:
//! spawning reuses the workspace's worktree but mints a fresh session id.

use crate::prelude::*;

#[test]
fn spawn_then_list_then_dispose() {
    let project = Project::new();

    let spawn_out = project
        .schmux()
        .args(&["spawn", "-a", "a", "-r", "R", "-b", "main", "--json"])
        .passes()
        .stdout();
    let spawned: Vec<serde_json::Value> = serde_json::from_str(&spawn_out).expect("spawn --json output parses");
    assert_eq!(spawned.len(), 1, "spawn should yield exactly one session: {spawn_out}");
    let session_id = spawned[0]["session_id"].as_str().expect("session_id").to_string();
    let workspace_id = spawned[0]["workspace_id"].as_str().expect("workspace_id").to_string();

    let list_out = project.schmux().args(&["list", "--json"]).passes().stdout();
    let workspaces: Vec<serde_json::Value> = serde_json::from_str(&list_out).expect("list --json parses");
    let workspace = workspaces
        .iter()
        .find(|w| w["id"] == workspace_id)
        .unwrap_or_else(|| panic!("workspace {workspace_id} not present in {list_out}"));
    let sessions = workspace["sessions"].as_array().expect("sessions array");
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["id"], session_id);
    assert_eq!(sessions[0]["running"], true);

    project.schmux().args(&["dispose", &session_id]).passes();

    let after_out = project.schmux().args(&["list", "--json"]).passes().stdout();
    let workspaces_after: Vec<serde_json::Value> = serde_json::from_str(&after_out).expect("list --json parses");
    let still_present = workspaces_after
        .iter()
        .flat_map(|w| w["sessions"].as_array().cloned().unwrap_or_default())
        .any(|s| s["id"] == session_id);
    assert!(!still_present, "session {session_id} should be gone after dispose");
}

#[test]
fn dispose_is_idempotent_by_id() {
    let project = Project::new();
    project.schmux().args(&["dispose", "does-not-exist"]).passes();
    project.schmux().args(&["dispose", "does-not-exist"]).passes();
}

#[test]
fn spawn_dispose_spawn_reuses_the_workspace_id() {
    let project = Project::new();

    let first = project.schmux().args(&["spawn", "-a", "a", "-r", "R", "-b", "main", "--json"]).passes().stdout();
    let first: Vec<serde_json::Value> = serde_json::from_str(&first).unwrap();
    let workspace_id = first[0]["workspace_id"].as_str().unwrap().to_string();
    let first_session = first[0]["session_id"].as_str().unwrap().to_string();

    project.schmux().args(&["dispose", &first_session]).passes();

    let second = project.schmux().args(&["spawn", "-a", "a", "-r", "R", "-b", "main", "--json"]).passes().stdout();
    let second: Vec<serde_json::Value> = serde_json::from_str(&second).unwrap();
    let second_workspace_id = second[0]["workspace_id"].as_str().unwrap().to_string();
    let second_session = second[0]["session_id"].as_str().unwrap().to_string();

    assert_eq!(workspace_id, second_workspace_id, "re-spawning the same repo/branch should reuse the worktree");
    assert_ne!(first_session, second_session, "each spawn mints a fresh session id");

    project.schmux().args(&["dispose", &second_session]).passes();
}
