//! Scenario 2 (Multi-agent spawn): two agents on the same new workspace
//! each get their own session id, both listed under one workspace entry.

use crate::prelude::*;

#[test]
fn two_agents_spawn_into_one_workspace() {
    let project = Project::with_agents(&[ECHO_AGENT, ECHO_AGENT_B]);

    let out_a = project.schmux().args(&["spawn", "-a", "a", "-r", "R", "-b", "main", "--json"]).passes().stdout();
    let spawned_a: Vec<serde_json::Value> = serde_json::from_str(&out_a).unwrap();
    let workspace_id = spawned_a[0]["workspace_id"].as_str().unwrap().to_string();
    let session_a = spawned_a[0]["session_id"].as_str().unwrap().to_string();

    let list_out = project.schmux().args(&["list", "--json"]).passes().stdout();
    let workspaces: Vec<serde_json::Value> = serde_json::from_str(&list_out).unwrap();
    let worktree_path = workspaces
        .iter()
        .find(|w| w["id"] == workspace_id)
        .expect("workspace present after first spawn")["path"]
        .as_str()
        .expect("workspace path")
        .to_string();

    let out_b = project
        .schmux()
        .args(&["spawn", "-a", "b", "-w", &worktree_path, "--json"])
        .passes()
        .stdout();
    let spawned_b: Vec<serde_json::Value> = serde_json::from_str(&out_b).unwrap();
    let session_b = spawned_b[0]["session_id"].as_str().unwrap().to_string();
    assert_eq!(spawned_b[0]["workspace_id"].as_str().unwrap(), workspace_id, "second spawn should land on the same workspace");

    let list_out = project.schmux().args(&["list", "--json"]).passes().stdout();
    let workspaces: Vec<serde_json::Value> = serde_json::from_str(&list_out).unwrap();
    let matching: Vec<&serde_json::Value> = workspaces.iter().filter(|w| w["id"] == workspace_id).collect();
    assert_eq!(matching.len(), 1, "both sessions should appear under a single workspace entry");
    let ids: Vec<&str> = matching[0]["sessions"].as_array().unwrap().iter().map(|s| s["id"].as_str().unwrap()).collect();
    assert!(ids.contains(&session_a.as_str()));
    assert!(ids.contains(&session_b.as_str()));

    project.schmux().args(&["dispose", &session_a]).passes();
    project.schmux().args(&["dispose", &session_b]).passes();
}
