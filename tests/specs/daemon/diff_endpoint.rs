//! Scenario 3 (Diff endpoint): `GET /api/diff/<workspace_id>` reports a
//! modified file with the expected added/removed line counts. The CLI has
//! no `diff` verb (the dashboard owns rendering it), so this scenario is
//! exercised directly against the daemon's HTTP surface.

use crate::prelude::*;
use std::time::Duration;

async fn wait_healthy(base_url: &str) {
    let client = reqwest::Client::new();
    let ok = {
        let mut healthy = false;
        for _ in 0..200 {
            if let Ok(resp) = client.get(format!("{base_url}/api/healthz")).send().await {
                if resp.status().is_success() {
                    healthy = true;
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        healthy
    };
    assert!(ok, "daemon never became healthy at {base_url}");
}

#[tokio::test]
async fn modified_file_reports_added_lines() {
    let project = Project::new();
    project.schmux().args(&["start"]).passes();
    wait_healthy(&project.base_url()).await;

    let client = reqwest::Client::new();
    let spawn_body = serde_json::json!({
        "repo": "R",
        "branch": "main",
        "targets": {"a": 1},
    });
    let spawned: Vec<serde_json::Value> = client
        .post(format!("{}/api/spawn", project.base_url()))
        .json(&spawn_body)
        .send()
        .await
        .expect("spawn request")
        .json()
        .await
        .expect("spawn response parses");
    let workspace_id = spawned[0]["workspace_id"].as_str().unwrap().to_string();
    let session_id = spawned[0]["session_id"].as_str().unwrap().to_string();

    let workspaces: serde_json::Value = client
        .get(format!("{}/api/workspaces", project.base_url()))
        .send()
        .await
        .expect("workspaces request")
        .json()
        .await
        .expect("workspaces response parses");
    let worktree_path = workspaces["workspaces"]
        .as_array()
        .unwrap()
        .iter()
        .find(|w| w["id"] == workspace_id)
        .expect("workspace present")["path"]
        .as_str()
        .unwrap()
        .to_string();

    std::fs::write(std::path::Path::new(&worktree_path).join("README.md"), "hello\nworld\n").expect("write modified file");

    let diff: serde_json::Value = client
        .get(format!("{}/api/diff/{workspace_id}", project.base_url()))
        .send()
        .await
        .expect("diff request")
        .json()
        .await
        .expect("diff response parses");
    let files = diff["files"].as_array().expect("files array");
    let readme = files.iter().find(|f| f["new_path"] == "README.md").expect("README.md present in diff");
    assert_eq!(readme["lines_added"], 1);
    assert_eq!(readme["lines_removed"], 0);

    client.post(format!("{}/api/dispose/{session_id}", project.base_url())).send().await.ok();
}
