// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Installs a lifecycle hook configuration under `.<tool>/settings.local.json`
//! (§6) mapping `{SessionStart, UserPromptSubmit, Stop, Notification}` to
//! shell commands that append a state line to `$SCHMUX_STATUS_FILE`.
//! Schmux's own entries are identified by a `statusMessage` prefix and
//! merged idempotently alongside whatever the user already has configured.

use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

const STATUS_PREFIX: &str = "schmux:status:";

#[derive(Debug, Error)]
pub enum HookError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed settings file: {0}")]
    Malformed(String),
}

struct HookSpec {
    event: &'static str,
    matcher: &'static str,
    state: &'static str,
}

const HOOK_SPECS: &[HookSpec] = &[
    HookSpec { event: "SessionStart", matcher: "", state: "working" },
    HookSpec { event: "UserPromptSubmit", matcher: "", state: "working" },
    HookSpec { event: "Stop", matcher: "", state: "completed" },
    HookSpec { event: "Notification", matcher: "permission_prompt", state: "needs_input" },
    HookSpec { event: "Notification", matcher: "idle_prompt", state: "needs_input" },
    HookSpec { event: "Notification", matcher: "elicitation_dialog", state: "needs_input" },
];

/// Merge schmux's hook entries into `<workspace_root>/.<tool_dir_name>/settings.local.json`.
pub fn install_hook_file(workspace_root: &Path, tool_dir_name: &str) -> Result<(), HookError> {
    let dir = workspace_root.join(format!(".{tool_dir_name}"));
    fs::create_dir_all(&dir)?;
    let path = dir.join("settings.local.json");

    let mut root: Value = if path.exists() {
        let text = fs::read_to_string(&path)?;
        serde_json::from_str(&text).map_err(|e| HookError::Malformed(e.to_string()))?
    } else {
        json!({})
    };

    let root_obj = root.as_object_mut().ok_or_else(|| HookError::Malformed("settings root is not an object".to_string()))?;
    let hooks_value = root_obj.entry("hooks").or_insert_with(|| json!({}));
    let hooks = hooks_value.as_object_mut().ok_or_else(|| HookError::Malformed("\"hooks\" is not an object".to_string()))?;

    let events: BTreeSet<&'static str> = HOOK_SPECS.iter().map(|spec| spec.event).collect();
    for event in events {
        let entries = hooks.entry(event.to_string()).or_insert_with(|| json!([]));
        let array = entries.as_array_mut().ok_or_else(|| HookError::Malformed(format!("\"{event}\" is not an array")))?;
        array.retain(|group| !is_schmux_group(group));
        for spec in HOOK_SPECS.iter().filter(|spec| spec.event == event) {
            array.push(build_group(spec));
        }
    }

    let serialized = serde_json::to_string_pretty(&root).map_err(|e| HookError::Malformed(e.to_string()))?;
    write_atomic(&path, &serialized)?;
    Ok(())
}

fn build_group(spec: &HookSpec) -> Value {
    let env = super::STATUS_FILE_ENV;
    let command = format!("[ -n \"${{{env}:-}}\" ] && echo '{state}' >> \"${{{env}}}\" || true", state = spec.state);
    json!({
        "matcher": spec.matcher,
        "hooks": [
            { "type": "command", "command": command, "statusMessage": format!("{STATUS_PREFIX}{}", spec.state) }
        ]
    })
}

fn is_schmux_group(group: &Value) -> bool {
    group
        .get("hooks")
        .and_then(Value::as_array)
        .map(|hooks| {
            hooks.iter().any(|hook| {
                hook.get("statusMessage")
                    .and_then(Value::as_str)
                    .map(|message| message.starts_with(STATUS_PREFIX))
                    .unwrap_or(false)
            })
        })
        .unwrap_or(false)
}

fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
