// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent descriptors and the command-line forms a configured agent supports.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// The handful of agent binaries schmux knows how to drive in one-shot mode.
/// Any other configured agent is `Other` and cannot run one-shot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentKind {
    Claude,
    Coder,
    Other(String),
}

impl AgentKind {
    pub fn from_binary(binary: &str) -> Self {
        match binary {
            "claude" => AgentKind::Claude,
            "coder" => AgentKind::Coder,
            other => AgentKind::Other(other.to_string()),
        }
    }

    /// Whether this tool honors a lifecycle hook configuration file (§6).
    pub fn supports_lifecycle_hook(&self) -> bool {
        matches!(self, AgentKind::Claude)
    }
}

/// A configured agent: how to invoke it interactively and, if supported,
/// as a one-shot internal LLM call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub name: String,
    pub binary: String,
    /// Flags appended verbatim after `binary` for interactive spawn.
    pub interactive_args: Vec<String>,
}

impl AgentDescriptor {
    pub fn kind(&self) -> AgentKind {
        AgentKind::from_binary(&self.binary)
    }

    /// Build `argv` (without the binary itself) for an interactive spawn.
    /// The prompt, if any, is sent via `send-keys` after creation rather
    /// than appended here.
    pub fn interactive_argv(&self) -> Vec<String> {
        self.interactive_args.clone()
    }

    /// Build `argv` for a one-shot internal LLM call, per §6's enumerated
    /// known forms. `schema` is an optional path to a JSON schema file.
    pub fn one_shot_argv(&self, schema: Option<&Path>) -> Result<Vec<String>, AgentError> {
        match self.kind() {
            AgentKind::Claude => {
                let mut argv = vec!["-p".to_string(), "--output-format".to_string(), "json".to_string()];
                if let Some(schema) = schema {
                    argv.push("--json-schema".to_string());
                    argv.push(schema.display().to_string());
                }
                Ok(argv)
            }
            AgentKind::Coder => {
                let mut argv = vec!["exec".to_string(), "--json".to_string()];
                if let Some(schema) = schema {
                    argv.push("--output-schema".to_string());
                    argv.push(schema.display().to_string());
                }
                Ok(argv)
            }
            AgentKind::Other(name) => Err(AgentError::OneShotUnsupported(name)),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("agent '{0}' does not support one-shot invocation")]
    OneShotUnsupported(String),
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
