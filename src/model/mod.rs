// src/model/mod.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification the interpreter assigns to a raw input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DirectiveKind {
    Task,
    Conversation,
    Unclear,
}

impl DirectiveKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().trim_matches(|c| c == '[' || c == ']').to_ascii_uppercase().as_str() {
            "TASK" => Some(Self::Task),
            "CONVERSATION" => Some(Self::Conversation),
            "UNCLEAR" => Some(Self::Unclear),
            _ => None,
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Task => "TASK",
            Self::Conversation => "CONVERSATION",
            Self::Unclear => "UNCLEAR",
        };
        f.write_str(label)
    }
}

/// Word the interpreter uses to chain sub-actions inside one command.
pub const SEQUENCE_MARKER: &str = "then";

/// Structured result of interpreting one raw input.
///
/// `iterations` is always at least 1. A directive without a command has
/// nothing to execute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    pub kind: Option<DirectiveKind>,
    pub iterations: u32,
    pub command: Option<String>,
}

impl Default for Directive {
    fn default() -> Self {
        Self {
            kind: None,
            iterations: 1,
            command: None,
        }
    }
}

impl Directive {
    /// The canonical command, if it contains anything to act on.
    pub fn actionable_command(&self) -> Option<&str> {
        self.command
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Sub-actions of the canonical command split on the sequencing marker.
    pub fn sub_actions(&self) -> Vec<&str> {
        let Some(command) = self.actionable_command() else {
            return Vec::new();
        };
        let marker = format!(" {SEQUENCE_MARKER} ");
        command
            .split(marker.as_str())
            .map(|part| part.trim().trim_end_matches(',').trim())
            .filter(|part| !part.is_empty())
            .collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "type: {}\niterations: {}\ncommand: {}",
            self.kind.map(|k| k.to_string()).unwrap_or_else(|| "-".into()),
            self.iterations,
            self.command.as_deref().unwrap_or("-")
        )
    }
}
