// src/protocol/planner.rs

use crate::error::LlmError;
use crate::llm::Completion;
use crate::protocol::{ExecutionPlan, ExecutionStep};
use crate::tools::{CapabilityRegistry, CapabilitySpec};
use crate::validation::plan::validate_plan;
use regex::Regex;
use std::sync::{Arc, LazyLock};

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*```[A-Za-z]*\s*$").expect("valid fence regex"));
static SEQUENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bsequence\s*:\s*\[(.*?)\]").expect("valid sequence regex"));
static STATES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bstates?\s*:\s*\[(.*?)\]").expect("valid state regex"));
static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[(.*?)\]").expect("valid list regex"));
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)"|'([^']*)'"#).expect("valid quote regex"));

/// Turns a canonical command into a validated [`ExecutionPlan`].
///
/// Only a failure to reach the service is an error. Unparsable replies and
/// plans naming unknown capabilities both come back as an empty plan.
pub trait Planner: Send + Sync {
    fn plan(&self, command: &str, registry: &CapabilityRegistry) -> Result<ExecutionPlan, LlmError>;
}

pub struct LlmPlanner {
    llm: Arc<dyn Completion>,
}

impl LlmPlanner {
    pub fn new(llm: Arc<dyn Completion>) -> Self {
        Self { llm }
    }
}

impl Planner for LlmPlanner {
    fn plan(&self, command: &str, registry: &CapabilityRegistry) -> Result<ExecutionPlan, LlmError> {
        let prompt = build_prompt(command, &registry.specs());
        let reply = self.llm.complete(&prompt)?;
        tracing::debug!(target: "agentic_camera::planner", %reply, "raw planner reply");
        Ok(plan_from_reply(&reply, registry))
    }
}

fn build_prompt(command: &str, catalog: &[CapabilitySpec]) -> String {
    let capabilities = catalog
        .iter()
        .map(|spec| match spec.param_hint.as_str() {
            "" => format!("- {}: {}", spec.name, spec.description),
            hint => format!("- {}: {} ({hint})", spec.name, spec.description),
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are the planning agent of a camera application.

Determine which capabilities are needed to complete the task, in the order they must run.

### Constraints:
- Only use capability names from the list below, spelled exactly.
- Repeat a capability if the task needs it more than once.
- For every capability in the sequence, state what it should do (e.g. "turn background effects on").
- If no capability is needed, return empty lists.

### Output Format:
Sequence: ["first_capability", "second_capability"]
State: ["what the first one should do", "what the second one should do"]

### Available Capabilities:
{capabilities}

### Task:
"{command}""#
    )
}

/// Lists pulled out of a planner reply, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPlan {
    pub names: Vec<String>,
    /// Intended action per name; `None` when the reply held a single list.
    pub actions: Option<Vec<String>>,
}

/// Extract the name list and, if present, the parallel action list.
///
/// `Sequence: [...]` / `State: [...]` is preferred; otherwise the first
/// bracketed list not labelled `State:` is taken as the names. Never fails.
pub fn parse_plan_reply(reply: &str) -> RawPlan {
    let text = FENCE.replace_all(reply, "");

    if let Some(sequence) = SEQUENCE.captures(&text) {
        let actions = STATES.captures(&text).map(|c| split_list(&c[1]));
        return RawPlan {
            names: split_list(&sequence[1]),
            actions,
        };
    }

    let names = BRACKETED.captures_iter(&text).find(|list| {
        let start = list.get(0).map_or(0, |m| m.start());
        !labelled_as_states(&text[..start])
    });
    match names {
        Some(list) => RawPlan {
            names: split_list(&list[1]),
            actions: None,
        },
        None => RawPlan::default(),
    }
}

fn labelled_as_states(before: &str) -> bool {
    let label = before.trim_end().to_lowercase();
    label.ends_with("state:") || label.ends_with("states:")
}

fn split_list(inner: &str) -> Vec<String> {
    if QUOTED.is_match(inner) {
        return QUOTED
            .captures_iter(inner)
            .filter_map(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| m.as_str().trim().to_string())
            .collect();
    }

    inner
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse and validate a planner reply. Any invalid name empties the plan.
pub fn plan_from_reply(reply: &str, registry: &CapabilityRegistry) -> ExecutionPlan {
    let raw = parse_plan_reply(reply);
    if raw.names.is_empty() {
        tracing::debug!("planner returned no steps");
        return ExecutionPlan::empty();
    }

    let errors = validate_plan(&raw, registry);
    for error in &errors {
        let (message, example) = error.hint();
        let example = example.map(|v| v.to_string()).unwrap_or_default();
        tracing::warn!(?error, %example, "plan validation: {message}");
    }
    if errors.iter().any(|e| e.is_fatal()) {
        tracing::warn!(names = ?raw.names, "rejecting plan");
        return ExecutionPlan::empty();
    }

    let mut actions = raw.actions.unwrap_or_default();
    actions.resize(raw.names.len(), String::new());

    ExecutionPlan {
        steps: raw
            .names
            .into_iter()
            .zip(actions)
            .map(|(name, action)| ExecutionStep::new(name, action))
            .collect(),
    }
}
