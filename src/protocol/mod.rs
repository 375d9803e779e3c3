// src/protocol/mod.rs

use crate::model::Directive;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod interpreter;
pub mod planner;

pub const NO_CAPABILITIES_REQUIRED: &str = "no capabilities required";

/// One planned capability invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub capability: String,
    /// What this step should accomplish, e.g. "set background effects to ON".
    /// Empty when the planner only returned names.
    pub intended_action: String,
}

impl ExecutionStep {
    pub fn new(capability: impl Into<String>, intended_action: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            intended_action: intended_action.into(),
        }
    }
}

/// Ordered, validated sequence of steps. Empty means "no action required".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub steps: Vec<ExecutionStep>,
}

impl ExecutionPlan {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.capability.as_str()).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepStatus {
    Ok,
    Failed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Ok => f.write_str("OK"),
            StepStatus::Failed => f.write_str("FAILED"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub capability: String,
    pub summary: String,
    pub status: StepStatus,
}

impl StepResult {
    pub fn ok(capability: &str, summary: impl Into<String>) -> Self {
        Self {
            capability: capability.to_string(),
            summary: summary.into(),
            status: StepStatus::Ok,
        }
    }

    pub fn failed(capability: &str, summary: impl Into<String>) -> Self {
        Self {
            capability: capability.to_string(),
            summary: summary.into(),
            status: StepStatus::Failed,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == StepStatus::Ok
    }
}

/// Results of one repeat of the plan.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IterationResult {
    pub steps: Vec<StepResult>,
    /// Set when the iteration stopped early on a registry consistency breach.
    pub aborted: Option<String>,
}

impl IterationResult {
    pub fn is_ok(&self) -> bool {
        self.aborted.is_none() && self.steps.iter().all(StepResult::is_ok)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.iter().filter(|s| !s.is_ok())
    }
}

/// Orchestrator states, recorded in the order they were entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Interpreting,
    Planning,
    Executing,
    Done,
    Aborted,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RunStatus {
    Ok,
    Failed,
    NoActionRequired,
    Aborted(String),
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Ok => f.write_str("OK"),
            RunStatus::Failed => f.write_str("FAILED"),
            RunStatus::NoActionRequired => f.write_str(NO_CAPABILITIES_REQUIRED),
            RunStatus::Aborted(reason) => write!(f, "ABORTED ({reason})"),
        }
    }
}

/// Everything one orchestrated run produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub directive: Directive,
    pub plan: ExecutionPlan,
    pub iterations: Vec<IterationResult>,
    pub status: RunStatus,
    pub phases: Vec<Phase>,
}

impl RunResult {
    pub fn is_ok(&self) -> bool {
        self.status == RunStatus::Ok
    }

    pub fn executed_steps(&self) -> usize {
        self.iterations.iter().map(|i| i.steps.len()).sum()
    }

    /// Stable text form, stored as a test case's `result`.
    pub fn render(&self) -> String {
        let mut out = self.directive.summary();
        out.push('\n');

        if self.plan.is_empty() {
            out.push_str("plan: -\n");
        } else {
            out.push_str(&format!("plan: {}\n", self.plan.names().join(" -> ")));
        }

        let total = self.iterations.len();
        for (i, iteration) in self.iterations.iter().enumerate() {
            out.push_str(&format!("iteration {}/{}:\n", i + 1, total));
            let steps = iteration.steps.len();
            for (k, step) in iteration.steps.iter().enumerate() {
                out.push_str(&format!(
                    "  [{}/{}] {} {}: {}\n",
                    k + 1,
                    steps,
                    step.capability,
                    step.status,
                    step.summary
                ));
            }
            if let Some(reason) = &iteration.aborted {
                out.push_str(&format!("  aborted: {reason}\n"));
            }
        }

        out.push_str(&format!("status: {}", self.status));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_run() -> RunResult {
        RunResult {
            directive: Directive {
                kind: Some(crate::model::DirectiveKind::Task),
                iterations: 1,
                command: Some("take a photo".into()),
            },
            plan: ExecutionPlan {
                steps: vec![ExecutionStep::new("take_photo", "take 1 photo")],
            },
            iterations: vec![IterationResult {
                steps: vec![StepResult::ok("take_photo", "1 photo taken successfully")],
                aborted: None,
            }],
            status: RunStatus::Ok,
            phases: vec![Phase::Interpreting, Phase::Planning, Phase::Executing, Phase::Done],
        }
    }

    #[test]
    fn render_lists_every_step() {
        let text = sample_run().render();
        assert!(text.contains("plan: take_photo"));
        assert!(text.contains("iteration 1/1:"));
        assert!(text.contains("[1/1] take_photo OK: 1 photo taken successfully"));
        assert!(text.ends_with("status: OK"));
    }

    #[test]
    fn iteration_with_failed_step_is_not_ok() {
        let iteration = IterationResult {
            steps: vec![
                StepResult::ok("open_camera", "opened"),
                StepResult::failed("take_photo", "Photo button is not accessible"),
            ],
            aborted: None,
        };
        assert!(!iteration.is_ok());
        assert_eq!(iteration.failures().count(), 1);
    }

    #[test]
    fn no_action_status_renders_explicitly() {
        let mut run = sample_run();
        run.plan = ExecutionPlan::empty();
        run.iterations.clear();
        run.status = RunStatus::NoActionRequired;
        assert!(run.render().ends_with(NO_CAPABILITIES_REQUIRED));
        assert_eq!(run.executed_steps(), 0);
    }
}
