// src/context/mod.rs

use crate::protocol::{StepResult, StepStatus};

/// Outcome of an earlier step in the same iteration.
#[derive(Clone, Debug, PartialEq)]
pub struct StepSummary {
    pub capability: String,
    pub status: StepStatus,
    pub summary: String,
}

impl From<&StepResult> for StepSummary {
    fn from(result: &StepResult) -> Self {
        Self {
            capability: result.capability.clone(),
            status: result.status,
            summary: result.summary.clone(),
        }
    }
}

/// What a handler is told about the step it is running.
#[derive(Clone, Debug, PartialEq)]
pub struct StepContext {
    pub original_command: String,
    /// 1-based.
    pub step_index: usize,
    pub total_steps: usize,
    pub intended_action: String,
    pub prior: Vec<StepSummary>,
}

impl StepContext {
    pub fn new(original_command: &str, step_index: usize, total_steps: usize) -> Self {
        Self {
            original_command: original_command.to_string(),
            step_index,
            total_steps,
            intended_action: String::new(),
            prior: Vec::new(),
        }
    }

    pub fn with_intended_action(mut self, action: &str) -> Self {
        self.intended_action = action.to_string();
        self
    }

    pub fn with_prior(mut self, prior: Vec<StepSummary>) -> Self {
        self.prior = prior;
        self
    }
}
