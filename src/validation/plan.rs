// src/validation/plan.rs

use crate::protocol::planner::RawPlan;
use crate::tools::CapabilityRegistry;
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq)]
pub enum PlanValidationError {
    UnknownCapability(String),
    EmptyName(usize),
    StateCountMismatch { names: usize, states: usize },
}

impl PlanValidationError {
    pub fn hint(&self) -> (String, Option<Value>) {
        match self {
            PlanValidationError::UnknownCapability(name) => (
                "Unknown capability used. Only registered capability names are valid.".to_string(),
                Some(json!({ "name": name })),
            ),
            PlanValidationError::EmptyName(position) => (
                "Empty entry in sequence.".to_string(),
                Some(json!({ "position": position })),
            ),
            PlanValidationError::StateCountMismatch { names, states } => (
                "State list does not line up with the sequence.".to_string(),
                Some(json!({ "sequence": names, "state": states })),
            ),
        }
    }

    /// Fatal errors discard the whole plan.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PlanValidationError::StateCountMismatch { .. })
    }
}

pub fn validate_plan(plan: &RawPlan, registry: &CapabilityRegistry) -> Vec<PlanValidationError> {
    let mut errors = Vec::new();

    for (position, name) in plan.names.iter().enumerate() {
        if name.trim().is_empty() {
            errors.push(PlanValidationError::EmptyName(position + 1));
        } else if !registry.contains(name) {
            errors.push(PlanValidationError::UnknownCapability(name.clone()));
        }
    }

    if let Some(actions) = &plan.actions {
        if actions.len() != plan.names.len() {
            errors.push(PlanValidationError::StateCountMismatch {
                names: plan.names.len(),
                states: actions.len(),
            });
        }
    }

    errors
}
