// src/orchestrator/mod.rs

//! INTERPRETING → PLANNING → EXECUTING → DONE, with ABORTED reachable from the
//! first two phases.

use crate::context::{StepContext, StepSummary};
use crate::llm::Completion;
use crate::model::Directive;
use crate::protocol::interpreter::{Interpreter, LlmInterpreter};
use crate::protocol::planner::{LlmPlanner, Planner};
use crate::protocol::{
    ExecutionPlan, ExecutionStep, IterationResult, Phase, RunResult, RunStatus, StepResult,
};
use crate::tools::{Capability, CapabilityRegistry, Param, params};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

pub struct Orchestrator {
    registry: CapabilityRegistry,
    interpreter: Box<dyn Interpreter>,
    planner: Box<dyn Planner>,
}

impl Orchestrator {
    pub fn new(
        registry: CapabilityRegistry,
        interpreter: Box<dyn Interpreter>,
        planner: Box<dyn Planner>,
    ) -> Self {
        Self {
            registry,
            interpreter,
            planner,
        }
    }

    /// Interpreter and planner sharing one completion service.
    pub fn with_completion(registry: CapabilityRegistry, llm: Arc<dyn Completion>) -> Self {
        Self::new(
            registry,
            Box::new(LlmInterpreter::new(llm.clone())),
            Box::new(LlmPlanner::new(llm)),
        )
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Run one raw input to completion. Never fails: every outcome, including
    /// an abort, is described by the returned [`RunResult`].
    pub fn run(&self, raw: &str, history: &[(String, String)]) -> RunResult {
        let mut phases = vec![Phase::Interpreting];
        tracing::info!(input = raw, "interpreting");

        if raw.trim().is_empty() {
            return aborted(Directive::default(), phases, "empty input");
        }

        let directive = match self.interpret(raw, history) {
            Ok(directive) => directive,
            Err(reason) => return aborted(Directive::default(), phases, &reason),
        };

        phases.push(Phase::Planning);
        let plan = match self.plan(&directive) {
            Ok(plan) => plan,
            Err(reason) => return aborted(directive, phases, &reason),
        };

        if plan.is_empty() {
            tracing::info!("no capabilities required");
            phases.push(Phase::Done);
            return RunResult {
                directive,
                plan,
                iterations: Vec::new(),
                status: RunStatus::NoActionRequired,
                phases,
            };
        }

        phases.push(Phase::Executing);
        let iterations = self.execute(raw, &directive, &plan);

        phases.push(Phase::Done);
        let status = evaluate(&iterations);
        tracing::info!(%status, iterations = iterations.len(), "run complete");

        RunResult {
            directive,
            plan,
            iterations,
            status,
            phases,
        }
    }

    fn interpret(&self, raw: &str, history: &[(String, String)]) -> Result<Directive, String> {
        let catalog = self.registry.describe_all();
        let directive = self
            .interpreter
            .interpret(raw, &catalog, history)
            .map_err(|e| format!("interpreter unavailable: {e}"))?;
        tracing::info!(
            kind = ?directive.kind,
            iterations = directive.iterations,
            command = ?directive.command,
            "interpreted"
        );
        Ok(directive)
    }

    fn plan(&self, directive: &Directive) -> Result<ExecutionPlan, String> {
        let Some(command) = directive.actionable_command() else {
            tracing::info!("directive carries no command");
            return Ok(ExecutionPlan::empty());
        };
        let plan = self
            .planner
            .plan(command, &self.registry)
            .map_err(|e| format!("planner unavailable: {e}"))?;
        tracing::info!(steps = ?plan.names(), "planned");
        Ok(plan)
    }

    /// Run the plan `directive.iterations` times, one iteration after another.
    pub fn execute(&self, raw: &str, directive: &Directive, plan: &ExecutionPlan) -> Vec<IterationResult> {
        let command = directive.actionable_command().unwrap_or(raw);
        let sub_actions = directive.sub_actions();
        let total = directive.iterations.max(1);

        (1..=total)
            .map(|i| {
                tracing::info!(iteration = i, of = total, "executing");
                let result = self.run_iteration(raw, command, &sub_actions, plan);
                for failure in result.failures() {
                    tracing::error!(iteration = i, capability = %failure.capability, "{}", failure.summary);
                }
                result
            })
            .collect()
    }

    fn run_iteration(
        &self,
        raw: &str,
        command: &str,
        sub_actions: &[&str],
        plan: &ExecutionPlan,
    ) -> IterationResult {
        let mut result = IterationResult::default();
        let total = plan.len();

        for (index, step) in plan.steps.iter().enumerate() {
            let capability = match self.registry.resolve(&step.capability) {
                Ok(capability) => capability,
                Err(e) => {
                    tracing::error!(capability = %step.capability, "validated plan names an unresolvable capability");
                    result.aborted = Some(e.to_string());
                    break;
                }
            };

            let action = intended_action(step, index, total, sub_actions);
            let ctx = StepContext::new(raw, index + 1, total)
                .with_intended_action(action)
                .with_prior(result.steps.iter().map(StepSummary::from).collect());

            let param = params::resolve(capability.param(), capability.keywords(), action, command);
            let step_result = match param {
                Ok(param) => invoke_step(capability, &step.capability, param, &ctx),
                Err(e) => StepResult::failed(&step.capability, e.to_string()),
            };
            result.steps.push(step_result);
        }

        result
    }
}

fn invoke_step(capability: &dyn Capability, name: &str, param: Option<Param>, ctx: &StepContext) -> StepResult {
    tracing::debug!(
        step = ctx.step_index,
        of = ctx.total_steps,
        capability = name,
        ?param,
        "invoking"
    );
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| capability.invoke(param, ctx)));
    match outcome {
        Ok(Ok(summary)) => StepResult::ok(name, summary),
        Ok(Err(e)) => StepResult::failed(name, e.to_string()),
        Err(payload) => StepResult::failed(
            name,
            format!("handler panicked: {}", panic_message(payload.as_ref())),
        ),
    }
}

/// The planner's action text, or the matching sub-action of the command when
/// the planner returned names only and the counts line up.
fn intended_action<'a>(step: &'a ExecutionStep, index: usize, total: usize, sub_actions: &[&'a str]) -> &'a str {
    if !step.intended_action.trim().is_empty() {
        return &step.intended_action;
    }
    if sub_actions.len() == total {
        return sub_actions[index];
    }
    ""
}

fn evaluate(iterations: &[IterationResult]) -> RunStatus {
    if iterations.iter().all(IterationResult::is_ok) {
        RunStatus::Ok
    } else {
        RunStatus::Failed
    }
}

fn aborted(directive: Directive, mut phases: Vec<Phase>, reason: &str) -> RunResult {
    tracing::warn!(reason, "run aborted");
    phases.push(Phase::Aborted);
    RunResult {
        directive,
        plan: ExecutionPlan::empty(),
        iterations: Vec::new(),
        status: RunStatus::Aborted(reason.to_string()),
        phases,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedCompletion;
    use crate::model::DirectiveKind;
    use crate::tools::{FnCapability, ParamKind};
    use std::sync::Mutex;

    fn orchestrator(registry: CapabilityRegistry, replies: &[&str]) -> Orchestrator {
        let llm = Arc::new(ScriptedCompletion::with_replies(replies.iter().copied()));
        Orchestrator::with_completion(registry, llm)
    }

    #[test]
    fn blank_input_aborts_without_calling_services() {
        let llm = Arc::new(ScriptedCompletion::new());
        let orchestrator = Orchestrator::with_completion(CapabilityRegistry::new(), llm.clone());
        let result = orchestrator.run("   ", &[]);
        assert_eq!(result.status, RunStatus::Aborted("empty input".into()));
        assert_eq!(result.phases, vec![Phase::Interpreting, Phase::Aborted]);
        assert!(llm.prompts().is_empty());
    }

    #[test]
    fn directive_without_query_skips_the_planner() {
        let llm = Arc::new(ScriptedCompletion::with_replies(["TYPE: CONVERSATION"]));
        let orchestrator = Orchestrator::with_completion(CapabilityRegistry::new(), llm.clone());
        let result = orchestrator.run("hello there", &[]);
        assert_eq!(result.status, RunStatus::NoActionRequired);
        assert_eq!(
            result.phases,
            vec![Phase::Interpreting, Phase::Planning, Phase::Done]
        );
        assert_eq!(llm.prompts().len(), 1);
    }

    #[test]
    fn planner_outage_aborts_in_planning() {
        let llm = Arc::new(ScriptedCompletion::with_replies(["TYPE: TASK\nQUERY: open the camera"]));
        llm.push_failure("timed out");
        let orchestrator = Orchestrator::with_completion(CapabilityRegistry::new(), llm);
        let result = orchestrator.run("open the camera", &[]);
        assert!(matches!(result.status, RunStatus::Aborted(ref r) if r.contains("planner")));
        assert_eq!(result.directive.command.as_deref(), Some("open the camera"));
        assert_eq!(result.phases.last(), Some(&Phase::Aborted));
    }

    #[test]
    fn panicking_handler_is_recorded_as_failed() {
        let registry = CapabilityRegistry::new()
            .with(FnCapability::new("explode", "Always panics", |_, _| panic!("boom")))
            .and_then(|r| r.with(FnCapability::new("after", "Runs anyway", |_, _| Ok("fine".into()))))
            .unwrap();
        let result = orchestrator(
            registry,
            &["QUERY: explode then after", "Sequence: [\"explode\", \"after\"]"],
        )
        .run("explode then after", &[]);

        let steps = &result.iterations[0].steps;
        assert!(!steps[0].is_ok());
        assert_eq!(steps[0].summary, "handler panicked: boom");
        assert!(steps[1].is_ok());
        assert_eq!(result.status, RunStatus::Failed);
    }

    #[test]
    fn params_come_from_sub_actions_when_planner_gives_names_only() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let registry = CapabilityRegistry::new()
            .with(
                FnCapability::new("set_background_effects", "Toggle effects", move |param, ctx| {
                    sink.lock().unwrap().push((param, ctx.intended_action.clone()));
                    Ok("done".into())
                })
                .with_param(ParamKind::Flag),
            )
            .unwrap();
        orchestrator(
            registry,
            &[
                "QUERY: turn background effects on then turn background effects off",
                "[\"set_background_effects\", \"set_background_effects\"]",
            ],
        )
        .run("effects on and then off", &[]);

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, Some(params::Param::Flag(true)));
        assert_eq!(seen[1].0, Some(params::Param::Flag(false)));
        assert_eq!(seen[1].1, "turn background effects off");
    }

    #[test]
    fn unresolvable_step_aborts_each_iteration_but_not_the_run() {
        let registry = CapabilityRegistry::new()
            .with(FnCapability::new("open_camera", "Open the camera", |_, _| {
                Ok("Camera app opened successfully.".into())
            }))
            .unwrap();
        let orchestrator = orchestrator(registry, &[]);
        let directive = Directive {
            kind: Some(DirectiveKind::Task),
            iterations: 3,
            command: Some("open the camera then zoom in".into()),
        };
        let plan = ExecutionPlan {
            steps: vec![
                ExecutionStep::new("open_camera", "open the camera"),
                ExecutionStep::new("zoom_in", "zoom in"),
                ExecutionStep::new("open_camera", "open the camera"),
            ],
        };

        let iterations = orchestrator.execute("open the camera then zoom in", &directive, &plan);

        assert_eq!(iterations.len(), 3);
        for iteration in &iterations {
            assert_eq!(iteration.steps.len(), 1);
            assert!(iteration.steps[0].is_ok());
            assert_eq!(iteration.aborted.as_deref(), Some("unknown capability: zoom_in"));
            assert!(!iteration.is_ok());
        }
        assert_eq!(evaluate(&iterations), RunStatus::Failed);
    }

    #[test]
    fn unusable_argument_fails_the_step_without_invoking() {
        let registry = CapabilityRegistry::new()
            .with(
                FnCapability::new("take_photo", "Take photos", |_, _| {
                    panic!("handler must not run with an unusable count")
                })
                .with_param(ParamKind::Count { default: 1 }),
            )
            .and_then(|r| {
                r.with(FnCapability::new("close_camera", "Close the camera", |_, _| {
                    Ok("closed".into())
                }))
            })
            .unwrap();
        let result = orchestrator(
            registry,
            &[
                "QUERY: take 99999999999 photos then close the camera",
                "[\"take_photo\", \"close_camera\"]",
            ],
        )
        .run("take 99999999999 photos and close", &[]);

        let steps = &result.iterations[0].steps;
        assert_eq!(steps[0].summary, "invalid argument: count out of range: 99999999999");
        assert!(steps[1].is_ok());
        assert_eq!(result.status, RunStatus::Failed);
    }
}
