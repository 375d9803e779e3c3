// src/protocol/interpreter.rs

use crate::error::LlmError;
use crate::llm::Completion;
use crate::model::{Directive, DirectiveKind, SEQUENCE_MARKER};
use std::sync::Arc;

/// Turns raw user text into a [`Directive`].
///
/// Only a failure to reach the service is an error; any reply text yields a
/// directive.
pub trait Interpreter: Send + Sync {
    fn interpret(
        &self,
        raw: &str,
        catalog: &[(&str, &str)],
        history: &[(String, String)],
    ) -> Result<Directive, LlmError>;
}

/// Interpreter backed by a text-completion service.
pub struct LlmInterpreter {
    llm: Arc<dyn Completion>,
}

impl LlmInterpreter {
    pub fn new(llm: Arc<dyn Completion>) -> Self {
        Self { llm }
    }
}

impl Interpreter for LlmInterpreter {
    fn interpret(
        &self,
        raw: &str,
        catalog: &[(&str, &str)],
        history: &[(String, String)],
    ) -> Result<Directive, LlmError> {
        let prompt = build_prompt(raw, catalog, history);
        let reply = self.llm.complete(&prompt)?;
        tracing::debug!(target: "agentic_camera::interpreter", %reply, "raw interpreter reply");
        Ok(parse_directive(&reply))
    }
}

fn build_prompt(raw: &str, catalog: &[(&str, &str)], history: &[(String, String)]) -> String {
    let tools = catalog
        .iter()
        .map(|(name, description)| format!("- {name}: {description}"))
        .collect::<Vec<_>>()
        .join("\n");

    let conversation = if history.is_empty() {
        "(none)".to_string()
    } else {
        history
            .iter()
            .map(|(role, content)| format!("{role}: {content}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"Given this conversation context, interpret the user's intent into a clear command.
If clarification is needed, ask for it. If a previous query is referenced, resolve it.
For sequential actions (like minimize then restore), include both commands in the QUERY separated by '{SEQUENCE_MARKER}'.

Available capabilities:
{tools}

Conversation so far:
{conversation}

Query:
{raw}

Output format:
TYPE: [TASK|CONVERSATION|UNCLEAR]
ITERATIONS: [Number of times to execute, default 1]
QUERY: [Final interpreted command(s) with tool and parameters. Use '{SEQUENCE_MARKER}' for sequential actions]"#
    )
}

/// Parse `KEY: value` lines into a directive. Never fails.
///
/// Every non-blank line is split once on the first colon; unknown keys and
/// lines without a colon are ignored and the last occurrence of a key wins.
/// An `ITERATIONS` value that is not a positive integer becomes 1.
pub fn parse_directive(reply: &str) -> Directive {
    let mut directive = Directive::default();

    for line in reply.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key
            .trim()
            .trim_matches(|c: char| c == '*' || c == '-' || c == '#' || c.is_whitespace())
            .to_ascii_uppercase();
        let value = value.trim().trim_matches('*').trim();

        match key.as_str() {
            "TYPE" => directive.kind = DirectiveKind::parse(value),
            "ITERATIONS" => directive.iterations = parse_iterations(value),
            "QUERY" => {
                directive.command = Some(value.to_string()).filter(|v| !v.is_empty());
            }
            _ => {}
        }
    }

    if directive.command.is_none() {
        tracing::warn!(target: "agentic_camera::interpreter", "interpreter reply carried no QUERY line");
    }
    directive
}

fn parse_iterations(value: &str) -> u32 {
    match value.parse::<u32>() {
        Ok(n) if n >= 1 => n,
        _ => {
            tracing::debug!(target: "agentic_camera::interpreter", value, "unusable ITERATIONS value, defaulting to 1");
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedCompletion;
    use proptest::prelude::*;

    #[test]
    fn parses_well_formed_reply() {
        let directive = parse_directive(
            "TYPE: TASK\nITERATIONS: 2\nQUERY: minimize_camera then restore_camera",
        );
        assert_eq!(directive.kind, Some(DirectiveKind::Task));
        assert_eq!(directive.iterations, 2);
        assert_eq!(
            directive.command.as_deref(),
            Some("minimize_camera then restore_camera")
        );
    }

    #[test]
    fn tolerates_order_whitespace_and_noise() {
        let directive = parse_directive(
            "Sure! Here is the interpretation:\n\n   QUERY:  take_photo  \nnot a pair\n  ITERATIONS :3\nTYPE: task\n",
        );
        assert_eq!(directive.kind, Some(DirectiveKind::Task));
        assert_eq!(directive.iterations, 3);
        assert_eq!(directive.command.as_deref(), Some("take_photo"));
    }

    #[test]
    fn last_occurrence_wins() {
        let directive = parse_directive("ITERATIONS: 4\nQUERY: open_camera\nITERATIONS: 2\nQUERY: close_camera");
        assert_eq!(directive.iterations, 2);
        assert_eq!(directive.command.as_deref(), Some("close_camera"));
    }

    #[test]
    fn splits_only_on_first_colon() {
        let directive = parse_directive("QUERY: set mode: video");
        assert_eq!(directive.command.as_deref(), Some("set mode: video"));
    }

    #[test]
    fn bad_iterations_fall_back_to_one() {
        assert_eq!(parse_directive("ITERATIONS: five").iterations, 1);
        assert_eq!(parse_directive("ITERATIONS: 0").iterations, 1);
        assert_eq!(parse_directive("ITERATIONS: -3").iterations, 1);
        assert_eq!(parse_directive("ITERATIONS:").iterations, 1);
    }

    #[test]
    fn missing_query_yields_no_command() {
        let directive = parse_directive("TYPE: CONVERSATION\nITERATIONS: 1");
        assert_eq!(directive.kind, Some(DirectiveKind::Conversation));
        assert!(directive.actionable_command().is_none());
    }

    #[test]
    fn markdown_bold_keys_are_recognised() {
        let directive = parse_directive("**TYPE:** TASK\n**QUERY:** take_video");
        assert_eq!(directive.kind, Some(DirectiveKind::Task));
        assert_eq!(directive.command.as_deref(), Some("take_video"));
    }

    #[test]
    fn prompt_carries_catalog_history_and_query() {
        let llm = Arc::new(ScriptedCompletion::with_replies(["TYPE: TASK\nQUERY: open_camera"]));
        let interpreter = LlmInterpreter::new(llm.clone());
        let history = vec![("user".to_string(), "open the camera".to_string())];
        let directive = interpreter
            .interpret("do that again", &[("open_camera", "Open the camera")], &history)
            .unwrap();

        assert_eq!(directive.command.as_deref(), Some("open_camera"));
        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("- open_camera: Open the camera"));
        assert!(prompt.contains("user: open the camera"));
        assert!(prompt.contains("do that again"));
    }

    #[test]
    fn transport_failure_is_reported() {
        let llm = Arc::new(ScriptedCompletion::new());
        llm.push_failure("connection refused");
        let interpreter = LlmInterpreter::new(llm);
        assert!(interpreter.interpret("open", &[], &[]).is_err());
    }

    proptest! {
        #[test]
        fn any_reply_yields_positive_iterations(reply in "\\PC*") {
            let directive = parse_directive(&reply);
            prop_assert!(directive.iterations >= 1);
        }

        #[test]
        fn any_iterations_value_yields_positive_count(value in "[ -~]{0,12}") {
            let directive = parse_directive(&format!("TYPE: TASK\nITERATIONS: {value}\nQUERY: open_camera"));
            prop_assert!(directive.iterations >= 1);
            prop_assert_eq!(directive.command.as_deref(), Some("open_camera"));
        }
    }
}
