// src/cli.rs

//! Terminal front end: coloured run traces and the interactive loop.

use crate::cases::TestCaseStore;
use crate::memory::{Memory, Transcript};
use crate::orchestrator::Orchestrator;
use crate::protocol::{RunResult, RunStatus, StepStatus};
use colored::Colorize;
use std::io::{self, BufRead, Write};

pub fn render_trace(result: &RunResult) -> String {
    let mut out = String::new();
    let directive = &result.directive;

    let kind = directive
        .kind
        .map(|k| k.to_string())
        .unwrap_or_else(|| "-".into());
    out.push_str(&format!(
        "{} {}  {} {}\n",
        "type:".dimmed(),
        kind.cyan(),
        "iterations:".dimmed(),
        directive.iterations
    ));
    out.push_str(&format!(
        "{} {}\n",
        "command:".dimmed(),
        directive.command.as_deref().unwrap_or("-")
    ));

    if !result.plan.is_empty() {
        out.push_str(&format!(
            "{} {}\n",
            "plan:".dimmed(),
            result.plan.names().join(" -> ").bold()
        ));
    }

    let total = result.iterations.len();
    for (i, iteration) in result.iterations.iter().enumerate() {
        if total > 1 {
            out.push_str(&format!("{}\n", format!("iteration {}/{}", i + 1, total).blue()));
        }
        let steps = iteration.steps.len();
        for (k, step) in iteration.steps.iter().enumerate() {
            let status = match step.status {
                StepStatus::Ok => "OK".green().bold(),
                StepStatus::Failed => "FAILED".red().bold(),
            };
            out.push_str(&format!(
                "  [{}/{}] {} {} {}\n",
                k + 1,
                steps,
                step.capability.bold(),
                status,
                step.summary
            ));
        }
        if let Some(reason) = &iteration.aborted {
            out.push_str(&format!("  {} {}\n", "aborted:".red(), reason));
        }
    }

    let status = match &result.status {
        RunStatus::Ok => result.status.to_string().green().bold(),
        RunStatus::Failed => result.status.to_string().red().bold(),
        RunStatus::NoActionRequired => result.status.to_string().yellow(),
        RunStatus::Aborted(_) => result.status.to_string().red(),
    };
    out.push_str(&format!("{} {}\n", "status:".dimmed(), status));
    out
}

/// One line of transcript for a finished run.
pub fn turn_summary(result: &RunResult) -> String {
    match result.directive.actionable_command() {
        Some(command) => format!("{command} [{}]", result.status),
        None => format!("[{}]", result.status),
    }
}

pub fn write_case_list<W: Write>(store: &TestCaseStore, out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", "Available test cases:".bold())?;
    for (id, case) in store.list() {
        let status = match case.status.as_deref() {
            Some("Pass") => " Pass".green().to_string(),
            Some("Fail") => " Fail".red().to_string(),
            _ => String::new(),
        };
        writeln!(out, "ID: {} - {}{}", id.cyan(), case.description(), status)?;
    }
    Ok(())
}

/// Read commands until EOF or `exit`, running each through the orchestrator.
///
/// Every turn is added to `memory` so later commands can refer back to it.
pub fn interactive<R: BufRead, W: Write>(
    orchestrator: &Orchestrator,
    input: R,
    out: &mut W,
    memory: &mut Transcript,
) -> io::Result<()> {
    writeln!(out, "{}", "Camera control. Type 'exit' to quit.".bold())?;
    let mut lines = input.lines();

    loop {
        write!(out, "{} ", ">".cyan().bold())?;
        out.flush()?;

        let Some(line) = lines.next() else {
            writeln!(out)?;
            break;
        };
        let line = line?;
        let line = line.trim();

        match line {
            "" => continue,
            "exit" | "quit" => break,
            "clear" => {
                memory.clear();
                writeln!(out, "{}", "conversation cleared".dimmed())?;
                continue;
            }
            _ => {}
        }

        let result = orchestrator.run(line, &memory.read_all());
        write!(out, "{}", render_trace(&result))?;

        memory.log("user", line);
        memory.log("assistant", &turn_summary(&result));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedCompletion;
    use crate::tools::{CapabilityRegistry, FnCapability};
    use std::io::Cursor;
    use std::sync::Arc;

    #[test]
    fn interactive_loop_remembers_turns() {
        colored::control::set_override(false);
        let registry = CapabilityRegistry::new()
            .with(FnCapability::new("open_camera", "Open the camera", |_, _| {
                Ok("Camera app opened successfully.".into())
            }))
            .unwrap();
        let llm = Arc::new(ScriptedCompletion::with_replies([
            "TYPE: TASK\nITERATIONS: 1\nQUERY: open the camera",
            "Sequence: [\"open_camera\"]",
            "TYPE: CONVERSATION\nITERATIONS: 1",
        ]));
        let orchestrator = Orchestrator::with_completion(registry, llm.clone());

        let input = Cursor::new("open it\n\nthanks\nexit\nnever read\n");
        let mut out = Vec::new();
        let mut memory = Transcript::new();
        interactive(&orchestrator, input, &mut out, &mut memory).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[1/1] open_camera OK Camera app opened successfully."));
        assert!(text.contains("no capabilities required"));
        assert_eq!(memory.len(), 4);
        assert_eq!(
            memory.read_all()[1],
            ("assistant".to_string(), "open the camera [OK]".to_string())
        );

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[2].contains("user: open it"));
    }
}
