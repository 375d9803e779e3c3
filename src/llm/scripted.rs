// src/llm/scripted.rs

use crate::error::LlmError;
use crate::llm::Completion;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays queued replies in order and remembers every prompt it was given.
#[derive(Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let scripted = Self::new();
        for reply in replies {
            scripted.push_reply(reply);
        }
        scripted
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        if let Ok(mut queue) = self.replies.lock() {
            queue.push_back(Ok(reply.into()));
        }
    }

    /// Queue a transport failure.
    pub fn push_failure(&self, message: impl Into<String>) {
        if let Ok(mut queue) = self.replies.lock() {
            queue.push_back(Err(message.into()));
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|q| q.len()).unwrap_or_default()
    }
}

impl Completion for ScriptedCompletion {
    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let next = self
            .replies
            .lock()
            .map_err(|_| LlmError::Transport("scripted completion poisoned".into()))?
            .pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(LlmError::Transport(message)),
            None => Err(LlmError::Exhausted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_in_order_then_exhausts() {
        let llm = ScriptedCompletion::with_replies(["first", "second"]);
        assert_eq!(llm.complete("a").unwrap(), "first");
        assert_eq!(llm.complete("b").unwrap(), "second");
        assert!(matches!(llm.complete("c"), Err(LlmError::Exhausted)));
        assert_eq!(llm.prompts(), vec!["a", "b", "c"]);
    }

    #[test]
    fn queued_failure_surfaces_as_transport_error() {
        let llm = ScriptedCompletion::new();
        llm.push_failure("connection refused");
        assert!(matches!(llm.complete("x"), Err(LlmError::Transport(_))));
    }
}
