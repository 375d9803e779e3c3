// src/llm/mod.rs

//! Blocking text-completion clients.
//!
//! Both the interpreter and the planner only need "prompt in, text out",
//! so every backend implements [`Completion`].

use crate::error::LlmError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

pub mod scripted;
pub use scripted::ScriptedCompletion;

/// A text-completion service. Calls block until the full reply arrives.
pub trait Completion: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

fn http_client() -> Result<reqwest::blocking::Client, LlmError> {
    reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| LlmError::Transport(e.to_string()))
}

/// Local model served by Ollama.
pub struct OllamaClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    pub model: String,
}

impl OllamaClient {
    pub fn new(endpoint: &str, model: &str) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client()?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

impl Completion for OllamaClient {
    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.endpoint);

        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false
        });

        tracing::debug!(model = %self.model, %url, "sending completion request");
        let resp = self.client.post(&url).json(&payload).send()?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }

        let json = resp.json::<Value>()?;
        json.get("response")
            .and_then(|v| v.as_str())
            .map(|text| text.trim().to_string())
            .ok_or_else(|| LlmError::Decode("LLM response missing 'response' field".into()))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    content: Option<String>,
}

/// OpenAI-compatible chat completions endpoint.
pub struct OpenAiClient {
    client: reqwest::blocking::Client,
    api_key: String,
    api_url: String,
    pub model: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, api_url: &str, model: &str) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client()?,
            api_key,
            api_url: api_url.to_string(),
            model: model.to_string(),
        })
    }
}

impl Completion for OpenAiClient {
    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        tracing::debug!(model = %self.model, url = %self.api_url, "sending chat request");
        let resp = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }

        let completion: ChatResponse = resp.json()?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| LlmError::Decode("Empty response".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_response_decodes_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"TYPE: TASK"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("TYPE: TASK"));
    }

    #[test]
    fn chat_request_serializes_single_user_message() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "user",
                content: "hello",
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn ollama_endpoint_drops_trailing_slash() {
        let client = OllamaClient::new("http://localhost:11434/", "llama3").unwrap();
        assert_eq!(client.endpoint, "http://localhost:11434");
    }
}
