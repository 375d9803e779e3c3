// src/error.rs

use thiserror::Error;

/// Failures talking to a completion service.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("no scripted reply left")]
    Exhausted,
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LlmError::Decode(err.to_string())
        } else {
            LlmError::Transport(err.to_string())
        }
    }
}

/// Handler-level failures. All of these are caught at the step boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapabilityError {
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("{0} state could not be determined")]
    StateUnknown(String),

    #[error("{control} did not converge to {desired} (last seen: {observed})")]
    Reconciliation {
        control: String,
        desired: String,
        observed: String,
    },

    #[error("{0} is not accessible")]
    Unavailable(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("driver error: {0}")]
    Driver(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("capability already registered: {0}")]
    DuplicateCapability(String),

    #[error("unknown capability: {0}")]
    UnknownCapability(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing API key: {0} not found in environment")]
    MissingApiKey(String),

    #[error("unknown LLM provider: {0}")]
    UnknownProvider(String),

    #[error("could not build LLM client: {0}")]
    Client(#[from] LlmError),
}

#[derive(Error, Debug)]
pub enum CaseStoreError {
    #[error("test cases file not found: {0}")]
    NotFound(String),

    #[error("test ID {0} not found")]
    UnknownCase(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Crate-level error used by the binary and the file-backed surfaces.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cases(#[from] CaseStoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
