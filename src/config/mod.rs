// src/config/mod.rs

use crate::error::ConfigError;
use crate::llm::{Completion, OllamaClient, OpenAiClient};
use crate::reconcile::Settle;
use crate::tools::camera::Timing;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "camera.toml";

const OLLAMA_ENDPOINT: &str = "http://localhost:11434";
const OLLAMA_MODEL: &str = "llama3.1";
const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Ollama,
    OpenAi,
}

impl Provider {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Provider::Ollama),
            "openai" => Ok(Provider::OpenAi),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    /// Defaults depend on the provider.
    pub model: Option<String>,
    pub endpoint: Option<String>,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".into(),
            model: None,
            endpoint: None,
            api_key_env: "OPENAI_API_KEY".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub settle_ms: u64,
    pub poll_ms: u64,
    pub launch_ms: u64,
    pub capture_ms: u64,
    /// Most photos a single `take_photo` step may take.
    pub max_photos: u32,
    /// Longest video a single `take_video` step may record.
    pub max_video_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_ms: 2000,
            poll_ms: 250,
            launch_ms: 3000,
            capture_ms: 2000,
            max_photos: 50,
            max_video_secs: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CasesConfig {
    pub path: PathBuf,
}

impl Default for CasesConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("cases/test_cases.json"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub timing: TimingConfig,
    pub cases: CasesConfig,
}

impl AppConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: AppConfig = toml::from_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Apply `LLM_MODEL` / `LLM_API_URL` overrides.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(model) = lookup("LLM_MODEL").filter(|v| !v.trim().is_empty()) {
            self.llm.model = Some(model);
        }
        if let Some(url) = lookup("LLM_API_URL").filter(|v| !v.trim().is_empty()) {
            self.llm.endpoint = Some(url);
        }
    }

    pub fn provider(&self) -> Result<Provider, ConfigError> {
        Provider::parse(&self.llm.provider)
    }

    pub fn model(&self) -> Result<String, ConfigError> {
        Ok(match (&self.llm.model, self.provider()?) {
            (Some(model), _) => model.clone(),
            (None, Provider::Ollama) => OLLAMA_MODEL.into(),
            (None, Provider::OpenAi) => OPENAI_MODEL.into(),
        })
    }

    pub fn endpoint(&self) -> Result<String, ConfigError> {
        Ok(match (&self.llm.endpoint, self.provider()?) {
            (Some(endpoint), _) => endpoint.clone(),
            (None, Provider::Ollama) => OLLAMA_ENDPOINT.into(),
            (None, Provider::OpenAi) => OPENAI_ENDPOINT.into(),
        })
    }

    /// Build the configured completion client. `lookup` resolves the API key.
    pub fn build_completion(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Arc<dyn Completion>, ConfigError> {
        let model = self.model()?;
        let endpoint = self.endpoint()?;

        match self.provider()? {
            Provider::Ollama => {
                tracing::info!(%model, %endpoint, "using ollama");
                Ok(Arc::new(OllamaClient::new(&endpoint, &model)?))
            }
            Provider::OpenAi => {
                let key_name = &self.llm.api_key_env;
                let api_key = lookup(key_name)
                    .filter(|k| !k.trim().is_empty())
                    .ok_or_else(|| ConfigError::MissingApiKey(key_name.clone()))?;
                tracing::info!(%model, %endpoint, "using openai-compatible endpoint");
                Ok(Arc::new(OpenAiClient::new(api_key, &endpoint, &model)?))
            }
        }
    }

    pub fn timing(&self) -> Timing {
        Timing {
            settle: Settle::new(
                Duration::from_millis(self.timing.settle_ms),
                Duration::from_millis(self.timing.poll_ms),
            ),
            launch: Duration::from_millis(self.timing.launch_ms),
            capture: Duration::from_millis(self.timing.capture_ms),
            max_photos: self.timing.max_photos,
            max_video: Duration::from_secs(self.timing.max_video_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.model().unwrap(), "llama3.1");
        assert_eq!(config.timing().settle.retries(), 8);
        assert_eq!(config.timing(), Timing::default());
    }

    #[test]
    fn capture_limits_are_configurable() {
        let file = write_config("[timing]\nmax_photos = 5\nmax_video_secs = 30\n");
        let timing = AppConfig::load(file.path()).unwrap().timing();
        assert_eq!(timing.max_photos, 5);
        assert_eq!(timing.max_video, Duration::from_secs(30));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let file = write_config("[timing]\nsettle_ms = 500\n\n[cases]\npath = \"my_cases.json\"\n");
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.timing.settle_ms, 500);
        assert_eq!(config.timing.poll_ms, 250);
        assert_eq!(config.cases.path, PathBuf::from("my_cases.json"));
        assert_eq!(config.llm, LlmConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let file = write_config("[timing\nsettle_ms = ");
        assert!(matches!(AppConfig::load(file.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn env_overrides_model_and_url() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("LLM_MODEL", "qwen2.5"), ("LLM_API_URL", "http://gpu:11434")]));
        assert_eq!(config.model().unwrap(), "qwen2.5");
        assert_eq!(config.endpoint().unwrap(), "http://gpu:11434");
    }

    #[test]
    fn openai_without_key_is_rejected() {
        let file = write_config("[llm]\nprovider = \"openai\"\napi_key_env = \"CAMERA_TEST_KEY\"\n");
        let config = AppConfig::load(file.path()).unwrap();
        let err = config.build_completion(env(&[])).err().unwrap();
        assert!(matches!(err, ConfigError::MissingApiKey(name) if name == "CAMERA_TEST_KEY"));
    }

    #[test]
    fn openai_with_key_builds() {
        let mut config = AppConfig::default();
        config.llm.provider = "OpenAI".into();
        assert_eq!(config.endpoint().unwrap(), OPENAI_ENDPOINT);
        assert!(config.build_completion(env(&[("OPENAI_API_KEY", "sk-test")])).is_ok());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let mut config = AppConfig::default();
        config.llm.provider = "carrier-pigeon".into();
        assert!(matches!(config.provider(), Err(ConfigError::UnknownProvider(_))));
    }
}
