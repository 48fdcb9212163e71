//! Router configuration
//!
//! Loaded from TOML. Every section has defaults, so an empty file is a valid
//! configuration; secrets stay in the environment and are read when the
//! provider is built.

use crate::agent::priority::BusinessPriority;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The completion service cannot be asked for more than this many fallbacks
pub const MAX_ALTERNATIVES_LIMIT: usize = 2;

/// Top-level router configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RouterConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub orchestrator: OrchestratorSection,
    #[serde(default)]
    pub prompts: PromptsSection,
    #[serde(default)]
    pub data: DataSection,
}

/// HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Completion service settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSection {
    /// Provider name; only "openai" is supported
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable containing the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Override for OpenAI-compatible endpoints
    pub base_url: Option<String>,
    /// Optional temperature (0.0 to 2.0)
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Per-call HTTP timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: None,
            temperature: None,
            max_tokens: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

/// Bounds on a single routing run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrchestratorSection {
    /// Completion requests allowed per run
    #[serde(default = "default_max_round_trips")]
    pub max_round_trips: u32,
    /// Hard limit on a whole run, intake included
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: u64,
    /// Used when a request carries no business_priority
    #[serde(default = "default_priority")]
    pub default_priority: BusinessPriority,
    #[serde(default = "default_max_alternatives")]
    pub max_alternatives: usize,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            max_round_trips: default_max_round_trips(),
            run_timeout_secs: default_run_timeout(),
            default_priority: default_priority(),
            max_alternatives: default_max_alternatives(),
        }
    }
}

fn default_max_round_trips() -> u32 {
    8
}

fn default_run_timeout() -> u64 {
    60
}

fn default_priority() -> BusinessPriority {
    BusinessPriority::PrioritizeGoldTierSpeed
}

fn default_max_alternatives() -> usize {
    MAX_ALTERNATIVES_LIMIT
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PromptsSection {
    /// Directory holding prompt overrides
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DataSection {
    /// Directory holding fixture JSON files; built-in fixtures otherwise
    pub fixtures_dir: Option<PathBuf>,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RouterConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: RouterConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.llm.provider.eq_ignore_ascii_case("openai") {
            return Err(ConfigError::InvalidConfig(format!(
                "Unsupported LLM provider '{}'; only 'openai' is available",
                self.llm.provider
            )));
        }
        if let Some(temperature) = self.llm.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::InvalidConfig(format!(
                    "llm.temperature must be between 0.0 and 2.0, got {temperature}"
                )));
            }
        }
        if self.llm.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "llm.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.orchestrator.max_round_trips == 0 {
            return Err(ConfigError::InvalidConfig(
                "orchestrator.max_round_trips must be at least 1".to_string(),
            ));
        }
        if self.orchestrator.run_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "orchestrator.run_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.orchestrator.max_alternatives > MAX_ALTERNATIVES_LIMIT {
            return Err(ConfigError::InvalidConfig(format!(
                "orchestrator.max_alternatives must be at most {MAX_ALTERNATIVES_LIMIT}, got {}",
                self.orchestrator.max_alternatives
            )));
        }
        Ok(())
    }

    /// Get LLM API key from environment variable
    pub fn get_llm_api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.llm.api_key_env)
            .map_err(|_| ConfigError::EnvVarNotFound(self.llm.api_key_env.clone()))
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[llm]
model = "gpt-4o-mini"
api_key_env = "ORDER_ROUTER_TEST_KEY"
temperature = 0.0

[orchestrator]
max_round_trips = 4
run_timeout_secs = 5
"#;
        toml::from_str(toml_content).expect("Test config should parse")
    }
}
