//! System prompts for the completion service

use crate::config::ConfigError;
use std::path::Path;
use tracing::{info, warn};

pub const ROUTING_PROMPT_FILE: &str = "order_routing_decision_agent_instructions.md";

const BUILTIN_ROUTING_PROMPT: &str =
    include_str!("../../prompts/order_routing_decision_agent_instructions.md");

#[derive(Debug, Clone, PartialEq)]
pub struct Prompts {
    pub routing_instructions: String,
}

impl Prompts {
    pub fn builtin() -> Self {
        Self {
            routing_instructions: BUILTIN_ROUTING_PROMPT.to_string(),
        }
    }

    /// Prompts from `dir`, falling back to the built-in text per missing file
    pub fn load(dir: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(dir) = dir else {
            return Ok(Self::builtin());
        };

        if !dir.is_dir() {
            return Err(ConfigError::InvalidConfig(format!(
                "Prompt directory {} does not exist",
                dir.display()
            )));
        }

        let path = dir.join(ROUTING_PROMPT_FILE);
        if !path.exists() {
            warn!(path = %path.display(), "Prompt override not found, using built-in prompt");
            return Ok(Self::builtin());
        }

        let routing_instructions = std::fs::read_to_string(&path)?;
        if routing_instructions.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(format!(
                "Prompt file {} is empty",
                path.display()
            )));
        }

        info!(path = %path.display(), "Loaded routing prompt override");
        Ok(Self {
            routing_instructions,
        })
    }
}

impl Default for Prompts {
    fn default() -> Self {
        Self::builtin()
    }
}
