//! Error types for the order router
//!
//! Every layer has its own `thiserror` enum; [`RouterError`] is what the
//! orchestrator and the HTTP layer see. Messages leaving the process go
//! through [`sanitize_error_message`].

use crate::config::ConfigError;
use crate::data::DataError;
use crate::tools::{LookupError, ToolError};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Main error type for routing runs
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Invalid input: {message}")]
    Validation { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Data integrity error: {message}")]
    DataIntegrity { message: String },

    #[error("Upstream error: {message}")]
    Upstream { message: String },

    #[error("No route: {message}")]
    NoRoute { message: String },

    #[error("Routing run exceeded {seconds}s timeout")]
    Timeout { seconds: u64 },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),
}

impl RouterError {
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn data_integrity<S: Into<String>>(message: S) -> Self {
        Self::DataIntegrity {
            message: message.into(),
        }
    }

    pub fn upstream<S: Into<String>>(message: S) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    pub fn no_route<S: Into<String>>(message: S) -> Self {
        Self::NoRoute {
            message: message.into(),
        }
    }

    /// Stable machine-readable category
    pub fn kind(&self) -> &'static str {
        match self {
            RouterError::Validation { .. } => "validation",
            RouterError::NotFound { .. } => "not_found",
            RouterError::DataIntegrity { .. } => "data_integrity",
            RouterError::NoRoute { .. } => "no_route",
            // Timeouts and internal failures are reported as upstream to clients
            RouterError::Upstream { .. }
            | RouterError::Timeout { .. }
            | RouterError::Config(_)
            | RouterError::Tool(_)
            | RouterError::Data(_) => "upstream",
        }
    }

    /// Message suitable for an `{"error": ...}` body
    ///
    /// Domain failures carry their own wording; everything else keeps the
    /// category prefix.
    pub fn client_message(&self) -> String {
        let message = match self {
            RouterError::Validation { message }
            | RouterError::NotFound { message }
            | RouterError::DataIntegrity { message }
            | RouterError::NoRoute { message } => message.clone(),
            other => other.to_string(),
        };
        sanitize_error_message(&message)
    }
}

impl From<LookupError> for RouterError {
    fn from(error: LookupError) -> Self {
        match error {
            LookupError::Validation(message) => Self::Validation { message },
            LookupError::NotFound(message) => Self::NotFound { message },
            LookupError::DataIntegrity(message) => Self::DataIntegrity { message },
        }
    }
}

static SECRET_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").ok());

static SENSITIVE_PATH_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+").ok()
});

const MAX_MESSAGE_LEN: usize = 500;

/// Redact secrets and sensitive paths, cap the length at 500 bytes
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = message.to_string();

    if let Some(pattern) = SECRET_PATTERN.as_ref() {
        sanitized = pattern.replace_all(&sanitized, "${1}=***").to_string();
    }

    if let Some(pattern) = SENSITIVE_PATH_PATTERN.as_ref() {
        sanitized = pattern
            .replace_all(&sanitized, "/***REDACTED***/")
            .to_string();
    }

    if sanitized.len() > MAX_MESSAGE_LEN {
        let truncate_suffix = "...[truncated]";
        let mut cut = MAX_MESSAGE_LEN - truncate_suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], truncate_suffix);
    }

    sanitized
}

/// Result type for router operations
pub type RouterResult<T> = Result<T, RouterError>;
