//! Per-run progress reporting
//!
//! The orchestrator reports each stage, completion request and tool call
//! through [`Progress`]. [`RunLog`] keeps them in memory so the HTTP layer
//! can hand the run's log lines back to the caller next to the result.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressMessage {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub category: ProgressCategory,
    pub event_type: ProgressEventType,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressCategory {
    General,
    Intake,
    Routing,
    Tool,
    Llm,
}

impl ProgressCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressCategory::General => "general",
            ProgressCategory::Intake => "intake",
            ProgressCategory::Routing => "routing",
            ProgressCategory::Tool => "tool",
            ProgressCategory::Llm => "llm",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressEventType {
    RunStart,
    RunComplete,
    StageStart,
    StageComplete,
    StageError,
    ToolCall,
    ToolComplete,
    ToolError,
    LlmRequest,
    LlmResponse,
    LlmError,
}

impl ProgressEventType {
    fn is_error(&self) -> bool {
        matches!(
            self,
            ProgressEventType::StageError
                | ProgressEventType::ToolError
                | ProgressEventType::LlmError
        )
    }
}

impl ProgressMessage {
    pub fn new<S: Into<String>>(
        run_id: &str,
        category: ProgressCategory,
        event_type: ProgressEventType,
        message: S,
    ) -> Self {
        Self {
            run_id: run_id.to_string(),
            timestamp: Utc::now(),
            category,
            event_type,
            message: message.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// `2024-07-15T10:30:00.000Z - INFO - [routing] message`
    pub fn to_log_line(&self) -> String {
        let level = if self.event_type.is_error() {
            "ERROR"
        } else {
            "INFO"
        };
        format!(
            "{} - {} - [{}] {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            level,
            self.category.as_str(),
            self.message
        )
    }
}

/// Sink for run progress; `record` is the only required method
#[async_trait]
pub trait Progress: Send + Sync {
    async fn record(&self, message: ProgressMessage);

    async fn report_stage_start(&self, run_id: &str, category: ProgressCategory, message: &str) {
        self.record(ProgressMessage::new(
            run_id,
            category,
            ProgressEventType::StageStart,
            message,
        ))
        .await;
    }

    async fn report_stage_complete(&self, run_id: &str, category: ProgressCategory, message: &str) {
        self.record(ProgressMessage::new(
            run_id,
            category,
            ProgressEventType::StageComplete,
            message,
        ))
        .await;
    }

    async fn report_stage_error(&self, run_id: &str, category: ProgressCategory, message: &str) {
        self.record(ProgressMessage::new(
            run_id,
            category,
            ProgressEventType::StageError,
            message,
        ))
        .await;
    }

    async fn report_tool_call(&self, run_id: &str, tool_name: &str, arguments: &serde_json::Value) {
        self.record(
            ProgressMessage::new(
                run_id,
                ProgressCategory::Tool,
                ProgressEventType::ToolCall,
                format!("Calling {tool_name} with {arguments}"),
            )
            .with_metadata(serde_json::json!({"tool": tool_name})),
        )
        .await;
    }

    async fn report_tool_complete(&self, run_id: &str, tool_name: &str, message: &str) {
        self.record(
            ProgressMessage::new(
                run_id,
                ProgressCategory::Tool,
                ProgressEventType::ToolComplete,
                format!("{tool_name} returned: {message}"),
            )
            .with_metadata(serde_json::json!({"tool": tool_name})),
        )
        .await;
    }

    async fn report_tool_error(&self, run_id: &str, tool_name: &str, message: &str) {
        self.record(
            ProgressMessage::new(
                run_id,
                ProgressCategory::Tool,
                ProgressEventType::ToolError,
                format!("{tool_name} failed: {message}"),
            )
            .with_metadata(serde_json::json!({"tool": tool_name})),
        )
        .await;
    }

    async fn report_llm_request(&self, run_id: &str, message: &str) {
        self.record(ProgressMessage::new(
            run_id,
            ProgressCategory::Llm,
            ProgressEventType::LlmRequest,
            message,
        ))
        .await;
    }

    async fn report_llm_response(&self, run_id: &str, message: &str) {
        self.record(ProgressMessage::new(
            run_id,
            ProgressCategory::Llm,
            ProgressEventType::LlmResponse,
            message,
        ))
        .await;
    }

    async fn report_llm_error(&self, run_id: &str, message: &str) {
        self.record(ProgressMessage::new(
            run_id,
            ProgressCategory::Llm,
            ProgressEventType::LlmError,
            message,
        ))
        .await;
    }
}

pub struct NoOpProgress;

#[async_trait]
impl Progress for NoOpProgress {
    async fn record(&self, _message: ProgressMessage) {}
}

/// In-memory progress collector for a single run
#[derive(Debug, Default)]
pub struct RunLog {
    entries: Mutex<Vec<ProgressMessage>>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ProgressMessage> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Formatted lines in the order they were recorded
    pub fn lines(&self) -> Vec<String> {
        self.entries()
            .iter()
            .map(ProgressMessage::to_log_line)
            .collect()
    }
}

#[async_trait]
impl Progress for RunLog {
    async fn record(&self, message: ProgressMessage) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(message);
        }
    }
}
