//! Mock implementations for testing
//!
//! Provides a scripted LlmProvider and a recording Progress sink so the
//! orchestrator and the HTTP layer can be tested without a completion service.

use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, TokenUsage,
    ToolCall,
};
use crate::progress::{Progress, ProgressMessage};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Plain assistant text response
pub fn text_response(content: impl Into<String>) -> CompletionResponse {
    CompletionResponse {
        content: Some(content.into()),
        model: "mock-model".to_string(),
        usage: TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        },
        finish_reason: FinishReason::Stop,
        tool_calls: None,
        metadata: HashMap::new(),
    }
}

/// Assistant response requesting the given tool invocations
pub fn tool_call_response(calls: Vec<(&str, Value)>) -> CompletionResponse {
    let tool_calls = calls
        .into_iter()
        .enumerate()
        .map(|(i, (name, arguments))| ToolCall {
            id: format!("call_{i}_{name}"),
            name: name.to_string(),
            arguments,
        })
        .collect();

    CompletionResponse {
        content: None,
        finish_reason: FinishReason::ToolCalls,
        tool_calls: Some(tool_calls),
        ..text_response("")
    }
}

/// Mock LLM provider for testing
///
/// Replays its script in order and wraps around once exhausted, so a
/// single tool-call response keeps asking for tools forever.
#[derive(Debug, Default)]
pub struct MockLlmProvider {
    pub script: Vec<CompletionResponse>,
    pub current_response: Arc<Mutex<usize>>,
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
    pub should_fail: bool,
    pub delay: Option<Duration>,
}

impl MockLlmProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self::scripted(responses.into_iter().map(text_response).collect())
    }

    pub fn scripted(script: Vec<CompletionResponse>) -> Self {
        Self {
            script,
            ..Default::default()
        }
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub fn single_response(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Sleep before answering each completion request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn get_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn available_models(&self) -> Vec<String> {
        vec!["mock-model".to_string()]
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().await.push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail {
            return Err(LlmError::RequestFailed("Mock LLM failure".to_string()));
        }

        let mut current = self.current_response.lock().await;
        let response_idx = *current % self.script.len().max(1);
        *current += 1;

        Ok(self
            .script
            .get(response_idx)
            .cloned()
            .unwrap_or_else(|| text_response("Mock response")))
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        if self.should_fail {
            Err(LlmError::RequestFailed(
                "Mock health check failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Progress sink that keeps every message for assertions
#[derive(Debug, Default)]
pub struct RecordingProgress {
    pub messages: Arc<Mutex<Vec<ProgressMessage>>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_messages(&self) -> Vec<ProgressMessage> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl Progress for RecordingProgress {
    async fn record(&self, message: ProgressMessage) {
        self.messages.lock().await.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::Message;
    use serde_json::json;

    fn request() -> CompletionRequest {
        CompletionRequest {
            messages: vec![Message::user("hi")],
            model: "mock-model".to_string(),
            max_tokens: None,
            temperature: None,
            tools: None,
            tool_choice: None,
            response_format: None,
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_script_wraps_around() {
        let provider = MockLlmProvider::scripted(vec![
            tool_call_response(vec![("get_inventory", json!({"product_id": "product_A"}))]),
            text_response("done"),
        ]);

        let first = provider.complete(request()).await.unwrap();
        assert_eq!(first.requested_tool_calls().unwrap()[0].name, "get_inventory");
        let second = provider.complete(request()).await.unwrap();
        assert_eq!(second.content.as_deref(), Some("done"));
        let third = provider.complete(request()).await.unwrap();
        assert!(third.requested_tool_calls().is_some());

        assert_eq!(provider.call_count().await, 3);
    }

    #[tokio::test]
    async fn test_failure_still_records_request() {
        let provider = MockLlmProvider::with_failure();
        assert!(provider.complete(request()).await.is_err());
        assert!(provider.health_check().await.is_err());
        assert_eq!(provider.call_count().await, 1);
    }
}
