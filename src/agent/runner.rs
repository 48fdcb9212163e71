//! Bounded tool-calling loop against the completion service
//!
//! The loop alternates between asking for a completion and executing the
//! tool calls it returns. Each completion request is one round trip; the
//! loop fails once `max_round_trips` requests have been spent without a
//! final answer.

use crate::error::{RouterError, RouterResult};
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, LlmProvider, Message, ResponseFormat, ToolCall,
};
use crate::llm_span;
use crate::observability::metrics;
use crate::progress::Progress;
use crate::tool_span;
use crate::tools::{ToolDescription, ToolError, ToolSystem};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

/// Completion parameters shared by every round trip of a run
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub max_round_trips: u32,
    pub response_format: Option<ResponseFormat>,
}

/// Final assistant text and how many round trips it took
#[derive(Debug, Clone, PartialEq)]
pub struct LoopOutcome {
    pub content: String,
    pub round_trips: u32,
}

#[derive(Debug)]
enum LoopState {
    AwaitingCompletion { round_trip: u32 },
    ExecutingTools { round_trip: u32, calls: Vec<ToolCall> },
    Finished(LoopOutcome),
}

pub struct ToolLoop<'a> {
    llm: &'a dyn LlmProvider,
    tools: &'a ToolSystem,
    progress: &'a dyn Progress,
    settings: &'a LoopSettings,
}

impl<'a> ToolLoop<'a> {
    pub fn new(
        llm: &'a dyn LlmProvider,
        tools: &'a ToolSystem,
        progress: &'a dyn Progress,
        settings: &'a LoopSettings,
    ) -> Self {
        Self {
            llm,
            tools,
            progress,
            settings,
        }
    }

    /// Drive the conversation until the model stops asking for tools
    pub async fn run(
        &self,
        run_id: &str,
        mut messages: Vec<Message>,
        available_tools: &[ToolDescription],
    ) -> RouterResult<LoopOutcome> {
        let mut state = LoopState::AwaitingCompletion { round_trip: 1 };

        loop {
            state = match state {
                LoopState::AwaitingCompletion { round_trip } => {
                    Self::check_round_trip_limit(round_trip, self.settings.max_round_trips)?;

                    let request = self.create_completion_request(messages.clone(), available_tools);
                    let response = self
                        .execute_llm_request(run_id, request)
                        .instrument(llm_span!(run_id = %run_id, round_trip))
                        .await?;

                    match response.requested_tool_calls().map(<[ToolCall]>::to_vec) {
                        Some(calls) => {
                            debug!(run_id, round_trip, tool_count = calls.len(), "Processing tool calls");
                            messages.push(Message::assistant_with_tool_calls(
                                response.content.unwrap_or_default(),
                                calls.clone(),
                            ));
                            LoopState::ExecutingTools { round_trip, calls }
                        }
                        None => LoopState::Finished(LoopOutcome {
                            content: response.content.unwrap_or_default(),
                            round_trips: round_trip,
                        }),
                    }
                }
                LoopState::ExecutingTools { round_trip, calls } => {
                    for call in &calls {
                        let result = self
                            .execute_tool_call(run_id, call, available_tools)
                            .instrument(tool_span!(run_id = %run_id, tool = %call.name))
                            .await;
                        messages.push(Message::tool_result(call.id.clone(), result.to_string()));
                    }
                    LoopState::AwaitingCompletion {
                        round_trip: round_trip + 1,
                    }
                }
                LoopState::Finished(outcome) => {
                    info!(run_id, round_trips = outcome.round_trips, "Completion loop finished");
                    return Ok(outcome);
                }
            };
        }
    }

    /// Err once the next request would exceed the bound (pure validation)
    fn check_round_trip_limit(round_trip: u32, max_round_trips: u32) -> RouterResult<()> {
        if round_trip > max_round_trips {
            return Err(RouterError::upstream(format!(
                "Completion service did not produce a final answer within {max_round_trips} round trips"
            )));
        }
        Ok(())
    }

    fn create_completion_request(
        &self,
        messages: Vec<Message>,
        available_tools: &[ToolDescription],
    ) -> CompletionRequest {
        CompletionRequest {
            messages,
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            tools: if available_tools.is_empty() {
                None
            } else {
                Some(available_tools.to_vec())
            },
            tool_choice: None,
            response_format: self.settings.response_format.clone(),
            metadata: HashMap::new(),
        }
    }

    async fn execute_llm_request(
        &self,
        run_id: &str,
        request: CompletionRequest,
    ) -> RouterResult<CompletionResponse> {
        self.progress
            .report_llm_request(run_id, &format_request_summary(&request))
            .await;

        match self.llm.complete(request).await {
            Ok(response) => {
                metrics().llm_request(true, response.usage.total_tokens);
                self.progress
                    .report_llm_response(run_id, &format_response_summary(&response))
                    .await;
                Ok(response)
            }
            Err(e) => {
                metrics().llm_request(false, 0);
                warn!(run_id, error = %e, "Completion request failed");
                self.progress
                    .report_llm_error(run_id, &format!("Completion request failed: {e}"))
                    .await;
                Err(RouterError::upstream(format!("Completion service failed: {e}")))
            }
        }
    }

    /// Execute one call; failures become a tagged payload for the model.
    /// Only tools offered in the request are run.
    async fn execute_tool_call(
        &self,
        run_id: &str,
        call: &ToolCall,
        available_tools: &[ToolDescription],
    ) -> Value {
        self.progress
            .report_tool_call(run_id, &call.name, &call.arguments)
            .await;

        let start = Instant::now();
        let result = if available_tools.iter().any(|tool| tool.name == call.name) {
            self.tools.execute_tool(&call.name, &call.arguments).await
        } else {
            Err(ToolError::UnknownTool(format!(
                "{} was not offered in this request",
                call.name
            )))
        };
        let duration = start.elapsed();

        match result {
            Ok(payload) => {
                let succeeded = payload.get("status").and_then(Value::as_str) == Some("success");
                metrics().tool_executed(&call.name, duration, succeeded);
                if succeeded {
                    self.progress
                        .report_tool_complete(run_id, &call.name, &payload.to_string())
                        .await;
                } else {
                    let message = payload
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("lookup failed");
                    self.progress
                        .report_tool_error(run_id, &call.name, message)
                        .await;
                }
                payload
            }
            Err(e) => {
                metrics().tool_executed(&call.name, duration, false);
                warn!(run_id, tool = %call.name, error = %e, "Tool call rejected");
                self.progress
                    .report_tool_error(run_id, &call.name, &e.to_string())
                    .await;
                json!({
                    "status": "error",
                    "kind": "invalid_call",
                    "message": e.to_string(),
                })
            }
        }
    }
}

fn format_request_summary(request: &CompletionRequest) -> String {
    format!(
        "Completion request to {}: {} messages, tools={}",
        request.model,
        request.messages.len(),
        request.tools.as_ref().map(|t| t.len()).unwrap_or(0)
    )
}

fn format_response_summary(response: &CompletionResponse) -> String {
    format!(
        "Completion response: content_length={}, tool_calls={}, finish_reason={:?}, tokens_used={}",
        response.content.as_ref().map(|c| c.len()).unwrap_or(0),
        response.tool_calls.as_ref().map(|t| t.len()).unwrap_or(0),
        response.finish_reason,
        response.usage.total_tokens
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryRepository;
    use crate::llm::provider::MessageRole;
    use crate::progress::{ProgressEventType, RunLog};
    use crate::testing::mocks::{
        text_response, tool_call_response, MockLlmProvider, RecordingProgress,
    };
    use std::sync::Arc;

    fn settings(max_round_trips: u32) -> LoopSettings {
        LoopSettings {
            model: "mock-model".to_string(),
            temperature: None,
            max_tokens: None,
            max_round_trips,
            response_format: None,
        }
    }

    fn tools() -> ToolSystem {
        ToolSystem::with_builtin_tools(Arc::new(InMemoryRepository::seeded().unwrap()))
    }

    #[test]
    fn test_check_round_trip_limit_boundary() {
        assert!(ToolLoop::check_round_trip_limit(5, 5).is_ok());
        let err = ToolLoop::check_round_trip_limit(6, 5).unwrap_err();
        assert!(err.to_string().contains("5 round trips"));
    }

    #[tokio::test]
    async fn test_tool_results_are_fed_back_by_call_id() {
        let llm = MockLlmProvider::scripted(vec![
            tool_call_response(vec![("get_customer_zone", json!({"zip_code": "10001"}))]),
            text_response("{\"done\": true}"),
        ]);
        let tools = tools();
        let log = RunLog::new();
        let settings = settings(4);
        let tool_loop = ToolLoop::new(&llm, &tools, &log, &settings);

        let outcome = tool_loop
            .run("run-1", vec![Message::user("route")], &tools.describe_tools(&["get_customer_zone"]))
            .await
            .unwrap();
        assert_eq!(outcome.round_trips, 2);
        assert_eq!(outcome.content, "{\"done\": true}");

        let requests = llm.get_requests().await;
        let second = &requests[1].messages;
        assert_eq!(second.len(), 3);
        assert_eq!(second[1].role, MessageRole::Assistant);
        assert_eq!(second[2].role, MessageRole::Tool);
        assert_eq!(second[2].tool_call_id.as_deref(), Some("call_0_get_customer_zone"));
        assert!(second[2].content.contains("ZONE_1"));

        assert!(log.lines().iter().any(|l| l.contains("Calling get_customer_zone")));
    }

    #[tokio::test]
    async fn test_progress_events_follow_the_conversation() {
        let llm = MockLlmProvider::scripted(vec![
            tool_call_response(vec![("get_customer_zone", json!({"zip_code": "90210"}))]),
            text_response("{}"),
        ]);
        let tools = tools();
        let progress = RecordingProgress::new();
        let settings = settings(4);

        ToolLoop::new(&llm, &tools, &progress, &settings)
            .run(
                "run-events",
                vec![Message::user("route")],
                &tools.describe_tools(&["get_customer_zone"]),
            )
            .await
            .unwrap();

        let messages = progress.get_messages().await;
        let events: Vec<ProgressEventType> = messages.iter().map(|m| m.event_type).collect();
        assert_eq!(
            events,
            vec![
                ProgressEventType::LlmRequest,
                ProgressEventType::LlmResponse,
                ProgressEventType::ToolCall,
                ProgressEventType::ToolComplete,
                ProgressEventType::LlmRequest,
                ProgressEventType::LlmResponse,
            ]
        );
        assert!(messages.iter().all(|m| m.run_id == "run-events"));
        assert_eq!(
            messages[2].metadata,
            Some(json!({"tool": "get_customer_zone"}))
        );
    }

    #[tokio::test]
    async fn test_invalid_tool_call_is_reported_to_model() {
        let llm = MockLlmProvider::scripted(vec![
            tool_call_response(vec![("get_inventory", json!({"product_id": "product_A"}))]),
            text_response("ok"),
        ]);
        let tools = tools();
        let log = RunLog::new();
        let settings = settings(4);

        ToolLoop::new(&llm, &tools, &log, &settings)
            .run(
                "run-2",
                vec![Message::user("route")],
                &tools.describe_tools(&["get_inventory"]),
            )
            .await
            .unwrap();

        let requests = llm.get_requests().await;
        let tool_message = &requests[1].messages[2];
        assert!(tool_message.content.contains("invalid_call"));
        assert!(log.lines().iter().any(|l| l.contains("ERROR - [tool] get_inventory failed")));
    }

    #[tokio::test]
    async fn test_tools_not_offered_are_not_executed() {
        let llm = MockLlmProvider::scripted(vec![
            tool_call_response(vec![(
                "find_orders_for_customer",
                json!({"customer_identifier": "a"}),
            )]),
            text_response("{}"),
        ]);
        let tools = tools();
        let log = RunLog::new();
        let settings = settings(4);

        ToolLoop::new(&llm, &tools, &log, &settings)
            .run(
                "run-5",
                vec![Message::user("route")],
                &tools.describe_tools(&["get_customer_zone"]),
            )
            .await
            .unwrap();

        let requests = llm.get_requests().await;
        let tool_message = &requests[1].messages[2];
        assert_eq!(
            tool_message.tool_call_id.as_deref(),
            Some("call_0_find_orders_for_customer")
        );
        assert!(tool_message.content.contains("invalid_call"));
        assert!(tool_message.content.contains("not offered"));
        assert!(!tool_message.content.contains("alice.w@example.com"));
        assert!(log
            .lines()
            .iter()
            .any(|l| l.contains("ERROR - [tool] find_orders_for_customer failed")));
    }

    #[tokio::test]
    async fn test_endless_tool_calls_hit_the_bound() {
        let llm = MockLlmProvider::scripted(vec![tool_call_response(vec![(
            "get_customer_zone",
            json!({"zip_code": "10001"}),
        )])]);
        let tools = tools();
        let log = RunLog::new();
        let settings = settings(3);

        let err = ToolLoop::new(&llm, &tools, &log, &settings)
            .run("run-3", vec![Message::user("route")], &[])
            .await
            .unwrap_err();

        assert!(matches!(err, RouterError::Upstream { .. }));
        assert_eq!(llm.call_count().await, 3);
    }

    #[tokio::test]
    async fn test_provider_failure_is_upstream() {
        let llm = MockLlmProvider::with_failure();
        let tools = tools();
        let log = RunLog::new();
        let settings = settings(3);

        let err = ToolLoop::new(&llm, &tools, &log, &settings)
            .run("run-4", vec![Message::user("route")], &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Mock LLM failure"));
        assert!(log.lines().iter().any(|l| l.contains("ERROR - [llm]")));
    }
}
