//! Two-stage routing workflow: intake, then routing decision
//!
//! ```text
//! IntakePending ──► IntakeDone ──► RoutingPending ──► RoutingDone
//!        │                                 │
//!        ▼                                 ▼
//!   IntakeFailed                     RoutingFailed
//! ```
//!
//! Intake is deterministic. Routing resolves the zone, stock and shipping
//! candidates itself, then asks the completion service to pick one under the
//! business priority and checks the answer against the candidate set.
//!
//! ```rust
//! use order_router::agent::{Orchestrator, Prompts, WorkflowState};
//! use order_router::data::{InMemoryRepository, Repository};
//! use order_router::testing::mocks::MockLlmProvider;
//! use order_router::{RouterConfig, ToolSystem};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let repository: Arc<dyn Repository> = Arc::new(InMemoryRepository::seeded().unwrap());
//! let tools = Arc::new(ToolSystem::with_builtin_tools(repository.clone()));
//! let llm = Arc::new(MockLlmProvider::single_response("{}"));
//! let orchestrator = Orchestrator::new(
//!     &RouterConfig::default(),
//!     repository,
//!     tools,
//!     llm,
//!     Arc::new(Prompts::builtin()),
//! );
//!
//! // Intake rejects the order before the completion service is involved
//! let report = tokio_test::block_on(orchestrator.optimize_route(&json!({
//!     "product_id": "product_A",
//!     "quantity": 0,
//!     "customer_id": "cust123",
//! })));
//! assert_eq!(report.state, WorkflowState::IntakeFailed);
//! assert!(report.to_json()["error"].is_string());
//! ```

use crate::agent::intake::{enrich, ProcessedOrder, RawOrder};
use crate::agent::priority::BusinessPriority;
use crate::agent::prompts::Prompts;
use crate::agent::runner::{LoopSettings, ToolLoop};
use crate::agent::schema::{parse_decision_reply, DecisionReply, RoutingDecision, RoutingRecommendation};
use crate::config::{OrchestratorSection, RouterConfig};
use crate::data::Repository;
use crate::error::{RouterError, RouterResult};
use crate::llm::provider::{LlmProvider, Message, ResponseFormat};
use crate::observability::{metrics, RunOutcome};
use crate::progress::{Progress, ProgressCategory, RunLog};
use crate::run_span;
use crate::tools::builtin::{get_customer_zone, get_inventory, get_shipping_options, UNKNOWN_ZONE};
use crate::tools::ToolSystem;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn, Instrument};
use uuid::Uuid;

/// Tools the routing stage may call
pub const ROUTING_TOOLS: [&str; 3] = ["get_customer_zone", "get_inventory", "get_shipping_options"];

pub const NO_STOCK: &str = "No stock available for the product at any location.";
pub const NO_SHIPPING_OPTIONS: &str =
    "No shipping options available from stocked locations to the customer's zone.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    IntakePending,
    IntakeDone,
    IntakeFailed,
    RoutingPending,
    RoutingDone,
    RoutingFailed,
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowState::IntakeFailed | WorkflowState::RoutingDone | WorkflowState::RoutingFailed
        )
    }

    /// Terminal failure state for a run interrupted in this state
    fn failed(self) -> WorkflowState {
        match self {
            WorkflowState::IntakePending | WorkflowState::IntakeFailed => {
                WorkflowState::IntakeFailed
            }
            _ => WorkflowState::RoutingFailed,
        }
    }
}

/// Viable routes for one processed order
#[derive(Debug, Clone, PartialEq)]
pub struct RouteCandidates {
    pub zone: String,
    /// Location with stock -> units on hand
    pub stocked_locations: Vec<(String, u32)>,
    pub routes: Vec<RoutingRecommendation>,
}

/// Resolve zone, stock and shipping options for an order (pure function)
///
/// Routes are ordered by location id, then by shipping table order.
pub fn gather_candidates(
    repository: &dyn Repository,
    order: &ProcessedOrder,
) -> RouterResult<RouteCandidates> {
    let zone = get_customer_zone(repository, &order.customer_zip_code);
    if zone == UNKNOWN_ZONE {
        return Err(RouterError::no_route(format!(
            "Could not resolve a shipping zone for ZIP code '{}'.",
            order.customer_zip_code
        )));
    }

    let stock = get_inventory(repository, &order.product_id, order.quantity);
    if stock.is_empty() {
        return Err(RouterError::no_route(NO_STOCK));
    }

    let routes: Vec<RoutingRecommendation> = stock
        .keys()
        .flat_map(|location| {
            get_shipping_options(repository, location, &zone, &order.product_id)
                .into_iter()
                .map(move |option| RoutingRecommendation {
                    fulfillment_location: location.clone(),
                    carrier: option.carrier,
                    cost: option.cost,
                    delivery_days: option.days,
                    co2_kg: option.co2_kg,
                })
        })
        .collect();
    if routes.is_empty() {
        return Err(RouterError::no_route(NO_SHIPPING_OPTIONS));
    }

    Ok(RouteCandidates {
        zone,
        stocked_locations: stock.into_iter().collect(),
        routes,
    })
}

/// Check a model decision against the candidates (pure function)
///
/// The recommendation must name a candidate route; its figures are replaced
/// by the candidate's. Alternatives that are not candidates, or repeat the
/// recommendation, are dropped; at most `max_alternatives` are kept.
pub fn reconcile_decision(
    decision: RoutingDecision,
    candidates: &[RoutingRecommendation],
    max_alternatives: usize,
) -> RouterResult<RoutingDecision> {
    let find = |route: &RoutingRecommendation| {
        candidates
            .iter()
            .find(|candidate| candidate.same_route(route))
            .cloned()
    };

    let recommendation = find(&decision.recommendation).ok_or_else(|| {
        RouterError::upstream(format!(
            "Recommended route {} via {} is not among the viable candidates",
            decision.recommendation.fulfillment_location, decision.recommendation.carrier
        ))
    })?;

    let mut alternatives: Vec<RoutingRecommendation> = Vec::new();
    for alternative in &decision.alternatives_considered {
        match find(alternative) {
            Some(route)
                if !route.same_route(&recommendation)
                    && !alternatives.iter().any(|kept| kept.same_route(&route)) =>
            {
                alternatives.push(route)
            }
            Some(_) => {}
            None => warn!(
                location = %alternative.fulfillment_location,
                carrier = %alternative.carrier,
                "Dropping alternative that is not a viable candidate"
            ),
        }
    }
    alternatives.truncate(max_alternatives);

    Ok(RoutingDecision {
        recommendation,
        reasoning: decision.reasoning,
        alternatives_considered: alternatives,
    })
}

/// Everything a caller needs to know about one run
#[derive(Debug)]
pub struct RunReport {
    pub run_id: String,
    pub state: WorkflowState,
    pub processed_order: Option<ProcessedOrder>,
    pub outcome: RouterResult<RoutingDecision>,
    pub logs: Vec<String>,
    pub duration: Duration,
}

impl RunReport {
    /// `{recommendation, reasoning, alternatives_considered, logs}` or `{error, logs}`
    pub fn to_json(&self) -> Value {
        match &self.outcome {
            Ok(decision) => json!({
                "recommendation": decision.recommendation,
                "reasoning": decision.reasoning,
                "alternatives_considered": decision.alternatives_considered,
                "logs": self.logs,
            }),
            Err(e) => json!({
                "error": e.client_message(),
                "logs": self.logs,
            }),
        }
    }

    fn metrics_outcome(&self) -> RunOutcome {
        match &self.outcome {
            Ok(_) => RunOutcome::Routed,
            Err(RouterError::Timeout { .. }) => RunOutcome::TimedOut,
            Err(_) if self.state == WorkflowState::IntakeFailed => RunOutcome::IntakeFailed,
            Err(RouterError::NoRoute { .. }) => RunOutcome::NoRoute,
            Err(_) => RunOutcome::UpstreamFailed,
        }
    }
}

/// Runs the intake and routing stages for each request
///
/// Holds only shared read-only state, so one instance serves concurrent
/// requests.
pub struct Orchestrator {
    repository: Arc<dyn Repository>,
    tools: Arc<ToolSystem>,
    llm: Arc<dyn LlmProvider>,
    prompts: Arc<Prompts>,
    settings: OrchestratorSection,
    loop_settings: LoopSettings,
}

impl Orchestrator {
    pub fn new(
        config: &RouterConfig,
        repository: Arc<dyn Repository>,
        tools: Arc<ToolSystem>,
        llm: Arc<dyn LlmProvider>,
        prompts: Arc<Prompts>,
    ) -> Self {
        let loop_settings = LoopSettings {
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            max_round_trips: config.orchestrator.max_round_trips,
            response_format: Some(ResponseFormat::Json),
        };

        Self {
            repository,
            tools,
            llm,
            prompts,
            settings: config.orchestrator.clone(),
            loop_settings,
        }
    }

    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repository
    }

    pub fn tools(&self) -> &Arc<ToolSystem> {
        &self.tools
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    /// Run the whole workflow for one raw order under the run timeout
    pub async fn optimize_route(&self, raw_order: &Value) -> RunReport {
        let run_id = Uuid::new_v4().to_string();
        let start = Instant::now();
        let log = RunLog::new();
        let mut state = WorkflowState::IntakePending;
        let mut processed_order = None;

        metrics().run_started();
        info!(run_id = %run_id, "Routing run started");

        let timeout = Duration::from_secs(self.settings.run_timeout_secs);
        let run = self
            .execute(&run_id, raw_order, &log, &mut state, &mut processed_order)
            .instrument(run_span!(run_id = %run_id));

        let timed = tokio::time::timeout(timeout, run).await;
        let outcome = match timed {
            Ok(outcome) => outcome,
            Err(_) => {
                state = state.failed();
                let error = RouterError::Timeout {
                    seconds: self.settings.run_timeout_secs,
                };
                let category = if state == WorkflowState::IntakeFailed {
                    ProgressCategory::Intake
                } else {
                    ProgressCategory::Routing
                };
                log.report_stage_error(&run_id, category, &error.to_string())
                    .await;
                Err(error)
            }
        };

        let report = RunReport {
            run_id,
            state,
            processed_order,
            outcome,
            logs: log.lines(),
            duration: start.elapsed(),
        };

        metrics().run_finished(report.metrics_outcome(), report.duration);
        match &report.outcome {
            Ok(decision) => info!(
                run_id = %report.run_id,
                location = %decision.recommendation.fulfillment_location,
                carrier = %decision.recommendation.carrier,
                duration_ms = report.duration.as_millis() as u64,
                "Routing run completed"
            ),
            Err(e) => warn!(
                run_id = %report.run_id,
                state = ?report.state,
                error = %e,
                "Routing run failed"
            ),
        }
        report
    }

    async fn execute(
        &self,
        run_id: &str,
        raw_order: &Value,
        progress: &dyn Progress,
        state: &mut WorkflowState,
        processed_order: &mut Option<ProcessedOrder>,
    ) -> RouterResult<RoutingDecision> {
        let (order, priority) = match self.intake(run_id, raw_order, progress).await {
            Ok(result) => result,
            Err(e) => {
                *state = WorkflowState::IntakeFailed;
                return Err(e);
            }
        };
        *state = WorkflowState::IntakeDone;
        *processed_order = Some(order.clone());

        *state = WorkflowState::RoutingPending;
        match self.route(run_id, &order, priority, progress).await {
            Ok(decision) => {
                *state = WorkflowState::RoutingDone;
                Ok(decision)
            }
            Err(e) => {
                *state = WorkflowState::RoutingFailed;
                Err(e)
            }
        }
    }

    /// Validate and enrich a raw order
    pub async fn intake(
        &self,
        run_id: &str,
        raw_order: &Value,
        progress: &dyn Progress,
    ) -> RouterResult<(ProcessedOrder, BusinessPriority)> {
        progress
            .report_stage_start(run_id, ProgressCategory::Intake, &format!("Received raw order: {raw_order}"))
            .await;

        let result = RawOrder::parse(raw_order).and_then(|raw| {
            let priority = raw.business_priority.unwrap_or(self.settings.default_priority);
            enrich(self.repository.as_ref(), &raw).map(|order| (order, priority))
        });

        match &result {
            Ok((order, priority)) => {
                progress
                    .report_stage_complete(
                        run_id,
                        ProgressCategory::Intake,
                        &format!(
                            "Order enriched for {} ({}, tier {}, zip {}); priority {}",
                            order.customer_id,
                            order.customer_name,
                            order.customer_tier,
                            order.customer_zip_code,
                            priority
                        ),
                    )
                    .await
            }
            Err(e) => {
                progress
                    .report_stage_error(run_id, ProgressCategory::Intake, &e.client_message())
                    .await
            }
        }
        result
    }

    /// Pick a fulfillment route for a processed order
    pub async fn route(
        &self,
        run_id: &str,
        order: &ProcessedOrder,
        priority: BusinessPriority,
        progress: &dyn Progress,
    ) -> RouterResult<RoutingDecision> {
        progress
            .report_stage_start(
                run_id,
                ProgressCategory::Routing,
                &format!(
                    "Routing {} x{} to zip {} under {}",
                    order.product_id, order.quantity, order.customer_zip_code, priority
                ),
            )
            .await;

        let result = self.decide(run_id, order, priority, progress).await;
        match &result {
            Ok(decision) => {
                progress
                    .report_stage_complete(
                        run_id,
                        ProgressCategory::Routing,
                        &format!(
                            "Recommended {} via {} ({} alternatives)",
                            decision.recommendation.fulfillment_location,
                            decision.recommendation.carrier,
                            decision.alternatives_considered.len()
                        ),
                    )
                    .await
            }
            Err(e) => {
                progress
                    .report_stage_error(run_id, ProgressCategory::Routing, &e.client_message())
                    .await
            }
        }
        result
    }

    async fn decide(
        &self,
        run_id: &str,
        order: &ProcessedOrder,
        priority: BusinessPriority,
        progress: &dyn Progress,
    ) -> RouterResult<RoutingDecision> {
        let candidates = gather_candidates(self.repository.as_ref(), order)?;
        progress
            .report_stage_complete(
                run_id,
                ProgressCategory::Routing,
                &format!(
                    "Zone {}; stock at {}; {} candidate routes",
                    candidates.zone,
                    candidates
                        .stocked_locations
                        .iter()
                        .map(|(location, quantity)| format!("{location} ({quantity})"))
                        .collect::<Vec<_>>()
                        .join(", "),
                    candidates.routes.len()
                ),
            )
            .await;

        let messages = vec![
            Message::system(self.prompts.routing_instructions.clone()),
            Message::user(
                json!({
                    "processed_order": order,
                    "business_priority": priority,
                    "priority_guidance": priority.guidance(),
                    "customer_zone": candidates.zone,
                    "candidates": candidates.routes,
                    "response_schema": RoutingDecision::json_schema(),
                })
                .to_string(),
            ),
        ];

        let available_tools = self.tools.describe_tools(&ROUTING_TOOLS);
        let outcome = ToolLoop::new(
            self.llm.as_ref(),
            self.tools.as_ref(),
            progress,
            &self.loop_settings,
        )
        .run(run_id, messages, &available_tools)
        .await?;

        let decision = match parse_decision_reply(&outcome.content).map_err(RouterError::upstream)? {
            DecisionReply::Decision(decision) => decision,
            DecisionReply::Refusal(reason) => {
                return Err(RouterError::upstream(format!(
                    "Completion service declined to route: {reason}"
                )))
            }
        };

        reconcile_decision(decision, &candidates.routes, self.settings.max_alternatives)
    }
}
