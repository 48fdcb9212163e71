//! End-to-end orchestration tests against a scripted completion service
//!
//! Each test drives `optimize_route` with the seeded tables and checks the
//! observable outcome: final state, the JSON body, the run logs and what was
//! sent to the provider.

use futures::future::join_all;
use order_router::agent::orchestrator::{NO_SHIPPING_OPTIONS, NO_STOCK, ROUTING_TOOLS};
use order_router::agent::WorkflowState;
use order_router::config::RouterConfig;
use order_router::data::Tier;
use order_router::llm::provider::{MessageRole, ResponseFormat};
use order_router::testing::mocks::{text_response, tool_call_response, MockLlmProvider};
use order_router::RouterError;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use test_helpers::{build_orchestrator, decision_reply, order, test_config};

#[tokio::test]
async fn test_happy_path_routes_with_candidate_figures() {
    let llm = Arc::new(MockLlmProvider::scripted(vec![
        tool_call_response(vec![(
            "get_inventory",
            json!({"product_id": "product_A", "quantity": 1}),
        )]),
        text_response(decision_reply(
            ("STORE_CENTRAL", "LocalCourier_Exp"),
            &[
                ("WH_EAST", "CarrierY_Exp"),
                ("NOWHERE", "Ghost"),
                ("WH_SOUTH", "CarrierS_Exp"),
            ],
        )),
    ]));
    let orchestrator = build_orchestrator(&test_config(), llm.clone());

    let report = orchestrator
        .optimize_route(&order("product_A", 1, "cust123"))
        .await;

    assert_eq!(report.state, WorkflowState::RoutingDone);
    let processed = report.processed_order.as_ref().unwrap();
    assert_eq!(processed.customer_name, "Alice Wonderland");
    assert_eq!(processed.customer_zip_code, "10001");
    assert_eq!(processed.customer_tier, Tier::Gold);

    let decision = report.outcome.as_ref().unwrap();
    assert_eq!(decision.recommendation.fulfillment_location, "STORE_CENTRAL");
    assert_eq!(decision.recommendation.cost, 25.0);
    assert_eq!(decision.recommendation.delivery_days, 1);
    assert_eq!(decision.recommendation.co2_kg, 0.3);

    let alternatives: Vec<(&str, &str)> = decision
        .alternatives_considered
        .iter()
        .map(|r| (r.fulfillment_location.as_str(), r.carrier.as_str()))
        .collect();
    assert_eq!(
        alternatives,
        vec![("WH_EAST", "CarrierY_Exp"), ("WH_SOUTH", "CarrierS_Exp")]
    );

    let body = report.to_json();
    assert!(body.get("error").is_none());
    assert_eq!(body["recommendation"]["carrier"], "LocalCourier_Exp");
    let logs: Vec<&str> = body["logs"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(logs.iter().any(|l| l.contains("[intake]")));
    assert!(logs.iter().any(|l| l.contains("[tool] Calling get_inventory")));
    assert!(logs.iter().any(|l| l.contains("Recommended STORE_CENTRAL via LocalCourier_Exp")));
}

#[tokio::test]
async fn test_routing_request_carries_prompt_candidates_and_tools() {
    let llm = Arc::new(MockLlmProvider::single_response(decision_reply(
        ("WH_EAST", "CarrierY_Exp"),
        &[],
    )));
    let orchestrator = build_orchestrator(&test_config(), llm.clone());

    let report = orchestrator
        .optimize_route(&order("product_A", 1, "cust123"))
        .await;
    assert!(report.outcome.is_ok());

    let requests = llm.get_requests().await;
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    assert_eq!(request.model, "mock-model");
    assert!(matches!(request.response_format, Some(ResponseFormat::Json)));
    let offered: HashSet<&str> = request
        .tools
        .as_ref()
        .unwrap()
        .iter()
        .map(|t| t.name.as_str())
        .collect();
    assert_eq!(offered, ROUTING_TOOLS.iter().copied().collect());

    assert_eq!(request.messages[0].role, MessageRole::System);
    let user: Value = serde_json::from_str(&request.messages[1].content).unwrap();
    assert_eq!(user["customer_zone"], "ZONE_1");
    assert_eq!(user["business_priority"], "PRIORITIZE_GOLD_TIER_SPEED");
    assert_eq!(user["candidates"].as_array().unwrap().len(), 7);
    assert_eq!(user["processed_order"]["customer_tier"], "gold");
}

#[tokio::test]
async fn test_explicit_priority_is_forwarded() {
    let llm = Arc::new(MockLlmProvider::single_response(decision_reply(
        ("WH_EAST", "CarrierX_Std"),
        &[],
    )));
    let orchestrator = build_orchestrator(&test_config(), llm.clone());

    let mut raw = order("product_A", 2, "cust123");
    raw["business_priority"] = json!("minimize_cost");
    let report = orchestrator.optimize_route(&raw).await;
    assert!(report.outcome.is_ok());

    let requests = llm.get_requests().await;
    let user: Value = serde_json::from_str(&requests[0].messages[1].content).unwrap();
    assert_eq!(user["business_priority"], "MINIMIZE_COST");
}

#[tokio::test]
async fn test_no_stock_fails_before_the_completion_service() {
    let llm = Arc::new(MockLlmProvider::single_response("unused"));
    let orchestrator = build_orchestrator(&test_config(), llm.clone());

    let report = orchestrator
        .optimize_route(&order("product_C", 100, "cust123"))
        .await;

    assert_eq!(report.state, WorkflowState::RoutingFailed);
    assert!(matches!(report.outcome, Err(RouterError::NoRoute { .. })));
    assert_eq!(report.to_json()["error"], NO_STOCK);
    assert!(report.processed_order.is_some());
    assert_eq!(llm.call_count().await, 0);
}

#[tokio::test]
async fn test_stock_without_shipping_lane_is_no_route() {
    let llm = Arc::new(MockLlmProvider::single_response("unused"));
    let orchestrator = build_orchestrator(&test_config(), llm.clone());

    let report = orchestrator
        .optimize_route(&order("product_C", 1, "cust123"))
        .await;

    assert_eq!(report.state, WorkflowState::RoutingFailed);
    assert_eq!(report.to_json()["error"], NO_SHIPPING_OPTIONS);
    assert_eq!(llm.call_count().await, 0);
}

#[tokio::test]
async fn test_invalid_quantity_fails_intake() {
    let llm = Arc::new(MockLlmProvider::single_response("unused"));
    let orchestrator = build_orchestrator(&test_config(), llm.clone());

    for quantity in [0, -5] {
        let report = orchestrator
            .optimize_route(&order("product_A", quantity, "cust123"))
            .await;

        assert_eq!(report.state, WorkflowState::IntakeFailed);
        assert!(report.processed_order.is_none());
        let body = report.to_json();
        assert!(body["error"].as_str().unwrap().contains("positive integer"));
        assert!(body["logs"]
            .as_array()
            .unwrap()
            .iter()
            .any(|l| l.as_str().unwrap().contains("ERROR - [intake]")));
    }
    assert_eq!(llm.call_count().await, 0);
}

#[tokio::test]
async fn test_unknown_customer_fails_intake() {
    let llm = Arc::new(MockLlmProvider::single_response("unused"));
    let orchestrator = build_orchestrator(&test_config(), llm);

    let report = orchestrator
        .optimize_route(&order("product_A", 1, "cust999"))
        .await;

    assert_eq!(report.state, WorkflowState::IntakeFailed);
    assert!(matches!(report.outcome, Err(RouterError::NotFound { .. })));
    assert_eq!(
        report.to_json()["error"],
        "Customer ID 'cust999' not found in CRM."
    );
}

#[tokio::test]
async fn test_unsupported_priority_fails_intake() {
    let orchestrator = build_orchestrator(
        &test_config(),
        Arc::new(MockLlmProvider::single_response("unused")),
    );

    let mut raw = order("product_A", 1, "cust123");
    raw["business_priority"] = json!("FASTEST_POSSIBLE");
    let report = orchestrator.optimize_route(&raw).await;

    assert_eq!(report.state, WorkflowState::IntakeFailed);
    assert!(report.to_json()["error"]
        .as_str()
        .unwrap()
        .contains("Unsupported business priority"));
}

#[tokio::test]
async fn test_recommendation_outside_candidates_is_upstream_error() {
    let llm = Arc::new(MockLlmProvider::single_response(decision_reply(
        ("WH_MOON", "Rocket"),
        &[],
    )));
    let orchestrator = build_orchestrator(&test_config(), llm);

    let report = orchestrator
        .optimize_route(&order("product_A", 1, "cust123"))
        .await;

    assert_eq!(report.state, WorkflowState::RoutingFailed);
    assert!(matches!(report.outcome, Err(RouterError::Upstream { .. })));
    assert!(report.to_json()["error"]
        .as_str()
        .unwrap()
        .contains("not among the viable candidates"));
}

#[tokio::test]
async fn test_model_refusal_and_garbage_are_upstream_errors() {
    for reply in [r#"{"error": "cannot decide"}"#, "I would pick WH_EAST."] {
        let orchestrator = build_orchestrator(
            &test_config(),
            Arc::new(MockLlmProvider::single_response(reply)),
        );
        let report = orchestrator
            .optimize_route(&order("product_A", 1, "cust123"))
            .await;

        assert_eq!(report.state, WorkflowState::RoutingFailed);
        assert!(
            matches!(report.outcome, Err(RouterError::Upstream { .. })),
            "reply {reply:?} should be an upstream failure"
        );
    }
}

#[tokio::test]
async fn test_endless_tool_calls_stop_at_round_trip_bound() {
    let llm = Arc::new(MockLlmProvider::scripted(vec![tool_call_response(vec![(
        "get_customer_zone",
        json!({"zip_code": "10001"}),
    )])]));
    let orchestrator = build_orchestrator(&test_config(), llm.clone());

    let report = orchestrator
        .optimize_route(&order("product_A", 1, "cust123"))
        .await;

    assert_eq!(report.state, WorkflowState::RoutingFailed);
    assert_eq!(llm.call_count().await, 4);
    assert!(report.to_json()["error"]
        .as_str()
        .unwrap()
        .contains("within 4 round trips"));
}

#[tokio::test]
async fn test_provider_failure_is_reported_not_raised() {
    let orchestrator = build_orchestrator(&test_config(), Arc::new(MockLlmProvider::with_failure()));

    let report = orchestrator
        .optimize_route(&order("product_A", 1, "cust123"))
        .await;

    assert_eq!(report.state, WorkflowState::RoutingFailed);
    assert!(report.to_json()["error"]
        .as_str()
        .unwrap()
        .starts_with("Completion service failed"));
}

#[tokio::test]
async fn test_slow_provider_hits_run_timeout() {
    let mut config: RouterConfig = test_config();
    config.orchestrator.run_timeout_secs = 1;

    let llm = Arc::new(
        MockLlmProvider::single_response(decision_reply(("WH_EAST", "CarrierY_Exp"), &[]))
            .with_delay(Duration::from_secs(3)),
    );
    let orchestrator = build_orchestrator(&config, llm);

    let report = orchestrator
        .optimize_route(&order("product_A", 1, "cust123"))
        .await;

    assert_eq!(report.state, WorkflowState::RoutingFailed);
    assert!(matches!(report.outcome, Err(RouterError::Timeout { seconds: 1 })));
    assert!(report.duration < Duration::from_secs(3));

    let body = report.to_json();
    assert_eq!(body["error"], "Routing run exceeded 1s timeout");
    assert!(body["logs"]
        .as_array()
        .unwrap()
        .iter()
        .any(|l| l.as_str().unwrap().contains("ERROR - [routing] Routing run exceeded")));
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    let llm = Arc::new(MockLlmProvider::single_response(decision_reply(
        ("WH_EAST", "CarrierY_Exp"),
        &[("STORE_CENTRAL", "LocalCourier_Exp")],
    )));
    let orchestrator = build_orchestrator(&test_config(), llm.clone());

    let orders: Vec<Value> = (0..8)
        .map(|i| {
            if i % 2 == 0 {
                order("product_A", 1, "cust123")
            } else {
                order("product_C", 100, "cust123")
            }
        })
        .collect();
    let reports = join_all(orders.iter().map(|o| orchestrator.optimize_route(o))).await;

    let run_ids: HashSet<&str> = reports.iter().map(|r| r.run_id.as_str()).collect();
    assert_eq!(run_ids.len(), 8);

    for (i, report) in reports.iter().enumerate() {
        if i % 2 == 0 {
            assert_eq!(report.state, WorkflowState::RoutingDone);
        } else {
            assert_eq!(report.to_json()["error"], NO_STOCK);
        }
        // Logs never leak between runs
        assert!(report
            .logs
            .iter()
            .all(|line| !line.contains("Recommended") || i % 2 == 0));
    }
    assert_eq!(llm.call_count().await, 4);
}
