use async_trait::async_trait;
use order_router::data::{InMemoryRepository, Repository};
use order_router::tools::{Tool, ToolDescription, ToolError, ToolSystem};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;

fn builtin_system() -> ToolSystem {
    let repository: Arc<dyn Repository> = Arc::new(InMemoryRepository::seeded().unwrap());
    ToolSystem::with_builtin_tools(repository)
}

/// Records every call it receives
struct RecordingTool {
    name: &'static str,
    calls: Arc<Mutex<Vec<Value>>>,
}

#[async_trait]
impl Tool for RecordingTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: self.name.to_string(),
            description: "Records its parameters".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {"sku": {"type": "string", "minLength": 1}},
                "required": ["sku"]
            }),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        self.calls.lock().await.push(parameters.clone());
        Ok(json!({"status": "success", "data": parameters["sku"]}))
    }
}

struct BrokenSchemaTool;

#[async_trait]
impl Tool for BrokenSchemaTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "broken".to_string(),
            description: "Schema that does not compile".to_string(),
            parameters: json!({"type": "not-a-type"}),
        }
    }

    async fn execute(&self, _parameters: &Value) -> Result<Value, ToolError> {
        Ok(Value::Null)
    }
}

#[tokio::test]
async fn test_builtin_tools_are_registered_sorted() {
    let system = builtin_system();

    assert_eq!(
        system.list_tools(),
        vec![
            "find_orders_for_customer",
            "get_customer_details",
            "get_customer_zone",
            "get_inventory",
            "get_inventory_details_for_sku",
            "get_order_status",
            "get_overall_stock_for_product",
            "get_product_eta",
            "get_shipping_options",
        ]
    );
}

#[tokio::test]
async fn test_custom_tool_only_runs_with_valid_parameters() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut system = ToolSystem::new();
    system.register(Box::new(RecordingTool {
        name: "record",
        calls: calls.clone(),
    }));

    let result = system.execute_tool("record", &json!({"sku": ""})).await;
    assert!(matches!(result, Err(ToolError::ValidationError(_))));
    assert!(calls.lock().await.is_empty());

    let result = system
        .execute_tool("record", &json!({"sku": "B001-CHAIR-RED"}))
        .await
        .unwrap();
    assert_eq!(result["data"], "B001-CHAIR-RED");
    assert_eq!(calls.lock().await.len(), 1);
}

#[tokio::test]
async fn test_later_registration_replaces_builtin() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut system = builtin_system();
    system.register(Box::new(RecordingTool {
        name: "get_product_eta",
        calls: calls.clone(),
    }));

    assert_eq!(system.list_tools().len(), 9);
    system
        .execute_tool("get_product_eta", &json!({"sku": "S007-SOFA-GRN"}))
        .await
        .unwrap();
    assert_eq!(calls.lock().await.len(), 1);
}

#[tokio::test]
async fn test_uncompilable_schema_is_reported() {
    let mut system = ToolSystem::new();
    system.register(Box::new(BrokenSchemaTool));

    let result = system.execute_tool("broken", &json!({})).await;
    assert!(matches!(result, Err(ToolError::SchemaError(_))));
}

#[tokio::test]
async fn test_builtin_schemas_reject_extra_and_missing_fields() {
    let system = builtin_system();

    let extra = system
        .execute_tool(
            "get_customer_zone",
            &json!({"zip_code": "10001", "country": "US"}),
        )
        .await;
    assert!(matches!(extra, Err(ToolError::ValidationError(_))));

    let missing = system
        .execute_tool(
            "get_shipping_options",
            &json!({"warehouse_id": "WH_EAST", "zone": "ZONE_1"}),
        )
        .await;
    match missing {
        Err(ToolError::ValidationError(message)) => assert!(message.contains("product_id")),
        other => panic!("expected validation error, got {other:?}"),
    }

    let negative = system
        .execute_tool(
            "get_inventory",
            &json!({"product_id": "product_A", "quantity": -1}),
        )
        .await;
    assert!(matches!(negative, Err(ToolError::ValidationError(_))));
}

#[tokio::test]
async fn test_oversized_quantity_fails_execution() {
    let system = builtin_system();
    let result = system
        .execute_tool(
            "get_inventory",
            &json!({"product_id": "product_A", "quantity": 5_000_000_000u64}),
        )
        .await;
    assert!(matches!(result, Err(ToolError::ExecutionError(_))));
}

#[tokio::test]
async fn test_lookup_failures_are_results_not_errors() {
    let system = builtin_system();

    let result = system
        .execute_tool("get_order_status", &json!({"order_id": "  "}))
        .await
        .unwrap();
    assert_eq!(result["status"], "error");
    assert_eq!(result["kind"], "validation");

    let result = system
        .execute_tool("get_product_eta", &json!({"sku": "NOPE-000"}))
        .await
        .unwrap();
    assert_eq!(result["kind"], "not_found");
}

#[tokio::test]
async fn test_concurrent_tool_execution() {
    let system = Arc::new(builtin_system());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let system = system.clone();
            tokio::spawn(async move {
                let quantity = i % 4;
                system
                    .execute_tool(
                        "get_inventory",
                        &json!({"product_id": "product_A", "quantity": quantity}),
                    )
                    .await
            })
        })
        .collect();

    for handle in handles {
        let result = timeout(Duration::from_secs(5), handle)
            .await
            .expect("tool call timed out")
            .unwrap()
            .unwrap();
        assert_eq!(result["status"], "success");
        assert!(!result["data"].as_object().unwrap().is_empty());
    }
}
