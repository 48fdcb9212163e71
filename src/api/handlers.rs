use super::contextual::{build_contextual_data, customer_rows, order_rows};
use super::{ApiState, InventoryQuery, OrdersQuery};
use crate::error::sanitize_error_message;
use crate::observability::metrics;
use crate::tools::builtin::{
    find_orders_for_customer, get_inventory_details_for_sku, get_order_status,
    get_overall_stock_for_product, get_product_eta,
};
use crate::tools::{LookupError, ToolError};
use serde::Serialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};
use warp::Rejection;

type JsonReply = WithStatus<Json>;

fn reply<T: Serialize>(body: &T, status: StatusCode) -> Result<JsonReply, Infallible> {
    Ok(warp::reply::with_status(warp::reply::json(body), status))
}

fn error_reply(message: &str, status: StatusCode) -> Result<JsonReply, Infallible> {
    reply(&json!({ "error": sanitize_error_message(message) }), status)
}

fn lookup_status(error: &LookupError) -> StatusCode {
    match error {
        LookupError::Validation(_) => StatusCode::BAD_REQUEST,
        LookupError::NotFound(_) => StatusCode::NOT_FOUND,
        LookupError::DataIntegrity(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Workflow failures are still 200; the body carries `error`
pub async fn optimize_route(order: Value, state: Arc<ApiState>) -> Result<JsonReply, Infallible> {
    let report = state.orchestrator.optimize_route(&order).await;
    debug!(run_id = %report.run_id, state = ?report.state, "Route request answered");
    reply(&report.to_json(), StatusCode::OK)
}

pub async fn contextual_data(state: Arc<ApiState>) -> Result<JsonReply, Infallible> {
    let data = build_contextual_data(state.orchestrator.repository().as_ref());
    reply(&data, StatusCode::OK)
}

pub async fn customers(state: Arc<ApiState>) -> Result<JsonReply, Infallible> {
    reply(
        &customer_rows(state.orchestrator.repository().as_ref()),
        StatusCode::OK,
    )
}

/// Summary rows; `?customer=` narrows them, and no match is an empty list
pub async fn orders(query: OrdersQuery, state: Arc<ApiState>) -> Result<JsonReply, Infallible> {
    let repository = state.orchestrator.repository().as_ref();

    let Some(customer) = query.customer else {
        return reply(&order_rows(repository.orders()), StatusCode::OK);
    };

    match find_orders_for_customer(repository, &customer) {
        Ok(matches) => reply(&order_rows(matches), StatusCode::OK),
        Err(LookupError::NotFound(_)) => reply(&Vec::<Value>::new(), StatusCode::OK),
        Err(e) => error_reply(&e.to_string(), lookup_status(&e)),
    }
}

pub async fn order(order_id: String, state: Arc<ApiState>) -> Result<JsonReply, Infallible> {
    match get_order_status(state.orchestrator.repository().as_ref(), &order_id) {
        Ok(order) => reply(order, StatusCode::OK),
        Err(LookupError::NotFound(_)) => error_reply("Order not found", StatusCode::NOT_FOUND),
        Err(e) => error_reply(&e.to_string(), lookup_status(&e)),
    }
}

pub async fn inventory(query: InventoryQuery, state: Arc<ApiState>) -> Result<JsonReply, Infallible> {
    let Some(product) = query.product else {
        return error_reply(
            "Missing required query parameter: product",
            StatusCode::BAD_REQUEST,
        );
    };

    match get_overall_stock_for_product(state.orchestrator.repository().as_ref(), &product) {
        Ok(items) => reply(&items, StatusCode::OK),
        Err(LookupError::NotFound(_)) => reply(&Vec::<Value>::new(), StatusCode::OK),
        Err(e) => error_reply(&e.to_string(), lookup_status(&e)),
    }
}

/// SKU details plus the restock estimate
pub async fn sku(sku: String, state: Arc<ApiState>) -> Result<JsonReply, Infallible> {
    let repository = state.orchestrator.repository().as_ref();

    let details = match get_inventory_details_for_sku(repository, &sku) {
        Ok(details) => details,
        Err(e) => return error_reply(&e.to_string(), lookup_status(&e)),
    };
    match get_product_eta(repository, &sku) {
        Ok(eta) => reply(&json!({ "details": details, "eta": eta }), StatusCode::OK),
        Err(e) => error_reply(&e.to_string(), lookup_status(&e)),
    }
}

pub async fn list_tools(state: Arc<ApiState>) -> Result<JsonReply, Infallible> {
    let tools = state.orchestrator.tools();
    let descriptions: Vec<_> = tools
        .list_tools()
        .iter()
        .filter_map(|name| tools.describe_tool(name))
        .collect();
    reply(&json!({ "tools": descriptions }), StatusCode::OK)
}

/// Direct tool invocation; lookup failures come back as the tagged payload
pub async fn invoke_tool(
    name: String,
    arguments: Value,
    state: Arc<ApiState>,
) -> Result<JsonReply, Infallible> {
    let start = Instant::now();
    let result = state.orchestrator.tools().execute_tool(&name, &arguments).await;
    let duration = start.elapsed();

    match result {
        Ok(payload) => {
            let succeeded = payload.get("status").and_then(Value::as_str) == Some("success");
            metrics().tool_executed(&name, duration, succeeded);
            info!(tool = %name, succeeded, "Tool invoked from console");
            reply(&payload, StatusCode::OK)
        }
        Err(e) => {
            metrics().tool_executed(&name, duration, false);
            warn!(tool = %name, error = %e, "Tool console call rejected");
            let status = match e {
                ToolError::UnknownTool(_) => StatusCode::NOT_FOUND,
                ToolError::ValidationError(_) => StatusCode::BAD_REQUEST,
                ToolError::SchemaError(_) | ToolError::ExecutionError(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            error_reply(&e.to_string(), status)
        }
    }
}

pub async fn health(state: Arc<ApiState>) -> Result<JsonReply, Infallible> {
    let report = state.health.report().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    reply(&report, status)
}

pub async fn metrics_snapshot() -> Result<JsonReply, Infallible> {
    reply(&metrics().get_metrics(), StatusCode::OK)
}

pub async fn index() -> Result<JsonReply, Infallible> {
    reply(
        &json!({
            "service": "order-router",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": [
                "POST /optimize-route",
                "GET /contextual-data",
                "GET /api/customers",
                "GET /api/orders?customer=",
                "GET /api/orders/{id}",
                "GET /api/inventory?product=",
                "GET /api/inventory/{sku}",
                "GET /tools",
                "POST /tools/{name}",
                "GET /health",
                "GET /metrics",
            ],
        }),
        StatusCode::OK,
    )
}

/// Turn filter rejections into JSON errors
pub async fn handle_rejection(err: Rejection) -> Result<JsonReply, Infallible> {
    let (status, message) =
        if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
            (StatusCode::BAD_REQUEST, format!("Invalid JSON body: {e}"))
        } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
            (StatusCode::BAD_REQUEST, e.to_string())
        } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
            (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large".to_string(),
            )
        } else if err.find::<warp::reject::LengthRequired>().is_some() {
            (
                StatusCode::LENGTH_REQUIRED,
                "Content-Length header is required".to_string(),
            )
        } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
            (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Expected an application/json body".to_string(),
            )
        } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
            (
                StatusCode::METHOD_NOT_ALLOWED,
                "Method not allowed".to_string(),
            )
        } else if err.is_not_found() {
            (StatusCode::NOT_FOUND, "Not found".to_string())
        } else {
            error!(rejection = ?err, "Unhandled rejection");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        };

    error_reply(&message, status)
}
