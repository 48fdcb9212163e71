//! HTTP surface for route optimization, dashboard data and the tool console

pub mod contextual;
mod handlers;

pub use handlers::handle_rejection;

use crate::agent::Orchestrator;
use crate::health::HealthCheckManager;
use serde::Deserialize;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use warp::Filter;

/// Largest accepted request body
pub const MAX_BODY_BYTES: u64 = 64 * 1024;

/// Shared state handed to every handler
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    pub health: Arc<HealthCheckManager>,
}

impl ApiState {
    pub fn new(orchestrator: Arc<Orchestrator>, health: Arc<HealthCheckManager>) -> Self {
        Self {
            orchestrator,
            health,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    pub customer: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InventoryQuery {
    pub product: Option<String>,
}

fn with_state(
    state: Arc<ApiState>,
) -> impl Filter<Extract = (Arc<ApiState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body() -> impl Filter<Extract = (serde_json::Value,), Error = warp::Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

/// All routes with CORS and rejection handling applied
pub fn routes(
    state: Arc<ApiState>,
) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
    let optimize_route = warp::path("optimize-route")
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::optimize_route);

    let contextual_data = warp::path("contextual-data")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::contextual_data);

    let customers = warp::path!("api" / "customers")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::customers);

    let orders = warp::path!("api" / "orders")
        .and(warp::get())
        .and(warp::query::<OrdersQuery>())
        .and(with_state(state.clone()))
        .and_then(handlers::orders);

    let order = warp::path!("api" / "orders" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::order);

    let inventory = warp::path!("api" / "inventory")
        .and(warp::get())
        .and(warp::query::<InventoryQuery>())
        .and(with_state(state.clone()))
        .and_then(handlers::inventory);

    let sku = warp::path!("api" / "inventory" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::sku);

    let list_tools = warp::path!("tools")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::list_tools);

    let invoke_tool = warp::path!("tools" / String)
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(handlers::invoke_tool);

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state))
        .and_then(handlers::health);

    let metrics = warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(handlers::metrics_snapshot);

    let index = warp::path::end()
        .and(warp::get())
        .and_then(handlers::index);

    optimize_route
        .or(contextual_data)
        .or(customers)
        .or(orders)
        .or(order)
        .or(inventory)
        .or(sku)
        .or(list_tools)
        .or(invoke_tool)
        .or(health)
        .or(metrics)
        .or(index)
        .with(
            warp::cors()
                .allow_any_origin()
                .allow_methods(vec!["GET", "POST"])
                .allow_headers(vec!["content-type"]),
        )
        .recover(handle_rejection)
}

/// Serve until `shutdown` resolves
pub async fn serve(
    state: Arc<ApiState>,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), warp::Error> {
    let (bound, server) =
        warp::serve(routes(state)).try_bind_with_graceful_shutdown(addr, shutdown)?;

    info!(address = %bound, "Order router listening");
    server.await;
    info!("HTTP server stopped");
    Ok(())
}
