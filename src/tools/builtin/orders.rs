//! Order history and channel inventory lookups

use crate::data::{OrderRecord, Repository, SkuInventoryRecord, StockStatus};
use crate::tools::{render_outcome, LookupError, Tool, ToolDescription, ToolError};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub const MAX_CUSTOMER_ORDERS: usize = 5;
pub const MAX_STOCK_MATCHES: usize = 10;

fn require_non_empty(field: &str, value: &str) -> Result<(), LookupError> {
    if value.trim().is_empty() {
        return Err(LookupError::Validation(format!(
            "Invalid {field} format. Must be a non-empty string."
        )));
    }
    Ok(())
}

/// Fetch one order document (pure function)
pub fn get_order_status<'a>(
    repository: &'a dyn Repository,
    order_id: &str,
) -> Result<&'a OrderRecord, LookupError> {
    require_non_empty("order_id", order_id)?;
    repository
        .order(order_id)
        .ok_or_else(|| LookupError::NotFound(format!("Order details not found for ID: {order_id}")))
}

/// Orders whose customer name contains `identifier`, or whose id equals it
/// (case-insensitive, at most [`MAX_CUSTOMER_ORDERS`]) (pure function)
pub fn find_orders_for_customer<'a>(
    repository: &'a dyn Repository,
    identifier: &str,
) -> Result<Vec<&'a OrderRecord>, LookupError> {
    require_non_empty("customer_identifier", identifier)?;
    let needle = identifier.to_lowercase();

    let matches: Vec<&OrderRecord> = repository
        .orders()
        .iter()
        .filter(|order| {
            order.customer_name.to_lowercase().contains(&needle)
                || order.order_id.to_lowercase() == needle
        })
        .take(MAX_CUSTOMER_ORDERS)
        .collect();

    if matches.is_empty() {
        return Err(LookupError::NotFound(format!(
            "No orders found for customer: {identifier}"
        )));
    }
    Ok(matches)
}

/// Exact SKU lookup (pure function)
pub fn get_inventory_details_for_sku<'a>(
    repository: &'a dyn Repository,
    sku: &str,
) -> Result<&'a SkuInventoryRecord, LookupError> {
    require_non_empty("sku", sku)?;
    repository
        .sku(sku)
        .ok_or_else(|| LookupError::NotFound(format!("Inventory details not found for SKU: {sku}")))
}

/// SKU rows whose product name contains the query (case-insensitive, at most
/// [`MAX_STOCK_MATCHES`]) (pure function)
pub fn get_overall_stock_for_product<'a>(
    repository: &'a dyn Repository,
    name_query: &str,
) -> Result<Vec<&'a SkuInventoryRecord>, LookupError> {
    require_non_empty("product_name_query", name_query)?;
    let needle = name_query.to_lowercase();

    let matches: Vec<&SkuInventoryRecord> = repository
        .sku_inventory()
        .iter()
        .filter(|item| item.product_name.to_lowercase().contains(&needle))
        .take(MAX_STOCK_MATCHES)
        .collect();

    if matches.is_empty() {
        return Err(LookupError::NotFound(format!(
            "No products found matching query: '{name_query}'"
        )));
    }
    Ok(matches)
}

/// Restock estimate for a SKU
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductEta {
    pub sku: String,
    pub status: StockStatus,
    /// Recorded date, `"not applicable"` for stock on hand, `"unknown"` otherwise
    pub eta: String,
}

/// Restock estimate from the SKU table (pure function)
pub fn get_product_eta(repository: &dyn Repository, sku: &str) -> Result<ProductEta, LookupError> {
    let item = repository
        .sku(sku)
        .ok_or_else(|| LookupError::NotFound(format!("SKU {sku} not found in inventory records.")))?;

    let eta = match (&item.eta, item.status.is_on_hand()) {
        (Some(eta), _) => eta.clone(),
        (None, true) => "not applicable".to_string(),
        (None, false) => "unknown".to_string(),
    };

    Ok(ProductEta {
        sku: item.sku_code.clone(),
        status: item.status,
        eta,
    })
}

/// Declares a tool struct holding the repository plus its `new` constructor
macro_rules! repository_tool {
    ($name:ident) => {
        pub struct $name {
            repository: Arc<dyn Repository>,
        }

        impl $name {
            pub fn new(repository: Arc<dyn Repository>) -> Self {
                Self { repository }
            }
        }
    };
}

repository_tool!(OrderStatusTool);
repository_tool!(CustomerOrdersTool);
repository_tool!(SkuDetailsTool);
repository_tool!(ProductStockTool);
repository_tool!(ProductEtaTool);

fn single_string_schema(field: &str, description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            field: {"type": "string", "description": description}
        },
        "required": [field],
        "additionalProperties": false
    })
}

#[async_trait]
impl Tool for OrderStatusTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "get_order_status".to_string(),
            description: "Fetch status, payment, tracking and line items for an order id."
                .to_string(),
            parameters: single_string_schema("order_id", "The order id to query"),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let order_id = parameters["order_id"].as_str().unwrap_or_default();
        Ok(render_outcome(get_order_status(
            self.repository.as_ref(),
            order_id,
        )))
    }
}

#[async_trait]
impl Tool for CustomerOrdersTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "find_orders_for_customer".to_string(),
            description: format!(
                "Find up to {MAX_CUSTOMER_ORDERS} orders by customer name fragment or exact order id."
            ),
            parameters: single_string_schema(
                "customer_identifier",
                "Customer name fragment or order id",
            ),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let identifier = parameters["customer_identifier"]
            .as_str()
            .unwrap_or_default();
        Ok(render_outcome(find_orders_for_customer(
            self.repository.as_ref(),
            identifier,
        )))
    }
}

#[async_trait]
impl Tool for SkuDetailsTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "get_inventory_details_for_sku".to_string(),
            description: "Fetch channel inventory (location, status, purchase/backorder/preorder availability) for a SKU.".to_string(),
            parameters: single_string_schema("sku", "SKU code"),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let sku = parameters["sku"].as_str().unwrap_or_default();
        Ok(render_outcome(get_inventory_details_for_sku(
            self.repository.as_ref(),
            sku,
        )))
    }
}

#[async_trait]
impl Tool for ProductStockTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "get_overall_stock_for_product".to_string(),
            description: format!(
                "Find up to {MAX_STOCK_MATCHES} SKU inventory rows whose product name contains the query."
            ),
            parameters: single_string_schema(
                "product_name_query",
                "Product name fragment, e.g. 'Bookcase'",
            ),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let query = parameters["product_name_query"].as_str().unwrap_or_default();
        Ok(render_outcome(get_overall_stock_for_product(
            self.repository.as_ref(),
            query,
        )))
    }
}

#[async_trait]
impl Tool for ProductEtaTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "get_product_eta".to_string(),
            description: "Fetch the restock or arrival estimate for a SKU.".to_string(),
            parameters: single_string_schema("sku", "SKU code"),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let sku = parameters["sku"].as_str().unwrap_or_default();
        Ok(render_outcome(get_product_eta(self.repository.as_ref(), sku)))
    }
}
