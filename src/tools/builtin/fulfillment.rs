//! Zone, stock and shipping lookups used by the routing agent

use crate::data::{Repository, ShippingOption};
use crate::tools::{Tool, ToolDescription, ToolError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Zone returned when a zip has no mapping and no default zone exists
pub const UNKNOWN_ZONE: &str = "UNKNOWN_ZONE";

/// Resolve a zip code to a shipping zone (pure function)
///
/// Never fails: falls back to the table's default zone, then to [`UNKNOWN_ZONE`].
pub fn get_customer_zone(repository: &dyn Repository, zip_code: &str) -> String {
    let zones = repository.zones();
    zones
        .assignments
        .get(zip_code)
        .or(zones.default_zone.as_ref())
        .cloned()
        .unwrap_or_else(|| UNKNOWN_ZONE.to_string())
}

/// Locations holding at least `quantity` units of a product (pure function)
///
/// Only locations with an inventory row for the product are considered, so an
/// unknown product yields an empty map and `quantity == 0` lists every
/// location carrying the product.
pub fn get_inventory(
    repository: &dyn Repository,
    product_id: &str,
    quantity: u32,
) -> BTreeMap<String, u32> {
    repository
        .stock_for_product(product_id)
        .into_iter()
        .filter(|record| record.quantity >= quantity)
        .map(|record| (record.location_id.clone(), record.quantity))
        .collect()
}

/// Carrier offers for a product over one lane, in table order (pure function)
///
/// Unknown location, unknown zone and a lane without offers for the product
/// all produce an empty list.
pub fn get_shipping_options(
    repository: &dyn Repository,
    source_location: &str,
    destination_zone: &str,
    product_id: &str,
) -> Vec<ShippingOption> {
    repository
        .shipping_lane(source_location, destination_zone)
        .map(|lane| {
            lane.options
                .iter()
                .filter(|option| option.product_id == product_id)
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Format the shipping payload handed to the model (pure function)
fn format_shipping_response(
    source_location: &str,
    destination_zone: &str,
    product_id: &str,
    options: Vec<ShippingOption>,
) -> Value {
    let options: Vec<Value> = options
        .into_iter()
        .map(|o| {
            json!({
                "carrier": o.carrier,
                "cost": o.cost,
                "days": o.days,
                "co2_kg": o.co2_kg,
            })
        })
        .collect();

    if options.is_empty() {
        json!({
            "status": "success",
            "data": {
                "options": [],
                "message": format!(
                    "No shipping options found for product {product_id} from {source_location} to {destination_zone}."
                ),
            }
        })
    } else {
        json!({"status": "success", "data": {"options": options}})
    }
}

pub struct CustomerZoneTool {
    repository: Arc<dyn Repository>,
}

impl CustomerZoneTool {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Tool for CustomerZoneTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "get_customer_zone".to_string(),
            description: format!(
                "Determine the shipping zone for a zip code. Returns a zone id such as ZONE_1, or {UNKNOWN_ZONE}."
            ),
            parameters: json!({
                "type": "object",
                "properties": {
                    "zip_code": {"type": "string"}
                },
                "required": ["zip_code"],
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let zip_code = parameters["zip_code"].as_str().unwrap_or_default();
        let zone = get_customer_zone(self.repository.as_ref(), zip_code);
        Ok(json!({"status": "success", "data": {"zip_code": zip_code, "zone": zone}}))
    }
}

pub struct InventoryTool {
    repository: Arc<dyn Repository>,
}

impl InventoryTool {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Tool for InventoryTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "get_inventory".to_string(),
            description: "Check stock for a product across all fulfillment locations. Returns a map of location id to units on hand for locations holding at least the requested quantity.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "product_id": {"type": "string"},
                    "quantity": {"type": "integer", "minimum": 0}
                },
                "required": ["product_id", "quantity"],
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let product_id = parameters["product_id"].as_str().unwrap_or_default();
        let quantity = parameters["quantity"]
            .as_u64()
            .and_then(|q| u32::try_from(q).ok())
            .ok_or_else(|| {
                ToolError::ExecutionError("quantity does not fit in 32 bits".to_string())
            })?;

        let locations = get_inventory(self.repository.as_ref(), product_id, quantity);
        Ok(json!({"status": "success", "data": locations}))
    }
}

pub struct ShippingOptionsTool {
    repository: Arc<dyn Repository>,
}

impl ShippingOptionsTool {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Tool for ShippingOptionsTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "get_shipping_options".to_string(),
            description: "List carrier options (cost, transit days, co2_kg) for shipping a product from a fulfillment location to a zone.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "warehouse_id": {"type": "string"},
                    "zone": {"type": "string"},
                    "product_id": {"type": "string"}
                },
                "required": ["warehouse_id", "zone", "product_id"],
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let warehouse_id = parameters["warehouse_id"].as_str().unwrap_or_default();
        let zone = parameters["zone"].as_str().unwrap_or_default();
        let product_id = parameters["product_id"].as_str().unwrap_or_default();

        let options =
            get_shipping_options(self.repository.as_ref(), warehouse_id, zone, product_id);
        Ok(format_shipping_response(
            warehouse_id,
            zone,
            product_id,
            options,
        ))
    }
}
