//! Order intake: validate the raw request, then enrich it from the CRM

use crate::agent::priority::BusinessPriority;
use crate::data::{Repository, Tier};
use crate::error::{RouterError, RouterResult};
use crate::tools::builtin::get_customer_details;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const REQUIRED_FIELDS: [&str; 3] = ["product_id", "quantity", "customer_id"];

/// A structurally valid order request
#[derive(Debug, Clone, PartialEq)]
pub struct RawOrder {
    pub product_id: String,
    pub quantity: u32,
    pub customer_id: String,
    /// `None` when the request did not name one
    pub business_priority: Option<BusinessPriority>,
}

/// Order enriched with the customer fields routing needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedOrder {
    pub product_id: String,
    pub quantity: u32,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_zip_code: String,
    pub customer_tier: Tier,
}

impl RawOrder {
    /// Check shape and types of a raw JSON order (pure function)
    ///
    /// Quantity must be a JSON integer greater than zero; `2.0`, `"2"` and
    /// `-1` are all rejected.
    pub fn parse(value: &Value) -> RouterResult<Self> {
        let fields = value.as_object().ok_or_else(|| {
            RouterError::validation("Validation failed: order must be a JSON object")
        })?;

        let missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|key| fields.get(*key).map_or(true, Value::is_null))
            .collect();
        if !missing.is_empty() {
            return Err(RouterError::validation(format!(
                "Validation failed: missing required field(s): {}",
                missing.join(", ")
            )));
        }

        let quantity = parse_quantity(&fields["quantity"])?;
        let product_id = non_empty_string(fields, "product_id")?;
        let customer_id = non_empty_string(fields, "customer_id")?;

        let business_priority = match fields.get("business_priority") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(
                s.parse::<BusinessPriority>()
                    .map_err(|e| RouterError::validation(format!("Validation failed: {e}")))?,
            ),
            Some(other) => {
                return Err(RouterError::validation(format!(
                    "Validation failed: business_priority must be a string, got {other}"
                )))
            }
        };

        Ok(Self {
            product_id,
            quantity,
            customer_id,
            business_priority,
        })
    }
}

fn parse_quantity(value: &Value) -> RouterResult<u32> {
    value
        .as_u64()
        .filter(|quantity| *quantity > 0)
        .and_then(|quantity| u32::try_from(quantity).ok())
        .ok_or_else(|| {
            RouterError::validation(format!(
                "Validation failed: invalid quantity '{value}'. Must be a positive integer."
            ))
        })
}

fn non_empty_string(fields: &Map<String, Value>, key: &str) -> RouterResult<String> {
    match fields.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        other => Err(RouterError::validation(format!(
            "Validation failed: invalid {key} '{}'. Must be a non-empty string.",
            other.cloned().unwrap_or(Value::Null)
        ))),
    }
}

/// Merge a valid order with its CRM record
pub fn enrich(repository: &dyn Repository, order: &RawOrder) -> RouterResult<ProcessedOrder> {
    let customer = get_customer_details(repository, &order.customer_id)?;

    Ok(ProcessedOrder {
        product_id: order.product_id.clone(),
        quantity: order.quantity,
        customer_id: customer.customer_id,
        customer_name: customer.name,
        customer_zip_code: customer.zip_code,
        customer_tier: customer.tier,
    })
}
