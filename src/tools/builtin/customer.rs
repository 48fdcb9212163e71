//! CRM customer lookup

use crate::data::{Repository, Tier};
use crate::tools::{render_outcome, LookupError, Tool, ToolDescription, ToolError};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Customer fields needed downstream of intake
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerDetails {
    pub customer_id: String,
    pub name: String,
    pub zip_code: String,
    pub tier: Tier,
}

/// Look up a customer and check the fields routing depends on (pure function)
pub fn get_customer_details(
    repository: &dyn Repository,
    customer_id: &str,
) -> Result<CustomerDetails, LookupError> {
    if customer_id.trim().is_empty() {
        return Err(LookupError::Validation(
            "Invalid customer_id format. Must be a non-empty string.".to_string(),
        ));
    }

    let customer = repository.customer(customer_id).ok_or_else(|| {
        LookupError::NotFound(format!("Customer ID '{customer_id}' not found in CRM."))
    })?;

    let zip_code = customer
        .zip_code
        .as_ref()
        .filter(|zip| !zip.trim().is_empty())
        .ok_or_else(|| {
            LookupError::DataIntegrity(format!(
                "Customer ID '{customer_id}' found, but essential zip_code is missing from CRM data."
            ))
        })?;

    Ok(CustomerDetails {
        customer_id: customer.id.clone(),
        name: customer.name.clone().unwrap_or_else(|| "N/A".to_string()),
        zip_code: zip_code.clone(),
        tier: customer.tier.unwrap_or_default(),
    })
}

pub struct CustomerDetailsTool {
    repository: Arc<dyn Repository>,
}

impl CustomerDetailsTool {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Tool for CustomerDetailsTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "get_customer_details".to_string(),
            description: "Fetch a customer's name, zip code and loyalty tier from the CRM."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "customer_id": {
                        "type": "string",
                        "description": "CRM customer id, e.g. cust123"
                    }
                },
                "required": ["customer_id"],
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let customer_id = parameters["customer_id"].as_str().unwrap_or_default();
        Ok(render_outcome(get_customer_details(
            self.repository.as_ref(),
            customer_id,
        )))
    }
}
