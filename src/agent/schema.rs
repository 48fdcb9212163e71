//! Structured output for routing decisions
//!
//! The completion service is asked for a [`RoutingDecision`]; the JSON
//! schema derived here is sent as the structured response format.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One fulfillment route: where it ships from and how
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RoutingRecommendation {
    pub fulfillment_location: String,
    pub carrier: String,
    pub cost: f64,
    pub delivery_days: u32,
    pub co2_kg: f64,
}

impl RoutingRecommendation {
    /// Location and carrier identify a route
    pub fn same_route(&self, other: &RoutingRecommendation) -> bool {
        self.fulfillment_location == other.fulfillment_location && self.carrier == other.carrier
    }
}

/// The final answer of a routing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RoutingDecision {
    pub recommendation: RoutingRecommendation,

    /// Why the recommendation wins under the business priority
    pub reasoning: String,

    /// Runner-up routes, best first
    #[serde(default)]
    pub alternatives_considered: Vec<RoutingRecommendation>,
}

/// What the completion service may answer with
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionReply {
    Decision(RoutingDecision),
    /// The model declined with `{"error": ...}`
    Refusal(String),
}

impl RoutingDecision {
    /// Generate the JSON schema for this structure
    pub fn json_schema() -> Value {
        let schema = schemars::schema_for!(RoutingDecision);
        serde_json::to_value(schema).unwrap_or(Value::Null)
    }
}

/// Parse the final model output, tolerating a surrounding markdown fence
pub fn parse_decision_reply(content: &str) -> Result<DecisionReply, String> {
    let body = strip_code_fence(content);
    if body.is_empty() {
        return Err("Completion service returned an empty response".to_string());
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| format!("Completion service returned invalid JSON: {e}"))?;

    if let Some(error) = value.get("error") {
        let reason = error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Ok(DecisionReply::Refusal(reason));
    }

    serde_json::from_value(value)
        .map(DecisionReply::Decision)
        .map_err(|e| format!("Completion service returned an unusable routing decision: {e}"))
}

/// Body of the first fenced block, with any info string (`json`, `JSON`)
/// dropped; unfenced content is returned trimmed.
fn strip_code_fence(content: &str) -> &str {
    const FENCE: &str = "```";

    let trimmed = content.trim();
    let Some(start) = trimmed.find(FENCE) else {
        return trimmed;
    };
    let rest = &trimmed[start + FENCE.len()..];
    let tag_len = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    let body = &rest[tag_len..];
    let end = body.find(FENCE).unwrap_or(body.len());
    body[..end].trim()
}
