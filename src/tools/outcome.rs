//! Typed lookup failures and their JSON rendering at the tool boundary

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Why a lookup produced no data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    DataIntegrity(String),
}

impl LookupError {
    pub fn kind(&self) -> &'static str {
        match self {
            LookupError::Validation(_) => "validation",
            LookupError::NotFound(_) => "not_found",
            LookupError::DataIntegrity(_) => "data_integrity",
        }
    }
}

/// Render a lookup result as the tagged payload handed back to the model
///
/// Success: `{"status": "success", "data": ...}`.
/// Failure: `{"status": "error", "kind": ..., "message": ...}`.
pub fn render_outcome<T: Serialize>(result: Result<T, LookupError>) -> Value {
    match result {
        Ok(data) => match serde_json::to_value(data) {
            Ok(data) => json!({"status": "success", "data": data}),
            Err(e) => json!({
                "status": "error",
                "kind": "data_integrity",
                "message": format!("Result could not be serialized: {e}"),
            }),
        },
        Err(e) => json!({
            "status": "error",
            "kind": e.kind(),
            "message": e.to_string(),
        }),
    }
}
