//! LLM provider abstraction layer
//!
//! Provider-agnostic completion interface plus the OpenAI-compatible client
//! the routing agent uses in production.

pub mod provider;
pub mod providers;

pub use provider::*;
pub use providers::*;
