//! Observability: structured logging and in-process metrics

pub mod logging;
pub mod metrics;

pub use logging::{init_default_logging, init_logging, parse_level, LogFormat};
pub use metrics::{metrics, MetricsCollector, MetricsSnapshot, RunOutcome};

// Span macros for structured logging
pub use logging::{llm_span, run_span, tool_span};
