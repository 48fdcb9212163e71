//! Order Router - Rust Implementation
//!
//! A multi-agent order routing assistant: an intake stage validates and
//! enriches raw orders, and a routing stage asks an LLM to pick a
//! fulfillment location and carrier from candidates gathered by lookup tools.
//!
//! # Overview
//!
//! This crate provides:
//! - In-memory fulfillment tables (customers, stock, shipping lanes, zones, orders)
//! - Lookup tools with JSON schema validation
//! - An OpenAI-compatible tool-calling loop with bounded round trips
//! - The intake and routing orchestrator with per-run logs
//! - A warp HTTP API for route optimization and dashboard data
//!
//! # Quick Start
//!
//! ```rust
//! use order_router::data::InMemoryRepository;
//! use order_router::tools::builtin::{get_customer_zone, get_inventory};
//!
//! let repository = InMemoryRepository::seeded().unwrap();
//!
//! assert_eq!(get_customer_zone(&repository, "10001"), "ZONE_1");
//!
//! // Every location holding at least 5 units of product_A
//! let stock = get_inventory(&repository, "product_A", 5);
//! assert!(stock.contains_key("WH_EAST"));
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod data;
pub mod error;
pub mod health;
pub mod llm;
pub mod observability;
pub mod progress;
pub mod testing;
pub mod tools;

pub use agent::{Orchestrator, ProcessedOrder, RawOrder, RoutingDecision, RunReport};
pub use config::RouterConfig;
pub use data::{InMemoryRepository, Repository};
pub use error::{RouterError, RouterResult};
pub use progress::{Progress, ProgressCategory, ProgressEventType, ProgressMessage, RunLog};
pub use tools::{Tool, ToolDescription, ToolError, ToolSystem};
