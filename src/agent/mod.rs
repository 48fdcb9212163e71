//! Order routing agent: intake, routing decision and the completion loop

pub mod intake;
pub mod orchestrator;
pub mod priority;
pub mod prompts;
pub mod runner;
pub mod schema;

pub use intake::{ProcessedOrder, RawOrder};
pub use orchestrator::{Orchestrator, RouteCandidates, RunReport, WorkflowState};
pub use priority::BusinessPriority;
pub use prompts::Prompts;
pub use schema::{RoutingDecision, RoutingRecommendation};
