//! Health checks for the completion service and the data tables

use crate::data::Repository;
use crate::llm::provider::LlmProvider;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Health check result
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResult {
    pub component: String,
    pub healthy: bool,
    pub message: Option<String>,
    pub response_time_ms: Option<u64>,
}

/// Trait for components that can be health checked
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Perform health check on this component
    async fn health_check(&self) -> HealthCheckResult;

    /// Get the component name for reporting
    fn component_name(&self) -> &str;
}

/// LLM provider health check implementation
pub struct LlmProviderHealthCheck {
    llm_provider: Arc<dyn LlmProvider>,
}

impl LlmProviderHealthCheck {
    pub fn new(llm_provider: Arc<dyn LlmProvider>) -> Self {
        Self { llm_provider }
    }
}

#[async_trait]
impl HealthCheck for LlmProviderHealthCheck {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let provider = self.llm_provider.name();
        let outcome = self.llm_provider.health_check().await;
        let response_time_ms = start.elapsed().as_millis() as u64;

        let (healthy, message) = match outcome {
            Ok(()) => {
                debug!(provider, response_time_ms, "LLM provider healthy");
                (true, format!("{provider} provider healthy"))
            }
            Err(e) => {
                warn!(provider, response_time_ms, error = %e, "LLM provider health check failed");
                (false, format!("{provider} provider error: {e}"))
            }
        };

        HealthCheckResult {
            component: self.component_name().to_string(),
            healthy,
            message: Some(message),
            response_time_ms: Some(response_time_ms),
        }
    }

    fn component_name(&self) -> &str {
        "llm_provider"
    }
}

/// Reports broken cross-table invariants in the repository
pub struct RepositoryHealthCheck {
    repository: Arc<dyn Repository>,
}

impl RepositoryHealthCheck {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl HealthCheck for RepositoryHealthCheck {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let violations = self.repository.check_integrity();

        let message = if violations.is_empty() {
            format!(
                "{} customers, {} locations, {} shipping lanes",
                self.repository.customers().len(),
                self.repository.locations().len(),
                self.repository.shipping_lanes().len()
            )
        } else {
            violations
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        };

        HealthCheckResult {
            component: self.component_name().to_string(),
            healthy: violations.is_empty(),
            message: Some(message),
            response_time_ms: Some(start.elapsed().as_millis() as u64),
        }
    }

    fn component_name(&self) -> &str {
        "repository"
    }
}

/// Aggregated health report
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// `healthy` when every check passes, `degraded` otherwise
    pub status: String,
    pub checks: Vec<HealthCheckResult>,
    pub timestamp: String,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Aggregated health check manager
#[derive(Default)]
pub struct HealthCheckManager {
    health_checks: Vec<Box<dyn HealthCheck>>,
}

impl HealthCheckManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_health_check(&mut self, health_check: Box<dyn HealthCheck>) {
        self.health_checks.push(health_check);
    }

    /// Run all health checks in registration order
    pub async fn run_health_checks(&self) -> Vec<HealthCheckResult> {
        let mut results = Vec::with_capacity(self.health_checks.len());
        for health_check in &self.health_checks {
            results.push(health_check.health_check().await);
        }
        results
    }

    pub async fn report(&self) -> HealthReport {
        let checks = self.run_health_checks().await;
        if checks.is_empty() {
            warn!("No health checks configured - assuming healthy");
        }

        let healthy = checks.iter().all(|r| r.healthy);
        debug!(
            healthy_count = checks.iter().filter(|r| r.healthy).count(),
            total = checks.len(),
            "Health checks complete"
        );

        HealthReport {
            status: if healthy { "healthy" } else { "degraded" }.to_string(),
            checks,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
