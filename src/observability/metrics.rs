//! Thread-safe metrics collection
//!
//! Atomic counters for routing runs and completion requests, plus
//! mutex-protected per-tool statistics. Served as JSON on `/metrics`.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Retained latency samples per series
const MAX_SAMPLES: usize = 1000;

/// Global metrics collector instance
pub static METRICS: Lazy<MetricsCollector> = Lazy::new(MetricsCollector::new);

/// Get reference to global metrics collector
pub fn metrics() -> &'static MetricsCollector {
    &METRICS
}

/// How a routing run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Routed,
    IntakeFailed,
    NoRoute,
    UpstreamFailed,
    TimedOut,
}

/// Thread-safe metrics collector using atomics and mutexes
pub struct MetricsCollector {
    runs_received: AtomicU64,
    runs_in_flight: AtomicU64,
    runs_routed: AtomicU64,
    runs_intake_failed: AtomicU64,
    runs_no_route: AtomicU64,
    runs_upstream_failed: AtomicU64,
    runs_timed_out: AtomicU64,
    run_times: Mutex<Vec<u64>>,

    llm_requests: AtomicU64,
    llm_failures: AtomicU64,
    llm_tokens: AtomicU64,

    tool_stats: Mutex<BTreeMap<String, ToolExecutionStats>>,

    started_at: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            runs_received: AtomicU64::new(0),
            runs_in_flight: AtomicU64::new(0),
            runs_routed: AtomicU64::new(0),
            runs_intake_failed: AtomicU64::new(0),
            runs_no_route: AtomicU64::new(0),
            runs_upstream_failed: AtomicU64::new(0),
            runs_timed_out: AtomicU64::new(0),
            run_times: Mutex::new(Vec::new()),
            llm_requests: AtomicU64::new(0),
            llm_failures: AtomicU64::new(0),
            llm_tokens: AtomicU64::new(0),
            tool_stats: Mutex::new(BTreeMap::new()),
            started_at: AtomicU64::new(current_timestamp()),
        }
    }

    pub fn run_started(&self) {
        self.runs_received.fetch_add(1, Ordering::Relaxed);
        self.runs_in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn run_finished(&self, outcome: RunOutcome, duration: Duration) {
        self.runs_in_flight.fetch_sub(1, Ordering::Relaxed);
        let counter = match outcome {
            RunOutcome::Routed => &self.runs_routed,
            RunOutcome::IntakeFailed => &self.runs_intake_failed,
            RunOutcome::NoRoute => &self.runs_no_route,
            RunOutcome::UpstreamFailed => &self.runs_upstream_failed,
            RunOutcome::TimedOut => &self.runs_timed_out,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        push_sample(&self.run_times, duration);
    }

    pub fn llm_request(&self, success: bool, total_tokens: u32) {
        self.llm_requests.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.llm_failures.fetch_add(1, Ordering::Relaxed);
        }
        self.llm_tokens
            .fetch_add(u64::from(total_tokens), Ordering::Relaxed);
    }

    pub fn tool_executed(&self, tool_name: &str, duration: Duration, success: bool) {
        if let Ok(mut stats) = self.tool_stats.lock() {
            let entry = stats
                .entry(tool_name.to_string())
                .or_insert_with(ToolExecutionStats::default);
            entry.executions += 1;
            if !success {
                entry.failures += 1;
            }
            entry.last_execution = current_timestamp();
            entry.execution_times.push(duration.as_millis() as u64);
            if entry.execution_times.len() > MAX_SAMPLES {
                entry.execution_times.remove(0);
            }
        }
    }

    /// Reset all metrics (useful for testing)
    pub fn reset(&self) {
        for counter in [
            &self.runs_received,
            &self.runs_in_flight,
            &self.runs_routed,
            &self.runs_intake_failed,
            &self.runs_no_route,
            &self.runs_upstream_failed,
            &self.runs_timed_out,
            &self.llm_requests,
            &self.llm_failures,
            &self.llm_tokens,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        if let Ok(mut times) = self.run_times.lock() {
            times.clear();
        }
        if let Ok(mut stats) = self.tool_stats.lock() {
            stats.clear();
        }
        self.started_at
            .store(current_timestamp(), Ordering::Relaxed);
    }

    /// Snapshot tool statistics (pure function)
    fn tool_snapshot(stats: &ToolExecutionStats) -> ToolExecutionStatsSnapshot {
        let avg_execution_time_ms = if stats.execution_times.is_empty() {
            0.0
        } else {
            stats.execution_times.iter().sum::<u64>() as f64 / stats.execution_times.len() as f64
        };
        let success_rate = if stats.executions == 0 {
            0.0
        } else {
            (stats.executions - stats.failures) as f64 / stats.executions as f64
        };

        ToolExecutionStatsSnapshot {
            executions: stats.executions,
            failures: stats.failures,
            avg_execution_time_ms,
            last_execution: stats.last_execution,
            success_rate,
        }
    }

    /// Get complete metrics snapshot
    pub fn get_metrics(&self) -> MetricsSnapshot {
        let now = current_timestamp();
        let (avg, p50, p95, p99) = latency_statistics(&self.run_times);

        let tool_stats: BTreeMap<String, ToolExecutionStatsSnapshot> = self
            .tool_stats
            .lock()
            .map(|stats| {
                stats
                    .iter()
                    .map(|(name, s)| (name.clone(), Self::tool_snapshot(s)))
                    .collect()
            })
            .unwrap_or_default();
        let total_executions = tool_stats.values().map(|s| s.executions).sum();
        let total_failures = tool_stats.values().map(|s| s.failures).sum();

        MetricsSnapshot {
            runs: RunMetrics {
                received: self.runs_received.load(Ordering::Relaxed),
                in_flight: self.runs_in_flight.load(Ordering::Relaxed),
                routed: self.runs_routed.load(Ordering::Relaxed),
                intake_failed: self.runs_intake_failed.load(Ordering::Relaxed),
                no_route: self.runs_no_route.load(Ordering::Relaxed),
                upstream_failed: self.runs_upstream_failed.load(Ordering::Relaxed),
                timed_out: self.runs_timed_out.load(Ordering::Relaxed),
                avg_duration_ms: avg,
                duration_p50_ms: p50,
                duration_p95_ms: p95,
                duration_p99_ms: p99,
            },
            llm: LlmMetrics {
                requests: self.llm_requests.load(Ordering::Relaxed),
                failures: self.llm_failures.load(Ordering::Relaxed),
                total_tokens: self.llm_tokens.load(Ordering::Relaxed),
            },
            tools: ToolMetrics {
                tool_stats,
                total_executions,
                total_failures,
            },
            uptime_seconds: now.saturating_sub(self.started_at.load(Ordering::Relaxed)),
            timestamp: now,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct ToolExecutionStats {
    executions: u64,
    failures: u64,
    execution_times: Vec<u64>,
    last_execution: u64,
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub runs: RunMetrics,
    pub llm: LlmMetrics,
    pub tools: ToolMetrics,
    pub uptime_seconds: u64,
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
pub struct RunMetrics {
    pub received: u64,
    pub in_flight: u64,
    pub routed: u64,
    pub intake_failed: u64,
    pub no_route: u64,
    pub upstream_failed: u64,
    pub timed_out: u64,
    pub avg_duration_ms: f64,
    pub duration_p50_ms: f64,
    pub duration_p95_ms: f64,
    pub duration_p99_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct LlmMetrics {
    pub requests: u64,
    pub failures: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Serialize)]
pub struct ToolMetrics {
    pub tool_stats: BTreeMap<String, ToolExecutionStatsSnapshot>,
    pub total_executions: u64,
    pub total_failures: u64,
}

#[derive(Debug, Serialize)]
pub struct ToolExecutionStatsSnapshot {
    pub executions: u64,
    pub failures: u64,
    pub avg_execution_time_ms: f64,
    pub last_execution: u64,
    pub success_rate: f64,
}

fn push_sample(samples: &Mutex<Vec<u64>>, duration: Duration) {
    if let Ok(mut times) = samples.lock() {
        times.push(duration.as_millis() as u64);
        if times.len() > MAX_SAMPLES {
            times.remove(0);
        }
    }
}

fn latency_statistics(samples: &Mutex<Vec<u64>>) -> (f64, f64, f64, f64) {
    let Ok(times) = samples.lock() else {
        return (0.0, 0.0, 0.0, 0.0);
    };
    if times.is_empty() {
        return (0.0, 0.0, 0.0, 0.0);
    }

    let mut sorted = times.clone();
    sorted.sort_unstable();
    let avg = sorted.iter().sum::<u64>() as f64 / sorted.len() as f64;
    (
        avg,
        percentile(&sorted, 50.0),
        percentile(&sorted, 95.0),
        percentile(&sorted, 99.0),
    )
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn percentile(sorted_data: &[u64], percentile: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }

    let index = (percentile / 100.0) * (sorted_data.len() - 1) as f64;
    let lower = sorted_data[index.floor() as usize] as f64;
    let upper = sorted_data[index.ceil() as usize] as f64;
    lower + (upper - lower) * index.fract()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_run_metrics() {
        let collector = MetricsCollector::new();

        collector.run_started();
        collector.run_finished(RunOutcome::Routed, Duration::from_millis(1500));
        collector.run_started();
        collector.run_finished(RunOutcome::NoRoute, Duration::from_millis(10));

        let metrics = collector.get_metrics();
        assert_eq!(metrics.runs.received, 2);
        assert_eq!(metrics.runs.routed, 1);
        assert_eq!(metrics.runs.no_route, 1);
        assert_eq!(metrics.runs.in_flight, 0);
        assert!(metrics.runs.avg_duration_ms > 700.0);
    }

    #[test]
    fn test_llm_metrics() {
        let collector = MetricsCollector::new();
        collector.llm_request(true, 120);
        collector.llm_request(false, 0);

        let metrics = collector.get_metrics();
        assert_eq!(metrics.llm.requests, 2);
        assert_eq!(metrics.llm.failures, 1);
        assert_eq!(metrics.llm.total_tokens, 120);
    }

    #[test]
    fn test_tool_metrics() {
        let collector = MetricsCollector::new();

        collector.tool_executed("get_inventory", Duration::from_millis(500), true);
        collector.tool_executed("get_inventory", Duration::from_millis(300), false);

        let metrics = collector.get_metrics();
        let stats = metrics.tools.tool_stats.get("get_inventory").unwrap();

        assert_eq!(stats.executions, 2);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.success_rate, 0.5);
        assert!(stats.avg_execution_time_ms > 350.0);
        assert_eq!(metrics.tools.total_executions, 2);
    }

    #[test]
    fn test_thread_safety() {
        let collector = Arc::new(MetricsCollector::new());

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let collector = Arc::clone(&collector);
                thread::spawn(move || {
                    for _ in 0..100 {
                        collector.run_started();
                        collector.llm_request(true, 1);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let metrics = collector.get_metrics();
        assert_eq!(metrics.runs.received, 1000);
        assert_eq!(metrics.llm.total_tokens, 1000);
    }

    #[test]
    fn test_percentile_calculation() {
        let data = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10];

        assert!((percentile(&data, 50.0) - 5.5).abs() < 0.1);
        assert!((percentile(&data, 95.0) - 9.55).abs() < 0.1);
        assert!((percentile(&data, 0.0) - 1.0).abs() < 0.1);
        assert!((percentile(&data, 100.0) - 10.0).abs() < 0.1);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }

    #[test]
    fn test_reset_functionality() {
        let collector = MetricsCollector::new();

        collector.run_started();
        collector.tool_executed("get_customer_zone", Duration::from_millis(1), true);
        collector.reset();

        let metrics = collector.get_metrics();
        assert_eq!(metrics.runs.received, 0);
        assert!(metrics.tools.tool_stats.is_empty());
    }
}
