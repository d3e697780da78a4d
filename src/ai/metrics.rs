//! Model Call Metrics
//!
//! Aggregates model usage per run and per graph node. Shared between the
//! client and the driver through [`SharedMetrics`].
//!
//! ## Usage
//!
//! ```ignore
//! let metrics = create_shared_metrics("sales_report_country_spain");
//! metrics.record_response("research.update_progress_ledger", &response);
//! println!("{}", metrics.summary().display());
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::ai::provider::LlmResponse;

// =============================================================================
// Metrics Collector
// =============================================================================

/// Thread-safe metrics collector.
///
/// Totals are atomics; the per-node table sits behind a RwLock.
pub struct MetricsCollector {
    session_id: String,
    start_time: Instant,
    api_calls: AtomicU32,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    total_latency_ms: AtomicU64,
    nodes: RwLock<BTreeMap<String, NodeMetrics>>,
}

/// Usage attributed to one graph node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeMetrics {
    pub calls: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub latency_ms: u64,
}

/// Summary statistics for a run
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub session_id: String,
    pub total_duration_ms: u64,
    pub api_calls: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub avg_latency_ms: f64,
    pub nodes: BTreeMap<String, NodeMetrics>,
}

impl MetricsCollector {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            start_time: Instant::now(),
            api_calls: AtomicU32::new(0),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            nodes: RwLock::new(BTreeMap::new()),
        }
    }

    /// Record one model response under `node`
    pub fn record_response(&self, node: &str, response: &LlmResponse) {
        let input = response.usage.input_tokens as u64;
        let output = response.usage.output_tokens as u64;
        let latency = response.timing.total_ms;

        self.api_calls.fetch_add(1, Ordering::Relaxed);
        self.input_tokens.fetch_add(input, Ordering::Relaxed);
        self.output_tokens.fetch_add(output, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency, Ordering::Relaxed);

        let mut nodes = self.nodes.write().unwrap_or_else(|poisoned| {
            tracing::error!("Metrics node table RwLock poisoned, recovering");
            poisoned.into_inner()
        });
        let entry = nodes.entry(node.to_string()).or_default();
        entry.calls += 1;
        entry.input_tokens += input;
        entry.output_tokens += output;
        entry.latency_ms += latency;
    }

    /// Current metrics snapshot
    pub fn summary(&self) -> MetricsSummary {
        let api_calls = self.api_calls.load(Ordering::Relaxed);
        let input_tokens = self.input_tokens.load(Ordering::Relaxed);
        let output_tokens = self.output_tokens.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);

        let avg_latency_ms = if api_calls > 0 {
            total_latency as f64 / api_calls as f64
        } else {
            0.0
        };

        let nodes = self
            .nodes
            .read()
            .unwrap_or_else(|poisoned| {
                tracing::error!("Metrics node table RwLock poisoned on read, recovering");
                poisoned.into_inner()
            })
            .clone();

        MetricsSummary {
            session_id: self.session_id.clone(),
            total_duration_ms: self.start_time.elapsed().as_millis() as u64,
            api_calls,
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            avg_latency_ms,
            nodes,
        }
    }
}

impl MetricsSummary {
    /// Format summary for display
    pub fn display(&self) -> String {
        let mut out = format!(
            "Session: {}\n\
             Duration: {:.1}s\n\
             API Calls: {}\n\
             Tokens: {} (input: {}, output: {})\n\
             Avg Latency: {:.0}ms",
            self.session_id,
            self.total_duration_ms as f64 / 1000.0,
            self.api_calls,
            self.total_tokens,
            self.input_tokens,
            self.output_tokens,
            self.avg_latency_ms,
        );
        for (node, m) in &self.nodes {
            out.push_str(&format!(
                "\n  {:<40} {:>3} calls {:>8} tokens",
                node,
                m.calls,
                m.input_tokens + m.output_tokens
            ));
        }
        out
    }
}

// =============================================================================
// Shared Type
// =============================================================================

/// Shared metrics collector
pub type SharedMetrics = Arc<MetricsCollector>;

pub fn create_shared_metrics(session_id: impl Into<String>) -> SharedMetrics {
    Arc::new(MetricsCollector::new(session_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::{ResponseMetadata, ResponseTiming, TokenUsage};

    fn response(input: u32, output: u32, ms: u64) -> LlmResponse {
        LlmResponse::with_metrics(
            serde_json::Value::Null,
            TokenUsage {
                input_tokens: input,
                output_tokens: output,
            },
            ResponseTiming { total_ms: ms },
            ResponseMetadata::default(),
        )
    }

    #[test]
    fn test_record_per_node() {
        let metrics = MetricsCollector::new("test-session");
        metrics.record_response("research.summarize_findings", &response(100, 50, 500));
        metrics.record_response("editor.supervisor", &response(10, 5, 100));
        metrics.record_response("editor.supervisor", &response(10, 5, 300));

        let summary = metrics.summary();
        assert_eq!(summary.api_calls, 3);
        assert_eq!(summary.total_tokens, 180);
        assert_eq!(summary.avg_latency_ms, 300.0);

        let supervisor = &summary.nodes["editor.supervisor"];
        assert_eq!(supervisor.calls, 2);
        assert_eq!(supervisor.input_tokens, 20);
    }

    #[test]
    fn test_concurrent_recording() {
        use std::thread;

        let metrics = Arc::new(MetricsCollector::new("concurrent-test"));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..100 {
                        m.record_response("node", &response(10, 5, 50));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let summary = metrics.summary();
        assert_eq!(summary.api_calls, 1000);
        assert_eq!(summary.input_tokens, 10000);
        assert_eq!(summary.nodes["node"].calls, 1000);
    }

    #[test]
    fn test_summary_display() {
        let metrics = MetricsCollector::new("display-test");
        metrics.record_response("pipeline.generate_report", &response(1000, 500, 1000));

        let display = metrics.summary().display();
        assert!(display.contains("display-test"));
        assert!(display.contains("1500"));
        assert!(display.contains("pipeline.generate_report"));
    }
}
