//! Observability infrastructure for the analysis engine
//!
//! Provides:
//! - Prometheus metrics (chunks and nodes parsed or skipped, zero-allocatable
//!   occurrences, sweep latency)
//! - Structured logging with tracing

use crate::analyzer::Diagnostics;
use crate::error::AnalysisError;
use crate::models::Resource;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for sweep latency (in seconds)
const SWEEP_LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Global metrics instance (registered once); `None` if registration failed
static GLOBAL_METRICS: OnceLock<Option<AnalysisMetricsInner>> = OnceLock::new();

struct AnalysisMetricsInner {
    chunks_parsed: IntCounter,
    chunks_skipped: IntCounter,
    nodes_parsed: IntCounter,
    nodes_dropped: IntCounter,
    zero_allocatable: IntCounterVec,
    sweep_latency_seconds: Histogram,
}

impl AnalysisMetricsInner {
    fn new() -> prometheus::Result<Self> {
        Ok(Self {
            chunks_parsed: register_int_counter!(
                "allocatable_chunks_parsed_total",
                "Log chunks that yielded at least one node"
            )?,
            chunks_skipped: register_int_counter!(
                "allocatable_chunks_skipped_total",
                "Log lines that did not match the chunk grammar"
            )?,
            nodes_parsed: register_int_counter!(
                "allocatable_nodes_parsed_total",
                "Node records parsed from chunks"
            )?,
            nodes_dropped: register_int_counter!(
                "allocatable_nodes_dropped_total",
                "Node sub-lines skipped for a malformed line or quantity"
            )?,
            zero_allocatable: register_int_counter_vec!(
                "allocatable_zero_allocatable_total",
                "Nodes reporting zero allocatable, by resource",
                &["resource"]
            )?,
            sweep_latency_seconds: register_histogram!(
                "allocatable_sweep_latency_seconds",
                "Time spent on one full threshold sweep",
                SWEEP_LATENCY_BUCKETS.to_vec()
            )?,
        })
    }
}

/// Analysis metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the same
/// counters. If registration fails the handle records nothing.
#[derive(Clone)]
pub struct AnalysisMetrics {
    _private: (),
}

impl Default for AnalysisMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(|| match AnalysisMetricsInner::new() {
            Ok(inner) => Some(inner),
            Err(e) => {
                warn!(error = %e, "Failed to register analysis metrics, metrics disabled");
                None
            }
        });
        Self { _private: () }
    }

    fn inner(&self) -> Option<&AnalysisMetricsInner> {
        GLOBAL_METRICS.get().and_then(Option::as_ref)
    }

    pub fn inc_chunks_parsed(&self) {
        if let Some(inner) = self.inner() {
            inner.chunks_parsed.inc();
        }
    }

    pub fn inc_chunks_skipped(&self) {
        if let Some(inner) = self.inner() {
            inner.chunks_skipped.inc();
        }
    }

    pub fn add_nodes_parsed(&self, count: usize) {
        if let Some(inner) = self.inner() {
            inner.nodes_parsed.inc_by(count as u64);
        }
    }

    pub fn inc_nodes_dropped(&self) {
        if let Some(inner) = self.inner() {
            inner.nodes_dropped.inc();
        }
    }

    pub fn inc_zero_allocatable(&self, resource: Resource) {
        if let Some(inner) = self.inner() {
            let label = resource.to_string();
            inner
                .zero_allocatable
                .with_label_values(&[label.as_str()])
                .inc();
        }
    }

    /// Record a sweep latency observation
    pub fn observe_sweep_latency(&self, duration_secs: f64) {
        if let Some(inner) = self.inner() {
            inner.sweep_latency_seconds.observe(duration_secs);
        }
    }

    /// Render every registered metric in the Prometheus text format
    pub fn encode_text(&self) -> prometheus::Result<String> {
        let families = prometheus::gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Structured logger for analysis events
///
/// Every event carries an `event` field and the name of the input being
/// analyzed.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    source: String,
}

impl StructuredLogger {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Log a line that did not match the chunk grammar
    pub fn log_chunk_skipped(&self, line_number: u64, error: &AnalysisError) {
        debug!(
            event = "chunk_skipped",
            source = %self.source,
            line_number = line_number,
            error = %error,
            "Skipped log line"
        );
    }

    /// Log a node sub-line that was dropped from its chunk
    pub fn log_node_dropped(
        &self,
        line_number: u64,
        cluster: Option<&str>,
        index: usize,
        error: &AnalysisError,
    ) {
        warn!(
            event = "node_dropped",
            source = %self.source,
            line_number = line_number,
            cluster = cluster.unwrap_or(""),
            index = index,
            error = %error,
            "Dropped node record"
        );
    }

    /// Log a node whose allocatable is zero on one axis
    pub fn log_zero_allocatable(&self, cluster: Option<&str>, node: &str, resource: Resource) {
        debug!(
            event = "zero_allocatable",
            source = %self.source,
            cluster = cluster.unwrap_or(""),
            node = %node,
            resource = %resource,
            "Node reports zero allocatable, utilization counted as 0%"
        );
    }

    /// Log the end of an ingest run
    pub fn log_analysis_complete(&self, clusters: usize, diagnostics: &Diagnostics) {
        info!(
            event = "analysis_complete",
            source = %self.source,
            clusters = clusters,
            lines_read = diagnostics.lines_read,
            chunks_parsed = diagnostics.chunks_parsed,
            chunks_skipped = diagnostics.chunks_skipped,
            empty_chunks = diagnostics.empty_chunks,
            malformed_node_lines = diagnostics.malformed_node_lines,
            dropped_nodes = diagnostics.dropped_nodes,
            zero_allocatable = diagnostics.zero_allocatable,
            "Analysis complete"
        );
    }

    /// Log the end of a threshold sweep
    pub fn log_sweep_complete(&self, axis: &str, rows: usize, parallel: bool, duration_secs: f64) {
        info!(
            event = "sweep_complete",
            source = %self.source,
            axis = %axis,
            rows = rows,
            parallel = parallel,
            duration_secs = duration_secs,
            "Threshold sweep complete"
        );
    }
}
