//! Batch analysis driver
//!
//! Feeds log lines through the parser and the statistics aggregator one chunk
//! at a time, collecting per-cluster results and diagnostic counters into an
//! [`AnalysisReport`]. Chunks are independent: a bad line or node only affects
//! itself. Only a failure of the input source (I/O error, oversized line)
//! stops the run, and results gathered so far stay in the report.

use crate::classify::{
    aggregate_counts, is_overage_bounded, AggregateStats, NodeUtilization, Thresholds,
};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::models::{ClusterRecord, Resource};
use crate::observability::{AnalysisMetrics, StructuredLogger};
use crate::parser::parse_chunk;
use crate::stats::{ClusterStats, StatsAggregator};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Read};

/// Counters describing what happened to the input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub lines_read: u64,
    /// Chunks that produced at least one node
    pub chunks_parsed: u64,
    /// Lines not matching the chunk grammar
    pub chunks_skipped: u64,
    /// Chunks that matched but held no valid node
    pub empty_chunks: u64,
    pub malformed_node_lines: u64,
    /// Nodes dropped because a quantity did not parse
    pub dropped_nodes: u64,
    /// Node/axis pairs with zero allocatable
    pub zero_allocatable: u64,
}

/// One parsed chunk and its statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAnalysis {
    pub record: ClusterRecord,
    pub stats: ClusterStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub clusters: Vec<ClusterAnalysis>,
    pub diagnostics: Diagnostics,
}

impl AnalysisReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> Vec<ClusterStats> {
        self.clusters.iter().map(|c| c.stats.clone()).collect()
    }

    /// Percent pairs of every node across all clusters, in log order
    pub fn node_utilizations(&self) -> Vec<NodeUtilization> {
        self.clusters
            .iter()
            .flat_map(|c| c.record.nodes.iter().map(NodeUtilization::from))
            .collect()
    }

    /// Clusters whose overage is still covered by their reservation
    pub fn overage_bounded(&self) -> impl Iterator<Item = &ClusterAnalysis> {
        self.clusters.iter().filter(|c| is_overage_bounded(&c.stats))
    }

    pub fn node_count(&self) -> usize {
        self.clusters.iter().map(|c| c.record.len()).sum()
    }

    /// Class counts for a single threshold pair
    pub fn aggregate(&self, thresholds: Thresholds) -> AggregateStats {
        aggregate_counts(&self.stats(), &self.node_utilizations(), thresholds)
    }
}

pub struct Analyzer {
    config: AnalysisConfig,
    aggregator: StatsAggregator,
    metrics: AnalysisMetrics,
    logger: StructuredLogger,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        let aggregator = StatsAggregator::new(config.policies());
        Self {
            config,
            aggregator,
            metrics: AnalysisMetrics::new(),
            logger: StructuredLogger::new("input"),
        }
    }

    /// Name the input in log events
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.logger = StructuredLogger::new(source);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn aggregator(&self) -> &StatsAggregator {
        &self.aggregator
    }

    /// Process one log line; never fails
    pub fn ingest_line(&self, report: &mut AnalysisReport, line: &str) {
        let diagnostics = &mut report.diagnostics;
        diagnostics.lines_read += 1;
        let line_number = diagnostics.lines_read;

        let parsed = match parse_chunk(line) {
            Ok(parsed) => parsed,
            Err(error) => {
                diagnostics.chunks_skipped += 1;
                self.metrics.inc_chunks_skipped();
                self.logger.log_chunk_skipped(line_number, &error);
                return;
            }
        };

        let cluster = parsed.cluster;
        for skipped in &parsed.skipped {
            if matches!(skipped.error, AnalysisError::MalformedQuantity { .. }) {
                diagnostics.dropped_nodes += 1;
            } else {
                diagnostics.malformed_node_lines += 1;
            }
            self.metrics.inc_nodes_dropped();
            self.logger.log_node_dropped(
                line_number,
                cluster.identifier.as_deref(),
                skipped.index,
                &skipped.error,
            );
        }

        if cluster.is_empty() {
            diagnostics.empty_chunks += 1;
            return;
        }

        for node in &cluster.nodes {
            for resource in Resource::ALL {
                if node.allocatable(resource) == 0 {
                    diagnostics.zero_allocatable += 1;
                    self.metrics.inc_zero_allocatable(resource);
                    self.logger.log_zero_allocatable(
                        cluster.identifier.as_deref(),
                        &node.name,
                        resource,
                    );
                }
            }
        }

        diagnostics.chunks_parsed += 1;
        self.metrics.inc_chunks_parsed();
        self.metrics.add_nodes_parsed(cluster.len());

        let stats = self.aggregator.aggregate(&cluster);
        report.clusters.push(ClusterAnalysis {
            record: cluster,
            stats,
        });
    }

    /// Process every line of `reader`
    ///
    /// Lines end at `\n` with an optional preceding `\r`; invalid UTF-8 is
    /// replaced. A line longer than `max_line_bytes` or a read error stops
    /// the run.
    pub fn ingest_reader<R: BufRead>(
        &self,
        report: &mut AnalysisReport,
        mut reader: R,
    ) -> Result<(), AnalysisError> {
        let limit = self.config.max_line_bytes;
        // two extra bytes leave room for a "\r\n" after a line of exactly `limit`
        let read_cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(2);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let read = (&mut reader).take(read_cap).read_until(b'\n', &mut buf)?;
            if read == 0 {
                break;
            }

            if buf.last() == Some(&b'\n') {
                buf.pop();
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
            }
            if buf.len() > limit {
                return Err(AnalysisError::LineTooLong {
                    line_number: report.diagnostics.lines_read + 1,
                    limit,
                });
            }

            self.ingest_line(report, &String::from_utf8_lossy(&buf));
        }

        self.logger.log_analysis_complete(report.clusters.len(), &report.diagnostics);
        Ok(())
    }

    /// Convenience wrapper returning a fresh report
    pub fn analyze_reader<R: BufRead>(&self, reader: R) -> Result<AnalysisReport, AnalysisError> {
        let mut report = AnalysisReport::new();
        self.ingest_reader(&mut report, reader)?;
        Ok(report)
    }
}
