//! Node allocatable analysis library
//!
//! This crate provides the core functionality for:
//! - Parsing node utilization snapshots out of captured log text
//! - Computing system reservations from node capacity
//! - Aggregating per-cluster statistics and overage
//! - Classifying clusters and nodes against utilization thresholds
//! - Threshold sweeps and report column sets
//! - Observability (metrics and structured logging)

pub mod analyzer;
pub mod classify;
pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod parser;
pub mod quantity;
pub mod report;
pub mod reservation;
pub mod stats;
pub mod sweep;

pub use analyzer::{AnalysisReport, Analyzer, ClusterAnalysis, Diagnostics};
pub use classify::{
    aggregate_counts, classify_cluster, classify_node, is_overage_bounded, AggregateStats,
    ClusterClass, NodeClass, NodeUtilization, Thresholds,
};
pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use models::*;
pub use observability::{AnalysisMetrics, StructuredLogger};
pub use quantity::{Quantity, QuantityFormat};
pub use reservation::{PolicyKind, ReservationPolicies, ReservationPolicy};
pub use stats::{ClusterStats, ResourceStats, StatsAggregator};
pub use sweep::{sweep, sweep_parallel, SweepAxis, SweepPlan};
