//! Threshold sweep
//!
//! Evaluates [`aggregate_counts`] for a series of threshold pairs, either on
//! the calling thread or fanned out over tokio's blocking pool. Both paths
//! return rows in threshold order and produce identical results.

use crate::classify::{aggregate_counts, AggregateStats, NodeUtilization, Thresholds};
use crate::error::AnalysisError;
use crate::models::Resource;
use crate::observability::AnalysisMetrics;
use crate::stats::ClusterStats;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// Which threshold moves during a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepAxis {
    /// CPU threshold moves, memory stays at the fixed value
    #[default]
    Cpu,
    /// Memory threshold moves, CPU stays at the fixed value
    Memory,
    /// Both thresholds move together
    Both,
}

impl fmt::Display for SweepAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepAxis::Cpu => f.write_str("cpu"),
            SweepAxis::Memory => f.write_str("memory"),
            SweepAxis::Both => f.write_str("both"),
        }
    }
}

/// Threshold pairs to evaluate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPlan {
    axis: SweepAxis,
    fixed: u64,
    range: Range<u64>,
}

impl Default for SweepPlan {
    /// CPU threshold 0..100 with memory fixed at 0
    fn default() -> Self {
        Self {
            axis: SweepAxis::Cpu,
            fixed: 0,
            range: 0..100,
        }
    }
}

impl SweepPlan {
    /// Sweep `axis` over every threshold in `[0, 100)`
    pub fn new(axis: SweepAxis, fixed: u64) -> Result<Self, AnalysisError> {
        Self::with_range(axis, fixed, 0..100)
    }

    pub fn with_range(
        axis: SweepAxis,
        fixed: u64,
        range: Range<u64>,
    ) -> Result<Self, AnalysisError> {
        let fixed_resource = match axis {
            SweepAxis::Memory => Resource::Cpu,
            SweepAxis::Cpu | SweepAxis::Both => Resource::Memory,
        };
        if fixed >= 100 {
            return Err(AnalysisError::InvalidThreshold {
                resource: fixed_resource,
                value: fixed,
            });
        }
        if range.end > 100 {
            let resource = match axis {
                SweepAxis::Memory => Resource::Memory,
                SweepAxis::Cpu | SweepAxis::Both => Resource::Cpu,
            };
            return Err(AnalysisError::InvalidThreshold {
                resource,
                value: range.end - 1,
            });
        }
        Ok(Self { axis, fixed, range })
    }

    pub fn axis(&self) -> SweepAxis {
        self.axis
    }

    pub fn fixed(&self) -> u64 {
        self.fixed
    }

    /// Threshold pairs in sweep order
    pub fn thresholds(&self) -> Vec<Thresholds> {
        self.range
            .clone()
            .map(|t| match self.axis {
                SweepAxis::Cpu => Thresholds {
                    memory: self.fixed,
                    cpu: t,
                },
                SweepAxis::Memory => Thresholds {
                    memory: t,
                    cpu: self.fixed,
                },
                SweepAxis::Both => Thresholds { memory: t, cpu: t },
            })
            .collect()
    }
}

/// Sequential sweep on the calling thread
pub fn sweep(
    clusters: &[ClusterStats],
    nodes: &[NodeUtilization],
    plan: &SweepPlan,
) -> Vec<AggregateStats> {
    let start = Instant::now();
    let rows = plan
        .thresholds()
        .into_iter()
        .map(|thresholds| aggregate_counts(clusters, nodes, thresholds))
        .collect();
    AnalysisMetrics::new().observe_sweep_latency(start.elapsed().as_secs_f64());
    rows
}

/// Parallel sweep: one blocking task per threshold pair over shared,
/// read-only inputs
pub async fn sweep_parallel(
    clusters: Arc<[ClusterStats]>,
    nodes: Arc<[NodeUtilization]>,
    plan: SweepPlan,
) -> Result<Vec<AggregateStats>, AnalysisError> {
    let start = Instant::now();
    let pairs = plan.thresholds();
    let mut join_set = JoinSet::new();

    for (index, thresholds) in pairs.iter().copied().enumerate() {
        let clusters = Arc::clone(&clusters);
        let nodes = Arc::clone(&nodes);
        join_set.spawn_blocking(move || (index, aggregate_counts(&clusters, &nodes, thresholds)));
    }

    let mut slots: Vec<Option<AggregateStats>> = vec![None; pairs.len()];
    while let Some(joined) = join_set.join_next().await {
        let (index, row) = joined.map_err(|e| AnalysisError::Sweep(e.to_string()))?;
        slots[index] = Some(row);
    }

    let rows = slots
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| AnalysisError::Sweep("a threshold pair produced no result".to_string()))?;

    AnalysisMetrics::new().observe_sweep_latency(start.elapsed().as_secs_f64());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::ResourceStats;

    fn axis(max_percent: u64, mean_percent: u64) -> ResourceStats {
        ResourceStats {
            max_percent,
            mean_percent,
            ..Default::default()
        }
    }

    fn fixture() -> (Vec<ClusterStats>, Vec<NodeUtilization>) {
        let clusters = (0..12u64)
            .map(|i| ClusterStats {
                identifier: Some(format!("c{i}")),
                node_count: (i as usize % 4) + 1,
                memory: axis(i * 8, i * 5),
                cpu: axis(95 - i * 7, 60 - i * 4),
            })
            .collect();
        let nodes = (0..30u64)
            .map(|i| NodeUtilization {
                name: format!("n{i}"),
                memory_percent: (i * 13) % 100,
                cpu_percent: (i * 29) % 110,
            })
            .collect();
        (clusters, nodes)
    }

    #[test]
    fn test_default_plan_sweeps_cpu() {
        let pairs = SweepPlan::default().thresholds();
        assert_eq!(pairs.len(), 100);
        assert_eq!(pairs[0], Thresholds { memory: 0, cpu: 0 });
        assert_eq!(pairs[99], Thresholds { memory: 0, cpu: 99 });
    }

    #[test]
    fn test_plan_axes() {
        let memory = SweepPlan::new(SweepAxis::Memory, 30).unwrap().thresholds();
        assert_eq!(memory[5], Thresholds { memory: 5, cpu: 30 });

        let both = SweepPlan::with_range(SweepAxis::Both, 0, 10..20).unwrap().thresholds();
        assert_eq!(both.len(), 10);
        assert_eq!(both[0], Thresholds { memory: 10, cpu: 10 });
    }

    #[test]
    fn test_plan_rejects_out_of_range() {
        assert!(matches!(
            SweepPlan::new(SweepAxis::Cpu, 100),
            Err(AnalysisError::InvalidThreshold {
                resource: Resource::Memory,
                value: 100
            })
        ));
        assert!(SweepPlan::with_range(SweepAxis::Cpu, 0, 0..101).is_err());
    }

    #[test]
    fn test_sequential_rows_follow_plan() {
        let (clusters, nodes) = fixture();
        let plan = SweepPlan::default();
        let rows = sweep(&clusters, &nodes, &plan);

        assert_eq!(rows.len(), 100);
        for (row, thresholds) in rows.iter().zip(plan.thresholds()) {
            assert_eq!(row.thresholds, thresholds);
            assert_eq!(
                row.clusters_affected + row.clusters_unknown + row.clusters_unaffected,
                clusters.len()
            );
            assert_eq!(row.nodes_affected + row.nodes_unaffected, nodes.len());
        }
    }

    #[tokio::test]
    async fn test_parallel_matches_sequential() {
        let (clusters, nodes) = fixture();
        for plan in [
            SweepPlan::default(),
            SweepPlan::new(SweepAxis::Memory, 40).unwrap(),
            SweepPlan::new(SweepAxis::Both, 0).unwrap(),
        ] {
            let expected = sweep(&clusters, &nodes, &plan);
            let actual = sweep_parallel(
                Arc::from(clusters.clone()),
                Arc::from(nodes.clone()),
                plan,
            )
            .await
            .unwrap();
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn test_parallel_on_empty_inputs() {
        let clusters: Arc<[ClusterStats]> = Arc::from(Vec::new());
        let nodes: Arc<[NodeUtilization]> = Arc::from(Vec::new());
        let rows = tokio_test::block_on(sweep_parallel(clusters, nodes, SweepPlan::default()))
            .unwrap();
        assert_eq!(rows.len(), 100);
        assert!(rows.iter().all(|row| *row == AggregateStats {
            thresholds: row.thresholds,
            ..Default::default()
        }));
    }
}
