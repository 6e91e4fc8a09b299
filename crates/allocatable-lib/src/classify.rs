//! Threshold classification
//!
//! Clusters are labelled from their aggregate statistics, nodes from their
//! own utilization. Every label is computed on demand from immutable inputs.

use crate::error::AnalysisError;
use crate::models::{NodeRecord, Resource};
use crate::stats::ClusterStats;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Utilization thresholds in whole percent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Thresholds {
    pub memory: u64,
    pub cpu: u64,
}

impl Thresholds {
    /// Both values must lie in `[0, 100)`
    pub fn new(memory: u64, cpu: u64) -> Result<Self, AnalysisError> {
        for (resource, value) in [(Resource::Memory, memory), (Resource::Cpu, cpu)] {
            if value >= 100 {
                return Err(AnalysisError::InvalidThreshold { resource, value });
            }
        }
        Ok(Self { memory, cpu })
    }

    pub fn get(&self, resource: Resource) -> u64 {
        match resource {
            Resource::Cpu => self.cpu,
            Resource::Memory => self.memory,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterClass {
    Affected,
    Unknown,
    Unaffected,
}

impl ClusterClass {
    pub const ALL: [ClusterClass; 3] = [
        ClusterClass::Affected,
        ClusterClass::Unknown,
        ClusterClass::Unaffected,
    ];
}

impl fmt::Display for ClusterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterClass::Affected => f.write_str("affected"),
            ClusterClass::Unknown => f.write_str("unknown"),
            ClusterClass::Unaffected => f.write_str("unaffected"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeClass {
    Affected,
    Unaffected,
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeClass::Affected => f.write_str("affected"),
            NodeClass::Unaffected => f.write_str("unaffected"),
        }
    }
}

/// Percent pair of one node, with 0 standing in for a zero divisor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeUtilization {
    pub name: String,
    pub memory_percent: u64,
    pub cpu_percent: u64,
}

impl NodeUtilization {
    pub fn percent(&self, resource: Resource) -> u64 {
        match resource {
            Resource::Cpu => self.cpu_percent,
            Resource::Memory => self.memory_percent,
        }
    }
}

impl From<&NodeRecord> for NodeUtilization {
    fn from(node: &NodeRecord) -> Self {
        Self {
            name: node.name.clone(),
            memory_percent: node.memory_percent().unwrap_or(0),
            cpu_percent: node.cpu_percent().unwrap_or(0),
        }
    }
}

/// Affected if either mean exceeds its threshold, Unaffected if both maxima
/// are strictly below, Unknown otherwise
pub fn classify_cluster(stats: &ClusterStats, thresholds: Thresholds) -> ClusterClass {
    if stats.memory.mean_percent > thresholds.memory || stats.cpu.mean_percent > thresholds.cpu {
        ClusterClass::Affected
    } else if stats.memory.max_percent < thresholds.memory && stats.cpu.max_percent < thresholds.cpu
    {
        ClusterClass::Unaffected
    } else {
        ClusterClass::Unknown
    }
}

pub fn classify_node(node: &NodeUtilization, thresholds: Thresholds) -> NodeClass {
    if node.memory_percent >= thresholds.memory || node.cpu_percent >= thresholds.cpu {
        NodeClass::Affected
    } else {
        NodeClass::Unaffected
    }
}

/// Cluster-level overage is positive but still covered by the reservation on
/// at least one axis
pub fn is_overage_bounded(stats: &ClusterStats) -> bool {
    Resource::ALL.iter().any(|&resource| {
        let axis = stats.resource(resource);
        axis.cluster_overage > 0 && axis.cluster_overage < axis.reserved
    })
}

/// Class counts for one threshold pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub thresholds: Thresholds,
    pub clusters_affected: usize,
    pub clusters_unknown: usize,
    pub clusters_unaffected: usize,
    pub nodes_in_affected_clusters: usize,
    pub nodes_in_unknown_clusters: usize,
    pub nodes_in_unaffected_clusters: usize,
    pub nodes_affected: usize,
    pub nodes_unaffected: usize,
}

impl AggregateStats {
    pub fn clusters(&self, class: ClusterClass) -> usize {
        match class {
            ClusterClass::Affected => self.clusters_affected,
            ClusterClass::Unknown => self.clusters_unknown,
            ClusterClass::Unaffected => self.clusters_unaffected,
        }
    }

    pub fn nodes_in_clusters(&self, class: ClusterClass) -> usize {
        match class {
            ClusterClass::Affected => self.nodes_in_affected_clusters,
            ClusterClass::Unknown => self.nodes_in_unknown_clusters,
            ClusterClass::Unaffected => self.nodes_in_unaffected_clusters,
        }
    }

    pub fn nodes(&self, class: NodeClass) -> usize {
        match class {
            NodeClass::Affected => self.nodes_affected,
            NodeClass::Unaffected => self.nodes_unaffected,
        }
    }

    /// Mean node count of clusters in `class`, truncated; `None` without any
    pub fn average_cluster_size(&self, class: ClusterClass) -> Option<usize> {
        self.nodes_in_clusters(class).checked_div(self.clusters(class))
    }
}

pub fn aggregate_counts(
    clusters: &[ClusterStats],
    nodes: &[NodeUtilization],
    thresholds: Thresholds,
) -> AggregateStats {
    let mut counts = AggregateStats {
        thresholds,
        ..Default::default()
    };

    for stats in clusters {
        let (total, members) = match classify_cluster(stats, thresholds) {
            ClusterClass::Affected => (
                &mut counts.clusters_affected,
                &mut counts.nodes_in_affected_clusters,
            ),
            ClusterClass::Unknown => (
                &mut counts.clusters_unknown,
                &mut counts.nodes_in_unknown_clusters,
            ),
            ClusterClass::Unaffected => (
                &mut counts.clusters_unaffected,
                &mut counts.nodes_in_unaffected_clusters,
            ),
        };
        *total += 1;
        *members += stats.node_count;
    }

    for node in nodes {
        match classify_node(node, thresholds) {
            NodeClass::Affected => counts.nodes_affected += 1,
            NodeClass::Unaffected => counts.nodes_unaffected += 1,
        }
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::ResourceStats;
    use proptest::prelude::*;

    fn axis(max_percent: u64, mean_percent: u64) -> ResourceStats {
        ResourceStats {
            max_percent,
            mean_percent,
            ..Default::default()
        }
    }

    fn cluster(nodes: usize, mem: (u64, u64), cpu: (u64, u64)) -> ClusterStats {
        ClusterStats {
            identifier: None,
            node_count: nodes,
            memory: axis(mem.0, mem.1),
            cpu: axis(cpu.0, cpu.1),
        }
    }

    fn utilization(memory_percent: u64, cpu_percent: u64) -> NodeUtilization {
        NodeUtilization {
            name: "n".to_string(),
            memory_percent,
            cpu_percent,
        }
    }

    #[test]
    fn test_thresholds_validation() {
        assert!(Thresholds::new(0, 99).is_ok());
        assert!(matches!(
            Thresholds::new(100, 10),
            Err(AnalysisError::InvalidThreshold {
                resource: Resource::Memory,
                value: 100
            })
        ));
        assert!(matches!(
            Thresholds::new(10, 250),
            Err(AnalysisError::InvalidThreshold {
                resource: Resource::Cpu,
                ..
            })
        ));
    }

    #[test]
    fn test_classify_cluster_bands() {
        let t = Thresholds::new(50, 50).unwrap();
        // mean above threshold
        assert_eq!(classify_cluster(&cluster(3, (90, 51), (10, 5)), t), ClusterClass::Affected);
        // both maxima strictly below
        assert_eq!(classify_cluster(&cluster(3, (49, 30), (49, 30)), t), ClusterClass::Unaffected);
        // a max at the threshold is not below it
        assert_eq!(classify_cluster(&cluster(3, (50, 30), (10, 5)), t), ClusterClass::Unknown);
        // a mean at the threshold does not exceed it
        assert_eq!(classify_cluster(&cluster(3, (80, 50), (80, 50)), t), ClusterClass::Unknown);
    }

    #[test]
    fn test_zero_thresholds() {
        let t = Thresholds::default();
        assert_eq!(classify_cluster(&cluster(1, (0, 0), (0, 0)), t), ClusterClass::Unknown);
        assert_eq!(classify_cluster(&cluster(1, (5, 1), (0, 0)), t), ClusterClass::Affected);
        assert_eq!(classify_node(&utilization(0, 0), t), NodeClass::Affected);
    }

    #[test]
    fn test_classify_node_is_inclusive() {
        let t = Thresholds::new(60, 40).unwrap();
        assert_eq!(classify_node(&utilization(59, 39), t), NodeClass::Unaffected);
        assert_eq!(classify_node(&utilization(60, 0), t), NodeClass::Affected);
        assert_eq!(classify_node(&utilization(0, 40), t), NodeClass::Affected);
    }

    #[test]
    fn test_node_utilization_sentinel() {
        let node = NodeRecord {
            name: "z".to_string(),
            memory_allocatable: "0".parse().unwrap(),
            memory_requested: "1Gi".parse().unwrap(),
            cpu_allocatable: "2".parse().unwrap(),
            cpu_requested: "500m".parse().unwrap(),
        };
        let utilization = NodeUtilization::from(&node);
        assert_eq!(utilization.memory_percent, 0);
        assert_eq!(utilization.cpu_percent, 25);
        assert_eq!(utilization.percent(Resource::Cpu), 25);
    }

    #[test]
    fn test_overage_bounded() {
        let mut stats = cluster(2, (0, 0), (0, 0));
        assert!(!is_overage_bounded(&stats));

        stats.cpu.reserved = 100;
        stats.cpu.cluster_overage = 40;
        assert!(is_overage_bounded(&stats));

        stats.cpu.cluster_overage = 100;
        assert!(!is_overage_bounded(&stats));

        stats.memory.reserved = 1 << 30;
        stats.memory.cluster_overage = 1;
        assert!(is_overage_bounded(&stats));
    }

    #[test]
    fn test_aggregate_counts() {
        let clusters = vec![
            cluster(4, (90, 80), (10, 5)),
            cluster(2, (90, 80), (90, 70)),
            cluster(3, (30, 20), (30, 20)),
            cluster(5, (70, 40), (20, 10)),
        ];
        let nodes = vec![utilization(10, 10), utilization(80, 10), utilization(10, 45)];
        let counts = aggregate_counts(&clusters, &nodes, Thresholds::new(50, 40).unwrap());

        assert_eq!(counts.clusters_affected, 2);
        assert_eq!(counts.nodes_in_affected_clusters, 6);
        assert_eq!(counts.clusters_unknown, 1);
        assert_eq!(counts.nodes_in_unknown_clusters, 5);
        assert_eq!(counts.clusters_unaffected, 1);
        assert_eq!(counts.nodes_in_unaffected_clusters, 3);
        assert_eq!(counts.nodes_affected, 2);
        assert_eq!(counts.nodes_unaffected, 1);

        assert_eq!(counts.average_cluster_size(ClusterClass::Affected), Some(3));
        assert_eq!(counts.average_cluster_size(ClusterClass::Unknown), Some(5));
    }

    #[test]
    fn test_average_cluster_size_without_clusters() {
        let counts = aggregate_counts(&[], &[], Thresholds::default());
        assert_eq!(counts.average_cluster_size(ClusterClass::Affected), None);
        assert_eq!(counts.average_cluster_size(ClusterClass::Unknown), None);
    }

    proptest! {
        #[test]
        fn classification_is_total_and_exclusive(
            mem_max in 0u64..200, mem_mean in 0u64..200,
            cpu_max in 0u64..200, cpu_mean in 0u64..200,
            mem_t in 0u64..100, cpu_t in 0u64..100,
        ) {
            let stats = cluster(1, (mem_max, mem_mean), (cpu_max, cpu_mean));
            let t = Thresholds::new(mem_t, cpu_t).unwrap();
            let counts = aggregate_counts(std::slice::from_ref(&stats), &[], t);
            let labelled: usize = ClusterClass::ALL.iter().map(|&c| counts.clusters(c)).sum();
            prop_assert_eq!(labelled, 1);
            prop_assert_eq!(counts.clusters(classify_cluster(&stats, t)), 1);
        }
    }
}
