//! Report column sets
//!
//! Rows are plain string records so any sink (CSV writer, terminal table,
//! JSON) can consume them without knowing the statistics types.

use crate::classify::{AggregateStats, ClusterClass, NodeClass};
use crate::stats::ClusterStats;

/// Header of the per-cluster statistics table
pub const CLUSTER_HEADER: [&str; 10] = [
    "Nodes",
    "CPU Capacity",
    "Memory Capacity",
    "CPU Reserved",
    "Memory Reserved",
    "Node CPU Overage",
    "Node Memory Overage",
    "Cluster CPU Overage",
    "Cluster Memory Overage",
    "Identifier",
];

/// One per-cluster row in [`CLUSTER_HEADER`] order; CPU in millicores, memory in bytes
pub fn cluster_row(stats: &ClusterStats) -> Vec<String> {
    vec![
        stats.node_count.to_string(),
        stats.cpu.allocatable.to_string(),
        stats.memory.allocatable.to_string(),
        stats.cpu.reserved.to_string(),
        stats.memory.reserved.to_string(),
        stats.cpu.per_node_overage.to_string(),
        stats.memory.per_node_overage.to_string(),
        stats.cpu.cluster_overage.to_string(),
        stats.memory.cluster_overage.to_string(),
        stats.identifier.clone().unwrap_or_default(),
    ]
}

/// The four tables written by a threshold sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistributionTable {
    /// Cluster counts per class
    Clusters,
    /// Node counts summed over the clusters of each class
    ClusterNodes,
    /// Nodes affected and unaffected on their own
    Nodes,
    /// Average nodes per affected and per unknown cluster
    ClusterSize,
}

impl DistributionTable {
    pub const ALL: [DistributionTable; 4] = [
        DistributionTable::Clusters,
        DistributionTable::ClusterNodes,
        DistributionTable::Nodes,
        DistributionTable::ClusterSize,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            DistributionTable::Clusters => "clusterStats.csv",
            DistributionTable::ClusterNodes => "clusterNodeStats.csv",
            DistributionTable::Nodes => "nodeStats.csv",
            DistributionTable::ClusterSize => "clusterSizeStats.csv",
        }
    }

    pub fn header(&self) -> &'static [&'static str] {
        match self {
            DistributionTable::Clusters => &[
                "CPU Threshold",
                "Memory Threshold",
                "Clusters Affected",
                "Clusters Unknown",
                "Clusters Unaffected",
            ],
            DistributionTable::ClusterNodes => &[
                "CPU Threshold",
                "Memory Threshold",
                "Nodes In Affected Clusters",
                "Nodes In Unknown Clusters",
                "Nodes In Unaffected Clusters",
            ],
            DistributionTable::Nodes => &[
                "CPU Threshold",
                "Memory Threshold",
                "Nodes Affected",
                "Nodes Unaffected",
            ],
            DistributionTable::ClusterSize => &[
                "CPU Threshold",
                "Memory Threshold",
                "Avg Affected Cluster Size",
                "Avg Unknown Cluster Size",
            ],
        }
    }

    /// Row for one sweep step; undefined averages are left empty
    pub fn row(&self, stats: &AggregateStats) -> Vec<String> {
        let mut row = vec![
            stats.thresholds.cpu.to_string(),
            stats.thresholds.memory.to_string(),
        ];
        match self {
            DistributionTable::Clusters => {
                row.extend(ClusterClass::ALL.iter().map(|&c| stats.clusters(c).to_string()));
            }
            DistributionTable::ClusterNodes => {
                row.extend(
                    ClusterClass::ALL
                        .iter()
                        .map(|&c| stats.nodes_in_clusters(c).to_string()),
                );
            }
            DistributionTable::Nodes => {
                row.push(stats.nodes(NodeClass::Affected).to_string());
                row.push(stats.nodes(NodeClass::Unaffected).to_string());
            }
            DistributionTable::ClusterSize => {
                for class in [ClusterClass::Affected, ClusterClass::Unknown] {
                    row.push(
                        stats
                            .average_cluster_size(class)
                            .map(|size| size.to_string())
                            .unwrap_or_default(),
                    );
                }
            }
        }
        row
    }
}
