//! Per-cluster statistics
//!
//! Folds a cluster's node records into a [`ClusterStats`] snapshot: totals of
//! allocatable, requested and reserved capacity, overage measured per node and
//! across the whole cluster, and max/mean utilization.

use crate::models::{utilization_percent, ClusterRecord, NodeRecord, Resource};
use crate::reservation::ReservationPolicies;
use serde::{Deserialize, Serialize};

/// Figures for one resource axis of a cluster
///
/// Amounts are millicores for CPU and bytes for memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStats {
    pub allocatable: u64,
    pub requested: u64,
    pub reserved: u64,
    /// Sum over nodes of `max(0, requested + reserved - allocatable)`
    pub per_node_overage: u64,
    /// `max(0, total requested + total reserved - total allocatable)`
    pub cluster_overage: u64,
    pub max_percent: u64,
    /// `floor(100 * total requested / total allocatable)`, 0 when nothing is allocatable
    pub mean_percent: u64,
    /// Nodes whose allocatable on this axis was zero (their percent counts as 0)
    pub zero_allocatable_nodes: usize,
}

/// Immutable summary of one cluster chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStats {
    pub identifier: Option<String>,
    pub node_count: usize,
    pub cpu: ResourceStats,
    pub memory: ResourceStats,
}

impl ClusterStats {
    pub fn resource(&self, resource: Resource) -> &ResourceStats {
        match resource {
            Resource::Cpu => &self.cpu,
            Resource::Memory => &self.memory,
        }
    }

    /// True if any node had zero allocatable on either axis
    pub fn has_zero_allocatable(&self) -> bool {
        self.cpu.zero_allocatable_nodes > 0 || self.memory.zero_allocatable_nodes > 0
    }
}

#[derive(Debug, Default)]
struct ResourceAccumulator {
    allocatable: u64,
    requested: u64,
    reserved: u64,
    per_node_overage: u64,
    max_percent: u64,
    zero_allocatable_nodes: usize,
}

impl ResourceAccumulator {
    fn add_node(&mut self, allocatable: u64, requested: u64, reserved: u64) {
        self.allocatable = self.allocatable.saturating_add(allocatable);
        self.requested = self.requested.saturating_add(requested);
        self.reserved = self.reserved.saturating_add(reserved);

        let overage = requested.saturating_add(reserved).saturating_sub(allocatable);
        self.per_node_overage = self.per_node_overage.saturating_add(overage);

        match utilization_percent(requested, allocatable) {
            Some(percent) => self.max_percent = self.max_percent.max(percent),
            None => self.zero_allocatable_nodes += 1,
        }
    }

    fn finish(self) -> ResourceStats {
        let cluster_overage = self
            .requested
            .saturating_add(self.reserved)
            .saturating_sub(self.allocatable);
        ResourceStats {
            allocatable: self.allocatable,
            requested: self.requested,
            reserved: self.reserved,
            per_node_overage: self.per_node_overage,
            cluster_overage,
            max_percent: self.max_percent,
            mean_percent: utilization_percent(self.requested, self.allocatable).unwrap_or(0),
            zero_allocatable_nodes: self.zero_allocatable_nodes,
        }
    }
}

/// Computes [`ClusterStats`] using a pair of reservation policies
#[derive(Debug, Clone, Default)]
pub struct StatsAggregator {
    policies: ReservationPolicies,
}

impl StatsAggregator {
    pub fn new(policies: ReservationPolicies) -> Self {
        Self { policies }
    }

    pub fn policies(&self) -> &ReservationPolicies {
        &self.policies
    }

    /// Reservation for a single node on one axis
    pub fn node_reserved(&self, node: &NodeRecord, resource: Resource) -> u64 {
        self.policies.reserved(resource, node.allocatable(resource))
    }

    /// Summarize a cluster; never fails, zero allocatable is counted instead
    pub fn aggregate(&self, cluster: &ClusterRecord) -> ClusterStats {
        let mut cpu = ResourceAccumulator::default();
        let mut memory = ResourceAccumulator::default();

        for node in &cluster.nodes {
            for (resource, acc) in [(Resource::Cpu, &mut cpu), (Resource::Memory, &mut memory)] {
                let allocatable = node.allocatable(resource);
                let reserved = self.policies.reserved(resource, allocatable);
                acc.add_node(allocatable, node.requested(resource), reserved);
            }
        }

        ClusterStats {
            identifier: cluster.identifier.clone(),
            node_count: cluster.len(),
            cpu: cpu.finish(),
            memory: memory.finish(),
        }
    }
}
