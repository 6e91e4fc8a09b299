//! Core data models for node allocatable analysis

use crate::error::AnalysisError;
use crate::quantity::Quantity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource axis analyzed for every node
///
/// CPU figures are carried in millicores, memory figures in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Cpu,
    Memory,
}

impl Resource {
    pub const ALL: [Resource; 2] = [Resource::Cpu, Resource::Memory];

    /// Unit used for integer figures on this axis
    pub fn unit(&self) -> &'static str {
        match self {
            Resource::Cpu => "millicores",
            Resource::Memory => "bytes",
        }
    }

    /// Read a quantity in this axis' integer unit
    pub fn amount(&self, quantity: &Quantity) -> u64 {
        match self {
            Resource::Cpu => quantity.milli_value(),
            Resource::Memory => quantity.value(),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Cpu => f.write_str("cpu"),
            Resource::Memory => f.write_str("memory"),
        }
    }
}

/// `floor(100 * part / whole)`, or `None` when `whole` is zero
pub fn utilization_percent(part: u64, whole: u64) -> Option<u64> {
    if whole == 0 {
        return None;
    }
    let percent = u128::from(part) * 100 / u128::from(whole);
    Some(u64::try_from(percent).unwrap_or(u64::MAX))
}

/// Requested vs. allocatable figures for one node, as captured in the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    pub memory_allocatable: Quantity,
    pub memory_requested: Quantity,
    pub cpu_allocatable: Quantity,
    pub cpu_requested: Quantity,
}

impl NodeRecord {
    /// Allocatable capacity in the axis' integer unit
    pub fn allocatable(&self, resource: Resource) -> u64 {
        match resource {
            Resource::Cpu => resource.amount(&self.cpu_allocatable),
            Resource::Memory => resource.amount(&self.memory_allocatable),
        }
    }

    /// Requested amount in the axis' integer unit
    pub fn requested(&self, resource: Resource) -> u64 {
        match resource {
            Resource::Cpu => resource.amount(&self.cpu_requested),
            Resource::Memory => resource.amount(&self.memory_requested),
        }
    }

    /// Requested as a whole percentage of allocatable
    pub fn percent(&self, resource: Resource) -> Result<u64, AnalysisError> {
        utilization_percent(self.requested(resource), self.allocatable(resource))
            .ok_or(AnalysisError::ZeroAllocatable { resource })
    }

    pub fn memory_percent(&self) -> Result<u64, AnalysisError> {
        self.percent(Resource::Memory)
    }

    pub fn cpu_percent(&self) -> Result<u64, AnalysisError> {
        self.percent(Resource::Cpu)
    }
}

/// Renders the node sub-line grammar the parser accepts
impl fmt::Display for NodeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NodeName: {}, Memory: {} / {} = {}%, CPU: {} / {} = {}%",
            self.name,
            self.memory_requested,
            self.memory_allocatable,
            self.memory_percent().unwrap_or(0),
            self.cpu_requested,
            self.cpu_allocatable,
            self.cpu_percent().unwrap_or(0),
        )
    }
}

/// All nodes captured in one log chunk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRecord {
    /// Contents of the leading `{...}` of the chunk, if any
    pub identifier: Option<String>,
    /// Nodes in log order
    pub nodes: Vec<NodeRecord>,
}

impl ClusterRecord {
    pub fn new(identifier: Option<String>, nodes: Vec<NodeRecord>) -> Self {
        Self { identifier, nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(mem_req: &str, mem_alloc: &str, cpu_req: &str, cpu_alloc: &str) -> NodeRecord {
        NodeRecord {
            name: "node-a".to_string(),
            memory_allocatable: mem_alloc.parse().unwrap(),
            memory_requested: mem_req.parse().unwrap(),
            cpu_allocatable: cpu_alloc.parse().unwrap(),
            cpu_requested: cpu_req.parse().unwrap(),
        }
    }

    #[test]
    fn test_percent_uses_integer_division() {
        let n = node("100Mi", "300Mi", "333m", "1");
        assert_eq!(n.memory_percent().unwrap(), 33);
        assert_eq!(n.cpu_percent().unwrap(), 33);
    }

    #[test]
    fn test_cpu_percent_keeps_sub_core_precision() {
        // 1.5 cores requested of 2 would be 50% if truncated to whole cores
        let n = node("1Gi", "2Gi", "1500m", "2");
        assert_eq!(n.cpu_percent().unwrap(), 75);
    }

    #[test]
    fn test_zero_allocatable_is_an_error() {
        let n = node("100Mi", "0", "100m", "1");
        assert!(matches!(
            n.memory_percent(),
            Err(AnalysisError::ZeroAllocatable {
                resource: Resource::Memory
            })
        ));
        assert_eq!(n.cpu_percent().unwrap(), 10);
    }

    #[test]
    fn test_display_matches_log_format() {
        let n = node("100Mi", "200Mi", "100m", "200m");
        assert_eq!(
            n.to_string(),
            "NodeName: node-a, Memory: 100Mi / 200Mi = 50%, CPU: 100m / 200m = 50%"
        );
    }

    #[test]
    fn test_utilization_percent_overcommitted() {
        assert_eq!(utilization_percent(300, 100), Some(300));
        assert_eq!(utilization_percent(u64::MAX, 1), Some(u64::MAX));
        assert_eq!(utilization_percent(5, 0), None);
    }
}
