//! Analysis configuration

use crate::classify::Thresholds;
use crate::error::AnalysisError;
use crate::reservation::{PolicyKind, ReservationPolicies};
use serde::{Deserialize, Serialize};

/// Settings passed explicitly to every analysis entry point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Memory utilization threshold in percent, `[0, 100)`
    #[serde(default = "default_threshold")]
    pub memory_threshold: u64,

    /// CPU utilization threshold in percent, `[0, 100)`
    #[serde(default = "default_threshold")]
    pub cpu_threshold: u64,

    /// Reservation tables applied to every node
    #[serde(default)]
    pub reservation_policy: PolicyKind,

    /// Longest input line accepted by the reader
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

fn default_threshold() -> u64 {
    0
}

fn default_max_line_bytes() -> usize {
    512 * 1024
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            memory_threshold: default_threshold(),
            cpu_threshold: default_threshold(),
            reservation_policy: PolicyKind::default(),
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

impl AnalysisConfig {
    /// Validated threshold pair
    pub fn thresholds(&self) -> Result<Thresholds, AnalysisError> {
        Thresholds::new(self.memory_threshold, self.cpu_threshold)
    }

    pub fn policies(&self) -> ReservationPolicies {
        ReservationPolicies::for_kind(self.reservation_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config: AnalysisConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.max_line_bytes, 512 * 1024);
        assert_eq!(config.reservation_policy, PolicyKind::Marginal);
    }

    #[test]
    fn test_partial_document() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"cpu_threshold": 70, "reservation_policy": "step"}"#).unwrap();
        assert_eq!(config.cpu_threshold, 70);
        assert_eq!(config.memory_threshold, 0);
        assert_eq!(config.reservation_policy, PolicyKind::Step);
        assert_eq!(config.policies().cpu.name(), "step-cpu");
    }

    #[test]
    fn test_thresholds_validated() {
        let config = AnalysisConfig {
            memory_threshold: 100,
            ..Default::default()
        };
        assert!(matches!(
            config.thresholds(),
            Err(AnalysisError::InvalidThreshold { .. })
        ));
        assert_eq!(
            AnalysisConfig::default().thresholds().unwrap(),
            Thresholds { memory: 0, cpu: 0 }
        );
    }
}
