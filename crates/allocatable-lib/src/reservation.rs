//! System reservation policies
//!
//! A reservation policy maps a node's allocatable capacity to the amount the
//! node keeps back for system daemons. The canonical [`MarginalPolicy`] taxes
//! each capacity band at its own marginal rate, like income brackets, which
//! keeps the reservation non-decreasing in capacity. [`StepPolicy`] is the
//! older fixed-amount-per-tier scheme, kept only so results can be compared
//! against it.
//!
//! Capacities and reservations are integers in the resource's unit: bytes for
//! memory, millicores for CPU.

use crate::error::AnalysisError;
use crate::models::Resource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Rates are expressed in parts per ten thousand
pub const BASIS_POINTS: u64 = 10_000;

const KI: u64 = 1 << 10;
const MI: u64 = 1 << 20;
const GI: u64 = 1 << 30;
const MILLICORES_PER_CORE: u64 = 1000;

/// Memory capacity at or below which nothing is reserved
pub const MEMORY_RESERVATION_FLOOR: u64 = GI;

/// Eviction headroom added to the quarter-of-capacity legacy tier
pub const LEGACY_EVICTION_THRESHOLD: u64 = 250 * MI;

/// Trait for capacity → reservation functions
pub trait ReservationPolicy: Send + Sync + fmt::Debug {
    /// Amount reserved for a node with the given allocatable capacity
    fn reserved(&self, capacity: u64) -> u64;

    /// Short policy name for logs and reports
    fn name(&self) -> &str;
}

/// One band of a marginal policy: capacity above `threshold` (up to the next
/// bracket) is reserved at `rate_basis_points / 10000`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationBracket {
    pub threshold: u64,
    pub rate_basis_points: u64,
}

impl ReservationBracket {
    pub const fn new(threshold: u64, rate_basis_points: u64) -> Self {
        Self {
            threshold,
            rate_basis_points,
        }
    }
}

/// Memory brackets: 25% of the first 4Gi, 20% of the next 4Gi, 10% of the
/// next 8Gi, 6% of the next 112Gi and 2% of anything above 128Gi
pub const MEMORY_BRACKETS: [ReservationBracket; 5] = [
    ReservationBracket::new(0, 2500),
    ReservationBracket::new(4 * GI, 2000),
    ReservationBracket::new(8 * GI, 1000),
    ReservationBracket::new(16 * GI, 600),
    ReservationBracket::new(128 * GI, 200),
];

/// CPU brackets: 6% of the first core, 1% of the second, 0.5% of the next
/// two and 0.25% of every core above four
pub const CPU_BRACKETS: [ReservationBracket; 4] = [
    ReservationBracket::new(0, 600),
    ReservationBracket::new(MILLICORES_PER_CORE, 100),
    ReservationBracket::new(2 * MILLICORES_PER_CORE, 50),
    ReservationBracket::new(4 * MILLICORES_PER_CORE, 25),
];

/// Marginal-rate reservation over ascending brackets
#[derive(Debug, Clone)]
pub struct MarginalPolicy {
    name: String,
    brackets: Vec<ReservationBracket>,
    zero_at_or_below: Option<u64>,
}

impl MarginalPolicy {
    /// Build a policy, rejecting unsorted brackets and rates above 100%
    pub fn new(
        name: impl Into<String>,
        brackets: Vec<ReservationBracket>,
    ) -> Result<Self, AnalysisError> {
        if brackets.is_empty() {
            return Err(AnalysisError::InvalidBrackets(
                "at least one bracket is required".to_string(),
            ));
        }
        if let Some(pair) = brackets.windows(2).find(|w| w[0].threshold >= w[1].threshold) {
            return Err(AnalysisError::InvalidBrackets(format!(
                "thresholds must be strictly increasing ({} >= {})",
                pair[0].threshold, pair[1].threshold
            )));
        }
        if let Some(bracket) = brackets.iter().find(|b| b.rate_basis_points > BASIS_POINTS) {
            return Err(AnalysisError::InvalidBrackets(format!(
                "rate of {} basis points exceeds 100%",
                bracket.rate_basis_points
            )));
        }

        Ok(Self {
            name: name.into(),
            brackets,
            zero_at_or_below: None,
        })
    }

    /// Reserve nothing for capacities at or below `floor`
    pub fn with_zero_floor(mut self, floor: u64) -> Self {
        self.zero_at_or_below = Some(floor);
        self
    }

    /// Default memory policy (bytes)
    pub fn memory() -> Self {
        Self {
            name: "marginal-memory".to_string(),
            brackets: MEMORY_BRACKETS.to_vec(),
            zero_at_or_below: Some(MEMORY_RESERVATION_FLOOR),
        }
    }

    /// Default CPU policy (millicores)
    pub fn cpu() -> Self {
        Self {
            name: "marginal-cpu".to_string(),
            brackets: CPU_BRACKETS.to_vec(),
            zero_at_or_below: None,
        }
    }

    pub fn brackets(&self) -> &[ReservationBracket] {
        &self.brackets
    }
}

impl ReservationPolicy for MarginalPolicy {
    fn reserved(&self, capacity: u64) -> u64 {
        if self.zero_at_or_below.is_some_and(|floor| capacity <= floor) {
            return 0;
        }

        // Sum in basis-point units and divide once so rounding never compounds
        let mut total: u128 = 0;
        for (i, bracket) in self.brackets.iter().enumerate() {
            if capacity <= bracket.threshold {
                break;
            }
            let upper = self
                .brackets
                .get(i + 1)
                .map_or(capacity, |next| next.threshold.min(capacity));
            total += u128::from(upper - bracket.threshold) * u128::from(bracket.rate_basis_points);
        }
        u64::try_from(total / u128::from(BASIS_POINTS)).unwrap_or(u64::MAX)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// What a legacy tier reserves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierReservation {
    /// A fixed amount
    Fixed(u64),
    /// A quarter of capacity plus the given headroom
    QuarterPlus(u64),
}

/// Legacy tier: capacities above `threshold` reserve `reserved`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationTier {
    pub threshold: u64,
    pub reserved: TierReservation,
}

impl ReservationTier {
    pub const fn fixed(threshold: u64, reserved: u64) -> Self {
        Self {
            threshold,
            reserved: TierReservation::Fixed(reserved),
        }
    }
}

pub const LEGACY_MEMORY_TIERS: [ReservationTier; 8] = [
    ReservationTier::fixed(400 * GI, 14 * GI),
    ReservationTier::fixed(250 * GI, 11 * GI),
    ReservationTier::fixed(120 * GI, 8 * GI),
    ReservationTier::fixed(63 * GI, 6 * GI),
    ReservationTier::fixed(31 * GI, 3584 * MI),
    ReservationTier::fixed(15 * GI, 2816 * MI),
    ReservationTier::fixed(7 * GI, 2 * GI),
    ReservationTier {
        threshold: 0,
        reserved: TierReservation::QuarterPlus(LEGACY_EVICTION_THRESHOLD),
    },
];

pub const LEGACY_CPU_TIERS: [ReservationTier; 7] = [
    ReservationTier::fixed(48_000, 300),
    ReservationTier::fixed(24_000, 150),
    ReservationTier::fixed(12_000, 120),
    ReservationTier::fixed(6_000, 90),
    ReservationTier::fixed(3_000, 80),
    ReservationTier::fixed(1_500, 70),
    ReservationTier::fixed(0, 60),
];

/// Fixed reservation per capacity tier, first matching tier wins
///
/// Not monotone in general: crossing a tier boundary can lower the
/// reservation. Only used when explicitly selected.
#[derive(Debug, Clone)]
pub struct StepPolicy {
    name: String,
    tiers: Vec<ReservationTier>,
}

impl StepPolicy {
    /// Build a policy from tiers ordered by descending threshold
    pub fn new(name: impl Into<String>, tiers: Vec<ReservationTier>) -> Result<Self, AnalysisError> {
        if let Some(pair) = tiers.windows(2).find(|w| w[0].threshold <= w[1].threshold) {
            return Err(AnalysisError::InvalidBrackets(format!(
                "tier thresholds must be strictly decreasing ({} <= {})",
                pair[0].threshold, pair[1].threshold
            )));
        }
        Ok(Self {
            name: name.into(),
            tiers,
        })
    }

    pub fn memory() -> Self {
        Self {
            name: "step-memory".to_string(),
            tiers: LEGACY_MEMORY_TIERS.to_vec(),
        }
    }

    pub fn cpu() -> Self {
        Self {
            name: "step-cpu".to_string(),
            tiers: LEGACY_CPU_TIERS.to_vec(),
        }
    }
}

impl ReservationPolicy for StepPolicy {
    fn reserved(&self, capacity: u64) -> u64 {
        self.tiers
            .iter()
            .find(|tier| capacity > tier.threshold)
            .map_or(0, |tier| match tier.reserved {
                TierReservation::Fixed(amount) => amount,
                TierReservation::QuarterPlus(headroom) => (capacity / 4).saturating_add(headroom),
            })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Which family of reservation tables to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    #[default]
    Marginal,
    Step,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::Marginal => f.write_str("marginal"),
            PolicyKind::Step => f.write_str("step"),
        }
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "marginal" => Ok(PolicyKind::Marginal),
            "step" => Ok(PolicyKind::Step),
            other => Err(format!(
                "unknown reservation policy '{other}' (expected 'marginal' or 'step')"
            )),
        }
    }
}

/// Memory and CPU policies applied together
#[derive(Debug, Clone)]
pub struct ReservationPolicies {
    pub memory: Arc<dyn ReservationPolicy>,
    pub cpu: Arc<dyn ReservationPolicy>,
}

impl ReservationPolicies {
    pub fn new(memory: Arc<dyn ReservationPolicy>, cpu: Arc<dyn ReservationPolicy>) -> Self {
        Self { memory, cpu }
    }

    /// Built-in tables for the given kind
    pub fn for_kind(kind: PolicyKind) -> Self {
        match kind {
            PolicyKind::Marginal => Self::new(
                Arc::new(MarginalPolicy::memory()),
                Arc::new(MarginalPolicy::cpu()),
            ),
            PolicyKind::Step => Self::new(Arc::new(StepPolicy::memory()), Arc::new(StepPolicy::cpu())),
        }
    }

    pub fn policy(&self, resource: Resource) -> &dyn ReservationPolicy {
        match resource {
            Resource::Cpu => self.cpu.as_ref(),
            Resource::Memory => self.memory.as_ref(),
        }
    }

    /// Reservation for a capacity on the given axis
    pub fn reserved(&self, resource: Resource, capacity: u64) -> u64 {
        self.policy(resource).reserved(capacity)
    }
}

impl Default for ReservationPolicies {
    fn default() -> Self {
        Self::for_kind(PolicyKind::Marginal)
    }
}
