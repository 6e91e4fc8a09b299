//! Fixed-point resource quantities
//!
//! A [`Quantity`] holds an exact, non-negative number of milli-units. Memory
//! is read back in whole bytes with [`Quantity::value`], CPU in milli-cores
//! with [`Quantity::milli_value`]. Nothing here touches floating point, so
//! summing thousands of node values never drifts.
//!
//! Accepted text: `<mantissa><suffix>` where the mantissa is `123`, `1.5` or
//! `.5` and the suffix is one of `Ki Mi Gi Ti` (powers of 1024), `m k M G`
//! (powers of 1000) or nothing.

use crate::error::{AnalysisError, QuantityFault};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::Sum;
use std::ops::{Add, Sub};
use std::str::FromStr;

const MILLIS_PER_UNIT: u64 = 1000;

/// Suffix family a quantity was written in, used when formatting it back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QuantityFormat {
    /// Ki, Mi, Gi, Ti
    BinarySi,
    /// m, k, M, G or no suffix
    #[default]
    DecimalSi,
}

/// Multiplier expressed as an exact fraction
struct Scale {
    numerator: u128,
    denominator: u128,
    format: QuantityFormat,
}

fn scale_for(suffix: &str) -> Option<Scale> {
    let (numerator, denominator, format) = match suffix {
        "" => (1, 1, QuantityFormat::DecimalSi),
        "m" => (1, 1000, QuantityFormat::DecimalSi),
        "k" => (1_000, 1, QuantityFormat::DecimalSi),
        "M" => (1_000_000, 1, QuantityFormat::DecimalSi),
        "G" => (1_000_000_000, 1, QuantityFormat::DecimalSi),
        "Ki" => (1 << 10, 1, QuantityFormat::BinarySi),
        "Mi" => (1 << 20, 1, QuantityFormat::BinarySi),
        "Gi" => (1 << 30, 1, QuantityFormat::BinarySi),
        "Ti" => (1 << 40, 1, QuantityFormat::BinarySi),
        _ => return None,
    };
    Some(Scale {
        numerator,
        denominator,
        format,
    })
}

/// Parse `123`, `1.50` or `.5` into (digits as integer, digits after the point)
fn parse_mantissa(number: &str) -> Result<(u128, u32), QuantityFault> {
    let (integer, fraction) = number.split_once('.').unwrap_or((number, ""));
    if integer.is_empty() && fraction.is_empty() {
        return Err(QuantityFault::InvalidNumber);
    }
    if !integer.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(QuantityFault::InvalidNumber);
    }
    let fraction = fraction.trim_end_matches('0');

    let mut mantissa: u128 = 0;
    for digit in integer.bytes().chain(fraction.bytes()) {
        mantissa = mantissa
            .checked_mul(10)
            .and_then(|m| m.checked_add(u128::from(digit - b'0')))
            .ok_or(QuantityFault::Overflow)?;
    }
    let scale = u32::try_from(fraction.len()).map_err(|_| QuantityFault::Overflow)?;
    Ok((mantissa, scale))
}

/// Exact non-negative resource amount in milli-units
#[derive(Debug, Clone, Copy, Default)]
pub struct Quantity {
    millis: u64,
    format: QuantityFormat,
}

impl Quantity {
    pub const ZERO: Quantity = Quantity {
        millis: 0,
        format: QuantityFormat::DecimalSi,
    };

    /// Build a quantity from milli-units (e.g. millicores)
    pub fn from_milli(millis: u64) -> Self {
        Self {
            millis,
            format: QuantityFormat::DecimalSi,
        }
    }

    /// Build a quantity from whole base units (e.g. bytes or cores)
    pub fn from_value(value: u64, format: QuantityFormat) -> Self {
        Self {
            millis: value.saturating_mul(MILLIS_PER_UNIT),
            format,
        }
    }

    /// Whole base units, rounded up
    pub fn value(&self) -> u64 {
        self.millis.div_ceil(MILLIS_PER_UNIT)
    }

    /// Milli-units, exact
    pub fn milli_value(&self) -> u64 {
        self.millis
    }

    pub fn format(&self) -> QuantityFormat {
        self.format
    }

    pub fn is_zero(&self) -> bool {
        self.millis == 0
    }

    /// Subtract, clamping at zero
    pub fn saturating_sub(self, other: Quantity) -> Quantity {
        Quantity {
            millis: self.millis.saturating_sub(other.millis),
            format: self.format,
        }
    }
}

impl FromStr for Quantity {
    type Err = AnalysisError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let fault = |reason| AnalysisError::MalformedQuantity {
            text: text.to_string(),
            reason,
        };

        if text.is_empty() {
            return Err(fault(QuantityFault::Empty));
        }

        let split = text
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(text.len());
        let (number, suffix) = text.split_at(split);
        if number.is_empty() {
            return Err(fault(QuantityFault::InvalidNumber));
        }

        let scale = scale_for(suffix).ok_or_else(|| fault(QuantityFault::UnknownSuffix))?;
        let (mantissa, decimals) = parse_mantissa(number).map_err(fault)?;

        // millis = ceil(mantissa * numerator * 1000 / (10^decimals * denominator))
        let dividend = mantissa
            .checked_mul(scale.numerator)
            .and_then(|v| v.checked_mul(u128::from(MILLIS_PER_UNIT)))
            .ok_or_else(|| fault(QuantityFault::Overflow))?;
        let divisor = 10u128
            .checked_pow(decimals)
            .and_then(|p| p.checked_mul(scale.denominator))
            .ok_or_else(|| fault(QuantityFault::Overflow))?;
        let millis = u64::try_from(dividend.div_ceil(divisor))
            .map_err(|_| fault(QuantityFault::Overflow))?;

        Ok(Quantity {
            millis,
            format: scale.format,
        })
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.millis % MILLIS_PER_UNIT != 0 {
            return write!(f, "{}m", self.millis);
        }
        let value = self.millis / MILLIS_PER_UNIT;
        if value == 0 {
            return f.write_str("0");
        }

        let units: &[(u64, &str)] = match self.format {
            QuantityFormat::BinarySi => &[
                (1 << 40, "Ti"),
                (1 << 30, "Gi"),
                (1 << 20, "Mi"),
                (1 << 10, "Ki"),
            ],
            QuantityFormat::DecimalSi => &[(1_000_000_000, "G"), (1_000_000, "M"), (1_000, "k")],
        };
        for &(unit, suffix) in units {
            if value % unit == 0 {
                return write!(f, "{}{}", value / unit, suffix);
            }
        }
        write!(f, "{}", value)
    }
}

// Equality and ordering are numeric; the format only affects Display.
impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.millis == other.millis
    }
}

impl Eq for Quantity {}

impl Hash for Quantity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.millis.hash(state);
    }
}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.millis.cmp(&other.millis)
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, other: Quantity) -> Quantity {
        Quantity {
            millis: self.millis.saturating_add(other.millis),
            format: self.format,
        }
    }
}

impl Sub for Quantity {
    type Output = Quantity;

    fn sub(self, other: Quantity) -> Quantity {
        self.saturating_sub(other)
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Quantity {
        iter.fold(Quantity::ZERO, Add::add)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
