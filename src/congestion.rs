//! Network congestion model.
//!
//! Maps an averaged congestion estimate (in unit transactions, "UT") to the
//! dimensionless load factor `Li` used by the quota formula.  The true
//! relationship depends on live network state; this module reproduces the
//! published step table, which is coarse but deterministic.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Congestion estimate assumed when the caller has no observation.
pub const DEFAULT_CONGESTION: f64 = 50.0;

/// Largest congestion estimate accepted from user-facing inputs.
pub const MAX_CONGESTION: f64 = 500.0;

/// Load factor applied past the last step of [`LOAD_STEPS`].
pub const FLOOR_LOAD_FACTOR: f64 = 0.2;

/// Inclusive upper bounds paired with the load factor they select, in
/// ascending bound order.
pub const LOAD_STEPS: [(f64, f64); 8] = [
    (50.0, 1.0),
    (100.0, 0.9),
    (150.0, 0.8),
    (200.0, 0.7),
    (250.0, 0.6),
    (300.0, 0.5),
    (400.0, 0.4),
    (500.0, 0.3),
];

/// Returns the load factor `Li` for a congestion estimate.
///
/// The function is total: negative estimates select the first step and
/// anything above the last bound (or NaN) falls through to
/// [`FLOOR_LOAD_FACTOR`].  The result is always in `(0, 1]` and never
/// increases as `congestion` grows.
///
/// # Examples
///
/// ```
/// use feeless_quota::congestion::load_factor;
///
/// assert_eq!(load_factor(50.0), 1.0);
/// assert_eq!(load_factor(51.0), 0.9);
/// assert_eq!(load_factor(501.0), 0.2);
/// ```
pub fn load_factor(congestion: f64) -> f64 {
    LOAD_STEPS
        .iter()
        .find(|(bound, _)| congestion <= *bound)
        .map(|(_, li)| *li)
        .unwrap_or(FLOOR_LOAD_FACTOR)
}

/// Coarse congestion label shown next to the estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CongestionLevel {
    /// Up to 50 UT.
    Low,
    /// Up to 150 UT.
    Medium,
    /// Up to 300 UT.
    High,
    /// Anything above 300 UT.
    VeryHigh,
}

impl CongestionLevel {
    /// Buckets a congestion estimate.
    pub fn classify(congestion: f64) -> Self {
        if congestion <= 50.0 {
            Self::Low
        } else if congestion <= 150.0 {
            Self::Medium
        } else if congestion <= 300.0 {
            Self::High
        } else {
            Self::VeryHigh
        }
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::VeryHigh => "Very High",
        }
    }
}

impl fmt::Display for CongestionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
