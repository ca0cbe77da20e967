//! Quota function.
//!
//! Implements `Qi = M × (1 − 2 / (1 + e^(Li·ξi·ρ)))`, the logistic
//! saturation curve that turns a stake `ξi` (in whole tokens) and a load
//! factor `Li` into a per-block quota, then scales it to the rolling window.
//!
//! The identity `1 − 2/(1 + eˣ) = tanh(x/2)` is used for evaluation.  It is
//! exact in real arithmetic, never overflows for large `x`, and keeps full
//! relative precision for the tiny exponents produced by realistic stakes,
//! where the literal form collapses to zero because `eˣ` rounds to `1.0`.

use crate::congestion::load_factor;
use crate::stake::StakeAmount;
use tracing::debug;

/// Maximum quota a single block can grant (`M`).
pub const MAX_QUOTA_PER_BLOCK: f64 = 1_000_000.0;

/// Stake sensitivity constant (`ρ`).
pub const RHO: f64 = 3.13478991e-22;

/// Number of blocks in the rolling quota window.
pub const WINDOW_BLOCKS: u32 = 75;

/// Upper bound (exclusive for any representable stake) of a window quota.
pub const MAX_WINDOW_QUOTA: f64 = MAX_QUOTA_PER_BLOCK * WINDOW_BLOCKS as f64;

/// Returns the formula exponent `Li · ξi · ρ`.
#[inline]
pub fn exponent(tokens: f64, load_factor: f64) -> f64 {
    load_factor * tokens * RHO
}

/// Per-block quota for a given exponent.
///
/// Non-positive or NaN exponents yield `0.0`.
#[inline]
pub fn per_block_quota(exponent: f64) -> f64 {
    if !(exponent > 0.0) {
        return 0.0;
    }
    MAX_QUOTA_PER_BLOCK * (exponent / 2.0).tanh()
}

/// Clamps a window quota from any source into `[0, MAX_WINDOW_QUOTA)`.
///
/// NaN and non-positive values give `0.0`; anything at or above the bound
/// becomes the largest float strictly below it.
pub fn clamp_window_quota(quota_total: f64) -> f64 {
    if !(quota_total > 0.0) {
        return 0.0;
    }
    let ceiling = f64::from_bits(MAX_WINDOW_QUOTA.to_bits() - 1);
    quota_total.min(ceiling)
}

/// Window quota for a stake already expressed in whole tokens.
///
/// A token count of exactly zero (or anything that is not strictly
/// positive) short-circuits to `0.0` without touching the formula.
pub fn quota_from_tokens(tokens: f64, congestion: f64) -> f64 {
    if !(tokens > 0.0) {
        return 0.0;
    }
    let li = load_factor(congestion);
    let x = exponent(tokens, li);
    let total = per_block_quota(x) * WINDOW_BLOCKS as f64;
    debug!(tokens, congestion, li, exponent = x, total, "computed window quota");
    total
}

/// Window quota for a stake held in base units.
///
/// # Examples
///
/// ```
/// use feeless_quota::{quota, StakeAmount, DEFAULT_CONGESTION};
///
/// assert_eq!(quota(StakeAmount::ZERO, DEFAULT_CONGESTION), 0.0);
/// let q = quota(StakeAmount::from_base_units(u128::MAX), DEFAULT_CONGESTION);
/// assert!(q > 0.0 && q < 75_000_000.0);
/// ```
pub fn quota(stake: StakeAmount, congestion: f64) -> f64 {
    quota_from_tokens(stake.tokens(), congestion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::congestion::DEFAULT_CONGESTION;
    use proptest::prelude::*;

    fn close(actual: f64, expected: f64, rel: f64) -> bool {
        ((actual - expected) / expected).abs() <= rel
    }

    #[test]
    fn zero_stake_is_zero_quota_at_any_congestion() {
        for congestion in [0.0, 50.0, 250.0, 500.0, 10_000.0] {
            assert_eq!(quota(StakeAmount::ZERO, congestion), 0.0);
        }
        assert_eq!(quota_from_tokens(0.0, DEFAULT_CONGESTION), 0.0);
        assert_eq!(quota_from_tokens(-5.0, DEFAULT_CONGESTION), 0.0);
        assert_eq!(quota_from_tokens(f64::NAN, DEFAULT_CONGESTION), 0.0);
    }

    #[test]
    fn one_million_tokens_stays_in_linear_regime() {
        let stake = StakeAmount::from_tokens(1_000_000).unwrap();
        let total = quota(stake, DEFAULT_CONGESTION);
        let x = 1_000_000.0 * RHO;
        // tanh(x/2) ≈ x/2 for tiny x.
        let expected = MAX_QUOTA_PER_BLOCK * (x / 2.0) * WINDOW_BLOCKS as f64;
        assert!(total > 0.0, "tiny quota must not collapse to zero");
        // The ≈2.35e-8 figure sometimes quoted for this stake uses M·x and drops the /2.
        assert!(close(total, expected, 1e-9), "got {total}, want {expected}");
        assert!(close(total, 1.175546216e-8, 1e-6));
    }

    #[test]
    fn tanh_form_matches_literal_formula_where_literal_is_accurate() {
        for x in [0.05, 0.5, 1.0, 3.0, 10.0] {
            let literal = MAX_QUOTA_PER_BLOCK * (1.0 - 2.0 / (1.0 + f64::exp(x)));
            assert!(close(per_block_quota(x), literal, 1e-12), "x = {x}");
        }
    }

    #[test]
    fn huge_exponents_saturate_without_nan() {
        for x in [700.0, 710.0, 1e6, f64::MAX, f64::INFINITY] {
            let q = per_block_quota(x);
            assert!(!q.is_nan());
            assert_eq!(q, MAX_QUOTA_PER_BLOCK);
        }
        let q = quota_from_tokens(1e300, DEFAULT_CONGESTION);
        assert_eq!(q, MAX_WINDOW_QUOTA);
    }

    #[test]
    fn largest_stake_is_strictly_below_window_bound() {
        let q = quota(StakeAmount::from_base_units(u128::MAX), 0.0);
        assert!(q > 0.0);
        assert!(q < MAX_WINDOW_QUOTA);
    }

    #[test]
    fn clamp_keeps_quota_inside_window_bound() {
        assert_eq!(clamp_window_quota(f64::NAN), 0.0);
        assert_eq!(clamp_window_quota(-3.0), 0.0);
        assert_eq!(clamp_window_quota(1_000_000.0), 1_000_000.0);
        let top = clamp_window_quota(1e21);
        assert!(top < MAX_WINDOW_QUOTA);
        assert!(MAX_WINDOW_QUOTA - top < 1e-7);
        assert_eq!(clamp_window_quota(f64::INFINITY), top);
    }

    #[test]
    fn congestion_reduces_quota() {
        let stake = StakeAmount::from_base_units(10u128.pow(38));
        let calm = quota(stake, 10.0);
        let busy = quota(stake, 450.0);
        assert!(busy < calm);
        assert!(close(busy / calm, 0.3, 1e-3));
    }

    proptest! {
        #[test]
        fn quota_is_monotone_in_stake(a in any::<u128>(), b in any::<u128>(), congestion in 0.0f64..600.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let q_lo = quota(StakeAmount::from_base_units(lo), congestion);
            let q_hi = quota(StakeAmount::from_base_units(hi), congestion);
            prop_assert!(q_lo <= q_hi);
            prop_assert!(q_lo >= 0.0);
            prop_assert!(q_hi < MAX_WINDOW_QUOTA);
        }

        #[test]
        fn quota_is_antitone_in_congestion(stake in any::<u128>(), a in 0.0f64..600.0, b in 0.0f64..600.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let stake = StakeAmount::from_base_units(stake);
            prop_assert!(quota(stake, hi) <= quota(stake, lo));
        }
    }
}
