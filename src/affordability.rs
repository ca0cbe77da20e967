//! Affordability table: how many transactions of each cost class a quota funds.

use crate::quota::{clamp_window_quota, MAX_WINDOW_QUOTA};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction kinds with a fixed quota price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostClass {
    /// Plain native-coin transfer.
    SimpleTransfer,
    /// Smart contract deployment.
    ContractCreation,
    /// Stake or unstake call.
    StakeOperation,
    /// DEX swap (estimated cost).
    Swap,
    /// NFT mint (estimated cost).
    NftMint,
}

impl CostClass {
    /// Every class, in display order.
    pub const ALL: [CostClass; 5] = [
        CostClass::SimpleTransfer,
        CostClass::ContractCreation,
        CostClass::StakeOperation,
        CostClass::Swap,
        CostClass::NftMint,
    ];

    /// Quota units consumed by one transaction of this class.
    pub const fn cost(self) -> u64 {
        match self {
            CostClass::SimpleTransfer => 21_000,
            CostClass::ContractCreation => 41_825,
            CostClass::StakeOperation => 104_166,
            CostClass::Swap => 150_000,
            CostClass::NftMint => 150_000,
        }
    }

    /// Whether the cost is an estimate rather than a protocol constant.
    pub const fn is_estimate(self) -> bool {
        matches!(self, CostClass::Swap | CostClass::NftMint)
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            CostClass::SimpleTransfer => "Simple transfers",
            CostClass::ContractCreation => "Contract deployments",
            CostClass::StakeOperation => "Stake/unstake operations",
            CostClass::Swap => "Swaps (estimated)",
            CostClass::NftMint => "NFT mints (estimated)",
        }
    }
}

impl fmt::Display for CostClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Number of whole transactions a quota covers for one class.
///
/// Satisfies `count × cost ≤ quota < (count + 1) × cost` for quotas in
/// `[0, MAX_WINDOW_QUOTA)`.  Larger inputs are clamped into that range first;
/// NaN and non-positive quotas give zero.
pub fn count_for(quota_total: f64, class: CostClass) -> u64 {
    let quota_total = clamp_window_quota(quota_total);
    if quota_total == 0.0 {
        return 0;
    }
    let cost = class.cost() as f64;
    let mut count = (quota_total / cost).floor();
    // The division may round across an integer boundary; products of
    // integral counts and costs are exact, so correct against them.
    if count * cost > quota_total {
        count -= 1.0;
    } else if (count + 1.0) * cost <= quota_total {
        count += 1.0;
    }
    count as u64
}

/// Whole-transaction counts per cost class for a quota total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AffordabilityReport {
    /// Simple transfers.
    pub simple_transfers: u64,
    /// Contract deployments.
    pub contract_creations: u64,
    /// Stake/unstake operations.
    pub stake_operations: u64,
    /// Swaps.
    pub swaps: u64,
    /// NFT mints.
    pub nft_mints: u64,
}

impl AffordabilityReport {
    /// Count for `class`.
    pub fn count(&self, class: CostClass) -> u64 {
        match class {
            CostClass::SimpleTransfer => self.simple_transfers,
            CostClass::ContractCreation => self.contract_creations,
            CostClass::StakeOperation => self.stake_operations,
            CostClass::Swap => self.swaps,
            CostClass::NftMint => self.nft_mints,
        }
    }

    /// `(class, count)` pairs in [`CostClass::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (CostClass, u64)> + '_ {
        CostClass::ALL.into_iter().map(|class| (class, self.count(class)))
    }
}

/// Builds the affordability table for `quota_total`.
pub fn affordability(quota_total: f64) -> AffordabilityReport {
    AffordabilityReport {
        simple_transfers: count_for(quota_total, CostClass::SimpleTransfer),
        contract_creations: count_for(quota_total, CostClass::ContractCreation),
        stake_operations: count_for(quota_total, CostClass::StakeOperation),
        swaps: count_for(quota_total, CostClass::Swap),
        nft_mints: count_for(quota_total, CostClass::NftMint),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn one_million_quota_table() {
        let report = affordability(1_000_000.0);
        assert_eq!(report.simple_transfers, 47);
        assert_eq!(report.contract_creations, 23);
        assert_eq!(report.stake_operations, 9);
        assert_eq!(report.swaps, 6);
        assert_eq!(report.nft_mints, 6);
    }

    #[test]
    fn zero_quota_affords_nothing() {
        assert_eq!(affordability(0.0), AffordabilityReport::default());
        assert_eq!(affordability(-1.0), AffordabilityReport::default());
        assert_eq!(affordability(f64::NAN), AffordabilityReport::default());
        assert_eq!(affordability(20_999.999), AffordabilityReport::default());
    }

    #[test]
    fn exact_multiples_are_fully_counted() {
        assert_eq!(count_for(21_000.0, CostClass::SimpleTransfer), 1);
        assert_eq!(count_for(3.0 * 41_825.0, CostClass::ContractCreation), 3);
        assert_eq!(count_for(104_165.0, CostClass::StakeOperation), 0);
    }

    #[test]
    fn oversized_quota_counts_are_bounded_by_window() {
        let ceiling = affordability(MAX_WINDOW_QUOTA);
        assert_eq!(ceiling.simple_transfers, 3_571);
        assert_eq!(affordability(1e21), ceiling);
        assert_eq!(affordability(f64::INFINITY), ceiling);
    }

    #[test]
    fn iteration_follows_display_order() {
        let report = affordability(300_000.0);
        let classes: Vec<_> = report.iter().map(|(class, _)| class).collect();
        assert_eq!(classes, CostClass::ALL.to_vec());
        assert!(CostClass::Swap.is_estimate());
        assert!(!CostClass::SimpleTransfer.is_estimate());
    }

    proptest! {
        #[test]
        fn counts_honour_floor_contract(q in 0.0f64..75_000_000.0) {
            let report = affordability(q);
            for (class, count) in report.iter() {
                let cost = class.cost() as f64;
                prop_assert!(count as f64 * cost <= q);
                prop_assert!(q < (count + 1) as f64 * cost);
            }
        }
    }
}
