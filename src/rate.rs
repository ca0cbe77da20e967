//! Throughput rates derived from a window quota.

use crate::affordability::CostClass;
use crate::quota::WINDOW_BLOCKS;
use serde::{Deserialize, Serialize};

/// Quota units per window that amount to one unit transaction per block.
pub const UNIT_RATE_DIVISOR: f64 = CostClass::SimpleTransfer.cost() as f64 * WINDOW_BLOCKS as f64;

/// Unit transactions per second for a window quota.
///
/// One block is produced per second, so this is also the sustained number
/// of simple transfers per block the quota can fund across the window.
#[inline]
pub fn utps(quota_total: f64) -> f64 {
    quota_total / UNIT_RATE_DIVISOR
}

/// Unit transactions per window, derived from an already computed UTPS.
#[inline]
pub fn utpe(utps: f64) -> f64 {
    utps * WINDOW_BLOCKS as f64
}

/// UTPS/UTPE pair taken from a single quota total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rates {
    /// Unit transactions per second.
    pub utps: f64,
    /// Unit transactions per rolling window.
    pub utpe: f64,
}

impl Rates {
    /// Derives both rates from `quota_total`; UTPE reuses the UTPS value.
    pub fn from_quota(quota_total: f64) -> Self {
        let utps = utps(quota_total);
        Self {
            utps,
            utpe: utpe(utps),
        }
    }
}
