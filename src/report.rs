//! Structured quota report handed to renderers.
//!
//! A report is rebuilt from scratch for every input change: the committed
//! on-chain reading ([`QuotaBasis`]) plus the congestion estimate fully
//! determine it.

use crate::affordability::{affordability, AffordabilityReport};
use crate::congestion::{load_factor, CongestionLevel};
use crate::quota::{
    clamp_window_quota, exponent, quota_from_tokens, MAX_QUOTA_PER_BLOCK, RHO, WINDOW_BLOCKS,
};
use crate::rate::Rates;
use crate::stake::{format_grouped, StakeAmount};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;
use tracing::{debug, warn};

/// Default divisor applied to raw delegation values.
pub const DEFAULT_DELEGATION_DIVISOR: NonZeroU64 = match NonZeroU64::new(1_000) {
    Some(divisor) => divisor,
    None => unreachable!(),
};

/// How an on-chain reading turns into a quota total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuotaBasis {
    /// A stake balance fed through the saturation formula.
    Stake {
        /// Committed stake.
        amount: StakeAmount,
    },
    /// A raw delegation value whose quotient by `divisor` is the quota total.
    Delegation {
        /// Raw delegation value as read from the contract.
        raw: StakeAmount,
        /// Fixed divisor.
        divisor: NonZeroU64,
    },
}

impl QuotaBasis {
    /// The committed on-chain value.
    pub fn amount(&self) -> StakeAmount {
        match *self {
            QuotaBasis::Stake { amount } => amount,
            QuotaBasis::Delegation { raw, .. } => raw,
        }
    }
}

/// Every value a renderer needs for one (reading, congestion) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaReport {
    /// Reading the report was derived from.
    pub basis: QuotaBasis,
    /// Congestion estimate used.
    pub congestion: f64,
    /// Coarse congestion label; `None` when congestion does not enter the quota.
    pub congestion_level: Option<CongestionLevel>,
    /// Load factor `Li` applied to the formula; `None` for delegation readings.
    pub load_factor: Option<f64>,
    /// Stake in whole tokens; `None` for delegation readings.
    pub tokens: Option<f64>,
    /// Formula exponent `Li·ξi·ρ`; `None` for delegation readings.
    pub exponent: Option<f64>,
    /// Quota available over the rolling window.
    pub quota_total: f64,
    /// UTPS/UTPE derived from `quota_total`.
    #[serde(flatten)]
    pub rates: Rates,
    /// Whole-transaction counts per cost class.
    pub affordability: AffordabilityReport,
}

impl QuotaReport {
    /// Builds a report for any basis.
    ///
    /// Delegation quotients are clamped into `[0, MAX_WINDOW_QUOTA)`.
    ///
    /// [`MAX_WINDOW_QUOTA`]: crate::quota::MAX_WINDOW_QUOTA
    pub fn compute(basis: QuotaBasis, congestion: f64) -> Self {
        let (li, tokens, x, quota_total) = match basis {
            QuotaBasis::Stake { amount } => {
                let li = load_factor(congestion);
                let tokens = amount.tokens();
                let total = quota_from_tokens(tokens, congestion);
                (Some(li), Some(tokens), Some(exponent(tokens, li)), total)
            }
            QuotaBasis::Delegation { raw, divisor } => {
                let quotient = raw.base_units() as f64 / divisor.get() as f64;
                let total = clamp_window_quota(quotient);
                if total < quotient {
                    warn!(
                        %raw,
                        divisor = divisor.get(),
                        quotient,
                        total,
                        "delegation quota above window bound; clamped"
                    );
                }
                (None, None, None, total)
            }
        };
        let report = Self {
            basis,
            congestion,
            congestion_level: li.map(|_| CongestionLevel::classify(congestion)),
            load_factor: li,
            tokens,
            exponent: x,
            quota_total,
            rates: Rates::from_quota(quota_total),
            affordability: affordability(quota_total),
        };
        debug!(
            amount = %basis.amount(),
            congestion,
            quota_total,
            utps = report.rates.utps,
            "built quota report"
        );
        report
    }

    /// Report for a stake run through the formula.
    pub fn from_stake(amount: StakeAmount, congestion: f64) -> Self {
        Self::compute(QuotaBasis::Stake { amount }, congestion)
    }

    /// Report for a delegation value divided by `divisor`.
    pub fn from_delegation(raw: StakeAmount, divisor: NonZeroU64, congestion: f64) -> Self {
        Self::compute(QuotaBasis::Delegation { raw, divisor }, congestion)
    }
}

impl fmt::Display for QuotaReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.basis {
            QuotaBasis::Stake { amount } => {
                writeln!(f, "Staked amount:    {} VC", amount.display_tokens())?;
                writeln!(f, "  raw:            {amount} wei")?;
            }
            QuotaBasis::Delegation { raw, divisor } => {
                writeln!(f, "Delegation value: {raw} (quota = value / {divisor})")?;
            }
        }
        match (self.congestion_level, self.load_factor) {
            (Some(level), Some(li)) => writeln!(
                f,
                "Congestion:       {} UT ({level}), Li = {li:.2}",
                format_grouped(self.congestion, 0)
            )?,
            _ => writeln!(f, "Congestion:       not applied to delegation quotas")?,
        }
        writeln!(
            f,
            "Quota ({WINDOW_BLOCKS} blocks): {}",
            format_grouped(self.quota_total, 0)
        )?;
        writeln!(f, "UTPS:             {:.2}", self.rates.utps)?;
        writeln!(f, "UTPE:             {:.0}", self.rates.utpe)?;
        writeln!(f, "Available feeless transactions:")?;
        for (class, count) in self.affordability.iter() {
            let approx = if class.is_estimate() { "~" } else { "" };
            writeln!(
                f,
                "  {:<26} {:>12}  ({approx}{} quota each)",
                class.label(),
                format_grouped(count as f64, 0),
                format_grouped(class.cost() as f64, 0)
            )?;
        }
        if let (Some(tokens), Some(x)) = (self.tokens, self.exponent) {
            writeln!(
                f,
                "Qi = M x (1 - 2 / (1 + e^(Li x xi x rho))), M = {}, rho = {RHO:e}, xi = {}, exponent = {x:e}",
                format_grouped(MAX_QUOTA_PER_BLOCK, 0),
                format_grouped(tokens, 2)
            )?;
        }
        Ok(())
    }
}
