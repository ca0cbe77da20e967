#![deny(missing_docs)]

//! # feeless_quota
//!
//! **feeless_quota** derives the feeless transaction quota a staked account
//! earns on a quota-based chain.  The core is a set of pure, deterministic
//! transforms applied in sequence:
//!
//! * **Congestion model**: the [`congestion`](congestion/index.html) module
//!   maps a congestion estimate to a load factor `Li` via a fixed step table.
//! * **Quota function**: the [`quota`](quota/index.html) module evaluates
//!   `Qi = M × (1 − 2 / (1 + e^(Li·ξi·ρ)))` in a numerically stable form and
//!   scales it to the 75-block rolling window.
//! * **Rate derivation**: the [`rate`](rate/index.html) module expresses the
//!   window quota as unit transactions per second and per window.
//! * **Affordability table**: the [`affordability`](affordability/index.html)
//!   module floors the quota into whole transactions per cost class.
//!
//! [`QuotaReport`] bundles all of these for one input pair.  With the `net`
//! feature, the [`net`](net/index.html) module reads the stake from chain
//! and refreshes reports on a ticker.
//!
//! ## Usage
//!
//! ```rust
//! use feeless_quota::{QuotaReport, StakeAmount, DEFAULT_CONGESTION};
//!
//! let stake = StakeAmount::from_base_units(10u128.pow(38));
//! let report = QuotaReport::from_stake(stake, DEFAULT_CONGESTION);
//! assert_eq!(report.load_factor, Some(1.0));
//! assert_eq!(report.rates.utpe, report.rates.utps * 75.0);
//! assert!(report.quota_total < 75_000_000.0);
//! ```
//!
//! Every function in the core is total over finite inputs and holds no
//! state, so reports may be rebuilt on every input change from any thread.

pub mod affordability;
pub mod config;
pub mod congestion;
#[cfg(feature = "net")]
pub mod net;
pub mod quota;
pub mod rate;
pub mod report;
pub mod stake;

pub use affordability::{affordability, count_for, AffordabilityReport, CostClass};
pub use config::{validate_congestion, ConfigError, QuotaConfig, SourceConfig};
pub use congestion::{load_factor, CongestionLevel, DEFAULT_CONGESTION, MAX_CONGESTION};
pub use quota::{quota, quota_from_tokens, MAX_QUOTA_PER_BLOCK, MAX_WINDOW_QUOTA, RHO, WINDOW_BLOCKS};
pub use rate::{utpe, utps, Rates};
pub use report::{QuotaBasis, QuotaReport, DEFAULT_DELEGATION_DIVISOR};
pub use stake::{Address, AddressError, AmountError, StakeAmount, BASE_UNITS_PER_TOKEN};
