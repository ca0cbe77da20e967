//! Stake sources: which contract read supplies the quota basis.
//!
//! The two policies are mutually exclusive.  `getStake` feeds the
//! saturation formula; `delegations` is divided by a fixed divisor and used
//! as the quota total directly.  Either way the read collapses to a
//! [`StakeReading`], so the engine only ever sees a committed amount.

use crate::config::SourceConfig;
use crate::net::abi::{self, DELEGATIONS, GET_STAKE, GET_STAKE_FOR_VALIDATOR};
use crate::net::rpc::{CallError, ContractReader};
use crate::report::QuotaBasis;
use crate::stake::{Address, StakeAmount};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;
use tracing::{error, warn};

/// Outcome of one contract read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum StakeReading {
    /// A non-zero amount.
    Value(StakeAmount),
    /// The account has nothing staked (zero value or reverted read).
    NoStake,
    /// The read failed and may be retried.
    TransportError(String),
    /// The read failed in a way retrying will not fix (bad return data,
    /// wrong network).
    Invalid(String),
}

/// A contract read policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakeSource {
    /// `getStake(address[,uint256])` on the staking contract.
    ContractStake {
        /// Staking contract.
        contract: Address,
        /// Optional validator id argument.
        validator_id: Option<u64>,
    },
    /// `delegations(address)` on the SFC contract.
    Delegations {
        /// SFC contract.
        contract: Address,
        /// Divisor turning the raw value into a quota total.
        divisor: NonZeroU64,
    },
}

impl From<SourceConfig> for StakeSource {
    fn from(cfg: SourceConfig) -> Self {
        match cfg {
            SourceConfig::Stake {
                contract,
                validator_id,
            } => StakeSource::ContractStake {
                contract,
                validator_id,
            },
            SourceConfig::Delegations { contract, divisor } => {
                StakeSource::Delegations { contract, divisor }
            }
        }
    }
}

impl StakeSource {
    /// Label for logs.
    pub fn name(&self) -> &'static str {
        match self {
            StakeSource::ContractStake { .. } => "contract-stake",
            StakeSource::Delegations { .. } => "delegations",
        }
    }

    /// Contract address and call data for `account`.
    pub fn call_for(&self, account: &Address) -> (Address, Vec<u8>) {
        match *self {
            StakeSource::ContractStake {
                contract,
                validator_id: Some(id),
            } => (
                contract,
                abi::encode_call(
                    *GET_STAKE_FOR_VALIDATOR,
                    &[abi::encode_address(account), abi::encode_uint(id.into())],
                ),
            ),
            StakeSource::ContractStake {
                contract,
                validator_id: None,
            } => (
                contract,
                abi::encode_call(*GET_STAKE, &[abi::encode_address(account)]),
            ),
            StakeSource::Delegations { contract, .. } => (
                contract,
                abi::encode_call(*DELEGATIONS, &[abi::encode_address(account)]),
            ),
        }
    }

    /// Reads `account` through `reader`.
    ///
    /// The zero address is never queried.  Reverts and zero values map to
    /// [`StakeReading::NoStake`].  Transient failures (see
    /// [`CallError::is_transient`]) become [`StakeReading::TransportError`];
    /// undecodable data and other permanent failures become
    /// [`StakeReading::Invalid`].
    pub async fn read<R: ContractReader>(&self, reader: &R, account: &Address) -> StakeReading {
        if account.is_zero() {
            return StakeReading::NoStake;
        }
        let (to, data) = self.call_for(account);
        match reader.call(to, data).await {
            Ok(bytes) => match abi::decode_amount(&bytes) {
                Ok(amount) if amount.is_zero() => StakeReading::NoStake,
                Ok(amount) => StakeReading::Value(amount),
                Err(err) => {
                    error!(source = self.name(), %account, %err, "undecodable stake result");
                    StakeReading::Invalid(err.to_string())
                }
            },
            Err(CallError::Reverted(reason)) => {
                warn!(source = self.name(), %account, %reason, "stake read reverted; treating as no stake");
                StakeReading::NoStake
            }
            Err(err) if err.is_transient() => {
                warn!(source = self.name(), %account, %err, "stake read failed; will retry");
                StakeReading::TransportError(err.to_string())
            }
            Err(err) => {
                error!(source = self.name(), %account, %err, "stake read unusable");
                StakeReading::Invalid(err.to_string())
            }
        }
    }

    /// Commits a reading to a quota basis; failed reads commit nothing.
    pub fn commit(&self, reading: &StakeReading) -> Option<QuotaBasis> {
        let amount = match reading {
            StakeReading::Value(amount) => *amount,
            StakeReading::NoStake => StakeAmount::ZERO,
            StakeReading::TransportError(_) | StakeReading::Invalid(_) => return None,
        };
        Some(match *self {
            StakeSource::ContractStake { .. } => QuotaBasis::Stake { amount },
            StakeSource::Delegations { divisor, .. } => QuotaBasis::Delegation {
                raw: amount,
                divisor,
            },
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{DEFAULT_SFC_CONTRACT, DEFAULT_STAKE_CONTRACT};
    use crate::net::rpc::NetworkStatus;
    use crate::report::DEFAULT_DELEGATION_DIVISOR;
    use std::sync::Mutex;

    /// In-memory reader returning canned responses and recording calls.
    pub(crate) struct FakeReader {
        pub response: Result<Vec<u8>, CallError>,
        pub status: Result<NetworkStatus, CallError>,
        pub calls: Mutex<Vec<(Address, Vec<u8>)>>,
    }

    impl FakeReader {
        pub(crate) fn returning(response: Result<Vec<u8>, CallError>) -> Self {
            Self {
                response,
                status: Ok(NetworkStatus {
                    gas_price_wei: 2_000_000_000,
                    block_number: 42,
                }),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn amount(units: u128) -> Self {
            Self::returning(Ok(abi::encode_uint(units).to_vec()))
        }
    }

    impl ContractReader for FakeReader {
        async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, CallError> {
            self.calls.lock().unwrap().push((to, data));
            self.response.clone()
        }

        async fn network_status(&self) -> Result<NetworkStatus, CallError> {
            self.status.clone()
        }
    }

    fn account() -> Address {
        Address::from_bytes([0xab; 20])
    }

    fn stake_source() -> StakeSource {
        StakeSource::from(SourceConfig::default())
    }

    #[tokio::test]
    async fn value_is_read_from_get_stake() {
        let reader = FakeReader::amount(5_000);
        let reading = stake_source().read(&reader, &account()).await;
        assert_eq!(
            reading,
            StakeReading::Value(StakeAmount::from_base_units(5_000))
        );
        let calls = reader.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, DEFAULT_STAKE_CONTRACT);
        assert_eq!(&calls[0].1[..4], &GET_STAKE_FOR_VALIDATOR[..]);
        assert_eq!(calls[0].1.len(), 68);
    }

    #[tokio::test]
    async fn revert_and_zero_mean_no_stake() {
        let reverted = FakeReader::returning(Err(CallError::Reverted("nope".into())));
        assert_eq!(
            stake_source().read(&reverted, &account()).await,
            StakeReading::NoStake
        );
        let zero = FakeReader::amount(0);
        assert_eq!(
            stake_source().read(&zero, &account()).await,
            StakeReading::NoStake
        );
    }

    #[tokio::test]
    async fn transport_failures_are_surfaced() {
        let reader = FakeReader::returning(Err(CallError::Transport("timeout".into())));
        let reading = stake_source().read(&reader, &account()).await;
        assert!(matches!(reading, StakeReading::TransportError(ref d) if d.contains("timeout")));
        assert_eq!(stake_source().commit(&reading), None);

        let rpc = FakeReader::returning(Err(CallError::Rpc {
            code: -32000,
            message: "header not found".into(),
        }));
        assert!(matches!(
            stake_source().read(&rpc, &account()).await,
            StakeReading::TransportError(ref d) if d.contains("header not found")
        ));
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retryable() {
        let short = FakeReader::returning(Ok(vec![1, 2, 3]));
        let reading = stake_source().read(&short, &account()).await;
        assert!(matches!(reading, StakeReading::Invalid(_)));
        assert_eq!(stake_source().commit(&reading), None);

        let garbled = FakeReader::returning(Err(CallError::Decode("bad hex".into())));
        assert!(matches!(
            stake_source().read(&garbled, &account()).await,
            StakeReading::Invalid(ref d) if d.contains("bad hex")
        ));

        let wrong_chain = FakeReader::returning(Err(CallError::WrongChain {
            expected: 207,
            actual: 1,
        }));
        assert!(matches!(
            stake_source().read(&wrong_chain, &account()).await,
            StakeReading::Invalid(_)
        ));
    }

    #[tokio::test]
    async fn zero_address_is_never_queried() {
        let reader = FakeReader::amount(1);
        assert_eq!(
            stake_source().read(&reader, &Address::ZERO).await,
            StakeReading::NoStake
        );
        assert!(reader.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn single_argument_form_when_no_validator() {
        let source = StakeSource::ContractStake {
            contract: DEFAULT_STAKE_CONTRACT,
            validator_id: None,
        };
        let (_, data) = source.call_for(&account());
        assert_eq!(&data[..4], &GET_STAKE[..]);
        assert_eq!(data.len(), 36);
    }

    #[test]
    fn commit_follows_policy() {
        let delegations = StakeSource::from(SourceConfig::Delegations {
            contract: DEFAULT_SFC_CONTRACT,
            divisor: DEFAULT_DELEGATION_DIVISOR,
        });
        let amount = StakeAmount::from_base_units(9);
        assert_eq!(
            delegations.commit(&StakeReading::Value(amount)),
            Some(QuotaBasis::Delegation {
                raw: amount,
                divisor: DEFAULT_DELEGATION_DIVISOR
            })
        );
        assert_eq!(
            stake_source().commit(&StakeReading::NoStake),
            Some(QuotaBasis::Stake {
                amount: StakeAmount::ZERO
            })
        );
        assert_eq!(delegations.name(), "delegations");
    }
}
