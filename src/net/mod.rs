//! Chain access for the quota engine.
//!
//! These modules are gated behind the `net` Cargo feature and provide the
//! functionality required by the `quota fetch` and `quota watch` commands:
//! ABI encoding for the stake contracts, a JSON-RPC transport, the stake
//! source policies, and the refresh loop.

#![cfg(feature = "net")]

/// Selectors, call-data encoding and return-word decoding.
pub mod abi;
/// JSON-RPC transport and the contract reader abstraction.
pub mod rpc;
/// Stake source policies and typed read outcomes.
pub mod source;
/// Injected refresh ticker and polling loop.
pub mod ticker;

pub use abi::AbiError;
pub use rpc::{interpret_response, parse_quantity, CallError, ContractReader, NetworkStatus, RpcClient};
pub use source::{StakeReading, StakeSource};
pub use ticker::{poll_once, poll_reports, IntervalTicker, PollControl, PollSnapshot, Ticker};
