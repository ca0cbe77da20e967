//! Refresh scheduling and the polling loop.
//!
//! Polling is driven by an injected [`Ticker`] so the cadence stays outside
//! the engine and tests can step it by hand.

use crate::net::rpc::{ContractReader, NetworkStatus};
use crate::net::source::{StakeReading, StakeSource};
use crate::report::QuotaReport;
use crate::stake::Address;
use serde::Serialize;
use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{info, warn};

/// A source of refresh instants.
pub trait Ticker: Send {
    /// Resolves at the next refresh instant.
    fn tick(&mut self) -> impl Future<Output = ()> + Send;
}

/// Tokio interval ticker; the first tick fires immediately.
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    /// Ticks every `period`, delaying rather than bursting after a stall.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(period: Duration) -> Self {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// Everything observed on one refresh.
#[derive(Debug, Clone, Serialize)]
pub struct PollSnapshot {
    /// Account queried.
    pub account: Address,
    /// Raw outcome of the contract read.
    pub reading: StakeReading,
    /// Report for the committed reading; `None` after a failed read.
    pub report: Option<QuotaReport>,
    /// Gas price and head block, if the status query succeeded.
    pub network: Option<NetworkStatus>,
    /// Wall-clock time of the poll in milliseconds.
    pub polled_at_ms: u64,
}

/// Whether the poll loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollControl {
    /// Wait for the next tick.
    Continue,
    /// Return from the loop.
    Stop,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Performs one refresh.
pub async fn poll_once<R: ContractReader>(
    reader: &R,
    source: &StakeSource,
    account: Address,
    congestion: f64,
) -> PollSnapshot {
    let reading = source.read(reader, &account).await;
    let report = source
        .commit(&reading)
        .map(|basis| QuotaReport::compute(basis, congestion));
    let network = match reader.network_status().await {
        Ok(status) => Some(status),
        Err(err) => {
            warn!(%err, "network status unavailable");
            None
        }
    };
    PollSnapshot {
        account,
        reading,
        report,
        network,
        polled_at_ms: now_millis(),
    }
}

/// Refreshes on every tick and hands each snapshot to `sink` until it
/// returns [`PollControl::Stop`].  Returns the number of polls made.
pub async fn poll_reports<R, T, F>(
    reader: &R,
    source: &StakeSource,
    account: Address,
    congestion: f64,
    ticker: &mut T,
    mut sink: F,
) -> u64
where
    R: ContractReader,
    T: Ticker,
    F: FnMut(PollSnapshot) -> PollControl,
{
    let mut polls = 0u64;
    loop {
        ticker.tick().await;
        let snapshot = poll_once(reader, source, account, congestion).await;
        polls += 1;
        info!(
            poll = polls,
            source = source.name(),
            account = %account.short(),
            quota = snapshot.report.as_ref().map(|r| r.quota_total),
            "quota refreshed"
        );
        if sink(snapshot) == PollControl::Stop {
            return polls;
        }
    }
}
