//! Command-line front end for the feeless quota engine.
//!
//! `calc` evaluates the engine offline for a given stake or delegation
//! value.  With the `net` feature, `fetch` reads the account's stake from
//! chain once and `watch` keeps refreshing it on the configured cadence.

use feeless_quota::{
    validate_congestion, CostClass, QuotaReport, StakeAmount, DEFAULT_CONGESTION,
    DEFAULT_DELEGATION_DIVISOR,
};
#[cfg(feature = "net")]
use feeless_quota::{
    net::{
        poll_once, poll_reports, IntervalTicker, PollControl, PollSnapshot, RpcClient,
        StakeReading, StakeSource,
    },
    stake::format_grouped,
    Address, QuotaConfig,
};
use std::env;
use std::num::NonZeroU64;
#[cfg(feature = "net")]
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "net")]
const DEFAULT_CONFIG_PATH: &str = "quota.json";

fn fatal(message: &str) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_help() {
    println!("Usage: quota <calc|costs|fetch|watch> ...");
    println!("  calc (--stake <wei> | --tokens <VC> | --delegation <raw> [--divisor <N>])");
    println!("       [--congestion <0..500>] [--json]");
    println!("  costs");
    if cfg!(feature = "net") {
        println!("  fetch [--config <file>] [--account <0x..>] [--congestion <0..500>] [--json]");
        println!("  watch [--config <file>] [--account <0x..>] [--congestion <0..500>]");
        println!("        [--interval <secs>] [--count <N>] [--json]");
    }
}

fn main() {
    init_logging();
    let mut args = env::args().skip(1);
    let command = args.next();
    match command.as_deref() {
        Some("calc") => cmd_calc(args.collect()),
        Some("costs") => cmd_costs(),
        #[cfg(feature = "net")]
        Some("fetch") => cmd_fetch(args.collect()),
        #[cfg(feature = "net")]
        Some("watch") => cmd_watch(args.collect()),
        Some("-h") | Some("--help") | Some("help") => print_help(),
        _ => {
            print_help();
            std::process::exit(1);
        }
    }
}

fn parse_congestion(value: &str) -> f64 {
    let parsed: f64 = value
        .parse()
        .unwrap_or_else(|_| fatal("invalid --congestion value"));
    validate_congestion(parsed).unwrap_or_else(|err| fatal(&err.to_string()))
}

fn emit_report(report: &QuotaReport, json: bool) {
    if json {
        match serde_json::to_string_pretty(report) {
            Ok(text) => println!("{text}"),
            Err(err) => fatal(&format!("failed to encode report: {err}")),
        }
    } else {
        print!("{report}");
    }
}

fn cmd_calc(args: Vec<String>) {
    let mut stake: Option<StakeAmount> = None;
    let mut delegation: Option<StakeAmount> = None;
    let mut divisor = DEFAULT_DELEGATION_DIVISOR;
    let mut congestion = DEFAULT_CONGESTION;
    let mut json = false;
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--stake" => {
                let value = iter
                    .next()
                    .unwrap_or_else(|| fatal("--stake expects a value"));
                stake = Some(
                    value
                        .parse()
                        .unwrap_or_else(|err| fatal(&format!("invalid --stake: {err}"))),
                );
            }
            "--tokens" => {
                let value = iter
                    .next()
                    .unwrap_or_else(|| fatal("--tokens expects a value"));
                let tokens: u64 = value
                    .parse()
                    .unwrap_or_else(|_| fatal("invalid --tokens value"));
                stake = Some(
                    StakeAmount::from_tokens(tokens)
                        .unwrap_or_else(|| fatal("--tokens value is too large")),
                );
            }
            "--delegation" => {
                let value = iter
                    .next()
                    .unwrap_or_else(|| fatal("--delegation expects a value"));
                delegation = Some(
                    value
                        .parse()
                        .unwrap_or_else(|err| fatal(&format!("invalid --delegation: {err}"))),
                );
            }
            "--divisor" => {
                let value = iter
                    .next()
                    .unwrap_or_else(|| fatal("--divisor expects a value"));
                divisor = value
                    .parse::<NonZeroU64>()
                    .unwrap_or_else(|_| fatal("--divisor must be a positive integer"));
            }
            "--congestion" => {
                let value = iter
                    .next()
                    .unwrap_or_else(|| fatal("--congestion expects a value"));
                congestion = parse_congestion(&value);
            }
            "--json" => json = true,
            other => fatal(&format!("unknown argument: {other}")),
        }
    }
    let report = match (stake, delegation) {
        (Some(amount), None) => QuotaReport::from_stake(amount, congestion),
        (None, Some(raw)) => QuotaReport::from_delegation(raw, divisor, congestion),
        (Some(_), Some(_)) => fatal("use either --stake/--tokens or --delegation, not both"),
        (None, None) => fatal("calc needs --stake, --tokens or --delegation"),
    };
    emit_report(&report, json);
}

fn cmd_costs() {
    for class in CostClass::ALL {
        let approx = if class.is_estimate() { "~" } else { "" };
        println!("{:<26} {approx}{}", class.label(), class.cost());
    }
}

#[cfg(feature = "net")]
struct NetArgs {
    config: QuotaConfig,
    json: bool,
    count: Option<u64>,
}

#[cfg(feature = "net")]
fn parse_net_args(args: Vec<String>, allow_watch_flags: bool) -> NetArgs {
    let mut config_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    let mut account: Option<Address> = None;
    let mut congestion: Option<f64> = None;
    let mut interval: Option<u64> = None;
    let mut count: Option<u64> = None;
    let mut json = false;
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                config_path = PathBuf::from(
                    iter.next()
                        .unwrap_or_else(|| fatal("--config expects a value")),
                );
            }
            "--account" => {
                let value = iter
                    .next()
                    .unwrap_or_else(|| fatal("--account expects a value"));
                account = Some(
                    value
                        .parse()
                        .unwrap_or_else(|err| fatal(&format!("invalid --account: {err}"))),
                );
            }
            "--congestion" => {
                let value = iter
                    .next()
                    .unwrap_or_else(|| fatal("--congestion expects a value"));
                congestion = Some(parse_congestion(&value));
            }
            "--interval" if allow_watch_flags => {
                let value = iter
                    .next()
                    .unwrap_or_else(|| fatal("--interval expects a value"));
                interval = Some(
                    value
                        .parse()
                        .unwrap_or_else(|_| fatal("invalid --interval value")),
                );
            }
            "--count" if allow_watch_flags => {
                let value = iter
                    .next()
                    .unwrap_or_else(|| fatal("--count expects a value"));
                count = Some(
                    value
                        .parse()
                        .unwrap_or_else(|_| fatal("invalid --count value")),
                );
            }
            "--json" => json = true,
            other => fatal(&format!("unknown argument: {other}")),
        }
    }
    let mut config =
        QuotaConfig::load(&config_path).unwrap_or_else(|err| fatal(&err.to_string()));
    if account.is_some() {
        config.account = account;
    }
    if let Some(c) = congestion {
        config.congestion = c;
    }
    if let Some(secs) = interval {
        config.poll_interval_secs = secs;
    }
    config.validate().unwrap_or_else(|err| fatal(&err.to_string()));
    NetArgs {
        config,
        json,
        count,
    }
}

#[cfg(feature = "net")]
fn build_runtime() -> tokio::runtime::Runtime {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    builder
        .build()
        .unwrap_or_else(|err| fatal(&format!("failed to start runtime: {err}")))
}

#[cfg(feature = "net")]
fn connect(config: &QuotaConfig) -> RpcClient {
    RpcClient::new(config.rpc_url.clone(), config.request_timeout())
        .unwrap_or_else(|err| fatal(&err.to_string()))
}

#[cfg(feature = "net")]
fn emit_snapshot(snapshot: &PollSnapshot, json: bool) {
    if json {
        match serde_json::to_string(snapshot) {
            Ok(text) => println!("{text}"),
            Err(err) => eprintln!("failed to encode snapshot: {err}"),
        }
        return;
    }
    println!("Wallet:           {}", snapshot.account.short());
    if let Some(status) = &snapshot.network {
        println!(
            "Network:          {:.2} gwei, block {}",
            status.gas_price_gwei(),
            format_grouped(status.block_number as f64, 0)
        );
    }
    match &snapshot.reading {
        StakeReading::NoStake => {
            println!("No stake found; stake VC with a validator to earn feeless quota.")
        }
        StakeReading::TransportError(detail) => {
            println!("Error loading stake data (will retry): {detail}");
            return;
        }
        StakeReading::Invalid(detail) => {
            println!("Stake data unusable: {detail}");
            return;
        }
        StakeReading::Value(_) => {}
    }
    if let Some(report) = &snapshot.report {
        print!("{report}");
    }
}

#[cfg(feature = "net")]
fn cmd_fetch(args: Vec<String>) {
    let NetArgs { config, json, .. } = parse_net_args(args, false);
    let account = config
        .account
        .unwrap_or_else(|| fatal("no account configured; pass --account or set FQ_ACCOUNT"));
    let source = StakeSource::from(config.source);
    let runtime = build_runtime();
    runtime.block_on(async {
        let client = connect(&config);
        client
            .ensure_chain(config.chain_id)
            .await
            .unwrap_or_else(|err| fatal(&format!("{err}; check the configured RPC endpoint")));
        let snapshot = poll_once(&client, &source, account, config.congestion).await;
        emit_snapshot(&snapshot, json);
    });
}

#[cfg(feature = "net")]
fn cmd_watch(args: Vec<String>) {
    let NetArgs {
        config,
        json,
        count,
    } = parse_net_args(args, true);
    let account = config
        .account
        .unwrap_or_else(|| fatal("no account configured; pass --account or set FQ_ACCOUNT"));
    let source = StakeSource::from(config.source);
    let runtime = build_runtime();
    runtime.block_on(async {
        let client = connect(&config);
        client
            .ensure_chain(config.chain_id)
            .await
            .unwrap_or_else(|err| fatal(&format!("{err}; check the configured RPC endpoint")));
        let mut ticker = IntervalTicker::new(config.poll_interval());
        let mut seen = 0u64;
        let poll = poll_reports(
            &client,
            &source,
            account,
            config.congestion,
            &mut ticker,
            |snapshot| {
                emit_snapshot(&snapshot, json);
                seen += 1;
                match count {
                    Some(limit) if seen >= limit => PollControl::Stop,
                    _ => PollControl::Continue,
                }
            },
        );
        tokio::select! {
            polls = poll => tracing::info!(polls, "watch finished"),
            _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
        }
    });
}
