//! Uniswap V3 Sandwich Bot
//!
//! Main entry point.
//!
//! Modes:
//! - run      : watch pending Universal Router swaps, evaluate each against a
//!              fresh pool snapshot, submit front/back-run when profitable
//! - snapshot : dump one pool's current snapshot as JSON
//! - replay   : evaluate a calldata blob against a saved snapshot (offline)
//! - scan     : detect historical sandwiches in a pool's Swap events
//!
//! Architecture:
//! - One WS provider for RPC reads (and signing when live)
//! - The mempool monitor keeps its own subscription and reconnects on drop
//! - SIGINT/SIGTERM stop the monitor; an in-flight execution gets a grace
//!   period to finish before exit
//!
//! Created: 2026-10-19

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder, WsConnect};
use alloy::signers::local::PrivateKeySigner;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use sandwich_bot::config::BotConfig;
use sandwich_bot::execution::{DryRunExecutor, RouterExecutor, TradeExecutor};
use sandwich_bot::mempool::{monitor, CandidateTxDecoder};
use sandwich_bot::pool::{ChainStateSource, PoolSnapshot, PoolStateSource, SnapshotSource};
use sandwich_bot::sandwich::history::{fetch_swap_events, find_sandwiches};
use sandwich_bot::sandwich::{EngineDecision, EngineSettings, SandwichEngine};
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Grace period for an in-flight sandwich after a shutdown signal
const SHUTDOWN_GRACE_SECS: u64 = 30;

/// Uniswap V3 sandwich bot
#[derive(Parser)]
#[command(name = "sandwich-bot", version)]
struct Args {
    /// TOML config file (missing file = defaults + environment)
    #[arg(short, long, env = "SANDWICH_CONFIG", default_value = "config/sandwich.toml")]
    config: PathBuf,

    /// Never send transactions, regardless of config
    #[arg(long)]
    dry_run: bool,

    /// JSON log lines
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Watch the mempool (default)
    Run,
    /// Save a pool snapshot to a JSON file
    Snapshot {
        #[arg(long)]
        pool: Address,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Evaluate a Universal Router calldata blob against a saved snapshot
    Replay {
        /// Snapshot JSON produced by `snapshot`
        #[arg(long)]
        snapshot: PathBuf,
        /// 0x-prefixed execute() calldata
        #[arg(long)]
        calldata: String,
        /// msg.value in wei
        #[arg(long, default_value = "0")]
        value: U256,
        #[arg(long, default_value_t = Address::ZERO)]
        sender: Address,
        /// Input-token decimals for the profit floor
        #[arg(long, default_value_t = 18)]
        decimals: u8,
    },
    /// Find sandwiches in a pool's historical Swap events
    Scan {
        #[arg(long)]
        pool: Address,
        #[arg(long)]
        from_block: u64,
        /// Defaults to the latest block
        #[arg(long)]
        to_block: Option<u64>,
        #[arg(long, default_value_t = 2000)]
        batch_size: u64,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let mut config = BotConfig::load_or_default(&args.config)?;
    if args.dry_run {
        config.strategy.dry_run = true;
    }

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::Snapshot { pool, out } => snapshot(&config, pool, out).await,
        Command::Replay { snapshot, calldata, value, sender, decimals } => {
            replay(&config, snapshot, &calldata, value, sender, decimals).await
        }
        Command::Scan { pool, from_block, to_block, batch_size } => {
            scan(&config, pool, from_block, to_block, batch_size).await
        }
    }
}

// ── run ──────────────────────────────────────────────────────────────

async fn run(config: BotConfig) -> Result<()> {
    info!(
        "Sandwich bot starting | chain_id={} | router={:?} | budget={} | min_profit={} | dry_run={}",
        config.network.chain_id,
        config.network.universal_router,
        config.strategy.attack_budget_wei,
        config.strategy.min_profit,
        config.strategy.dry_run
    );

    let signer = config
        .private_key
        .as_deref()
        .map(|key| key.parse::<PrivateKeySigner>())
        .transpose()
        .context("Invalid PRIVATE_KEY")?;
    let recipient = signer.as_ref().map(|s| s.address()).unwrap_or(Address::ZERO);
    let settings = EngineSettings::from_strategy(&config.strategy, recipient);
    let decoder = CandidateTxDecoder::new(config.network.universal_router);
    let ws = WsConnect::new(&config.network.rpc_url);

    match signer {
        Some(signer) if !config.strategy.dry_run => {
            let provider = Arc::new(
                ProviderBuilder::new()
                    .wallet(signer)
                    .connect_ws(ws)
                    .await
                    .context("WS connect failed")?,
            );
            let block = provider.get_block_number().await?;
            info!("Connected | block={} | wallet={:?} | LIVE", block, recipient);

            let source = chain_source(&config, provider.clone());
            let executor = RouterExecutor::new(provider, config.network.swap_router, recipient);
            serve(&config, SandwichEngine::new(source, executor, decoder, settings)).await
        }
        _ => {
            let provider = Arc::new(ProviderBuilder::new().connect_ws(ws).await.context("WS connect failed")?);
            let block = provider.get_block_number().await?;
            info!("Connected | block={} | DRY RUN", block);

            let source = chain_source(&config, provider);
            serve(&config, SandwichEngine::new(source, DryRunExecutor::new(), decoder, settings)).await
        }
    }
}

fn chain_source<P: Provider + 'static>(config: &BotConfig, provider: Arc<P>) -> ChainStateSource<P> {
    ChainStateSource::new(
        provider,
        config.network.factory,
        config.network.tick_lens,
        config.strategy.tick_word_radius,
    )
}

/// Run the monitor until it fails or a shutdown signal arrives.
async fn serve<S, E>(config: &BotConfig, engine: SandwichEngine<S, E>) -> Result<()>
where
    S: PoolStateSource + 'static,
    E: TradeExecutor + 'static,
{
    let engine = Arc::new(engine);
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let handle = signals.handle();

    let result = tokio::select! {
        r = monitor::run(
            &config.network.rpc_url,
            config.network.universal_router,
            Arc::clone(&engine),
            config.strategy.max_concurrent_evaluations,
        ) => r,
        Some(signal) = signals.next() => {
            info!("Received signal {} - shutting down", signal);
            Ok(())
        }
    };
    handle.close();

    let mut waited = 0;
    while engine.guard().is_busy() && waited < SHUTDOWN_GRACE_SECS * 10 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        waited += 1;
    }
    if engine.guard().is_busy() {
        warn!("Exiting with a sandwich still in flight");
    }

    info!("Final stats | {}", engine.stats());
    result
}

// ── snapshot ─────────────────────────────────────────────────────────

async fn snapshot(config: &BotConfig, pool: Address, out: PathBuf) -> Result<()> {
    let provider = ProviderBuilder::new()
        .connect_ws(WsConnect::new(&config.network.rpc_url))
        .await
        .context("WS connect failed")?;
    let source = chain_source(config, Arc::new(provider));

    let snap = source.snapshot(pool).await?;
    let json = serde_json::to_string_pretty(&snap)?;
    std::fs::write(&out, json).with_context(|| format!("Failed to write {}", out.display()))?;

    info!(
        "Snapshot saved | pool={:?} | block={} | tick={} | ticks={} | {}",
        pool,
        snap.block_number,
        snap.state.tick,
        snap.ticks.len(),
        out.display()
    );
    Ok(())
}

// ── replay ───────────────────────────────────────────────────────────

async fn replay(
    config: &BotConfig,
    snapshot_path: PathBuf,
    calldata: &str,
    value: U256,
    sender: Address,
    decimals: u8,
) -> Result<()> {
    let json = std::fs::read_to_string(&snapshot_path)
        .with_context(|| format!("Failed to read {}", snapshot_path.display()))?;
    let snap: PoolSnapshot = serde_json::from_str(&json).context("Invalid snapshot JSON")?;
    let input = alloy::hex::decode(calldata.trim()).context("Calldata is not valid hex")?;

    info!(
        "Replaying against pool={:?} | block={} | tick={} | liquidity={}",
        snap.pool, snap.block_number, snap.state.tick, snap.state.liquidity
    );

    // Offline: recipient is irrelevant and nothing is sent
    let settings = EngineSettings::from_strategy(&config.strategy, Address::ZERO);
    let engine = SandwichEngine::new(
        SnapshotSource::new(snap, decimals),
        DryRunExecutor::new(),
        CandidateTxDecoder::new(config.network.universal_router),
        settings,
    );

    let decision = engine.handle_pending(TxHash::ZERO, sender, value, &input).await?;
    info!("Decision: {:?}", decision);

    if let EngineDecision::Executed { .. } = decision {
        for trade in engine.executor().submitted() {
            info!(
                "  {:?} -> {:?} | in={} | min_out={}",
                trade.token_in, trade.token_out, trade.amount_in, trade.amount_out_minimum
            );
        }
    }
    Ok(())
}

// ── scan ─────────────────────────────────────────────────────────────

async fn scan(
    config: &BotConfig,
    pool: Address,
    from_block: u64,
    to_block: Option<u64>,
    batch_size: u64,
) -> Result<()> {
    let provider = ProviderBuilder::new()
        .connect(&config.network.rpc_url)
        .await
        .context("RPC connect failed")?;

    let to_block = match to_block {
        Some(block) => block,
        None => provider.get_block_number().await.context("Failed to get block number")?,
    };
    if to_block < from_block {
        bail!("to_block {} is before from_block {}", to_block, from_block);
    }

    info!("Scanning pool={:?} | blocks {}-{} | batch={}", pool, from_block, to_block, batch_size);
    let events = fetch_swap_events(
        &provider,
        pool,
        from_block,
        to_block,
        batch_size,
        Some(config.network.universal_router),
    )
    .await?;

    let found = find_sandwiches(events.iter().cloned());
    for s in &found {
        info!(
            "🥪 block={} | attacker={:?} | victim={:?} | token{} | gain={}",
            s.block_number, s.attacker, s.victim, s.target_token, s.gain
        );
    }

    info!(
        "Scan complete | swaps={} | sandwiches={}",
        events.len(),
        found.len()
    );
    Ok(())
}
