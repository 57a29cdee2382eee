//! Mempool Monitor: Pending Transaction Loop
//!
//! Purpose:
//!     Subscribe to full pending transactions over WebSocket, keep the ones
//!     sent to the Universal Router, and hand each to the sandwich engine in
//!     its own task.
//!
//! Created: 2026-10-19
//!
//! Dependencies:
//!     - alloy (WS provider, pending tx subscription)
//!     - tokio (spawn, Semaphore, select!, interval)
//!
//! Notes:
//!     - Evaluations are capped by a semaphore; when every slot is busy new
//!       candidates are dropped rather than queued (a queued candidate is stale)
//!     - Subscription errors reconnect with a fixed 5s delay, up to MAX_RECONNECTS

use std::sync::Arc;

use alloy::consensus::Transaction as ConsensusTx;
use alloy::network::TransactionResponse;
use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder, WsConnect};
use anyhow::{bail, Context, Result};
use futures::StreamExt;
use tokio::sync::Semaphore;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};

use crate::execution::TradeExecutor;
use crate::pool::v3_syncer::PoolStateSource;
use crate::sandwich::engine::SandwichEngine;

const MAX_RECONNECTS: u32 = 50;
const STATS_INTERVAL_SECS: u64 = 60;

/// Run the monitor until the subscription can no longer be restored.
pub async fn run<S, E>(
    rpc_url: &str,
    router: Address,
    engine: Arc<SandwichEngine<S, E>>,
    max_concurrent: usize,
) -> Result<()>
where
    S: PoolStateSource + 'static,
    E: TradeExecutor + 'static,
{
    info!(
        "Mempool monitor starting | router={:?} | max_concurrent={} | live={}",
        router,
        max_concurrent,
        engine.executor().is_live()
    );

    let slots = Arc::new(Semaphore::new(max_concurrent));
    let mut reconnects = 0u32;

    loop {
        match run_inner(rpc_url, router, &engine, &slots).await {
            Ok(()) => {
                info!("Mempool monitor exited cleanly");
                return Ok(());
            }
            Err(e) => {
                reconnects += 1;
                if reconnects > MAX_RECONNECTS {
                    error!(
                        "Mempool monitor: {} reconnects exhausted — giving up: {:#}",
                        MAX_RECONNECTS, e
                    );
                    return Err(e);
                }
                warn!(
                    "Mempool monitor error (reconnect {}/{}): {:#} — retrying in 5s...",
                    reconnects, MAX_RECONNECTS, e
                );
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }
}

/// One WS session. Returns Err on connection or stream failure (caller retries).
async fn run_inner<S, E>(
    rpc_url: &str,
    router: Address,
    engine: &Arc<SandwichEngine<S, E>>,
    slots: &Arc<Semaphore>,
) -> Result<()>
where
    S: PoolStateSource + 'static,
    E: TradeExecutor + 'static,
{
    let provider = ProviderBuilder::new()
        .connect_ws(WsConnect::new(rpc_url))
        .await
        .context("Mempool WS connect failed")?;

    let subscription = provider
        .subscribe_full_pending_transactions()
        .await
        .context("Pending transaction subscription failed")?;
    let mut stream = subscription.into_stream();
    info!("Subscribed to pending transactions");

    let mut stats_tick = interval(Duration::from_secs(STATS_INTERVAL_SECS));
    stats_tick.tick().await;

    loop {
        tokio::select! {
            next = stream.next() => {
                let Some(tx) = next else {
                    bail!("Pending transaction stream ended");
                };
                if ConsensusTx::to(&tx) != Some(router) {
                    continue;
                }
                let tx_hash = TransactionResponse::tx_hash(&tx);

                let Ok(permit) = slots.clone().try_acquire_owned() else {
                    debug!("Evaluation slots full, dropping {:?}", tx_hash);
                    continue;
                };

                let engine = Arc::clone(engine);
                let sender = TransactionResponse::from(&tx);
                let value = ConsensusTx::value(&tx);
                let input = ConsensusTx::input(&tx).clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    // Outcome is logged and counted by the engine
                    let _ = engine.handle_pending(tx_hash, sender, value, &input).await;
                });
            }
            _ = stats_tick.tick() => {
                info!("📊 Mempool stats | {}", engine.stats());
            }
        }
    }
}
