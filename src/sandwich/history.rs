//! Historical Sandwich Scan
//!
//! Purpose:
//!     Find sandwiches that already happened in a pool by pattern-matching
//!     consecutive `Swap` events: attacker buys, victim buys the same way,
//!     attacker sells back about what it bought at a gain.
//!
//! Created: 2026-10-19
//!
//! Notes:
//!     - The matcher keeps a window of at most three events. A failed triple
//!       drops its first two events, so a noise swap in the same direction as
//!       a real front-run can hide that sandwich
//!     - Swaps whose recipient is the router itself are not attacker or victim
//!       legs; callers filter them out before matching
//!
//! Dependencies:
//!     - alloy (log fetching, Swap event decoding)

use std::collections::VecDeque;

use alloy::primitives::{Address, TxHash, I256, U256};
use alloy::providers::Provider;
use alloy::rpc::types::{Filter, Log};
use alloy::sol_types::SolEvent;
use anyhow::{Context, Result};
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

use crate::contracts::UniswapV3Pool;

/// Maximum retries per batch on RPC failure
const MAX_RETRIES: u32 = 3;

/// A pool `Swap` event, signed from the pool's perspective
/// (positive = paid into the pool, negative = paid out).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapEvent {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub recipient: Address,
    pub amount0: I256,
    pub amount1: I256,
}

impl SwapEvent {
    /// Decode a raw log; None for non-Swap or pending logs.
    pub fn from_log(log: &Log) -> Option<Self> {
        let decoded = log.log_decode::<UniswapV3Pool::Swap>().ok()?;
        let swap = decoded.inner.data;
        Some(Self {
            tx_hash: log.transaction_hash?,
            block_number: log.block_number?,
            recipient: swap.recipient,
            amount0: swap.amount0,
            amount1: swap.amount1,
        })
    }

    fn amount(&self, index: usize) -> I256 {
        if index == 0 {
            self.amount0
        } else {
            self.amount1
        }
    }

    /// Direction marker: token1 flowed into the pool
    fn pays_token1(&self) -> bool {
        self.amount1.is_positive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedSandwich {
    pub front_run: TxHash,
    pub victim: TxHash,
    pub back_run: TxHash,
    pub block_number: u64,
    pub attacker: Address,
    pub victim_recipient: Address,
    /// Pool token index (0/1) the attacker bought and sold back
    pub target_token: usize,
    /// Attacker gain in the token it paid with
    pub gain: I256,
}

/// Check whether (front, victim, back) form a sandwich.
fn match_triple(front: &SwapEvent, victim: &SwapEvent, back: &SwapEvent) -> Option<DetectedSandwich> {
    if back.recipient != front.recipient {
        return None;
    }

    // Token the front-run took out of the pool, token the back-run put in
    let bought = if front.amount0 >= I256::ZERO { 1 } else { 0 };
    let sold = if back.amount0 <= I256::ZERO { 1 } else { 0 };
    if bought != sold {
        return None;
    }

    let gain = -(back.amount(1 - sold) + front.amount(1 - bought));
    if gain <= I256::ZERO {
        return None;
    }

    // Must sell back within 0.1% of the amount bought
    let diff = (front.amount(bought) + back.amount(sold)).unsigned_abs();
    let bought_amount = front.amount(bought).unsigned_abs();
    if diff.saturating_mul(U256::from(1000u64)) >= bought_amount {
        return None;
    }

    Some(DetectedSandwich {
        front_run: front.tx_hash,
        victim: victim.tx_hash,
        back_run: back.tx_hash,
        block_number: front.block_number,
        attacker: front.recipient,
        victim_recipient: victim.recipient,
        target_token: bought,
        gain,
    })
}

/// Scan an ordered event sequence for sandwiches. Matched events are consumed.
pub fn find_sandwiches<I>(events: I) -> Vec<DetectedSandwich>
where
    I: IntoIterator<Item = SwapEvent>,
{
    let mut window: VecDeque<SwapEvent> = VecDeque::with_capacity(3);
    let mut found = Vec::new();

    for event in events {
        window.push_back(event);
        match window.len() {
            2 => {
                let (front, victim) = (&window[0], &window[1]);
                if victim.recipient == front.recipient || victim.pays_token1() != front.pays_token1() {
                    window.pop_front();
                }
            }
            3 => match match_triple(&window[0], &window[1], &window[2]) {
                Some(sandwich) => {
                    debug!(
                        "Sandwich found | block={} | attacker={:?} | gain={}",
                        sandwich.block_number, sandwich.attacker, sandwich.gain
                    );
                    found.push(sandwich);
                    window.clear();
                }
                None => {
                    window.pop_front();
                    window.pop_front();
                }
            },
            _ => {}
        }
    }

    found
}

/// Fetch `Swap` events of `pool` in [from_block, to_block], `batch_size` blocks at a time.
/// Events with `recipient == exclude` (the router) are dropped.
pub async fn fetch_swap_events<P: Provider>(
    provider: &P,
    pool: Address,
    from_block: u64,
    to_block: u64,
    batch_size: u64,
    exclude: Option<Address>,
) -> Result<Vec<SwapEvent>> {
    let batch_size = batch_size.max(1);
    let mut events = Vec::new();
    let mut batch_start = from_block;

    while batch_start <= to_block {
        let batch_end = batch_start.saturating_add(batch_size - 1).min(to_block);

        let filter = Filter::new()
            .from_block(batch_start)
            .to_block(batch_end)
            .address(pool)
            .event_signature(UniswapV3Pool::Swap::SIGNATURE_HASH);

        // Fetch logs with retry
        let logs = {
            let mut attempt = 0;
            loop {
                match provider.get_logs(&filter).await {
                    Ok(logs) => break logs,
                    Err(e) => {
                        attempt += 1;
                        if attempt >= MAX_RETRIES {
                            return Err(e).with_context(|| {
                                format!("Failed to fetch logs for blocks {}-{}", batch_start, batch_end)
                            });
                        }
                        warn!(
                            "Retry {}/{} for blocks {}-{}: {}",
                            attempt, MAX_RETRIES, batch_start, batch_end, e
                        );
                        sleep(Duration::from_millis(1000 * 2u64.pow(attempt))).await;
                    }
                }
            }
        };

        let before = events.len();
        events.extend(
            logs.iter()
                .filter_map(SwapEvent::from_log)
                .filter(|e| Some(e.recipient) != exclude),
        );
        debug!(
            "Fetched swaps | blocks {}-{} | logs={} | kept={}",
            batch_start,
            batch_end,
            logs.len(),
            events.len() - before
        );

        match batch_end.checked_add(1) {
            Some(next) => batch_start = next,
            None => break,
        }
    }

    Ok(events)
}
