//! Uniswap V3 Pool Snapshots
//!
//! Fetches a point-in-time view of one V3 pool (slot0, liquidity, fee,
//! spacing, token order) plus the initialized ticks around the current
//! price, and hands it to the simulator as a `PoolSnapshot`.
//!
//! Tick loading:
//! - tickBitmap(word) for every word within `word_radius` of the current word
//! - TickLens.getPopulatedTicksInWord for the non-empty ones
//! - The resulting TickStore remembers the loaded word range, so a swap that
//!   walks past it fails instead of silently seeing no liquidity
//!
//! All reads for one snapshot are pinned to the same block. Nothing is cached
//! across snapshots except token decimals.
//!
//! Created: 2026-10-19

use std::ops::RangeInclusive;
use std::sync::Arc;

use alloy::eips::BlockId;
use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::state::PoolState;
use super::tick_store::{Tick, TickStore};
use crate::contracts::{fee_to_u24, ITickLens, UniswapV3Factory, UniswapV3Pool, IERC20};
use crate::error::SimResult;
use crate::math::tick_math::{MAX_TICK, MIN_TICK};

/// Everything one evaluation needs from chain, serializable for replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub pool: Address,
    pub token0: Address,
    pub token1: Address,
    pub state: PoolState,
    pub ticks: Vec<Tick>,
    /// Inclusive bitmap word range the ticks were loaded from (None = complete)
    pub loaded_words: Option<(i16, i16)>,
    pub block_number: u64,
}

impl PoolSnapshot {
    /// Build the per-evaluation tick store.
    pub fn tick_store(&self) -> SimResult<TickStore> {
        let store = TickStore::new(self.ticks.iter().copied(), self.state.tick_spacing)?;
        Ok(match self.loaded_words {
            Some((lo, hi)) => store.with_loaded_words(lo..=hi),
            None => store,
        })
    }
}

/// Read access to pool state.
#[async_trait]
pub trait PoolStateSource: Send + Sync {
    /// Pool for a pair and fee tier, None if the factory has none.
    async fn pool_address(&self, token_a: Address, token_b: Address, fee: u32) -> Result<Option<Address>>;

    async fn snapshot(&self, pool: Address) -> Result<PoolSnapshot>;

    async fn token_decimals(&self, token: Address) -> Result<u8>;
}

/// Serves one fixed snapshot (offline replay). Every token reports `decimals`.
pub struct SnapshotSource {
    snapshot: PoolSnapshot,
    decimals: u8,
}

impl SnapshotSource {
    pub fn new(snapshot: PoolSnapshot, decimals: u8) -> Self {
        Self { snapshot, decimals }
    }
}

#[async_trait]
impl PoolStateSource for SnapshotSource {
    async fn pool_address(&self, token_a: Address, token_b: Address, fee: u32) -> Result<Option<Address>> {
        let snap = &self.snapshot;
        let same_pair = (token_a == snap.token0 && token_b == snap.token1)
            || (token_a == snap.token1 && token_b == snap.token0);
        Ok((same_pair && fee == snap.state.fee_pips).then_some(snap.pool))
    }

    async fn snapshot(&self, pool: Address) -> Result<PoolSnapshot> {
        if pool != self.snapshot.pool {
            return Err(anyhow!("no snapshot for pool {:?}", pool));
        }
        Ok(self.snapshot.clone())
    }

    async fn token_decimals(&self, _token: Address) -> Result<u8> {
        Ok(self.decimals)
    }
}

/// Bitmap words to load: `radius` on each side of the current tick's word,
/// clipped to the words the tick range can occupy.
pub fn word_window(tick: i32, tick_spacing: i32, radius: i16) -> RangeInclusive<i16> {
    let word_of = |t: i32| (t.div_euclid(tick_spacing) >> 8) as i16;
    let (min_word, max_word) = (word_of(MIN_TICK), word_of(MAX_TICK));
    let center = word_of(tick.clamp(MIN_TICK, MAX_TICK));
    let lo = center.saturating_sub(radius).max(min_word);
    let hi = center.saturating_add(radius).min(max_word);
    lo..=hi
}

/// PoolStateSource backed by an alloy provider.
pub struct ChainStateSource<P> {
    provider: Arc<P>,
    factory: Address,
    tick_lens: Address,
    word_radius: i16,
    /// Token decimals never change, safe to share across evaluations
    decimals_cache: DashMap<Address, u8>,
}

impl<P: Provider + 'static> ChainStateSource<P> {
    pub fn new(provider: Arc<P>, factory: Address, tick_lens: Address, word_radius: i16) -> Self {
        Self {
            provider,
            factory,
            tick_lens,
            word_radius,
            decimals_cache: DashMap::new(),
        }
    }

    /// Populated ticks in the given words at `block`.
    async fn load_ticks(
        &self,
        pool: Address,
        words: RangeInclusive<i16>,
        block: BlockId,
    ) -> Result<Vec<Tick>> {
        let pool_contract = UniswapV3Pool::new(pool, self.provider.clone());
        let bitmaps = try_join_all(words.map(|word| {
            let call = pool_contract.tickBitmap(word).block(block);
            async move {
                let bitmap = call
                    .call()
                    .await
                    .with_context(|| format!("Failed to get tickBitmap({})", word))?;
                Ok::<_, anyhow::Error>((word, bitmap))
            }
        }))
        .await?;

        let lens = ITickLens::new(self.tick_lens, self.provider.clone());
        let populated = try_join_all(
            bitmaps
                .into_iter()
                .filter(|(_, bitmap)| *bitmap != U256::ZERO)
                .map(|(word, _)| {
                    let call = lens.getPopulatedTicksInWord(pool, word).block(block);
                    async move {
                        call.call()
                            .await
                            .with_context(|| format!("Failed to get populated ticks in word {}", word))
                    }
                }),
        )
        .await?;

        populated
            .into_iter()
            .flatten()
            .map(|t| {
                let index = i32::try_from(t.tick).map_err(|_| anyhow!("tick does not fit i32"))?;
                Ok(Tick::new(index, t.liquidityNet, t.liquidityGross))
            })
            .collect()
    }
}

#[async_trait]
impl<P: Provider + 'static> PoolStateSource for ChainStateSource<P> {
    async fn pool_address(&self, token_a: Address, token_b: Address, fee: u32) -> Result<Option<Address>> {
        // V3 pools sort tokens by address (token0 < token1)
        let (token0, token1) = if token_a < token_b {
            (token_a, token_b)
        } else {
            (token_b, token_a)
        };

        let factory = UniswapV3Factory::new(self.factory, self.provider.clone());
        let pool = factory
            .getPool(token0, token1, fee_to_u24(fee))
            .call()
            .await
            .context("Failed to get V3 pool address")?;

        Ok((pool != Address::ZERO).then_some(pool))
    }

    async fn snapshot(&self, pool: Address) -> Result<PoolSnapshot> {
        let block_number = self
            .provider
            .get_block_number()
            .await
            .context("Failed to get block number")?;
        let block = BlockId::number(block_number);

        let contract = UniswapV3Pool::new(pool, self.provider.clone());
        let slot0_call = contract.slot0().block(block);
        let liq_call = contract.liquidity().block(block);
        let fee_call = contract.fee().block(block);
        let spacing_call = contract.tickSpacing().block(block);
        let token0_call = contract.token0().block(block);
        let token1_call = contract.token1().block(block);
        let (slot0, liquidity, fee, spacing, token0, token1) = tokio::join!(
            slot0_call.call(),
            liq_call.call(),
            fee_call.call(),
            spacing_call.call(),
            token0_call.call(),
            token1_call.call()
        );

        let slot0 = slot0.context("Failed to get slot0")?;
        let tick = i32::try_from(slot0.tick).map_err(|_| anyhow!("slot0 tick does not fit i32"))?;
        let tick_spacing = i32::try_from(spacing.context("Failed to get tickSpacing")?)
            .map_err(|_| anyhow!("tickSpacing does not fit i32"))?;

        let state = PoolState::new(
            U256::from(slot0.sqrtPriceX96),
            tick,
            liquidity.context("Failed to get liquidity")?,
            fee.context("Failed to get fee")?.to::<u32>(),
            tick_spacing,
        )
        .with_context(|| format!("Inconsistent pool state at {:?}", pool))?;

        let words = word_window(tick, tick_spacing, self.word_radius);
        let ticks = self.load_ticks(pool, words.clone(), block).await?;

        debug!(
            "Snapshot | pool={:?} | block={} | tick={} | liquidity={} | words={}..={} | ticks={}",
            pool,
            block_number,
            tick,
            state.liquidity,
            words.start(),
            words.end(),
            ticks.len()
        );

        Ok(PoolSnapshot {
            pool,
            token0: token0.context("Failed to get token0")?,
            token1: token1.context("Failed to get token1")?,
            state,
            ticks,
            loaded_words: Some((*words.start(), *words.end())),
            block_number,
        })
    }

    async fn token_decimals(&self, token: Address) -> Result<u8> {
        if let Some(decimals) = self.decimals_cache.get(&token) {
            return Ok(*decimals);
        }

        let token_contract = IERC20::new(token, self.provider.clone());
        let decimals = token_contract
            .decimals()
            .call()
            .await
            .context("Failed to get token decimals")?;

        self.decimals_cache.insert(token, decimals);
        Ok(decimals)
    }
}
