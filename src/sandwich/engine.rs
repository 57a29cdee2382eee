//! Sandwich Engine
//!
//! Purpose:
//!     Decision pipeline for one pending swap: decode, filter, fetch a fresh
//!     pool snapshot, evaluate the sandwich, compare against the profit
//!     floor, then submit front-run and back-run under the execution guard.
//!
//! Created: 2026-10-19
//!
//! Notes:
//!     - Simulation errors end the evaluation of that candidate only; they are
//!       logged and reported as a skip, never propagated
//!     - Collaborator failures (RPC, signing) are returned as errors
//!     - Evaluation never waits on the guard; a busy guard skips the candidate
//!     - The permit is held until both legs are confirmed (or one fails)
//!
//! Dependencies:
//!     - alloy (primitives)
//!     - rust_decimal (profit floor in whole tokens)
//!     - chrono (candidate latency)

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use alloy::primitives::{Address, TxHash, U256};
use anyhow::{Context, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use super::evaluator::{evaluate, AbortReason, SandwichPlan};
use crate::config::StrategyConfig;
use crate::error::SimError;
use crate::execution::{ExecutionGuard, TradeExecutor, TradeRequest};
use crate::mempool::decoder::CandidateTxDecoder;
use crate::mempool::types::CandidateTx;
use crate::pool::simulator::SwapDirection;
use crate::pool::v3_syncer::PoolStateSource;

/// Engine knobs, usually taken from `[strategy]`.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub base_token: Option<Address>,
    pub attack_budget: U256,
    pub min_profit: Decimal,
    pub deadline_secs: u64,
    /// Receives both legs' output
    pub recipient: Address,
}

impl EngineSettings {
    pub fn from_strategy(strategy: &StrategyConfig, recipient: Address) -> Self {
        Self {
            base_token: strategy.base_token,
            attack_budget: strategy.attack_budget_wei,
            min_profit: strategy.min_profit,
            deadline_secs: strategy.deadline_secs,
            recipient,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Calldata is not a single-hop V3 exact-in swap
    NotASwap,
    /// Victim does not spend the configured base token
    NotBaseToken,
    PoolNotFound,
    /// Swap tokens are not the pool's tokens
    TokenMismatch,
    Simulation(SimError),
    /// Raw profit does not fit a Decimal at the token's decimals
    UnrepresentableProfit { decimals: u8 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotASwap => write!(f, "not a single-hop exact-in swap"),
            Self::NotBaseToken => write!(f, "input is not the base token"),
            Self::PoolNotFound => write!(f, "pool not found"),
            Self::TokenMismatch => write!(f, "tokens do not match pool"),
            Self::Simulation(e) => write!(f, "simulation failed: {}", e),
            Self::UnrepresentableProfit { decimals } => {
                write!(f, "profit not representable at {} decimals", decimals)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineDecision {
    Skipped(SkipReason),
    /// Profit (whole tokens) at or below the floor
    Unprofitable { profit: Decimal },
    Aborted(AbortReason),
    /// Another sandwich is being submitted
    ExecutionBusy,
    Executed { front_run: TxHash, back_run: TxHash },
}

/// Decision counters, shared across evaluation tasks.
#[derive(Debug, Default)]
pub struct EngineStats {
    pub candidates: AtomicU64,
    pub skipped: AtomicU64,
    pub unprofitable: AtomicU64,
    pub aborted: AtomicU64,
    pub busy: AtomicU64,
    pub executed: AtomicU64,
    pub errors: AtomicU64,
}

impl EngineStats {
    fn record(&self, decision: &Result<EngineDecision>) {
        let counter = match decision {
            Ok(EngineDecision::Skipped(_)) => &self.skipped,
            Ok(EngineDecision::Unprofitable { .. }) => &self.unprofitable,
            Ok(EngineDecision::Aborted(_)) => &self.aborted,
            Ok(EngineDecision::ExecutionBusy) => &self.busy,
            Ok(EngineDecision::Executed { .. }) => &self.executed,
            Err(_) => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.candidates.fetch_add(1, Ordering::Relaxed);
    }
}

impl fmt::Display for EngineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "candidates={} | skipped={} | unprofitable={} | aborted={} | busy={} | executed={} | errors={}",
            self.candidates.load(Ordering::Relaxed),
            self.skipped.load(Ordering::Relaxed),
            self.unprofitable.load(Ordering::Relaxed),
            self.aborted.load(Ordering::Relaxed),
            self.busy.load(Ordering::Relaxed),
            self.executed.load(Ordering::Relaxed),
            self.errors.load(Ordering::Relaxed),
        )
    }
}

pub struct SandwichEngine<S, E> {
    source: S,
    executor: E,
    decoder: CandidateTxDecoder,
    guard: ExecutionGuard,
    settings: EngineSettings,
    stats: EngineStats,
}

impl<S: PoolStateSource, E: TradeExecutor> SandwichEngine<S, E> {
    pub fn new(source: S, executor: E, decoder: CandidateTxDecoder, settings: EngineSettings) -> Self {
        Self {
            source,
            executor,
            decoder,
            guard: ExecutionGuard::new(),
            settings,
            stats: EngineStats::default(),
        }
    }

    pub fn guard(&self) -> &ExecutionGuard {
        &self.guard
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn decoder(&self) -> &CandidateTxDecoder {
        &self.decoder
    }

    /// Entry point for a raw pending transaction sent to the router.
    pub async fn handle_pending(
        &self,
        tx_hash: TxHash,
        sender: Address,
        value: U256,
        calldata: &[u8],
    ) -> Result<EngineDecision> {
        match self.decoder.decode(calldata, value, sender) {
            Some(swap) => self.process(&CandidateTx::new(tx_hash, sender, value, swap)).await,
            None => {
                let decision = Ok(EngineDecision::Skipped(SkipReason::NotASwap));
                self.stats.record(&decision);
                decision
            }
        }
    }

    /// Run the full pipeline for a decoded candidate.
    pub async fn process(&self, candidate: &CandidateTx) -> Result<EngineDecision> {
        let decision = self.decide(candidate).await;
        match &decision {
            Ok(EngineDecision::Executed { front_run, back_run }) => info!(
                "🥪 Sandwich sent | victim={:?} | front={:?} | back={:?} | {}ms after seen",
                candidate.tx_hash,
                front_run,
                back_run,
                (Utc::now() - candidate.seen_at).num_milliseconds()
            ),
            Ok(EngineDecision::Skipped(SkipReason::Simulation(e))) => {
                warn!("Simulation failed | tx={:?} | {}", candidate.tx_hash, e)
            }
            Ok(other) => debug!("Decision | tx={:?} | {:?}", candidate.tx_hash, other),
            Err(e) => warn!("Evaluation error | tx={:?} | {:#}", candidate.tx_hash, e),
        }
        self.stats.record(&decision);
        decision
    }

    async fn decide(&self, candidate: &CandidateTx) -> Result<EngineDecision> {
        let swap = &candidate.swap;

        if let Some(base) = self.settings.base_token {
            if swap.token_in != base {
                return Ok(EngineDecision::Skipped(SkipReason::NotBaseToken));
            }
        }

        let Some(pool) = self
            .source
            .pool_address(swap.token_in, swap.token_out, swap.fee_tier)
            .await?
        else {
            return Ok(EngineDecision::Skipped(SkipReason::PoolNotFound));
        };

        let snapshot = self.source.snapshot(pool).await?;

        let direction = if swap.token_in == snapshot.token0 && swap.token_out == snapshot.token1 {
            SwapDirection::ZeroForOne
        } else if swap.token_in == snapshot.token1 && swap.token_out == snapshot.token0 {
            SwapDirection::OneForZero
        } else {
            return Ok(EngineDecision::Skipped(SkipReason::TokenMismatch));
        };

        let plan = SandwichPlan {
            attacker_budget: self.settings.attack_budget,
            victim_amount_in: swap.amount_in,
            victim_minimum_out: swap.amount_out_minimum,
            direction,
        };
        let outcome = match snapshot.tick_store().and_then(|ticks| evaluate(&snapshot.state, &ticks, &plan)) {
            Ok(outcome) => outcome,
            Err(e) => return Ok(EngineDecision::Skipped(SkipReason::Simulation(e))),
        };

        debug!(
            "Sandwich evaluated | pool={:?} | block={} | profit={} | victim_out={} | resell={}",
            pool, snapshot.block_number, outcome.profit, outcome.victim_amount_out, outcome.attacker_tokens_to_resell
        );

        if let Some(reason) = outcome.abort_reason {
            return Ok(EngineDecision::Aborted(reason));
        }

        let decimals = self.source.token_decimals(swap.token_in).await?;
        let Some(profit) = outcome.profit_in_units(decimals) else {
            warn!(
                "Profit not representable | tx={:?} | raw={} | decimals={}",
                candidate.tx_hash, outcome.profit, decimals
            );
            return Ok(EngineDecision::Skipped(SkipReason::UnrepresentableProfit { decimals }));
        };
        if !outcome.is_profitable() || profit <= self.settings.min_profit {
            return Ok(EngineDecision::Unprofitable { profit });
        }

        info!(
            "💰 Profitable sandwich | victim={:?} | pool={:?} | profit={} | budget={}",
            candidate.tx_hash, pool, profit, self.settings.attack_budget
        );

        let Some(_permit) = self.guard.try_acquire() else {
            return Ok(EngineDecision::ExecutionBusy);
        };

        let deadline = TradeRequest::deadline_in(self.settings.deadline_secs);
        let front = TradeRequest {
            token_in: swap.token_in,
            token_out: swap.token_out,
            fee: swap.fee_tier,
            amount_in: self.settings.attack_budget,
            amount_out_minimum: outcome.attacker_tokens_to_resell,
            recipient: self.settings.recipient,
            deadline,
        };
        let back = TradeRequest {
            token_in: swap.token_out,
            token_out: swap.token_in,
            fee: swap.fee_tier,
            amount_in: outcome.attacker_tokens_to_resell,
            amount_out_minimum: outcome.attacker_amount_received,
            recipient: self.settings.recipient,
            deadline,
        };

        let front_run = self.executor.submit(&front).await.context("Front-run submission failed")?;
        let back_run = match self.executor.submit(&back).await {
            Ok(hash) => hash,
            Err(e) => {
                error!("Back-run failed after front-run {:?} | holding {} of {:?}", front_run, back.amount_in, back.token_in);
                return Err(e.context("Back-run submission failed"));
            }
        };

        Ok(EngineDecision::Executed { front_run, back_run })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::DryRunExecutor;
    use crate::mempool::types::SwapDescriptor;
    use crate::pool::state::PoolState;
    use crate::pool::tick_store::Tick;
    use crate::pool::v3_syncer::PoolSnapshot;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    const E18: u128 = 1_000_000_000_000_000_000;

    fn token0() -> Address {
        Address::repeat_byte(0x01)
    }
    fn token1() -> Address {
        Address::repeat_byte(0x02)
    }
    fn pool_addr() -> Address {
        Address::repeat_byte(0x33)
    }
    fn router() -> Address {
        Address::repeat_byte(0x44)
    }
    fn me() -> Address {
        Address::repeat_byte(0x55)
    }

    struct MockSource {
        snapshot: PoolSnapshot,
        has_pool: bool,
        fail_snapshot: bool,
        decimals: u8,
    }

    impl MockSource {
        fn full_range(liquidity: u128) -> Self {
            let net = liquidity as i128;
            Self {
                snapshot: PoolSnapshot {
                    pool: pool_addr(),
                    token0: token0(),
                    token1: token1(),
                    state: PoolState::at_tick(0, liquidity, 3000, 60).unwrap(),
                    ticks: vec![Tick::new(-887220, net, liquidity), Tick::new(887220, -net, liquidity)],
                    loaded_words: None,
                    block_number: 1,
                },
                has_pool: true,
                fail_snapshot: false,
                decimals: 18,
            }
        }
    }

    #[async_trait]
    impl PoolStateSource for MockSource {
        async fn pool_address(&self, _a: Address, _b: Address, _fee: u32) -> Result<Option<Address>> {
            Ok(self.has_pool.then(pool_addr))
        }

        async fn snapshot(&self, _pool: Address) -> Result<PoolSnapshot> {
            if self.fail_snapshot {
                anyhow::bail!("rpc unavailable");
            }
            Ok(self.snapshot.clone())
        }

        async fn token_decimals(&self, _token: Address) -> Result<u8> {
            Ok(self.decimals)
        }
    }

    /// Each submit waits for one permit, standing in for block confirmation.
    struct GatedExecutor {
        confirmations: tokio::sync::Semaphore,
        inner: DryRunExecutor,
    }

    #[async_trait]
    impl TradeExecutor for GatedExecutor {
        async fn submit(&self, trade: &TradeRequest) -> Result<TxHash> {
            self.confirmations.acquire().await?.forget();
            self.inner.submit(trade).await
        }

        fn is_live(&self) -> bool {
            true
        }
    }

    fn settings(min_profit: Decimal) -> EngineSettings {
        EngineSettings {
            base_token: None,
            attack_budget: U256::from(10u128.pow(16)),
            min_profit,
            deadline_secs: 900,
            recipient: me(),
        }
    }

    fn build(source: MockSource, min_profit: Decimal) -> SandwichEngine<MockSource, DryRunExecutor> {
        SandwichEngine::new(source, DryRunExecutor::new(), CandidateTxDecoder::new(router()), settings(min_profit))
    }

    fn candidate(token_in: Address, token_out: Address, min_out: u128) -> CandidateTx {
        CandidateTx::new(
            TxHash::repeat_byte(0xee),
            Address::repeat_byte(0x66),
            U256::ZERO,
            SwapDescriptor {
                recipient: Address::repeat_byte(0x66),
                amount_in: U256::from(10u128.pow(17)),
                amount_out_minimum: U256::from(min_out),
                token_in,
                token_out,
                fee_tier: 3000,
                payer_is_sender: true,
                command_index: 0,
                deadline: None,
            },
        )
    }

    #[tokio::test]
    async fn test_profitable_candidate_is_executed() {
        let engine = build(MockSource::full_range(E18), dec!(0.001));
        let decision = engine.process(&candidate(token0(), token1(), 0)).await.unwrap();
        assert!(matches!(decision, EngineDecision::Executed { .. }));

        let trades = engine.executor().submitted();
        assert_eq!(trades.len(), 2);

        let (front, back) = (&trades[0], &trades[1]);
        assert_eq!(front.token_in, token0());
        assert_eq!(front.amount_in, U256::from(10u128.pow(16)));
        assert_eq!(front.amount_out_minimum, U256::from(9_871_580_343_970_612u64));
        assert_eq!(front.recipient, me());

        assert_eq!(back.token_in, token1());
        assert_eq!(back.token_out, token0());
        assert_eq!(back.amount_in, front.amount_out_minimum);
        assert_eq!(back.amount_out_minimum, U256::from(11_988_150_076_494_883u64));
        assert_eq!(back.deadline, front.deadline);

        assert_eq!(engine.stats().executed.load(Ordering::Relaxed), 1);
        assert!(!engine.guard().is_busy());
    }

    #[tokio::test]
    async fn test_one_for_zero_direction() {
        let engine = build(MockSource::full_range(E18), dec!(0.001));
        let decision = engine.process(&candidate(token1(), token0(), 0)).await.unwrap();
        assert!(matches!(decision, EngineDecision::Executed { .. }));
        assert_eq!(engine.executor().submitted()[0].token_in, token1());
    }

    #[tokio::test]
    async fn test_below_profit_floor() {
        let engine = build(MockSource::full_range(E18), dec!(0.01));
        let decision = engine.process(&candidate(token0(), token1(), 0)).await.unwrap();
        assert_eq!(
            decision,
            EngineDecision::Unprofitable { profit: dec!(0.001988150076494883) }
        );
        assert!(engine.executor().submitted().is_empty());
    }

    #[tokio::test]
    async fn test_victim_slippage_aborts() {
        let engine = build(MockSource::full_range(E18), Decimal::ZERO);
        let decision = engine
            .process(&candidate(token0(), token1(), 9 * 10u128.pow(16)))
            .await
            .unwrap();
        assert_eq!(decision, EngineDecision::Aborted(AbortReason::VictimSlippageExceeded));
        assert!(engine.executor().submitted().is_empty());
    }

    #[tokio::test]
    async fn test_busy_guard_skips_execution() {
        let engine = build(MockSource::full_range(E18), Decimal::ZERO);
        let permit = engine.guard().try_acquire();
        assert!(permit.is_some());

        let decision = engine.process(&candidate(token0(), token1(), 0)).await.unwrap();
        assert_eq!(decision, EngineDecision::ExecutionBusy);
        assert!(engine.executor().submitted().is_empty());

        drop(permit);
        let decision = engine.process(&candidate(token0(), token1(), 0)).await.unwrap();
        assert!(matches!(decision, EngineDecision::Executed { .. }));
    }

    #[tokio::test]
    async fn test_guard_held_until_both_legs_confirm() {
        let executor = GatedExecutor {
            confirmations: tokio::sync::Semaphore::new(0),
            inner: DryRunExecutor::new(),
        };
        let engine = std::sync::Arc::new(SandwichEngine::new(
            MockSource::full_range(E18),
            executor,
            CandidateTxDecoder::new(router()),
            settings(dec!(0.001)),
        ));

        let running = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.process(&candidate(token0(), token1(), 0)).await })
        };
        while !engine.guard().is_busy() {
            tokio::task::yield_now().await;
        }

        // Front-run confirmed, back-run still pending
        engine.executor().confirmations.add_permits(1);
        while engine.executor().inner.submitted().is_empty() {
            tokio::task::yield_now().await;
        }
        assert!(engine.guard().is_busy());
        let decision = engine.process(&candidate(token0(), token1(), 0)).await.unwrap();
        assert_eq!(decision, EngineDecision::ExecutionBusy);

        engine.executor().confirmations.add_permits(1);
        let decision = running.await.unwrap().unwrap();
        assert!(matches!(decision, EngineDecision::Executed { .. }));
        assert!(!engine.guard().is_busy());
        assert_eq!(engine.executor().inner.submitted().len(), 2);
    }

    #[tokio::test]
    async fn test_unrepresentable_profit_is_skipped() {
        let mut source = MockSource::full_range(E18);
        source.decimals = 40;
        let engine = build(source, Decimal::ZERO);

        let decision = engine.process(&candidate(token0(), token1(), 0)).await.unwrap();
        assert_eq!(
            decision,
            EngineDecision::Skipped(SkipReason::UnrepresentableProfit { decimals: 40 })
        );
        assert!(engine.executor().submitted().is_empty());
    }

    #[tokio::test]
    async fn test_filters() {
        let mut engine = build(MockSource::full_range(E18), Decimal::ZERO);
        engine.settings.base_token = Some(token1());
        let decision = engine.process(&candidate(token0(), token1(), 0)).await.unwrap();
        assert_eq!(decision, EngineDecision::Skipped(SkipReason::NotBaseToken));

        engine.settings.base_token = None;
        let stranger = Address::repeat_byte(0x77);
        let decision = engine.process(&candidate(token0(), stranger, 0)).await.unwrap();
        assert_eq!(decision, EngineDecision::Skipped(SkipReason::TokenMismatch));

        let mut source = MockSource::full_range(E18);
        source.has_pool = false;
        let engine = build(source, Decimal::ZERO);
        let decision = engine.process(&candidate(token0(), token1(), 0)).await.unwrap();
        assert_eq!(decision, EngineDecision::Skipped(SkipReason::PoolNotFound));
    }

    #[tokio::test]
    async fn test_simulation_error_is_a_skip() {
        // Ticks aligned to spacing 10 in a spacing-60 pool
        let mut source = MockSource::full_range(E18);
        source.snapshot.ticks = vec![Tick::new(-10, 1, 1), Tick::new(10, -1, 1)];
        let engine = build(source, Decimal::ZERO);

        let decision = engine.process(&candidate(token0(), token1(), 0)).await.unwrap();
        assert_eq!(
            decision,
            EngineDecision::Skipped(SkipReason::Simulation(SimError::OutOfRangeTick(-10)))
        );
    }

    #[tokio::test]
    async fn test_collaborator_error_propagates() {
        let mut source = MockSource::full_range(E18);
        source.fail_snapshot = true;
        let engine = build(source, Decimal::ZERO);

        assert!(engine.process(&candidate(token0(), token1(), 0)).await.is_err());
        assert_eq!(engine.stats().errors.load(Ordering::Relaxed), 1);
        assert_eq!(engine.stats().candidates.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_undecodable_calldata_is_skipped() {
        let engine = build(MockSource::full_range(E18), Decimal::ZERO);
        let decision = engine
            .handle_pending(TxHash::ZERO, Address::ZERO, U256::ZERO, &[0xde, 0xad, 0xbe, 0xef])
            .await
            .unwrap();
        assert_eq!(decision, EngineDecision::Skipped(SkipReason::NotASwap));
        assert_eq!(engine.stats().skipped.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_stats_display() {
        let stats = EngineStats::default();
        stats.record(&Ok(EngineDecision::ExecutionBusy));
        assert_eq!(
            stats.to_string(),
            "candidates=1 | skipped=0 | unprofitable=0 | aborted=0 | busy=1 | executed=0 | errors=0"
        );
    }
}
