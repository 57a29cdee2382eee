//! Trade Executor
//!
//! Submits the two sandwich legs as V3 SwapRouter `exactInputSingle` calls.
//! Two implementations behind one trait: a dry-run executor that only logs
//! (default, and what the engine tests run against) and a live router executor
//! that signs through the provider's wallet filler.
//!
//! `submit` returns only once the trade is final: the live executor waits for
//! the receipt and treats a revert as an error, so an execution permit held
//! across both legs covers the capital until it is back.
//!
//! Created: 2026-10-19

use std::sync::{Arc, Mutex};

use alloy::network::ReceiptResponse;
use alloy::primitives::{aliases::U160, keccak256, Address, TxHash, U256};
use alloy::providers::Provider;
use alloy::sol_types::SolCall;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashSet;
use tracing::{info, warn};

use crate::contracts::{fee_to_u24, ISwapRouter, IERC20};

/// One single-hop exact-input swap to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRequest {
    pub token_in: Address,
    pub token_out: Address,
    pub fee: u32,
    pub amount_in: U256,
    pub amount_out_minimum: U256,
    pub recipient: Address,
    /// Unix timestamp (seconds)
    pub deadline: U256,
}

impl TradeRequest {
    /// Deadline `secs` seconds from now.
    pub fn deadline_in(secs: u64) -> U256 {
        let at = Utc::now() + Duration::seconds(secs as i64);
        U256::from(at.timestamp().max(0) as u64)
    }

    pub fn to_params(&self) -> ISwapRouter::ExactInputSingleParams {
        ISwapRouter::ExactInputSingleParams {
            tokenIn: self.token_in,
            tokenOut: self.token_out,
            fee: fee_to_u24(self.fee),
            recipient: self.recipient,
            deadline: self.deadline,
            amountIn: self.amount_in,
            amountOutMinimum: self.amount_out_minimum,
            sqrtPriceLimitX96: U160::ZERO,
        }
    }

    /// SwapRouter calldata for this trade.
    pub fn calldata(&self) -> Vec<u8> {
        ISwapRouter::exactInputSingleCall {
            params: self.to_params(),
        }
        .abi_encode()
    }
}

#[async_trait]
pub trait TradeExecutor: Send + Sync {
    /// Submit a trade; returns the transaction hash once it is mined and succeeded.
    async fn submit(&self, trade: &TradeRequest) -> Result<TxHash>;

    /// False when trades are only logged.
    fn is_live(&self) -> bool;
}

// ── Dry run ──────────────────────────────────────────────────────────

/// Logs trades instead of sending them. The returned hash is the keccak
/// of the calldata, so identical trades map to identical hashes.
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    submitted: Mutex<Vec<TradeRequest>>,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trades seen so far, in submission order.
    pub fn submitted(&self) -> Vec<TradeRequest> {
        match self.submitted.lock() {
            Ok(trades) => trades.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl TradeExecutor for DryRunExecutor {
    async fn submit(&self, trade: &TradeRequest) -> Result<TxHash> {
        let hash = keccak256(trade.calldata());
        info!(
            "[DRY RUN] exactInputSingle | {:?} -> {:?} | fee={} | in={} | min_out={} | id={:?}",
            trade.token_in, trade.token_out, trade.fee, trade.amount_in, trade.amount_out_minimum, hash
        );
        match self.submitted.lock() {
            Ok(mut trades) => trades.push(trade.clone()),
            Err(poisoned) => poisoned.into_inner().push(trade.clone()),
        }
        Ok(hash)
    }

    fn is_live(&self) -> bool {
        false
    }
}

// ── Live ─────────────────────────────────────────────────────────────

/// Sends trades to the V3 SwapRouter. The provider must carry a wallet
/// for `from`; nonce and gas are filled by the provider.
pub struct RouterExecutor<P> {
    provider: Arc<P>,
    router: Address,
    from: Address,
    /// Tokens already approved for the router (max allowance)
    approved: DashSet<Address>,
}

impl<P: Provider + 'static> RouterExecutor<P> {
    pub fn new(provider: Arc<P>, router: Address, from: Address) -> Self {
        warn!("Executor in LIVE mode - trades will be sent | router={:?} | from={:?}", router, from);
        Self {
            provider,
            router,
            from,
            approved: DashSet::new(),
        }
    }

    /// Approve the router for `token` if the current allowance is short.
    async fn ensure_approval(&self, token: Address, amount: U256) -> Result<()> {
        if self.approved.contains(&token) {
            return Ok(());
        }

        let erc20 = IERC20::new(token, self.provider.clone());
        let allowance = erc20
            .allowance(self.from, self.router)
            .call()
            .await
            .context("Failed to read allowance")?;

        if allowance < amount {
            info!("Approving router | token={:?} | allowance={}", token, allowance);
            let tx_hash = erc20
                .approve(self.router, U256::MAX)
                .from(self.from)
                .send()
                .await
                .context("Failed to send approval")?
                .watch()
                .await
                .context("Approval not confirmed")?;
            info!("Router approved | token={:?} | tx={:?}", token, tx_hash);
        }

        self.approved.insert(token);
        Ok(())
    }
}

/// A mined but reverted trade is a failure.
fn ensure_succeeded(tx_hash: TxHash, status: bool) -> Result<()> {
    if !status {
        bail!("Trade {:?} reverted", tx_hash);
    }
    Ok(())
}

#[async_trait]
impl<P: Provider + 'static> TradeExecutor for RouterExecutor<P> {
    async fn submit(&self, trade: &TradeRequest) -> Result<TxHash> {
        self.ensure_approval(trade.token_in, trade.amount_in).await?;

        let router = ISwapRouter::new(self.router, self.provider.clone());
        let pending = router
            .exactInputSingle(trade.to_params())
            .from(self.from)
            .send()
            .await
            .context("Failed to send exactInputSingle")?;

        let tx_hash = *pending.tx_hash();
        info!(
            "Trade sent | {:?} -> {:?} | in={} | min_out={} | tx={:?}",
            trade.token_in, trade.token_out, trade.amount_in, trade.amount_out_minimum, tx_hash
        );

        let receipt = pending
            .get_receipt()
            .await
            .with_context(|| format!("Trade {:?} not confirmed", tx_hash))?;
        ensure_succeeded(tx_hash, ReceiptResponse::status(&receipt))?;

        info!(
            "Trade confirmed | tx={:?} | block={}",
            tx_hash,
            ReceiptResponse::block_number(&receipt).unwrap_or(0)
        );
        Ok(tx_hash)
    }

    fn is_live(&self) -> bool {
        true
    }
}
