//! Mempool Type Definitions
//!
//! Purpose:
//!     Normalized view of a pending Universal Router swap (decoder output)
//!     and the candidate record handed from the monitor to the engine.
//!
//! Created: 2026-10-19
//!
//! Dependencies:
//!     - alloy (Address, TxHash, U256)
//!     - chrono (timestamps)

use alloy::primitives::{Address, TxHash, U256};
use chrono::{DateTime, Utc};

/// Single-hop exact-input swap extracted from router calldata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapDescriptor {
    /// Final recipient with router sentinels resolved
    pub recipient: Address,
    /// Raw input amount (CONTRACT_BALANCE already resolved to msg.value)
    pub amount_in: U256,
    /// Victim's slippage floor
    pub amount_out_minimum: U256,
    pub token_in: Address,
    pub token_out: Address,
    /// V3 fee tier in hundredths of a bip (500, 3000, 10000)
    pub fee_tier: u32,
    /// Router pulls input from the sender (false: router spends its own balance)
    pub payer_is_sender: bool,
    /// Position of the swap within the command string
    pub command_index: usize,
    /// execute() deadline, when the deadline overload was used
    pub deadline: Option<U256>,
}

/// A decoded pending transaction awaiting evaluation.
#[derive(Debug, Clone)]
pub struct CandidateTx {
    pub tx_hash: TxHash,
    pub sender: Address,
    pub value: U256,
    pub swap: SwapDescriptor,
    pub seen_at: DateTime<Utc>,
}

impl CandidateTx {
    pub fn new(tx_hash: TxHash, sender: Address, value: U256, swap: SwapDescriptor) -> Self {
        Self {
            tx_hash,
            sender,
            value,
            swap,
            seen_at: Utc::now(),
        }
    }
}
