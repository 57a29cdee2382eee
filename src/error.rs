//! Simulation Error Types
//!
//! Purpose:
//!     Single error enum for the swap-simulation core (tick math, tick
//!     traversal, swap loop). Every variant is local to one evaluation:
//!     the engine logs it and drops the candidate.
//!
//! Created: 2026-10-19
//!
//! Dependencies:
//!     - thiserror (derive)
//!     - alloy (U256 in payloads)

use alloy::primitives::U256;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// Calldata is not a single-hop exact-input swap. The decoder reports this
    /// as `None`; the variant exists for callers that need an error value.
    #[error("Calldata is not an exact-input single-hop swap")]
    DecodeMismatch,

    #[error("Tick {0} outside global bounds")]
    OutOfRangeTick(i32),

    #[error("Tick {0} is not initialized")]
    TickNotInitialized(i32),

    #[error("Tick bitmap word {0} was not loaded into the snapshot")]
    TickWordNotLoaded(i16),

    #[error("Tick spacing {0} must be positive")]
    InvalidTickSpacing(i32),

    #[error("sqrtPriceX96 {0} outside representable range")]
    InvalidSqrtPrice(U256),

    #[error("Price limit on wrong side of current price or out of range")]
    InvalidPriceLimit,

    #[error("Fee {0} pips must be below 1_000_000")]
    InvalidFee(u32),

    #[error("Pool state tick does not match its sqrt price")]
    InconsistentPoolState,

    #[error("Active liquidity would become negative")]
    InsufficientLiquidity,

    #[error("Swap did not converge after {0} steps")]
    SwapDidNotConverge(usize),

    #[error("mulDiv result overflows 256 bits")]
    MulDivOverflow,

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Amount does not fit the signed 256-bit range")]
    AmountOverflow,
}

pub type SimResult<T> = Result<T, SimError>;
