//! Uniswap V3 Sandwich Bot Library
//!
//! Exact V3 swap simulation (tick math, tick bitmap traversal, swap steps),
//! sandwich profitability evaluation, Universal Router calldata decoding,
//! and the live/replay/scan plumbing around them.
//!
//! Created: 2026-10-19

pub mod config;
pub mod contracts;
pub mod error;
pub mod execution;
pub mod math;
pub mod mempool;
pub mod pool;
pub mod sandwich;

// Re-export commonly used types
pub use config::BotConfig;
pub use error::{SimError, SimResult};
pub use pool::{PoolSnapshot, PoolState, TickStore};
pub use sandwich::{evaluate, SandwichOutcome, SandwichPlan};
