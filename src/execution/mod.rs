//! Sandwich execution: the single-flight guard and the trade executors.
//!
//! Created: 2026-10-19
//!
//! Architecture:
//!     guard.rs    - ExecutionGuard / ExecutionPermit (one sandwich in flight)
//!     executor.rs - TradeRequest, TradeExecutor trait, DryRunExecutor, RouterExecutor

pub mod executor;
pub mod guard;

pub use executor::{DryRunExecutor, RouterExecutor, TradeExecutor, TradeRequest};
pub use guard::{ExecutionGuard, ExecutionPermit};
