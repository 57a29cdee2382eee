//! Pool module for the sandwich evaluator
//!
//! Pool state, tick snapshots, exact swap simulation, and the chain reader
//! that builds snapshots.
//!
//! Created: 2026-10-19

pub mod simulator;
pub mod state;
pub mod tick_store;
pub mod v3_syncer;

pub use simulator::{simulate, SwapDirection, SwapRequest, SwapResult};
pub use state::PoolState;
pub use tick_store::{Tick, TickStore};
pub use v3_syncer::{ChainStateSource, PoolSnapshot, PoolStateSource, SnapshotSource};
