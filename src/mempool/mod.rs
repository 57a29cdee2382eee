//! Mempool Module
//!
//! Purpose:
//!     Observe pending Universal Router transactions, decode single-hop V3
//!     exact-in swaps, and feed them to the sandwich engine.
//!
//! Created: 2026-10-19
//!
//! Architecture:
//!     types.rs    - SwapDescriptor, CandidateTx
//!     decoder.rs  - execute() calldata → SwapDescriptor
//!     monitor.rs  - WS subscription loop, per-candidate tasks

pub mod decoder;
pub mod monitor;
pub mod types;

pub use decoder::CandidateTxDecoder;
pub use types::{CandidateTx, SwapDescriptor};
