//! Sandwich evaluation, decision pipeline, and historical detection.
//!
//! Created: 2026-10-19
//!
//! Architecture:
//!     evaluator.rs - front-run / victim / back-run simulation on one snapshot
//!     engine.rs    - candidate → decision → (optional) execution
//!     history.rs   - sandwich detection over past Swap events

pub mod engine;
pub mod evaluator;
pub mod history;

pub use engine::{EngineDecision, EngineSettings, SandwichEngine, SkipReason};
pub use evaluator::{evaluate, AbortReason, SandwichOutcome, SandwichPlan};
