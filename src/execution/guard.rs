//! Execution Guard
//!
//! Purpose:
//!     At most one sandwich is being submitted at any time. Evaluation runs
//!     concurrently across candidates; only the front-run/back-run submission
//!     is serialized. A candidate that finds the guard taken is skipped, it
//!     never waits.
//!
//! Created: 2026-10-19
//!
//! Notes:
//!     - The permit is an owned guard, so it can live inside a spawned task
//!       and is released on drop (including on error paths)

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
pub struct ExecutionGuard {
    lock: Arc<Mutex<()>>,
}

/// Held for the duration of one sandwich submission.
#[derive(Debug)]
pub struct ExecutionPermit {
    _guard: OwnedMutexGuard<()>,
}

impl ExecutionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the guard without waiting. None if an execution is in flight.
    pub fn try_acquire(&self) -> Option<ExecutionPermit> {
        self.lock
            .clone()
            .try_lock_owned()
            .ok()
            .map(|guard| ExecutionPermit { _guard: guard })
    }

    pub fn is_busy(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}
