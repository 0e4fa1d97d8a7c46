// src/engine/budget.rs

use serde::{Deserialize, Serialize};

/// Failed proposal calls tolerated over one loop run.
///
/// Every failure consumes one unit; the caller retries while
/// [`RetryBudget::try_consume`] returns `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryBudget {
    limit: u32,
    used: u32,
}

impl RetryBudget {
    pub fn new(limit: u32) -> Self {
        Self { limit, used: 0 }
    }

    /// Record one failure. Returns `false` once the budget is exhausted,
    /// meaning the failure must not be retried.
    pub fn try_consume(&mut self) -> bool {
        self.used = self.used.saturating_add(1);
        self.used <= self.limit
    }

    pub fn is_exhausted(&self) -> bool {
        self.used > self.limit
    }

    /// Failures recorded so far.
    pub fn used(&self) -> u32 {
        self.used
    }
}
