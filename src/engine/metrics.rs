//! Match run metrics.
//!
//! Every successful match carries a [`RunMetrics`] so callers can see how much
//! of the step budget a request used and how long the search took. The step
//! count is the same number the budget is checked against: one per node
//! visited plus one per backtrack.

use std::time::Duration;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunMetrics {
    /// Node visits plus backtracks spent by the search.
    pub steps: usize,
    /// Wall time from query construction to the finished result.
    pub elapsed: Duration,
}

impl RunMetrics {
    /// Share of `budget` that was used, in `0.0..=1.0`.
    pub fn budget_used(&self, budget: usize) -> f64 {
        if budget == 0 { 1.0 } else { (self.steps as f64 / budget as f64).min(1.0) }
    }
}
