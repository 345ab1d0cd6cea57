//! Semi (eve of day-off) swap policy.
//!
//! # Search order
//! 1. Later Semi dates in the same month, nearest first
//! 2. Earlier Semi dates in the same month, nearest first
//! 3. Other months, later dates first then earlier ones (optional)

use super::conflict::{SwapCandidate, SwapPolicy};
use super::lane::DutyLane;
use crate::models::YearMonth;

/// Swap-partner search for Semi conflicts.
#[derive(Debug, Clone, Copy)]
pub struct SemiSwapPolicy {
    cross_month: bool,
}

impl SemiSwapPolicy {
    /// Creates the policy. `cross_month` enables the last-resort step.
    pub fn new(cross_month: bool) -> Self {
        Self { cross_month }
    }
}

impl Default for SemiSwapPolicy {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SwapPolicy for SemiSwapPolicy {
    fn name(&self) -> &'static str {
        "semi"
    }

    fn candidates(&self, lane: &DutyLane, origin: usize) -> Vec<SwapCandidate> {
        let month = YearMonth::of(lane.date(origin));
        let same = |j: &usize| month.contains(lane.date(*j));

        let mut out: Vec<SwapCandidate> = (origin + 1..lane.len())
            .filter(same)
            .map(|j| SwapCandidate::new(j, "forward"))
            .collect();
        out.extend(
            (0..origin)
                .rev()
                .filter(same)
                .map(|j| SwapCandidate::new(j, "backward")),
        );
        if self.cross_month {
            out.extend(
                (origin + 1..lane.len())
                    .chain((0..origin).rev())
                    .filter(|j| !same(j))
                    .map(|j| SwapCandidate::new(j, "cross_month")),
            );
        }
        out
    }
}
