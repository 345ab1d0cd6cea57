//! Rotation scheduling, conflict resolution and run audit.
//!
//! # Components
//!
//! | Component | Role |
//! |-----------|------|
//! | [`BaselineScheduler`] | Round-robin pass with disabled skips and missing replacements |
//! | [`ReturnReinsertion`] | Catch-up duty after a missing period, with forward ripple |
//! | [`ConflictResolver`] | Adjacency conflict detection and swap search |
//! | [`SemiSwapPolicy`] / [`NormalSwapPolicy`] | Category specific partner search order |
//! | [`CalculationOrchestrator`] | Four-phase pipeline over a date range |
//! | [`RotationKpi`] | Fairness and violation metrics of a finished run |
//!
//! # Algorithm
//!
//! The engine is a first-fit heuristic, not an optimizer: every phase
//! takes the first feasible option in a fixed priority order, so the same
//! inputs always produce the same schedule.

mod baseline;
mod conflict;
mod kpi;
mod lane;
mod normal;
mod orchestrator;
mod reinsertion;
mod semi;

pub use baseline::{BaselineOutcome, BaselineScheduler};
pub use conflict::{
    ConflictContext, ConflictResolver, NoSwap, ResolutionStats, SwapCandidate, SwapPolicy,
};
pub use kpi::{
    deviations_from_baseline, find_adjacency_violations, AdjacencyViolation, Deviation,
    DeviationCause, RotationKpi,
};
pub use lane::{DutyLane, Slot};
pub use normal::{paired_weekday, same_track, NormalSwapPolicy};
pub use orchestrator::{CalculationOrchestrator, CalculationRun, PhaseResult, PhaseStats};
pub use reinsertion::{PendingReturn, ReinsertionStats, ReturnReinsertion};
pub use semi::SemiSwapPolicy;
