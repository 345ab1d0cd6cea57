//! Four-phase calculation pipeline.
//!
//! # Pipeline
//!
//! For each category in phase order (Special → Weekend → Semi → Normal),
//! for each group:
//!
//! 1. Seed the rotation pointer from the registry.
//! 2. Baseline pass (availability, replacements).
//! 3. Return-from-absence reinsertion.
//! 4. Conflict resolution against every finished phase.
//! 5. Checkpoint: the final occupant of each month's last filled date.
//!
//! A phase's final slots join the conflict context before the next phase
//! starts. Existing assignments on the day before and after the range are
//! part of the context from the start.
//!
//! Nothing is written anywhere during a run. The [`CalculationRun`] holds
//! every result until [`CalculationRun::commit`] hands it to a store.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use super::baseline::BaselineScheduler;
use super::conflict::{ConflictContext, ConflictResolver, NoSwap, SwapPolicy};
use super::lane::DutyLane;
use super::normal::NormalSwapPolicy;
use super::reinsertion::ReturnReinsertion;
use super::semi::SemiSwapPolicy;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::models::{
    CategoryCalendar, DayClassifier, Diagnostic, DiagnosticKind, DutyCategory, DutySchedule,
    Group, Ledger, RotationRegistry,
};
use crate::store::DutyStore;

/// Per-phase counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseStats {
    /// Dates of the category in range.
    pub dates: usize,
    /// Replacement records from the baseline pass.
    pub replacements: usize,
    /// Returning people placed.
    pub reinserted: usize,
    /// Shift records from reinsertion ripples.
    pub shifts: usize,
    /// Conflict swaps executed.
    pub swaps: usize,
    /// Conflicts left in place.
    pub unresolved: usize,
    /// Reinsertions deferred to the next run.
    pub deferred: usize,
}

/// Output of one category phase across all groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseResult {
    /// Phase category.
    pub category: DutyCategory,
    /// Pure rotation picks.
    pub rotation: DutySchedule,
    /// Occupants after the baseline pass.
    pub baseline: DutySchedule,
    /// Final occupants.
    pub assignments: DutySchedule,
    /// Occupants kept from existing assignments.
    pub preserved: DutySchedule,
    /// Counters.
    pub stats: PhaseStats,
}

/// Everything a calculation run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationRun {
    /// First date of the range.
    pub start: NaiveDate,
    /// Last date of the range.
    pub end: NaiveDate,
    /// Phase results in phase order.
    pub phases: Vec<PhaseResult>,
    /// Final assignments of all phases.
    pub assignments: DutySchedule,
    /// Records written by this run.
    pub ledger: Ledger,
    /// Checkpoints of every month the run touched.
    pub checkpoints: RotationRegistry,
    /// Non-fatal conditions.
    pub diagnostics: Vec<Diagnostic>,
}

impl CalculationRun {
    /// Result of one phase.
    pub fn phase(&self, category: DutyCategory) -> Option<&PhaseResult> {
        self.phases.iter().find(|p| p.category == category)
    }

    /// Diagnostics of one kind.
    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    /// Whether every slot was filled without a remaining conflict.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.iter().all(|d| {
            !matches!(
                d.kind,
                DiagnosticKind::UnresolvedConflict
                    | DiagnosticKind::UnfilledSlot
                    | DiagnosticKind::ConfigurationError
            )
        })
    }

    /// Writes assignments, checkpoints and ledger records to `store`.
    ///
    /// The only step of a calculation with side effects.
    pub fn commit<S: DutyStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        store.save_assignments(self.start, self.end, &self.assignments)?;
        for (group, category, months) in self.checkpoints.iter() {
            store.save_checkpoints(group, category, months)?;
        }
        store.save_ledger(self.start, self.end, self.ledger.records())?;
        info!(
            start = %self.start,
            end = %self.end,
            assignments = self.assignments.assignment_count(),
            records = self.ledger.len(),
            "calculation committed"
        );
        Ok(())
    }
}

/// Drives the four phases over a date range.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use u_roster::config::EngineConfig;
/// use u_roster::models::{DutyCategory, Group, HolidayCalendar};
/// use u_roster::scheduler::CalculationOrchestrator;
///
/// let groups = vec![Group::new(1).with_roster_all(&["A", "B", "C", "D"])];
/// let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
///
/// let run = CalculationOrchestrator::new(EngineConfig::default())
///     .run(&groups, &HolidayCalendar::new(), start, end, false)
///     .unwrap();
/// assert_eq!(run.assignments.assignment_count(), 31);
/// assert_eq!(run.phases.len(), 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CalculationOrchestrator {
    config: EngineConfig,
    registry: RotationRegistry,
    prior_ledger: Ledger,
    existing: DutySchedule,
    cancel: Option<Arc<AtomicBool>>,
}

impl CalculationOrchestrator {
    /// Creates an orchestrator with no history.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Sets the checkpoints of earlier runs.
    pub fn with_registry(mut self, registry: RotationRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sets the ledger of earlier runs.
    pub fn with_prior_ledger(mut self, ledger: Ledger) -> Self {
        self.prior_ledger = ledger;
        self
    }

    /// Sets assignments already stored for the range and its boundary days.
    pub fn with_existing_assignments(mut self, existing: DutySchedule) -> Self {
        self.existing = existing;
        self
    }

    /// Sets a flag that aborts the run before the next phase.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn policy(&self, category: DutyCategory) -> Box<dyn SwapPolicy> {
        match category {
            DutyCategory::Semi => Box::new(SemiSwapPolicy::new(self.config.semi_cross_month_search)),
            DutyCategory::Normal => {
                Box::new(NormalSwapPolicy::new(self.config.normal_next_month_search))
            }
            DutyCategory::Special | DutyCategory::Weekend => Box::new(NoSwap),
        }
    }

    /// Calculates `[start, end]` for every group.
    ///
    /// With `preserve` set, existing in-range assignments are kept and
    /// scheduled around.
    ///
    /// # Errors
    /// - [`EngineError::InvalidRange`] if `start > end`
    /// - [`EngineError::Config`] if the configuration is invalid
    /// - [`EngineError::Cancelled`] if the cancellation flag is set
    pub fn run(
        &self,
        groups: &[Group],
        classifier: &dyn DayClassifier,
        start: NaiveDate,
        end: NaiveDate,
        preserve: bool,
    ) -> Result<CalculationRun> {
        if start > end {
            return Err(EngineError::InvalidRange { start, end });
        }
        self.config.validate()?;
        info!(%start, %end, groups = groups.len(), preserve, "calculation started");

        let calendar = CategoryCalendar::build(classifier, start, end);
        let mut context = ConflictContext::new();
        let boundary = [start - Duration::days(1), end + Duration::days(1)];
        for (date, group, person) in self.existing.iter() {
            if boundary.contains(&date) {
                if let Some(category) = calendar.category(date) {
                    context.insert(date, group, category, person);
                }
            }
        }

        let baseline = BaselineScheduler::new(&self.config);
        let reinsertion = ReturnReinsertion::new(&self.config, classifier, start, end);
        let mut ledger =
            Ledger::new().with_next_pair_id(self.prior_ledger.next_pair_id());
        let mut diagnostics = Vec::new();
        let mut checkpoints = RotationRegistry::new();
        let mut phases = Vec::with_capacity(DutyCategory::ALL.len());
        let mut assignments = DutySchedule::new();

        for category in DutyCategory::ALL {
            if self.cancelled() {
                warn!(phase = %category, "calculation cancelled");
                return Err(EngineError::Cancelled { phase: category });
            }

            let dates = calendar.dates(category);
            let policy = self.policy(category);
            let mut stats = PhaseStats {
                dates: dates.len(),
                ..PhaseStats::default()
            };
            let mut lanes: Vec<DutyLane> = Vec::with_capacity(groups.len());

            for group in groups {
                if dates.is_empty() {
                    break;
                }
                let Some(seed) =
                    self.registry
                        .seed_position(group, category, start, classifier, self.config.epoch)
                else {
                    warn!(group = group.id, %category, "empty roster, category skipped");
                    diagnostics.push(Diagnostic::configuration_error(
                        group.id,
                        category,
                        format!("no {category} roster but {} dates to schedule", dates.len()),
                    ));
                    continue;
                };

                let preserved: BTreeMap<NaiveDate, String> = if preserve {
                    dates
                        .iter()
                        .filter_map(|&d| self.existing.get(d, group.id).map(|p| (d, p.to_string())))
                        .collect()
                } else {
                    BTreeMap::new()
                };

                let outcome = baseline.schedule(
                    group,
                    category,
                    dates,
                    seed.index,
                    &preserved,
                    &mut ledger,
                    &mut diagnostics,
                );
                stats.replacements += outcome.replacements;
                let mut lane = outcome.lane;

                let r = reinsertion.run(
                    group,
                    &mut lane,
                    &context,
                    &mut ledger,
                    &self.prior_ledger,
                    &mut diagnostics,
                );
                stats.reinserted += r.reinserted;
                stats.shifts += r.shifts;
                stats.deferred += r.deferred;

                let c = ConflictResolver::new(group, &context, policy.as_ref()).resolve(
                    &mut lane,
                    &mut ledger,
                    &mut diagnostics,
                );
                stats.swaps += c.swaps;
                stats.unresolved += c.unresolved;

                for (month, person) in lane.month_checkpoints() {
                    checkpoints.record_checkpoint(group.id, category, month, person);
                }

                lanes.push(lane);
            }

            let mut result = PhaseResult {
                category,
                rotation: DutySchedule::new(),
                baseline: DutySchedule::new(),
                assignments: DutySchedule::new(),
                preserved: DutySchedule::new(),
                stats,
            };
            for lane in &lanes {
                context.add_lane(lane);
                result.rotation.merge(&lane.rotation_schedule());
                result.baseline.merge(&lane.baseline_schedule());
                result.assignments.merge(&lane.to_schedule());
                result.preserved.merge(&lane.locked_schedule());
            }
            assignments.merge(&result.assignments);

            info!(
                phase = %category,
                dates = stats.dates,
                replacements = stats.replacements,
                reinserted = stats.reinserted,
                shifts = stats.shifts,
                swaps = stats.swaps,
                unresolved = stats.unresolved,
                "phase finished"
            );
            phases.push(result);
        }

        info!(
            assignments = assignments.assignment_count(),
            records = ledger.len(),
            diagnostics = diagnostics.len(),
            "calculation finished"
        );

        Ok(CalculationRun {
            start,
            end,
            phases,
            assignments,
            ledger,
            checkpoints,
            diagnostics,
        })
    }
}
