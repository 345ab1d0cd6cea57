//! Persistence boundary.
//!
//! The engine performs no I/O of its own. A [`DutyStore`] supplies groups,
//! checkpoints, stored assignments and the ledger in bulk before a run,
//! and receives the results in one commit afterwards.
//!
//! | Call | When |
//! |------|------|
//! | `load_*` | Once per run, before any phase |
//! | `save_*` | Once per run, from [`CalculationRun::commit`] |
//!
//! [`DutyEngine`] wires a store and a [`DayClassifier`] to the
//! [`CalculationOrchestrator`].

use chrono::{Duration, NaiveDate};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{Result, StoreError};
use crate::models::{
    AssignmentMap, AssignmentRecord, DayClassifier, DutyCategory, DutySchedule, Group, GroupId,
    Ledger, MonthCheckpoints, RotationRegistry,
};
use crate::scheduler::{CalculationOrchestrator, CalculationRun};

/// Durable state read and written around a calculation.
pub trait DutyStore {
    /// Every group with its people and rosters.
    fn load_groups(&self) -> Result<Vec<Group>, StoreError>;

    /// Month checkpoints of one `(group, category)`.
    fn load_checkpoints(
        &self,
        group: GroupId,
        category: DutyCategory,
    ) -> Result<MonthCheckpoints, StoreError>;

    /// Stored assignments dated within `[from, to]`.
    fn load_assignments(&self, from: NaiveDate, to: NaiveDate)
        -> Result<DutySchedule, StoreError>;

    /// Every ledger record.
    fn load_ledger(&self) -> Result<Vec<AssignmentRecord>, StoreError>;

    /// Replaces the stored assignments within `[start, end]`.
    fn save_assignments(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        assignments: &DutySchedule,
    ) -> Result<(), StoreError>;

    /// Upserts month checkpoints of one `(group, category)`.
    fn save_checkpoints(
        &mut self,
        group: GroupId,
        category: DutyCategory,
        checkpoints: &MonthCheckpoints,
    ) -> Result<(), StoreError>;

    /// Replaces the ledger records dated within `[start, end]`.
    fn save_ledger(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        records: &[AssignmentRecord],
    ) -> Result<(), StoreError>;
}

/// Store kept entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    groups: Vec<Group>,
    registry: RotationRegistry,
    assignments: DutySchedule,
    ledger: Vec<AssignmentRecord>,
    offline: bool,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a group.
    pub fn with_group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    /// Replaces all groups.
    pub fn with_groups(mut self, groups: Vec<Group>) -> Self {
        self.groups = groups;
        self
    }

    /// Seeds stored assignments.
    pub fn with_assignments(mut self, assignments: DutySchedule) -> Self {
        self.assignments = assignments;
        self
    }

    /// Seeds stored checkpoints.
    pub fn with_registry(mut self, registry: RotationRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Makes every call fail with [`StoreError::Unavailable`].
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Stored groups.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Mutable group by id, for availability edits between runs.
    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.id == id)
    }

    /// Stored assignments.
    pub fn assignments(&self) -> &DutySchedule {
        &self.assignments
    }

    /// Stored checkpoints.
    pub fn registry(&self) -> &RotationRegistry {
        &self.registry
    }

    /// Stored ledger records.
    pub fn ledger(&self) -> &[AssignmentRecord] {
        &self.ledger
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.offline {
            Err(StoreError::Unavailable("in-memory store is offline".into()))
        } else {
            Ok(())
        }
    }
}

impl DutyStore for InMemoryStore {
    fn load_groups(&self) -> Result<Vec<Group>, StoreError> {
        self.check()?;
        Ok(self.groups.clone())
    }

    fn load_checkpoints(
        &self,
        group: GroupId,
        category: DutyCategory,
    ) -> Result<MonthCheckpoints, StoreError> {
        self.check()?;
        Ok(self
            .registry
            .checkpoints(group, category)
            .cloned()
            .unwrap_or_default())
    }

    fn load_assignments(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<DutySchedule, StoreError> {
        self.check()?;
        let assignments: AssignmentMap = self
            .assignments
            .assignments
            .range(from..=to)
            .map(|(d, m)| (*d, m.clone()))
            .collect();
        Ok(DutySchedule::from(assignments))
    }

    fn load_ledger(&self) -> Result<Vec<AssignmentRecord>, StoreError> {
        self.check()?;
        Ok(self.ledger.clone())
    }

    fn save_assignments(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        assignments: &DutySchedule,
    ) -> Result<(), StoreError> {
        self.check()?;
        self.assignments
            .assignments
            .retain(|d, _| *d < start || *d > end);
        self.assignments.merge(assignments);
        Ok(())
    }

    fn save_checkpoints(
        &mut self,
        group: GroupId,
        category: DutyCategory,
        checkpoints: &MonthCheckpoints,
    ) -> Result<(), StoreError> {
        self.check()?;
        for (month, person) in checkpoints {
            self.registry
                .record_checkpoint(group, category, *month, person.clone());
        }
        Ok(())
    }

    fn save_ledger(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        records: &[AssignmentRecord],
    ) -> Result<(), StoreError> {
        self.check()?;
        self.ledger.retain(|r| r.date < start || r.date > end);
        self.ledger.extend_from_slice(records);
        Ok(())
    }
}

/// Load, calculate, hand back: the engine entry point over a store.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use u_roster::models::{Group, HolidayCalendar};
/// use u_roster::store::{DutyEngine, InMemoryStore};
///
/// let mut store = InMemoryStore::new().with_group(Group::new(1).with_roster_all(&["A", "B", "C"]));
/// let engine = DutyEngine::new(HolidayCalendar::new());
///
/// let start = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
/// let run = engine.calculate(&store, start, end, false).unwrap();
/// run.commit(&mut store).unwrap();
///
/// assert_eq!(store.assignments().assignment_count(), 31);
/// ```
#[derive(Debug, Clone)]
pub struct DutyEngine<C: DayClassifier> {
    config: EngineConfig,
    classifier: C,
    cancel: Option<Arc<AtomicBool>>,
}

impl<C: DayClassifier> DutyEngine<C> {
    /// Creates an engine with the default configuration.
    pub fn new(classifier: C) -> Self {
        Self {
            config: EngineConfig::default(),
            classifier,
            cancel: None,
        }
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets a flag that aborts runs before the next phase.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Day classifier.
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Loads everything a run over `[start, end]` needs from `store` and
    /// calculates it.
    ///
    /// Ledger records already stored inside the range belong to the run
    /// being replaced and are not read back, so recalculating a range
    /// gives the same result as calculating it the first time. Nothing
    /// is written; call [`CalculationRun::commit`] to persist.
    pub fn calculate<S: DutyStore + ?Sized>(
        &self,
        store: &S,
        start: NaiveDate,
        end: NaiveDate,
        preserve: bool,
    ) -> Result<CalculationRun> {
        let groups = store.load_groups()?;

        let mut registry = RotationRegistry::new();
        for group in &groups {
            for category in DutyCategory::ALL {
                let months = store.load_checkpoints(group.id, category)?;
                if !months.is_empty() {
                    registry = registry.with_checkpoints(group.id, category, months);
                }
            }
        }

        let existing =
            store.load_assignments(start - Duration::days(1), end + Duration::days(1))?;
        let prior: Vec<AssignmentRecord> = store
            .load_ledger()?
            .into_iter()
            .filter(|r| r.date < start || r.date > end)
            .collect();
        debug!(
            groups = groups.len(),
            existing = existing.assignment_count(),
            prior_records = prior.len(),
            "store loaded"
        );

        let mut orchestrator = CalculationOrchestrator::new(self.config.clone())
            .with_registry(registry)
            .with_prior_ledger(Ledger::from_records(prior))
            .with_existing_assignments(existing);
        if let Some(flag) = &self.cancel {
            orchestrator = orchestrator.with_cancellation(Arc::clone(flag));
        }
        orchestrator.run(&groups, &self.classifier, start, end, preserve)
    }
}
