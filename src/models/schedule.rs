//! Duty schedule (solution) model.
//!
//! A schedule maps every date to the person serving it in each group.
//! Conditions that prevented a clean rotation are reported as
//! [`Diagnostic`]s alongside the schedule rather than as errors, so a run
//! always yields a usable schedule.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{DutyCategory, GroupId};

/// `date → group → person`.
pub type AssignmentMap = BTreeMap<NaiveDate, BTreeMap<GroupId, String>>;

/// Typed assignment map with query helpers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DutySchedule {
    /// Assignments by date and group.
    pub assignments: AssignmentMap,
}

impl DutySchedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Person serving `group` on `date`.
    pub fn get(&self, date: NaiveDate, group: GroupId) -> Option<&str> {
        self.assignments
            .get(&date)
            .and_then(|m| m.get(&group))
            .map(String::as_str)
    }

    /// Sets the person serving `group` on `date`.
    pub fn set(&mut self, date: NaiveDate, group: GroupId, person: impl Into<String>) {
        self.assignments
            .entry(date)
            .or_default()
            .insert(group, person.into());
    }

    /// Copies every assignment of `other` into this schedule (other wins).
    pub fn merge(&mut self, other: &DutySchedule) {
        for (date, groups) in &other.assignments {
            let entry = self.assignments.entry(*date).or_default();
            for (g, p) in groups {
                entry.insert(*g, p.clone());
            }
        }
    }

    /// Dates on which `person` serves `group`, ascending.
    pub fn dates_for(&self, group: GroupId, person: &str) -> Vec<NaiveDate> {
        self.assignments
            .iter()
            .filter(|(_, m)| m.get(&group).is_some_and(|p| p == person))
            .map(|(d, _)| *d)
            .collect()
    }

    /// People serving `group` in date order.
    pub fn sequence(&self, group: GroupId) -> Vec<&str> {
        self.assignments
            .values()
            .filter_map(|m| m.get(&group).map(String::as_str))
            .collect()
    }

    /// Total number of `(date, group)` assignments.
    pub fn assignment_count(&self) -> usize {
        self.assignments.values().map(BTreeMap::len).sum()
    }

    /// Whether the schedule has no assignments.
    pub fn is_empty(&self) -> bool {
        self.assignment_count() == 0
    }

    /// Iterates `(date, group, person)` in date order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, GroupId, &str)> {
        self.assignments
            .iter()
            .flat_map(|(d, m)| m.iter().map(move |(g, p)| (*d, *g, p.as_str())))
    }
}

impl From<AssignmentMap> for DutySchedule {
    fn from(assignments: AssignmentMap) -> Self {
        Self { assignments }
    }
}

/// A non-fatal condition reported by a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Type of condition.
    pub kind: DiagnosticKind,
    /// Affected group.
    pub group: GroupId,
    /// Affected category.
    pub category: DutyCategory,
    /// Affected date, if the condition concerns one slot.
    pub date: Option<NaiveDate>,
    /// Affected person.
    pub person: Option<String>,
    /// Human-readable description.
    pub message: String,
    /// Severity (0-100, higher = worse).
    pub severity: i32,
}

/// Classification of run diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Every conflict-resolution strategy failed; the slot stays conflicting.
    UnresolvedConflict,
    /// No reinsertion target in range; retried by the next run.
    ReinsertionDeferred,
    /// Group/category could not be scheduled (e.g. empty roster).
    ConfigurationError,
    /// Nobody on the roster was available for the slot.
    UnfilledSlot,
}

impl Diagnostic {
    /// Creates an unresolved adjacency conflict diagnostic.
    pub fn unresolved_conflict(
        group: GroupId,
        category: DutyCategory,
        date: NaiveDate,
        person: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: DiagnosticKind::UnresolvedConflict,
            group,
            category,
            date: Some(date),
            person: Some(person.into()),
            message: message.into(),
            severity: 70,
        }
    }

    /// Creates a deferred reinsertion diagnostic.
    pub fn reinsertion_deferred(
        group: GroupId,
        category: DutyCategory,
        person: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: DiagnosticKind::ReinsertionDeferred,
            group,
            category,
            date: None,
            person: Some(person.into()),
            message: message.into(),
            severity: 40,
        }
    }

    /// Creates a configuration error diagnostic.
    pub fn configuration_error(
        group: GroupId,
        category: DutyCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: DiagnosticKind::ConfigurationError,
            group,
            category,
            date: None,
            person: None,
            message: message.into(),
            severity: 95,
        }
    }

    /// Creates an unfilled slot diagnostic.
    pub fn unfilled_slot(
        group: GroupId,
        category: DutyCategory,
        date: NaiveDate,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: DiagnosticKind::UnfilledSlot,
            group,
            category,
            date: Some(date),
            person: None,
            message: message.into(),
            severity: 90,
        }
    }
}
