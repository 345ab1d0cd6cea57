//! Run audit metrics.
//!
//! Computes fairness and rule-violation indicators from a finished
//! [`CalculationRun`].
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Duty count | Final duties per group, category and roster member |
//! | Spread | max - min duty count within a group and category |
//! | Replacements / Swaps / Shifts | Ledger records by kind |
//! | Unresolved | Conflicts left in place |
//! | Deferred | Reinsertions postponed to the next run |
//! | Unfilled | Slots nobody could take |

use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

use super::orchestrator::CalculationRun;
use crate::models::{
    AssignmentRecord, CategoryCalendar, Diagnostic, DiagnosticKind, DutyCategory, DutySchedule,
    Group, GroupId, RecordKind,
};

/// Audit indicators of one run.
#[derive(Debug, Clone, Default)]
pub struct RotationKpi {
    /// Duties per `(group, category)` and person.
    pub duty_counts: BTreeMap<(GroupId, DutyCategory), BTreeMap<String, usize>>,
    /// max - min duty count per `(group, category)`.
    pub spread: BTreeMap<(GroupId, DutyCategory), usize>,
    /// Replacement records.
    pub replacements: usize,
    /// Swap records (two per swap).
    pub swaps: usize,
    /// Shift records.
    pub shifts: usize,
    /// Unresolved conflicts.
    pub unresolved_conflicts: usize,
    /// Deferred reinsertions.
    pub deferred_reinsertions: usize,
    /// Unfilled slots.
    pub unfilled_slots: usize,
}

impl RotationKpi {
    /// Computes the indicators of `run`.
    ///
    /// Every roster member of `groups` is counted, including those with
    /// no duty at all.
    pub fn calculate(run: &CalculationRun, groups: &[Group]) -> Self {
        let mut duty_counts: BTreeMap<(GroupId, DutyCategory), BTreeMap<String, usize>> =
            BTreeMap::new();

        for group in groups {
            for phase in &run.phases {
                if phase.stats.dates == 0 {
                    continue;
                }
                let counts = duty_counts.entry((group.id, phase.category)).or_default();
                for name in group.roster(phase.category) {
                    counts.entry(name.clone()).or_insert(0);
                }
                for (_, g, person) in phase.assignments.iter() {
                    if g == group.id {
                        *counts.entry(person.to_string()).or_insert(0) += 1;
                    }
                }
            }
        }

        let spread = duty_counts
            .iter()
            .map(|(key, counts)| {
                let max = counts.values().copied().max().unwrap_or(0);
                let min = counts.values().copied().min().unwrap_or(0);
                (*key, max - min)
            })
            .collect();

        let count_kind = |kind| run.ledger.records_of_kind(kind).count();
        let count_diag = |kind| run.diagnostics_of(kind).count();

        Self {
            duty_counts,
            spread,
            replacements: count_kind(RecordKind::Replacement),
            swaps: count_kind(RecordKind::Swap),
            shifts: count_kind(RecordKind::Shift),
            unresolved_conflicts: count_diag(DiagnosticKind::UnresolvedConflict),
            deferred_reinsertions: count_diag(DiagnosticKind::ReinsertionDeferred),
            unfilled_slots: count_diag(DiagnosticKind::UnfilledSlot),
        }
    }

    /// Largest spread over all groups and categories.
    pub fn max_spread(&self) -> usize {
        self.spread.values().copied().max().unwrap_or(0)
    }

    /// Whether the run meets the given quality thresholds.
    pub fn meets_thresholds(&self, max_spread: usize, max_unresolved: usize) -> bool {
        self.max_spread() <= max_spread
            && self.unresolved_conflicts <= max_unresolved
            && self.unfilled_slots == 0
    }
}

/// One person serving conflicting categories on adjacent days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacencyViolation {
    /// Group.
    pub group: GroupId,
    /// Person.
    pub person: String,
    /// Earlier day and its category.
    pub first: (NaiveDate, DutyCategory),
    /// Following day and its category.
    pub second: (NaiveDate, DutyCategory),
}

impl AdjacencyViolation {
    /// Whether an unresolved-conflict diagnostic covers this violation.
    pub fn is_reported(&self, diagnostics: &[Diagnostic]) -> bool {
        diagnostics.iter().any(|d| {
            d.kind == DiagnosticKind::UnresolvedConflict
                && d.group == self.group
                && d.person.as_deref() == Some(self.person.as_str())
                && d.date
                    .is_some_and(|date| date == self.first.0 || date == self.second.0)
        })
    }
}

/// Scans `assignments` for adjacent-day category conflicts.
pub fn find_adjacency_violations(
    assignments: &DutySchedule,
    calendar: &CategoryCalendar,
) -> Vec<AdjacencyViolation> {
    let mut out = Vec::new();
    for (date, group, person) in assignments.iter() {
        let next = date + Duration::days(1);
        if assignments.get(next, group) != Some(person) {
            continue;
        }
        let (Some(a), Some(b)) = (calendar.category(date), calendar.category(next)) else {
            continue;
        };
        if a.conflicts_with(b) {
            out.push(AdjacencyViolation {
                group,
                person: person.to_string(),
                first: (date, a),
                second: (next, b),
            });
        }
    }
    out
}

/// Why a final slot differs from pure rotation.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviationCause {
    /// Explained by a ledger record.
    Recorded(AssignmentRecord),
    /// The rotation person was disabled; such skips are never recorded.
    DisabledSkip,
    /// Kept from an earlier calculation.
    Preserved,
    /// Nobody could take the slot.
    Unfilled,
    /// No explanation found.
    Unexplained,
}

/// A slot whose final person is not the rotation person.
#[derive(Debug, Clone, PartialEq)]
pub struct Deviation {
    /// Slot date.
    pub date: NaiveDate,
    /// Slot group.
    pub group: GroupId,
    /// Slot category.
    pub category: DutyCategory,
    /// Person pure rotation picked.
    pub rotation_person: String,
    /// Person actually serving.
    pub person: Option<String>,
    /// Explanation.
    pub cause: DeviationCause,
}

/// Every deviation from rotation in `run`, in phase then date order.
pub fn deviations_from_baseline(run: &CalculationRun, groups: &[Group]) -> Vec<Deviation> {
    let mut out = Vec::new();
    for phase in &run.phases {
        for (date, group_id, rotation_person) in phase.rotation.iter() {
            let person = phase.assignments.get(date, group_id);
            if person == Some(rotation_person) {
                continue;
            }

            let cause = match person {
                None => DeviationCause::Unfilled,
                Some(p) => {
                    if let Some(record) = run.ledger.get_reason(date, group_id, p) {
                        DeviationCause::Recorded(record.clone())
                    } else if phase.preserved.get(date, group_id) == Some(p) {
                        DeviationCause::Preserved
                    } else if groups
                        .iter()
                        .find(|g| g.id == group_id)
                        .is_some_and(|g| g.is_disabled_on(rotation_person, phase.category, date))
                    {
                        DeviationCause::DisabledSkip
                    } else {
                        DeviationCause::Unexplained
                    }
                }
            };

            out.push(Deviation {
                date,
                group: group_id,
                category: phase.category,
                rotation_person: rotation_person.to_string(),
                person: person.map(str::to_string),
                cause,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::models::{DisabledRule, HolidayCalendar, MissingPeriod, Person};
    use crate::scheduler::CalculationOrchestrator;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    fn all_normal(_: NaiveDate) -> DutyCategory {
        DutyCategory::Normal
    }

    #[test]
    fn test_kpi_counts_and_spread() {
        let groups = vec![Group::new(1).with_roster(DutyCategory::Normal, &["A", "B", "C"])];
        let config = EngineConfig::default().with_epoch(d(1));
        let run = CalculationOrchestrator::new(config)
            .run(&groups, &all_normal, d(1), d(7), false)
            .unwrap();

        let kpi = RotationKpi::calculate(&run, &groups);
        let counts = &kpi.duty_counts[&(1, DutyCategory::Normal)];
        assert_eq!(counts["A"], 3);
        assert_eq!(counts["B"], 2);
        assert_eq!(counts["C"], 2);
        assert_eq!(kpi.max_spread(), 1);
        assert_eq!(kpi.replacements, 0);
        assert!(kpi.meets_thresholds(1, 0));
        assert!(!kpi.meets_thresholds(0, 0));
    }

    #[test]
    fn test_zero_duty_members_are_counted() {
        let groups = vec![Group::new(1)
            .with_person(Person::new("C", 3).with_disabled(DutyCategory::Normal))
            .with_roster(DutyCategory::Normal, &["A", "B", "C"])];
        let run = CalculationOrchestrator::new(EngineConfig::default().with_epoch(d(1)))
            .run(&groups, &all_normal, d(1), d(4), false)
            .unwrap();

        let kpi = RotationKpi::calculate(&run, &groups);
        assert_eq!(kpi.duty_counts[&(1, DutyCategory::Normal)]["C"], 0);
        assert_eq!(kpi.spread[&(1, DutyCategory::Normal)], 2);
    }

    #[test]
    fn test_find_adjacency_violations() {
        let cal = HolidayCalendar::new();
        // Fri Jan 9 (Semi), Sat Jan 10 (Weekend), Sun Jan 11 (Weekend)
        let calendar = CategoryCalendar::build(&cal, d(9), d(11));
        let mut s = DutySchedule::new();
        s.set(d(9), 1, "A");
        s.set(d(10), 1, "A");
        s.set(d(11), 1, "A");
        s.set(d(10), 2, "B");

        let v = find_adjacency_violations(&s, &calendar);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].first, (d(9), DutyCategory::Semi));
        assert_eq!(v[0].second, (d(10), DutyCategory::Weekend));

        let diag = Diagnostic::unresolved_conflict(1, DutyCategory::Semi, d(9), "A", "x");
        assert!(v[0].is_reported(&[diag]));
        assert!(!v[0].is_reported(&[]));
    }

    #[test]
    fn test_deviations_are_explained() {
        let groups = vec![Group::new(1)
            .with_person(
                Person::new("C", 3)
                    .with_disabled_rule(DisabledRule::category(DutyCategory::Normal).between(d(3), d(3))),
            )
            .with_person(Person::new("B", 2).with_missing(MissingPeriod::new(d(4), d(4), "leave")))
            .with_roster(DutyCategory::Normal, &["A", "B", "C"])];
        let config = EngineConfig::default()
            .with_epoch(d(1))
            .with_reinsertion_categories(Vec::new());
        let run = CalculationOrchestrator::new(config)
            .run(&groups, &all_normal, d(1), d(6), false)
            .unwrap();

        // A B (A for disabled C) [C for missing B] C A
        let devs = deviations_from_baseline(&run, &groups);
        assert_eq!(devs.len(), 2);
        assert_eq!(devs[0].date, d(3));
        assert_eq!(devs[0].cause, DeviationCause::DisabledSkip);
        assert_eq!(devs[1].date, d(4));
        assert!(matches!(
            &devs[1].cause,
            DeviationCause::Recorded(r) if r.kind == RecordKind::Replacement
        ));
        assert!(devs.iter().all(|d| d.cause != DeviationCause::Unexplained));
    }
}
