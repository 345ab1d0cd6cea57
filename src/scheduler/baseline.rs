//! Baseline rotation pass.
//!
//! # Algorithm
//!
//! Walks the dates of one `(group, category)` in ascending order with a
//! rotation pointer into the roster:
//!
//! 1. Preserved assignment: keep it, move the pointer past that person.
//! 2. Candidate eligible: assign, pointer moves past the candidate.
//! 3. Candidate disabled: assign the next person who is neither disabled
//!    nor missing, pointer moves past the person assigned. No ledger entry.
//! 4. Candidate missing: assign the next eligible substitute, pointer
//!    moves past the *candidate*. A Replacement record links the two.
//!
//! Each month's checkpoint is the person assigned to its last filled
//! date, so the next run resumes at their successor.
//!
//! # Substitute exclusivity
//! Where enabled, the first lap of the substitute scan skips people who
//! already covered a *different* missing person in this pass. Later laps
//! accept them so the slot is still filled.
//!
//! # Complexity
//! O(n * r * l) where n=dates, r=roster length, l=scan laps.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

use super::lane::DutyLane;
use crate::config::EngineConfig;
use crate::models::{
    AssignmentRecord, AvailabilityStatus, Diagnostic, DutyCategory, Group, Ledger,
    MonthCheckpoints, RecordKind,
};

/// Result of one baseline pass.
#[derive(Debug, Clone)]
pub struct BaselineOutcome {
    /// Slots with occupants and rotation picks.
    pub lane: DutyLane,
    /// Checkpoint per month touched by the pass.
    pub checkpoints: MonthCheckpoints,
    /// Replacement records written.
    pub replacements: usize,
}

/// Rotation-pointer scheduler for one `(group, category)`.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use std::collections::BTreeMap;
/// use u_roster::config::EngineConfig;
/// use u_roster::models::{DutyCategory, Group, Ledger};
/// use u_roster::scheduler::BaselineScheduler;
///
/// let group = Group::new(1).with_roster(DutyCategory::Normal, &["A", "B", "C"]);
/// let dates: Vec<_> = (5..=8)
///     .map(|d| NaiveDate::from_ymd_opt(2026, 1, d).unwrap())
///     .collect();
///
/// let config = EngineConfig::default();
/// let mut ledger = Ledger::new();
/// let mut diagnostics = Vec::new();
/// let outcome = BaselineScheduler::new(&config).schedule(
///     &group,
///     DutyCategory::Normal,
///     &dates,
///     0,
///     &BTreeMap::new(),
///     &mut ledger,
///     &mut diagnostics,
/// );
/// assert_eq!(outcome.lane.to_schedule().sequence(1), vec!["A", "B", "C", "A"]);
/// ```
#[derive(Debug, Clone)]
pub struct BaselineScheduler<'a> {
    config: &'a EngineConfig,
}

impl<'a> BaselineScheduler<'a> {
    /// Creates a baseline scheduler.
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Fills `dates` from the roster starting at index `seed`.
    ///
    /// `preserved` holds existing assignments to keep (already filtered
    /// to this group and category). An empty roster yields empty slots.
    #[allow(clippy::too_many_arguments)]
    pub fn schedule(
        &self,
        group: &Group,
        category: DutyCategory,
        dates: &[NaiveDate],
        seed: usize,
        preserved: &BTreeMap<NaiveDate, String>,
        ledger: &mut Ledger,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> BaselineOutcome {
        let mut lane = DutyLane::new(group.id, category, dates);
        let mut replacements = 0;

        let roster = group.roster(category);
        if roster.is_empty() {
            return BaselineOutcome {
                lane,
                checkpoints: MonthCheckpoints::new(),
                replacements,
            };
        }
        let len = roster.len();
        let exclusive = self.config.substitutes_exclusive(category);
        // substitute -> people they covered
        let mut covered: HashMap<String, HashSet<String>> = HashMap::new();
        let mut ptr = seed % len;

        for (i, &date) in dates.iter().enumerate() {
            let candidate = roster[ptr].as_str();
            lane.slots[i].rotation_person = Some(candidate.to_string());

            if let Some(kept) = preserved.get(&date) {
                if group.is_disabled_on(kept, category, date) {
                    warn!(
                        group = group.id,
                        %category,
                        %date,
                        person = %kept,
                        "preserved assignment names a disabled person, recalculating"
                    );
                } else {
                    lane.slots[i].person = Some(kept.clone());
                    lane.slots[i].locked = true;
                    ptr = roster
                        .iter()
                        .position(|n| n == kept)
                        .map_or(ptr + 1, |k| k + 1)
                        % len;
                    continue;
                }
            }

            match group.availability(candidate, category, date) {
                AvailabilityStatus::Eligible => {
                    lane.slots[i].person = Some(candidate.to_string());
                    ptr = (ptr + 1) % len;
                }
                AvailabilityStatus::Disabled => {
                    match self.scan(group, category, date, ptr, |_| true) {
                        Some(idx) => {
                            lane.slots[i].person = Some(roster[idx].clone());
                            ptr = (idx + 1) % len;
                        }
                        None => {
                            self.unfilled(group, category, date, diagnostics);
                            ptr = (ptr + 1) % len;
                        }
                    }
                }
                AvailabilityStatus::Missing(period) => {
                    let taken_elsewhere = |name: &str| {
                        covered
                            .get(name)
                            .is_some_and(|s| s.iter().any(|c| c != candidate))
                    };
                    let first_lap = if exclusive {
                        self.scan_lap(group, category, date, ptr, |n| !taken_elsewhere(n))
                    } else {
                        None
                    };
                    let found = first_lap.or_else(|| self.scan(group, category, date, ptr, |_| true));

                    match found {
                        Some(idx) => {
                            let substitute = roster[idx].clone();
                            debug!(
                                group = group.id,
                                %category,
                                %date,
                                missing = candidate,
                                substitute = %substitute,
                                "replacement"
                            );
                            ledger.push(
                                AssignmentRecord::new(
                                    date,
                                    group.id,
                                    substitute.clone(),
                                    category,
                                    RecordKind::Replacement,
                                    format!("covers {candidate} ({})", period.reason),
                                )
                                .with_linked(candidate),
                            );
                            covered
                                .entry(substitute.clone())
                                .or_default()
                                .insert(candidate.to_string());
                            lane.slots[i].person = Some(substitute);
                            replacements += 1;
                        }
                        None => self.unfilled(group, category, date, diagnostics),
                    }
                    ptr = (ptr + 1) % len;
                }
            }
        }

        for slot in &mut lane.slots {
            slot.baseline_person = slot.person.clone();
        }
        let checkpoints = lane.month_checkpoints();

        BaselineOutcome {
            lane,
            checkpoints,
            replacements,
        }
    }

    /// First index after `ptr` whose person is eligible and accepted by
    /// `filter`, bounded by `scan_laps` roster lengths.
    fn scan(
        &self,
        group: &Group,
        category: DutyCategory,
        date: NaiveDate,
        ptr: usize,
        filter: impl Fn(&str) -> bool,
    ) -> Option<usize> {
        let len = group.roster(category).len();
        self.scan_bounded(group, category, date, ptr, len * self.config.scan_laps, filter)
    }

    /// Like [`scan`](Self::scan) but limited to one roster length.
    fn scan_lap(
        &self,
        group: &Group,
        category: DutyCategory,
        date: NaiveDate,
        ptr: usize,
        filter: impl Fn(&str) -> bool,
    ) -> Option<usize> {
        let len = group.roster(category).len();
        self.scan_bounded(group, category, date, ptr, len, filter)
    }

    fn scan_bounded(
        &self,
        group: &Group,
        category: DutyCategory,
        date: NaiveDate,
        ptr: usize,
        steps: usize,
        filter: impl Fn(&str) -> bool,
    ) -> Option<usize> {
        let roster = group.roster(category);
        let len = roster.len();
        (1..=steps).map(|k| (ptr + k) % len).find(|&idx| {
            let name = roster[idx].as_str();
            group.is_available(name, category, date) && filter(name)
        })
    }

    fn unfilled(
        &self,
        group: &Group,
        category: DutyCategory,
        date: NaiveDate,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        warn!(group = group.id, %category, %date, "no one available, slot left empty");
        diagnostics.push(Diagnostic::unfilled_slot(
            group.id,
            category,
            date,
            "every roster member is disabled or missing",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DisabledRule, MissingPeriod, Person, YearMonth};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    fn days(range: std::ops::RangeInclusive<u32>) -> Vec<NaiveDate> {
        range.map(d).collect()
    }

    fn run(
        group: &Group,
        config: &EngineConfig,
        dates: &[NaiveDate],
        seed: usize,
    ) -> (BaselineOutcome, Ledger, Vec<Diagnostic>) {
        let mut ledger = Ledger::new();
        let mut diags = Vec::new();
        let out = BaselineScheduler::new(config).schedule(
            group,
            DutyCategory::Normal,
            dates,
            seed,
            &BTreeMap::new(),
            &mut ledger,
            &mut diags,
        );
        (out, ledger, diags)
    }

    #[test]
    fn test_plain_rotation() {
        let g = Group::new(1).with_roster(DutyCategory::Normal, &["A", "B", "C"]);
        let (out, ledger, _) = run(&g, &EngineConfig::default(), &days(5..=10), 0);
        assert_eq!(out.lane.to_schedule().sequence(1), vec!["A", "B", "C", "A", "B", "C"]);
        assert!(ledger.is_empty());
        assert_eq!(out.checkpoints.get(&YearMonth::of(d(5))).map(String::as_str), Some("C"));
    }

    #[test]
    fn test_seed_offsets_rotation() {
        let g = Group::new(1).with_roster(DutyCategory::Normal, &["A", "B", "C"]);
        let (out, _, _) = run(&g, &EngineConfig::default(), &days(5..=7), 4);
        assert_eq!(out.lane.to_schedule().sequence(1), vec!["B", "C", "A"]);
    }

    #[test]
    fn test_disabled_skip_is_silent() {
        let g = Group::new(1)
            .with_person(
                Person::new("C", 3)
                    .with_disabled_rule(DisabledRule::category(DutyCategory::Normal).between(d(3), d(3))),
            )
            .with_roster(DutyCategory::Normal, &["A", "B", "C"]);
        let (out, ledger, diags) = run(&g, &EngineConfig::default(), &days(1..=6), 0);

        assert_eq!(out.lane.to_schedule().sequence(1), vec!["A", "B", "A", "B", "C", "A"]);
        assert_eq!(out.lane.slots[2].rotation_person.as_deref(), Some("C"));
        assert!(ledger.is_empty());
        assert!(diags.is_empty());
        assert_eq!(out.checkpoints.get(&YearMonth::of(d(1))).map(String::as_str), Some("A"));
    }

    #[test]
    fn test_missing_writes_replacement_and_keeps_pointer() {
        let g = Group::new(1)
            .with_person(Person::new("B", 2).with_missing(MissingPeriod::new(d(2), d(2), "leave")))
            .with_roster(DutyCategory::Normal, &["A", "B"]);
        let (out, ledger, _) = run(&g, &EngineConfig::default(), &days(1..=4), 0);

        assert_eq!(out.lane.to_schedule().sequence(1), vec!["A", "A", "A", "B"]);
        assert_eq!(out.replacements, 1);
        let r = ledger.get_reason(d(2), 1, "A").unwrap();
        assert_eq!(r.kind, RecordKind::Replacement);
        assert_eq!(r.linked_person.as_deref(), Some("B"));
        assert_eq!(out.checkpoints.get(&YearMonth::of(d(1))).map(String::as_str), Some("B"));
    }

    #[test]
    fn test_checkpoint_is_substitute_on_last_date() {
        // C is missing on the last date; A covers and becomes the checkpoint
        let g = Group::new(1)
            .with_person(Person::new("C", 3).with_missing(MissingPeriod::new(d(3), d(3), "leave")))
            .with_roster(DutyCategory::Normal, &["A", "B", "C"]);
        let (out, _, _) = run(&g, &EngineConfig::default(), &days(1..=3), 0);

        assert_eq!(out.lane.to_schedule().sequence(1), vec!["A", "B", "A"]);
        assert_eq!(out.lane.slots[2].rotation_person.as_deref(), Some("C"));
        assert_eq!(out.checkpoints.get(&YearMonth::of(d(1))).map(String::as_str), Some("A"));
    }

    #[test]
    fn test_exclusive_substitutes() {
        // A and C both absent on day 1, C also on day 2. B covers A on day 1.
        let g = Group::new(1)
            .with_person(Person::new("A", 1).with_missing(MissingPeriod::new(d(1), d(1), "x")))
            .with_person(Person::new("C", 2).with_missing(MissingPeriod::new(d(1), d(2), "y")))
            .with_roster(DutyCategory::Normal, &["A", "C", "B"]);

        let (out, ledger, _) = run(&g, &EngineConfig::default(), &days(1..=2), 0);
        assert_eq!(out.lane.to_schedule().sequence(1), vec!["B", "A"]);
        assert_eq!(
            ledger.get_reason(d(2), 1, "A").and_then(|r| r.linked_person.as_deref()),
            Some("C")
        );

        let relaxed = EngineConfig::default().with_exclusive_substitutes(false);
        let (out, _, _) = run(&g, &relaxed, &days(1..=2), 0);
        assert_eq!(out.lane.to_schedule().sequence(1), vec!["B", "B"]);
    }

    #[test]
    fn test_exclusive_falls_back_when_nobody_else() {
        // B is the only one left on day 2 even though B already covered A.
        let g = Group::new(1)
            .with_person(Person::new("A", 1).with_missing(MissingPeriod::new(d(1), d(2), "x")))
            .with_person(Person::new("C", 2).with_missing(MissingPeriod::new(d(1), d(2), "y")))
            .with_roster(DutyCategory::Normal, &["A", "C", "B"]);
        let (out, ledger, diags) = run(&g, &EngineConfig::default(), &days(1..=2), 0);

        assert_eq!(out.lane.to_schedule().sequence(1), vec!["B", "B"]);
        assert_eq!(
            ledger.get_reason(d(2), 1, "B").and_then(|r| r.linked_person.as_deref()),
            Some("C")
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn test_unfilled_slot() {
        let g = Group::new(1)
            .with_person(Person::new("A", 1).with_missing(MissingPeriod::new(d(1), d(1), "x")))
            .with_person(Person::new("B", 2).with_disabled(DutyCategory::Normal))
            .with_roster(DutyCategory::Normal, &["A", "B"]);
        let (out, ledger, diags) = run(&g, &EngineConfig::default(), &days(1..=2), 0);

        assert_eq!(out.lane.person(0), None);
        assert_eq!(out.lane.person(1), Some("A"));
        assert!(ledger.is_empty());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, crate::models::DiagnosticKind::UnfilledSlot);
    }

    #[test]
    fn test_preserved_assignment_locks_slot() {
        let g = Group::new(1)
            .with_person(Person::new("C", 3).with_disabled(DutyCategory::Normal))
            .with_roster(DutyCategory::Normal, &["A", "B", "C"]);
        let mut preserved = BTreeMap::new();
        preserved.insert(d(1), "B".to_string());
        // Disabled person is not locked
        preserved.insert(d(3), "C".to_string());

        let mut ledger = Ledger::new();
        let mut diags = Vec::new();
        let out = BaselineScheduler::new(&EngineConfig::default()).schedule(
            &g,
            DutyCategory::Normal,
            &days(1..=3),
            0,
            &preserved,
            &mut ledger,
            &mut diags,
        );
        assert!(out.lane.slots[0].locked);
        assert!(!out.lane.slots[2].locked);
        assert_eq!(out.lane.to_schedule().sequence(1), vec!["B", "A", "B"]);
    }

    #[test]
    fn test_empty_roster_yields_empty_lane() {
        let g = Group::new(1);
        let (out, _, diags) = run(&g, &EngineConfig::default(), &days(1..=3), 0);
        assert_eq!(out.lane.len(), 3);
        assert!(out.lane.to_schedule().is_empty());
        assert!(diags.is_empty());
    }
}
