//! Return-from-absence reinsertion.
//!
//! A person who lost a rotation turn to a missing period gets one catch-up
//! duty after returning. The returning person takes a target slot and the
//! occupants of the following slots each move one slot forward, until the
//! ripple reaches the returning person's own next slot.
//!
//! # Trigger
//! Once per `(person, missing period)` in the lane's category when:
//! - the period ends inside the run range, or in the month before it
//! - a Replacement record (this run or an earlier one) shows the person
//!   was covered during the period
//! - no earlier run already recorded a return for that period: a return
//!   dated between the period's end and the next period's start, or a
//!   backward placement between the previous period's end and its start
//!
//! # Target
//!
//! | Category | Forward | Backward fallback |
//! |----------|---------|-------------------|
//! | Special | first date ≥ end + lead days | latest date before start |
//! | Weekend | first date ≥ end + lead days, in the return month | latest date before start |
//! | Semi | first date ≥ end + lead days | latest date before start, skipping the nearest |
//! | Normal | first date on the missed weekday's track after `lead` Normal days | latest track date before start, except start - 1 |
//!
//! A target must be in range, unlocked, not already held by the returning
//! person, and free of availability and adjacency problems for them.
//! Without one, the reinsertion is deferred to the next run.

use chrono::{Datelike, Duration, NaiveDate};
use tracing::{debug, warn};

use super::conflict::ConflictContext;
use super::lane::DutyLane;
use super::normal::same_track;
use crate::config::EngineConfig;
use crate::models::{
    AssignmentRecord, DayClassifier, Diagnostic, DutyCategory, Group, Ledger, MissingPeriod,
    RecordFlags, RecordKind, YearMonth,
};

/// Upper bound when counting Normal days after a return.
const MAX_LOOKAHEAD_DAYS: usize = 366;

/// Counts from one reinsertion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReinsertionStats {
    /// Returning people placed.
    pub reinserted: usize,
    /// Shift records written by ripples.
    pub shifts: usize,
    /// Reinsertions left for the next run.
    pub deferred: usize,
}

/// A reinsertion waiting for a target.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingReturn {
    /// Returning person.
    pub person: String,
    /// The absence that cost them a turn.
    pub period: MissingPeriod,
    /// First slot they missed.
    pub missed: NaiveDate,
}

/// Places returning people back into a lane.
pub struct ReturnReinsertion<'a> {
    config: &'a EngineConfig,
    classifier: &'a dyn DayClassifier,
    start: NaiveDate,
    end: NaiveDate,
}

impl<'a> ReturnReinsertion<'a> {
    /// Creates a reinsertion pass for the run range `[start, end]`.
    pub fn new(
        config: &'a EngineConfig,
        classifier: &'a dyn DayClassifier,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self {
            config,
            classifier,
            start,
            end,
        }
    }

    /// Runs every pending reinsertion of `lane`.
    ///
    /// `ledger` holds this run's records so far; `prior` holds records of
    /// earlier runs.
    pub fn run(
        &self,
        group: &Group,
        lane: &mut DutyLane,
        context: &ConflictContext,
        ledger: &mut Ledger,
        prior: &Ledger,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> ReinsertionStats {
        let mut stats = ReinsertionStats::default();
        if !self.config.reinserts(lane.category) {
            return stats;
        }

        for pending in self.pending(group, lane.category, ledger, prior) {
            match self.target(group, lane, context, &pending) {
                Some(target) => {
                    stats.shifts += self.place(group, lane, target, &pending, ledger);
                    stats.reinserted += 1;
                }
                None => {
                    warn!(
                        group = group.id,
                        category = %lane.category,
                        person = %pending.person,
                        period_end = %pending.period.end,
                        "no reinsertion target, deferred"
                    );
                    diagnostics.push(Diagnostic::reinsertion_deferred(
                        group.id,
                        lane.category,
                        pending.person.clone(),
                        format!(
                            "return after {} to {} has no target in range",
                            pending.period.start, pending.period.end
                        ),
                    ));
                    stats.deferred += 1;
                }
            }
        }
        stats
    }

    /// Reinsertions triggered for one group and category, in roster order.
    pub fn pending(
        &self,
        group: &Group,
        category: DutyCategory,
        ledger: &Ledger,
        prior: &Ledger,
    ) -> Vec<PendingReturn> {
        let previous_month = YearMonth::of(self.start).previous();
        let mut out = Vec::new();

        for name in group.roster(category) {
            let Some(person) = group.person(name) else {
                continue;
            };
            let mut periods: Vec<&MissingPeriod> = person.availability.missing.iter().collect();
            periods.sort_by_key(|p| p.start);

            for (k, period) in periods.iter().enumerate() {
                let previous_end = k.checked_sub(1).map(|i| periods[i].end);
                let next_start = periods.get(k + 1).map(|p| p.start);
                let ends_here = period.end >= self.start && period.end <= self.end;
                if !ends_here && !previous_month.contains(period.end) {
                    continue;
                }

                let missed = prior
                    .records_of_kind(RecordKind::Replacement)
                    .chain(ledger.records_of_kind(RecordKind::Replacement))
                    .filter(|r| {
                        r.group == group.id
                            && r.category == category
                            && r.linked_person.as_deref() == Some(name.as_str())
                            && period.contains(r.date)
                    })
                    .map(|r| r.date)
                    .min();
                let Some(missed) = missed else {
                    continue;
                };

                let already_returned = prior.records().iter().any(|r| {
                    let in_window = if r.flags.backward_placement {
                        r.date < period.start && previous_end.map_or(true, |e| r.date > e)
                    } else {
                        r.date > period.end && next_start.map_or(true, |n| r.date < n)
                    };
                    r.flags.return_from_absence
                        && r.group == group.id
                        && r.category == category
                        && r.person == *name
                        && in_window
                });
                if already_returned {
                    continue;
                }

                out.push(PendingReturn {
                    person: name.clone(),
                    period: (*period).clone(),
                    missed,
                });
            }
        }
        out
    }

    /// Slot index where `pending` re-enters the lane.
    pub fn target(
        &self,
        group: &Group,
        lane: &DutyLane,
        context: &ConflictContext,
        pending: &PendingReturn,
    ) -> Option<usize> {
        let period = &pending.period;
        let feasible = |j: &usize| {
            let slot = &lane.slots[*j];
            !slot.locked
                && slot.person.as_deref() != Some(pending.person.as_str())
                && group.is_available(&pending.person, lane.category, slot.date)
                && context
                    .conflict_at(lane.group, &pending.person, lane.category, slot.date)
                    .is_none()
        };
        let before_start = (0..lane.len()).rev().filter(|&j| lane.date(j) < period.start);

        match lane.category {
            DutyCategory::Normal => {
                let track = pending.missed.weekday();
                let threshold = self.normal_threshold(period.return_date())?;
                let forward = (0..lane.len()).find(|j| {
                    let date = lane.date(*j);
                    date >= threshold && same_track(track, date.weekday()) && feasible(j)
                });
                let eve = period.start - Duration::days(1);
                forward.or_else(|| {
                    before_start
                        .filter(|&j| lane.date(j) != eve && same_track(track, lane.date(j).weekday()))
                        .find(feasible)
                })
            }
            category => {
                let from = period.end + Duration::days(self.config.return_lead_days);
                let return_month = YearMonth::of(period.return_date());
                let forward = (0..lane.len()).find(|j| {
                    let date = lane.date(*j);
                    date >= from
                        && (category != DutyCategory::Weekend || return_month.contains(date))
                        && feasible(j)
                });
                let skip = usize::from(category == DutyCategory::Semi);
                forward.or_else(|| before_start.skip(skip).find(feasible))
            }
        }
    }

    /// First Normal date after `normal_return_lead_duties` Normal days
    /// counted from `return_date`.
    fn normal_threshold(&self, return_date: NaiveDate) -> Option<NaiveDate> {
        return_date
            .iter_days()
            .take(MAX_LOOKAHEAD_DAYS)
            .filter(|d| self.classifier.classify(*d) == DutyCategory::Normal)
            .nth(self.config.normal_return_lead_duties)
    }

    /// Puts the returning person on `target` and ripples the displaced
    /// occupants forward. Returns the number of Shift records written.
    fn place(
        &self,
        group: &Group,
        lane: &mut DutyLane,
        target: usize,
        pending: &PendingReturn,
        ledger: &mut Ledger,
    ) -> usize {
        let returning = pending.person.as_str();
        let anchor = lane.date(target);
        let category = lane.category;

        let mut carry = lane.slots[target].person.replace(returning.to_string());
        lane.slots[target].moved = true;

        let mut record = AssignmentRecord::new(
            anchor,
            group.id,
            returning,
            category,
            RecordKind::Replacement,
            format!("returns from absence ({})", pending.period.reason),
        )
        .with_flags(RecordFlags {
            return_from_absence: true,
            backward_placement: anchor < pending.period.start,
            cross_month: YearMonth::of(anchor) != YearMonth::of(pending.missed),
        });
        if let Some(displaced) = &carry {
            record = record.with_linked(displaced.clone());
        }
        ledger.push(record);
        debug!(group = group.id, %category, person = returning, date = %anchor, "reinserted");

        let mut shifts = 0;
        for j in target + 1..lane.len() {
            let Some(moving) = carry.take() else {
                break;
            };
            let date = lane.date(j);
            let slot = &lane.slots[j];
            let blocked = slot.locked || !group.is_available(&moving, category, date);
            if blocked || slot.person.as_deref() == Some(moving.as_str()) {
                carry = Some(moving);
                continue;
            }

            let previous = lane.slots[j].person.replace(moving.clone());
            lane.slots[j].moved = true;
            let mut shift = AssignmentRecord::new(
                date,
                group.id,
                moving.as_str(),
                category,
                RecordKind::Shift,
                format!("moved forward by {returning}'s return"),
            )
            .with_anchor(anchor);
            if let Some(p) = &previous {
                shift = shift.with_linked(p.clone());
            }
            ledger.push(shift);
            shifts += 1;
            debug!(group = group.id, %category, person = %moving, %date, "ripple shift");

            if previous.as_deref() == Some(returning) {
                break;
            }
            carry = previous;
        }
        if let Some(left_over) = carry {
            debug!(group = group.id, %category, person = %left_over, "ripple ran past range end");
        }
        shifts
    }
}
