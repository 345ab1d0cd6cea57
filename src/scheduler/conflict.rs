//! Adjacency conflict detection and swap-based resolution.
//!
//! A phase's slots are checked against a [`ConflictContext`]: the final
//! assignments of earlier phases plus any existing assignments just
//! outside the run range. A conflicting slot is repaired by exchanging it
//! with a partner slot of the same category, chosen by a category
//! specific [`SwapPolicy`] (first feasible candidate wins).
//!
//! # Swap feasibility
//! A partner slot `j` for origin `i` qualifies when:
//! - `j` is occupied by a different person than `i`
//! - `j` is neither locked nor already moved in this phase
//! - both people are available on their new dates
//! - neither person has an adjacency conflict on their new date

use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;
use tracing::{debug, warn};

use super::lane::DutyLane;
use crate::models::{
    CategoryCalendar, Diagnostic, DutyCategory, Group, GroupId, Ledger, RecordFlags,
};

/// Fixed assignments that later phases must not conflict with.
#[derive(Debug, Clone, Default)]
pub struct ConflictContext {
    duties: HashMap<(NaiveDate, GroupId), (DutyCategory, String)>,
}

impl ConflictContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one fixed assignment. A later insert for the same slot wins.
    pub fn insert(
        &mut self,
        date: NaiveDate,
        group: GroupId,
        category: DutyCategory,
        person: impl Into<String>,
    ) {
        self.duties.insert((date, group), (category, person.into()));
    }

    /// Adds the final slots of a finished lane.
    pub fn add_lane(&mut self, lane: &DutyLane) {
        for slot in &lane.slots {
            if let Some(p) = &slot.person {
                self.insert(slot.date, lane.group, lane.category, p.clone());
            }
        }
    }

    /// Number of fixed assignments.
    pub fn len(&self) -> usize {
        self.duties.len()
    }

    /// Whether the context is empty.
    pub fn is_empty(&self) -> bool {
        self.duties.is_empty()
    }

    /// The neighbouring duty that makes `person` serving `category` on
    /// `date` a conflict, if any.
    pub fn conflict_at(
        &self,
        group: GroupId,
        person: &str,
        category: DutyCategory,
        date: NaiveDate,
    ) -> Option<(NaiveDate, DutyCategory)> {
        CategoryCalendar::neighbours(date).find_map(|day| {
            self.duties
                .get(&(day, group))
                .filter(|(c, p)| p == person && category.conflicts_with(*c))
                .map(|(c, _)| (day, *c))
        })
    }
}

/// One swap partner proposed by a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapCandidate {
    /// Slot index of the partner.
    pub index: usize,
    /// Search step that produced it, for logs.
    pub step: &'static str,
}

impl SwapCandidate {
    pub(crate) fn new(index: usize, step: &'static str) -> Self {
        Self { index, step }
    }
}

/// Category specific swap-partner search order.
pub trait SwapPolicy {
    /// Policy name for logs.
    fn name(&self) -> &'static str;

    /// Partner slots for `origin`, in the order they should be tried.
    fn candidates(&self, lane: &DutyLane, origin: usize) -> Vec<SwapCandidate>;
}

/// Policy for categories that never swap (Special, Weekend).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSwap;

impl SwapPolicy for NoSwap {
    fn name(&self) -> &'static str {
        "none"
    }

    fn candidates(&self, _lane: &DutyLane, _origin: usize) -> Vec<SwapCandidate> {
        Vec::new()
    }
}

/// Counts from one resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    /// Conflicting slots found.
    pub conflicts: usize,
    /// Swaps executed.
    pub swaps: usize,
    /// Conflicts left in place.
    pub unresolved: usize,
}

/// Repairs adjacency conflicts in one lane.
pub struct ConflictResolver<'a> {
    group: &'a Group,
    context: &'a ConflictContext,
    policy: &'a dyn SwapPolicy,
}

impl<'a> ConflictResolver<'a> {
    /// Creates a resolver.
    pub fn new(group: &'a Group, context: &'a ConflictContext, policy: &'a dyn SwapPolicy) -> Self {
        Self {
            group,
            context,
            policy,
        }
    }

    /// Whether `person` could serve `date` in `lane` without breaking
    /// availability or adjacency.
    pub fn can_take(&self, lane: &DutyLane, person: &str, date: NaiveDate) -> bool {
        self.group.is_available(person, lane.category, date)
            && self
                .context
                .conflict_at(lane.group, person, lane.category, date)
                .is_none()
    }

    /// Whether exchanging slots `origin` and `partner` is allowed.
    pub fn swap_feasible(&self, lane: &DutyLane, origin: usize, partner: usize) -> bool {
        if origin == partner {
            return false;
        }
        let target = &lane.slots[partner];
        if target.locked || target.moved {
            return false;
        }
        let (Some(p), Some(q)) = (lane.person(origin), lane.person(partner)) else {
            return false;
        };
        p != q && self.can_take(lane, p, target.date) && self.can_take(lane, q, lane.date(origin))
    }

    /// Checks every slot in date order and swaps conflicting ones.
    pub fn resolve(
        &self,
        lane: &mut DutyLane,
        ledger: &mut Ledger,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> ResolutionStats {
        let mut stats = ResolutionStats::default();

        for i in 0..lane.len() {
            let date = lane.date(i);
            let Some(person) = lane.person(i).map(str::to_owned) else {
                continue;
            };
            let Some((day, other)) =
                self.context
                    .conflict_at(lane.group, &person, lane.category, date)
            else {
                continue;
            };
            stats.conflicts += 1;
            let reason = format!("{person} also serves {other} on {day}");

            let found = if lane.slots[i].locked {
                None
            } else {
                self.policy
                    .candidates(lane, i)
                    .into_iter()
                    .find(|c| self.swap_feasible(lane, i, c.index))
            };

            match found {
                Some(candidate) => {
                    execute_swap(lane, i, candidate.index, ledger, &reason);
                    debug!(
                        group = lane.group,
                        category = %lane.category,
                        %date,
                        partner_date = %lane.date(candidate.index),
                        step = candidate.step,
                        policy = self.policy.name(),
                        "resolved conflict by swap"
                    );
                    stats.swaps += 1;
                }
                None => {
                    warn!(
                        group = lane.group,
                        category = %lane.category,
                        %date,
                        person = %person,
                        "unresolved adjacency conflict"
                    );
                    diagnostics.push(Diagnostic::unresolved_conflict(
                        lane.group,
                        lane.category,
                        date,
                        person,
                        reason,
                    ));
                    stats.unresolved += 1;
                }
            }
        }
        stats
    }
}

/// Exchanges the occupants of two slots and writes the swap pair.
///
/// Both slots are marked moved. Returns the pair id.
pub(crate) fn execute_swap(
    lane: &mut DutyLane,
    origin: usize,
    partner: usize,
    ledger: &mut Ledger,
    reason: &str,
) -> u64 {
    let origin_date = lane.date(origin);
    let partner_date = lane.date(partner);
    let flags = RecordFlags {
        return_from_absence: false,
        backward_placement: partner_date < origin_date,
        cross_month: (origin_date.year(), origin_date.month())
            != (partner_date.year(), partner_date.month()),
    };

    let incoming = lane.slots[partner].person.take();
    let outgoing = std::mem::replace(&mut lane.slots[origin].person, incoming);
    lane.slots[partner].person = outgoing;
    lane.slots[origin].moved = true;
    lane.slots[partner].moved = true;

    let now_origin = lane.person(origin).unwrap_or_default().to_string();
    let now_partner = lane.person(partner).unwrap_or_default().to_string();
    ledger.record_swap(
        lane.group,
        lane.category,
        &now_origin,
        origin_date,
        &now_partner,
        partner_date,
        reason,
        flags,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MissingPeriod, Person, RecordKind};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    fn lane(people: &[&str], days: &[u32]) -> DutyLane {
        let dates: Vec<_> = days.iter().map(|&x| d(x)).collect();
        let mut lane = DutyLane::new(1, DutyCategory::Semi, &dates);
        for (slot, p) in lane.slots.iter_mut().zip(people) {
            slot.person = Some(p.to_string());
        }
        lane
    }

    struct Forward;

    impl SwapPolicy for Forward {
        fn name(&self) -> &'static str {
            "forward"
        }

        fn candidates(&self, lane: &DutyLane, origin: usize) -> Vec<SwapCandidate> {
            (origin + 1..lane.len())
                .map(|j| SwapCandidate::new(j, "forward"))
                .collect()
        }
    }

    #[test]
    fn test_conflict_at_checks_both_neighbours() {
        let mut ctx = ConflictContext::new();
        ctx.insert(d(3), 1, DutyCategory::Weekend, "A");
        ctx.insert(d(5), 1, DutyCategory::Semi, "B");

        assert_eq!(
            ctx.conflict_at(1, "A", DutyCategory::Semi, d(2)),
            Some((d(3), DutyCategory::Weekend))
        );
        assert_eq!(
            ctx.conflict_at(1, "A", DutyCategory::Normal, d(4)),
            Some((d(3), DutyCategory::Weekend))
        );
        // Other group
        assert_eq!(ctx.conflict_at(2, "A", DutyCategory::Semi, d(2)), None);
        // Weekend/Special never conflict
        assert_eq!(ctx.conflict_at(1, "A", DutyCategory::Special, d(2)), None);
        // Same category never conflicts
        assert_eq!(ctx.conflict_at(1, "B", DutyCategory::Semi, d(6)), None);
    }

    #[test]
    fn test_resolve_swaps_with_first_feasible_partner() {
        let group = Group::new(1).with_roster_all(&["A", "B", "C"]);
        let mut ctx = ConflictContext::new();
        ctx.insert(d(3), 1, DutyCategory::Weekend, "A");
        // B would conflict on the origin date
        ctx.insert(d(1), 1, DutyCategory::Weekend, "B");

        let mut lane = lane(&["A", "B", "C"], &[2, 9, 16]);
        let mut ledger = Ledger::new();
        let mut diags = Vec::new();
        let stats = ConflictResolver::new(&group, &ctx, &Forward).resolve(
            &mut lane,
            &mut ledger,
            &mut diags,
        );

        assert_eq!(stats.swaps, 1);
        assert_eq!(lane.person(0), Some("C"));
        assert_eq!(lane.person(2), Some("A"));
        assert!(lane.slots[0].moved && lane.slots[2].moved);
        assert_eq!(ledger.records_of_kind(RecordKind::Swap).count(), 2);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_unresolved_conflict_is_reported() {
        let group = Group::new(1)
            .with_person(
                Person::new("B", 2).with_missing(MissingPeriod::new(d(1), d(31), "leave")),
            )
            .with_roster_all(&["A", "B"]);
        let mut ctx = ConflictContext::new();
        ctx.insert(d(3), 1, DutyCategory::Weekend, "A");

        let mut lane = lane(&["A", "B"], &[2, 9]);
        let mut ledger = Ledger::new();
        let mut diags = Vec::new();
        let stats = ConflictResolver::new(&group, &ctx, &Forward).resolve(
            &mut lane,
            &mut ledger,
            &mut diags,
        );

        assert_eq!(stats.unresolved, 1);
        assert_eq!(lane.person(0), Some("A"));
        assert!(ledger.is_empty());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].date, Some(d(2)));
    }

    #[test]
    fn test_locked_and_moved_partners_rejected() {
        let group = Group::new(1).with_roster_all(&["A", "B", "C"]);
        let ctx = ConflictContext::new();
        let resolver = ConflictResolver::new(&group, &ctx, &NoSwap);

        let mut lane = lane(&["A", "B", "A"], &[2, 9, 16]);
        assert!(resolver.swap_feasible(&lane, 0, 1));
        // Same person
        assert!(!resolver.swap_feasible(&lane, 0, 2));
        lane.slots[1].locked = true;
        assert!(!resolver.swap_feasible(&lane, 0, 1));
        lane.slots[1].locked = false;
        lane.slots[1].moved = true;
        assert!(!resolver.swap_feasible(&lane, 0, 1));
    }

    #[test]
    fn test_swap_flags() {
        let mut lane = lane(&["A", "B"], &[2, 30]);
        lane.slots[1].date = NaiveDate::from_ymd_opt(2026, 2, 6).unwrap();
        let mut ledger = Ledger::new();
        execute_swap(&mut lane, 1, 0, &mut ledger, "x");

        let r = ledger.get_reason(lane.date(1), 1, "A").unwrap();
        assert!(r.flags.backward_placement);
        assert!(r.flags.cross_month);
        assert_eq!(r.partner_date, Some(d(2)));
    }
}
