//! Working state of one `(group, category)` during a phase.

use chrono::NaiveDate;

use crate::models::{DutyCategory, DutySchedule, GroupId, MonthCheckpoints, YearMonth};

/// One dated duty slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    /// Slot date.
    pub date: NaiveDate,
    /// Current occupant. `None` when nobody was available.
    pub person: Option<String>,
    /// Occupant right after the baseline pass.
    pub baseline_person: Option<String>,
    /// Person pure rotation picked, before availability rules.
    pub rotation_person: Option<String>,
    /// Preserved from an earlier run; never moved.
    pub locked: bool,
    /// Already changed by a swap or shift in this phase.
    pub moved: bool,
}

impl Slot {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            person: None,
            baseline_person: None,
            rotation_person: None,
            locked: false,
            moved: false,
        }
    }
}

/// Date-ordered slots of one category within one group.
#[derive(Debug, Clone)]
pub struct DutyLane {
    /// Owning group.
    pub group: GroupId,
    /// Category of every slot.
    pub category: DutyCategory,
    /// Slots in ascending date order.
    pub slots: Vec<Slot>,
}

impl DutyLane {
    /// Creates empty slots for `dates` (must be ascending).
    pub fn new(group: GroupId, category: DutyCategory, dates: &[NaiveDate]) -> Self {
        Self {
            group,
            category,
            slots: dates.iter().copied().map(Slot::new).collect(),
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the lane has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot index of `date`.
    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.slots.binary_search_by_key(&date, |s| s.date).ok()
    }

    /// Date of slot `i`.
    #[inline]
    pub fn date(&self, i: usize) -> NaiveDate {
        self.slots[i].date
    }

    /// Occupant of slot `i`.
    #[inline]
    pub fn person(&self, i: usize) -> Option<&str> {
        self.slots[i].person.as_deref()
    }

    /// Whether `person` occupies slot `i`.
    #[inline]
    pub fn is_occupied_by(&self, i: usize, person: &str) -> bool {
        self.person(i) == Some(person)
    }

    /// Final occupants as a schedule.
    pub fn to_schedule(&self) -> DutySchedule {
        self.collect(|s| s.person.as_deref())
    }

    /// Post-baseline occupants as a schedule.
    pub fn baseline_schedule(&self) -> DutySchedule {
        self.collect(|s| s.baseline_person.as_deref())
    }

    /// Locked (preserved) occupants as a schedule.
    pub fn locked_schedule(&self) -> DutySchedule {
        self.collect(|s| if s.locked { s.person.as_deref() } else { None })
    }

    /// Pure-rotation picks as a schedule.
    pub fn rotation_schedule(&self) -> DutySchedule {
        self.collect(|s| s.rotation_person.as_deref())
    }

    /// Occupant of the last filled slot of each month.
    ///
    /// A month whose slots are all empty gets no entry.
    pub fn month_checkpoints(&self) -> MonthCheckpoints {
        let mut checkpoints = MonthCheckpoints::new();
        for slot in &self.slots {
            if let Some(p) = &slot.person {
                checkpoints.insert(YearMonth::of(slot.date), p.clone());
            }
        }
        checkpoints
    }

    fn collect<'a>(&'a self, pick: impl Fn(&'a Slot) -> Option<&'a str>) -> DutySchedule {
        let mut schedule = DutySchedule::new();
        for slot in &self.slots {
            if let Some(p) = pick(slot) {
                schedule.set(slot.date, self.group, p);
            }
        }
        schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    #[test]
    fn test_position_and_occupancy() {
        let mut lane = DutyLane::new(1, DutyCategory::Normal, &[d(5), d(6), d(8)]);
        assert_eq!(lane.len(), 3);
        assert_eq!(lane.position(d(6)), Some(1));
        assert_eq!(lane.position(d(7)), None);

        lane.slots[1].person = Some("A".into());
        assert!(lane.is_occupied_by(1, "A"));
        assert!(!lane.is_occupied_by(0, "A"));
    }

    #[test]
    fn test_schedules_skip_empty_slots() {
        let mut lane = DutyLane::new(2, DutyCategory::Semi, &[d(2), d(9)]);
        lane.slots[0].person = Some("A".into());
        lane.slots[0].rotation_person = Some("B".into());
        lane.slots[1].rotation_person = Some("C".into());

        let final_ = lane.to_schedule();
        assert_eq!(final_.assignment_count(), 1);
        assert_eq!(final_.get(d(2), 2), Some("A"));
        assert_eq!(lane.rotation_schedule().sequence(2), vec!["B", "C"]);
        assert!(lane.baseline_schedule().is_empty());

        lane.slots[0].locked = true;
        assert_eq!(lane.locked_schedule().sequence(2), vec!["A"]);
    }

    #[test]
    fn test_month_checkpoints_use_last_filled_slot() {
        let feb = NaiveDate::from_ymd_opt(2026, 2, 2).unwrap();
        let mut lane = DutyLane::new(1, DutyCategory::Normal, &[d(29), d(30), feb]);
        lane.slots[0].person = Some("A".into());
        lane.slots[1].rotation_person = Some("B".into());

        let checkpoints = lane.month_checkpoints();
        assert_eq!(checkpoints.len(), 1);
        assert_eq!(checkpoints[&YearMonth::of(d(1))], "A");

        lane.slots[1].person = Some("C".into());
        lane.slots[2].person = Some("D".into());
        let checkpoints = lane.month_checkpoints();
        assert_eq!(checkpoints[&YearMonth::of(d(1))], "C");
        assert_eq!(checkpoints[&YearMonth::of(feb)], "D");
    }
}
