//! Rotation registry: monthly checkpoints and seed positions.
//!
//! A checkpoint stores, per `(group, category, month)`, the name of the
//! person whose rotation turn was the last one taken in that month. A new
//! run resumes at that person's successor.
//!
//! # Seed priority
//! 1. Checkpoint of the month before the seed date, if the name is still
//!    on the roster
//! 2. Most recent manual last-duty date among roster members
//! 3. Category days counted from a fixed epoch, modulo roster length

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use super::{category_days_between, DayClassifier, DutyCategory, Group, GroupId, YearMonth};

/// Checkpoints of one `(group, category)` keyed by month.
pub type MonthCheckpoints = BTreeMap<YearMonth, String>;

/// Where a seed position came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedSource {
    /// Previous month's checkpoint.
    Checkpoint,
    /// Manual last-duty dates.
    LastDuty,
    /// Epoch-based category-day count.
    Epoch,
}

/// A resolved starting rotation index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedPosition {
    /// Index into the roster of the first person to serve.
    pub index: usize,
    /// How the index was derived.
    pub source: SeedSource,
}

/// Checkpoint store for all groups and categories.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RotationRegistry {
    checkpoints: BTreeMap<GroupId, BTreeMap<DutyCategory, MonthCheckpoints>>,
}

impl RotationRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the checkpoints of one `(group, category)`.
    pub fn with_checkpoints(
        mut self,
        group: GroupId,
        category: DutyCategory,
        checkpoints: MonthCheckpoints,
    ) -> Self {
        self.checkpoints
            .entry(group)
            .or_default()
            .insert(category, checkpoints);
        self
    }

    /// Checkpoints of one `(group, category)`.
    pub fn checkpoints(&self, group: GroupId, category: DutyCategory) -> Option<&MonthCheckpoints> {
        self.checkpoints.get(&group).and_then(|m| m.get(&category))
    }

    /// Checkpoint of one month.
    pub fn checkpoint(&self, group: GroupId, category: DutyCategory, month: YearMonth) -> Option<&str> {
        self.checkpoints(group, category)
            .and_then(|m| m.get(&month))
            .map(String::as_str)
    }

    /// Upserts a checkpoint. Last write wins.
    pub fn record_checkpoint(
        &mut self,
        group: GroupId,
        category: DutyCategory,
        month: YearMonth,
        person: impl Into<String>,
    ) {
        self.checkpoints
            .entry(group)
            .or_default()
            .entry(category)
            .or_default()
            .insert(month, person.into());
    }

    /// Iterates over every `(group, category)` with its checkpoints.
    pub fn iter(&self) -> impl Iterator<Item = (GroupId, DutyCategory, &MonthCheckpoints)> {
        self.checkpoints.iter().flat_map(|(g, by_cat)| {
            by_cat.iter().map(move |(c, months)| (*g, *c, months))
        })
    }

    /// Person following `after` in the roster, wrapping around.
    ///
    /// If `after` is not on the roster, the first member is returned.
    /// Returns `None` for an empty roster.
    pub fn next_in_rotation<'g>(
        group: &'g Group,
        category: DutyCategory,
        after: &str,
    ) -> Option<&'g str> {
        let roster = group.roster(category);
        if roster.is_empty() {
            return None;
        }
        let next = roster
            .iter()
            .position(|n| n == after)
            .map_or(0, |i| (i + 1) % roster.len());
        Some(roster[next].as_str())
    }

    /// Starting rotation index for the first `category` date on or after `date`.
    ///
    /// Returns `None` for an empty roster.
    pub fn seed_position(
        &self,
        group: &Group,
        category: DutyCategory,
        date: NaiveDate,
        classifier: &dyn DayClassifier,
        epoch: NaiveDate,
    ) -> Option<SeedPosition> {
        let roster = group.roster(category);
        if roster.is_empty() {
            return None;
        }
        let len = roster.len();

        let prev_month = YearMonth::of(date).previous();
        if let Some(name) = self.checkpoint(group.id, category, prev_month) {
            match roster.iter().position(|n| n == name) {
                Some(i) => {
                    return Some(SeedPosition {
                        index: (i + 1) % len,
                        source: SeedSource::Checkpoint,
                    })
                }
                None => warn!(
                    group = group.id,
                    %category,
                    month = %prev_month,
                    person = name,
                    "checkpoint person no longer on roster, falling back"
                ),
            }
        }

        let latest = roster
            .iter()
            .enumerate()
            .filter_map(|(i, n)| group.last_duty(n, category).map(|d| (d, i)))
            .filter(|(d, _)| *d < date)
            .max();
        if let Some((_, i)) = latest {
            return Some(SeedPosition {
                index: (i + 1) % len,
                source: SeedSource::LastDuty,
            });
        }

        let count = category_days_between(classifier, category, epoch, date);
        Some(SeedPosition {
            index: count.rem_euclid(len as i64) as usize,
            source: SeedSource::Epoch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HolidayCalendar, Person};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn group() -> Group {
        Group::new(1).with_roster(DutyCategory::Normal, &["A", "B", "C"])
    }

    #[test]
    fn test_next_in_rotation_wraps() {
        let g = group();
        assert_eq!(RotationRegistry::next_in_rotation(&g, DutyCategory::Normal, "A"), Some("B"));
        assert_eq!(RotationRegistry::next_in_rotation(&g, DutyCategory::Normal, "C"), Some("A"));
        assert_eq!(RotationRegistry::next_in_rotation(&g, DutyCategory::Normal, "Z"), Some("A"));
        assert_eq!(RotationRegistry::next_in_rotation(&g, DutyCategory::Semi, "A"), None);
    }

    #[test]
    fn test_seed_from_previous_month_checkpoint() {
        let g = group();
        let mut reg = RotationRegistry::new();
        reg.record_checkpoint(1, DutyCategory::Normal, YearMonth::new(2026, 1).unwrap(), "B");
        // A checkpoint for the seed month itself is ignored
        reg.record_checkpoint(1, DutyCategory::Normal, YearMonth::new(2026, 2).unwrap(), "A");

        let cal = HolidayCalendar::new();
        let seed = reg
            .seed_position(&g, DutyCategory::Normal, d(2026, 2, 2), &cal, d(2024, 1, 1))
            .unwrap();
        assert_eq!(seed.index, 2);
        assert_eq!(seed.source, SeedSource::Checkpoint);
    }

    #[test]
    fn test_record_checkpoint_last_write_wins() {
        let mut reg = RotationRegistry::new();
        let jan = YearMonth::new(2026, 1).unwrap();
        reg.record_checkpoint(1, DutyCategory::Weekend, jan, "A");
        reg.record_checkpoint(1, DutyCategory::Weekend, jan, "C");
        assert_eq!(reg.checkpoint(1, DutyCategory::Weekend, jan), Some("C"));
        assert_eq!(reg.iter().count(), 1);
    }

    #[test]
    fn test_stale_checkpoint_falls_back_to_epoch() {
        let g = group();
        let mut reg = RotationRegistry::new();
        reg.record_checkpoint(1, DutyCategory::Normal, YearMonth::new(2026, 1).unwrap(), "Gone");

        let cal = HolidayCalendar::new();
        let epoch = d(2026, 1, 5); // Monday
        // Mon..Thu of the first week = 4 normal days → 4 % 3 = 1
        let seed = reg
            .seed_position(&g, DutyCategory::Normal, d(2026, 2, 2), &cal, epoch)
            .unwrap();
        assert_eq!(seed.source, SeedSource::Epoch);

        let count = category_days_between(&cal, DutyCategory::Normal, epoch, d(2026, 2, 2));
        assert_eq!(seed.index, (count % 3) as usize);
    }

    #[test]
    fn test_epoch_seed_is_zero_at_epoch() {
        let g = group();
        let cal = HolidayCalendar::new();
        let seed = RotationRegistry::new()
            .seed_position(&g, DutyCategory::Normal, d(2026, 1, 5), &cal, d(2026, 1, 5))
            .unwrap();
        assert_eq!(seed.index, 0);
    }

    #[test]
    fn test_seed_from_manual_last_duty() {
        let g = Group::new(1)
            .with_person(Person::new("A", 1).with_last_duty(DutyCategory::Normal, d(2026, 1, 20)))
            .with_person(Person::new("B", 2).with_last_duty(DutyCategory::Normal, d(2026, 1, 22)))
            // Later than the seed date: ignored
            .with_person(Person::new("C", 3).with_last_duty(DutyCategory::Normal, d(2026, 3, 1)))
            .with_roster(DutyCategory::Normal, &["A", "B", "C"]);

        let cal = HolidayCalendar::new();
        let seed = RotationRegistry::new()
            .seed_position(&g, DutyCategory::Normal, d(2026, 2, 2), &cal, d(2024, 1, 1))
            .unwrap();
        assert_eq!(seed.source, SeedSource::LastDuty);
        assert_eq!(seed.index, 2);
    }

    #[test]
    fn test_empty_roster_has_no_seed() {
        let g = Group::new(1);
        let cal = HolidayCalendar::new();
        assert!(RotationRegistry::new()
            .seed_position(&g, DutyCategory::Normal, d(2026, 2, 2), &cal, d(2024, 1, 1))
            .is_none());
    }
}
