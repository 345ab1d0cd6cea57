//! People and their availability.
//!
//! # Availability precedence
//! A person is resolved for `(category, date)` as:
//! 1. `Disabled` if a disabled rule covers the category and date
//! 2. `Missing` if any missing period covers the date
//! 3. `Eligible` otherwise
//!
//! Disabled skips are silent; missing skips produce a Replacement record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::DutyCategory;

/// A person who can be placed on duty rosters.
///
/// The name is the identifier and must be unique within the system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Person {
    /// Unique name.
    pub name: String,
    /// Seniority rank (lower = more senior). Only used for manual roster insertion.
    pub rank: u32,
    /// Disabled categories and missing periods.
    #[serde(default)]
    pub availability: Availability,
    /// Manually entered last duty date per category.
    ///
    /// Seeds the rotation when no checkpoint exists.
    #[serde(default)]
    pub last_duties: BTreeMap<DutyCategory, NaiveDate>,
}

impl Person {
    /// Creates a fully available person.
    pub fn new(name: impl Into<String>, rank: u32) -> Self {
        Self {
            name: name.into(),
            rank,
            availability: Availability::default(),
            last_duties: BTreeMap::new(),
        }
    }

    /// Disables the person for a category, with no end date.
    pub fn with_disabled(mut self, category: DutyCategory) -> Self {
        self.availability.disabled.push(DisabledRule::category(category));
        self
    }

    /// Adds a disabled rule.
    pub fn with_disabled_rule(mut self, rule: DisabledRule) -> Self {
        self.availability.disabled.push(rule);
        self
    }

    /// Adds a missing period.
    pub fn with_missing(mut self, period: MissingPeriod) -> Self {
        self.availability.missing.push(period);
        self
    }

    /// Sets a manual last-duty date.
    pub fn with_last_duty(mut self, category: DutyCategory, date: NaiveDate) -> Self {
        self.last_duties.insert(category, date);
        self
    }
}

/// An inclusive absence interval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MissingPeriod {
    /// First missing day (inclusive).
    pub start: NaiveDate,
    /// Last missing day (inclusive).
    pub end: NaiveDate,
    /// Free-text reason (leave, training, ...).
    #[serde(default)]
    pub reason: String,
}

impl MissingPeriod {
    /// Creates a missing period.
    pub fn new(start: NaiveDate, end: NaiveDate, reason: impl Into<String>) -> Self {
        Self {
            start,
            end,
            reason: reason.into(),
        }
    }

    /// Whether `date` lies inside the period.
    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// First day back on duty.
    pub fn return_date(&self) -> NaiveDate {
        self.end.succ_opt().unwrap_or(self.end)
    }
}

/// Exclusion from one or all categories.
///
/// Without bounds the rule is a plain per-category flag. `from`/`until`
/// restrict it to an inclusive date window.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisabledRule {
    /// Category, or `None` for every category.
    pub category: Option<DutyCategory>,
    /// First disabled day (inclusive).
    pub from: Option<NaiveDate>,
    /// Last disabled day (inclusive).
    pub until: Option<NaiveDate>,
}

impl DisabledRule {
    /// Disables one category indefinitely.
    pub fn category(category: DutyCategory) -> Self {
        Self {
            category: Some(category),
            ..Self::default()
        }
    }

    /// Disables every category indefinitely.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts the rule to `[from, until]`.
    pub fn between(mut self, from: NaiveDate, until: NaiveDate) -> Self {
        self.from = Some(from);
        self.until = Some(until);
        self
    }

    /// Whether the rule applies to `category` at all.
    pub fn covers_category(&self, category: DutyCategory) -> bool {
        self.category.map_or(true, |c| c == category)
    }

    /// Whether the rule applies to `category` on `date`.
    pub fn covers(&self, category: DutyCategory, date: NaiveDate) -> bool {
        self.covers_category(category)
            && self.from.map_or(true, |f| date >= f)
            && self.until.map_or(true, |u| date <= u)
    }
}

/// Per-person availability data.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Availability {
    /// Exclusion rules.
    pub disabled: Vec<DisabledRule>,
    /// Absence intervals.
    pub missing: Vec<MissingPeriod>,
}

/// Result of an availability lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityStatus<'a> {
    /// Can serve.
    Eligible,
    /// Excluded from the category on this date.
    Disabled,
    /// Absent on the date.
    Missing(&'a MissingPeriod),
}

impl AvailabilityStatus<'_> {
    /// Whether the person can serve.
    #[inline]
    pub fn is_eligible(&self) -> bool {
        matches!(self, AvailabilityStatus::Eligible)
    }
}

impl Availability {
    /// Resolves availability for one category and date.
    pub fn resolve(&self, category: DutyCategory, date: NaiveDate) -> AvailabilityStatus<'_> {
        if self.is_disabled_on(category, date) {
            return AvailabilityStatus::Disabled;
        }
        match self.missing_on(date) {
            Some(period) => AvailabilityStatus::Missing(period),
            None => AvailabilityStatus::Eligible,
        }
    }

    /// Whether the person is disabled for `category` on `date`.
    #[inline]
    pub fn is_disabled_on(&self, category: DutyCategory, date: NaiveDate) -> bool {
        self.disabled.iter().any(|r| r.covers(category, date))
    }

    /// The missing period covering `date`, if any.
    pub fn missing_on(&self, date: NaiveDate) -> Option<&MissingPeriod> {
        self.missing.iter().find(|p| p.contains(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    #[test]
    fn test_missing_period_bounds() {
        let p = MissingPeriod::new(d(1, 10), d(1, 12), "leave");
        assert!(p.contains(d(1, 10)));
        assert!(p.contains(d(1, 12)));
        assert!(!p.contains(d(1, 13)));
        assert_eq!(p.return_date(), d(1, 13));
    }

    #[test]
    fn test_resolve_precedence() {
        let person = Person::new("A", 1)
            .with_disabled(DutyCategory::Weekend)
            .with_missing(MissingPeriod::new(d(1, 5), d(1, 6), "sick"));
        let av = &person.availability;

        // Disabled wins even inside a missing period
        assert_eq!(av.resolve(DutyCategory::Weekend, d(1, 5)), AvailabilityStatus::Disabled);
        assert!(matches!(
            av.resolve(DutyCategory::Normal, d(1, 5)),
            AvailabilityStatus::Missing(p) if p.reason == "sick"
        ));
        assert!(av.resolve(DutyCategory::Normal, d(1, 7)).is_eligible());
    }

    #[test]
    fn test_disabled_window() {
        let person = Person::new("C", 3)
            .with_disabled_rule(DisabledRule::category(DutyCategory::Normal).between(d(1, 7), d(1, 7)));
        let av = &person.availability;
        assert_eq!(av.resolve(DutyCategory::Normal, d(1, 7)), AvailabilityStatus::Disabled);
        assert!(av.resolve(DutyCategory::Normal, d(1, 8)).is_eligible());
        assert!(av.resolve(DutyCategory::Semi, d(1, 7)).is_eligible());
    }

    #[test]
    fn test_disabled_all_categories() {
        let person = Person::new("D", 4).with_disabled_rule(DisabledRule::all());
        for c in DutyCategory::ALL {
            assert!(person.availability.is_disabled_on(c, d(6, 1)));
        }
    }

    #[test]
    fn test_person_serde_defaults() {
        let p: Person = serde_json::from_str(r#"{"name":"B","rank":3}"#).unwrap();
        assert_eq!(p.name, "B");
        assert!(p.availability.missing.is_empty());
        assert!(p.last_duties.is_empty());
    }
}
