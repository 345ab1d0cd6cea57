//! Duty groups.
//!
//! A group owns one ordered roster per category plus the person records
//! (availability, manual last duties) of its members. Rosters are
//! administered outside the engine; a calculation run only reads them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{AvailabilityStatus, DutyCategory, Person};

/// Group identifier (1..N).
pub type GroupId = u32;

/// A duty group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    /// Group identifier.
    pub id: GroupId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Person records keyed by name.
    #[serde(default)]
    pub people: BTreeMap<String, Person>,
    /// Rotation order per category.
    #[serde(default)]
    pub rosters: BTreeMap<DutyCategory, Vec<String>>,
}

impl Group {
    /// Creates an empty group.
    pub fn new(id: GroupId) -> Self {
        Self {
            id,
            name: String::new(),
            people: BTreeMap::new(),
            rosters: BTreeMap::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds (or replaces) a person record.
    pub fn with_person(mut self, person: Person) -> Self {
        self.people.insert(person.name.clone(), person);
        self
    }

    /// Sets the roster for a category.
    ///
    /// Names without a person record are added as rank-0, fully
    /// available people.
    pub fn with_roster<S: AsRef<str>>(mut self, category: DutyCategory, names: &[S]) -> Self {
        let roster: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
        for name in &roster {
            self.people
                .entry(name.clone())
                .or_insert_with(|| Person::new(name.clone(), 0));
        }
        self.rosters.insert(category, roster);
        self
    }

    /// Sets the same roster for every category.
    pub fn with_roster_all<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        for category in DutyCategory::ALL {
            self = self.with_roster(category, names);
        }
        self
    }

    /// Rotation order for a category (empty if none).
    pub fn roster(&self, category: DutyCategory) -> &[String] {
        self.rosters
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Person record by name.
    pub fn person(&self, name: &str) -> Option<&Person> {
        self.people.get(name)
    }

    /// Mutable person record by name.
    pub fn person_mut(&mut self, name: &str) -> Option<&mut Person> {
        self.people.get_mut(name)
    }

    /// Availability of `name` for a category on a date.
    ///
    /// Unknown names are treated as eligible.
    pub fn availability(
        &self,
        name: &str,
        category: DutyCategory,
        date: NaiveDate,
    ) -> AvailabilityStatus<'_> {
        match self.people.get(name) {
            Some(p) => p.availability.resolve(category, date),
            None => AvailabilityStatus::Eligible,
        }
    }

    /// Whether `name` can serve `category` on `date`.
    #[inline]
    pub fn is_available(&self, name: &str, category: DutyCategory, date: NaiveDate) -> bool {
        self.availability(name, category, date).is_eligible()
    }

    /// Whether `name` is disabled for `category` on `date`.
    pub fn is_disabled_on(&self, name: &str, category: DutyCategory, date: NaiveDate) -> bool {
        self.people
            .get(name)
            .is_some_and(|p| p.availability.is_disabled_on(category, date))
    }

    /// Manual last-duty date of `name` for `category`.
    pub fn last_duty(&self, name: &str, category: DutyCategory) -> Option<NaiveDate> {
        self.people
            .get(name)
            .and_then(|p| p.last_duties.get(&category).copied())
    }

    /// Inserts `name` into a roster by rank.
    ///
    /// The newcomer goes after the last member whose rank is less than
    /// or equal to theirs (members without a record count as rank 0).
    /// The person record must already exist. Returns `false` if the
    /// record is missing or the name is already on the roster.
    pub fn insert_by_rank(&mut self, category: DutyCategory, name: &str) -> bool {
        let Some(rank) = self.people.get(name).map(|p| p.rank) else {
            return false;
        };
        let people = &self.people;
        let roster = self.rosters.entry(category).or_default();
        if roster.iter().any(|n| n == name) {
            return false;
        }

        let rank_of = |n: &String| people.get(n).map_or(0, |p| p.rank);
        let pos = roster
            .iter()
            .rposition(|n| rank_of(n) <= rank)
            .map_or(0, |i| i + 1);
        roster.insert(pos, name.to_string());
        true
    }
}
