//! Duty rotation domain models.
//!
//! Provides the core data types for rotation scheduling: categories and
//! their adjacency relation, groups with per-category rosters, person
//! availability, rotation checkpoints, the assignment ledger, and the
//! resulting schedule.
//!
//! # Domain Mappings
//!
//! | u-roster | Hospital | Fire service | IT operations |
//! |----------|----------|--------------|---------------|
//! | Group | Ward team | Station shift | Support tier |
//! | Person | Physician | Firefighter | Engineer |
//! | DutyCategory | Holiday/weekend/eve/weekday call | Same | On-call class |
//! | Checkpoint | Last on-call per month | Same | Last pager holder |

mod calendar;
mod category;
mod group;
mod ledger;
mod person;
mod rotation;
mod schedule;

pub use calendar::{
    category_days_between, is_weekend, CategoryCalendar, DayClassifier, HolidayCalendar,
    RecurringHoliday, YearMonth,
};
pub use category::DutyCategory;
pub use group::{Group, GroupId};
pub use ledger::{AssignmentRecord, Ledger, RecordFlags, RecordKind};
pub use person::{Availability, AvailabilityStatus, DisabledRule, MissingPeriod, Person};
pub use rotation::{MonthCheckpoints, RotationRegistry, SeedPosition, SeedSource};
pub use schedule::{AssignmentMap, Diagnostic, DiagnosticKind, DutySchedule};
