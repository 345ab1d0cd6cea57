//! Duty rotation engine.
//!
//! Assigns people to daily duty slots by fair round-robin rotation, per
//! group and per duty category, then repairs the result: substitutes for
//! missing people, catch-up duties after an absence, and swaps that keep
//! anyone from serving conflicting categories on adjacent days.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `DutyCategory`, `Group`, `Person`,
//!   `HolidayCalendar`, `RotationRegistry`, `Ledger`, `DutySchedule`
//! - **`scheduler`**: Baseline rotation, reinsertion, conflict resolution,
//!   the four-phase orchestrator and run audit metrics
//! - **`store`**: Persistence boundary and the store-backed `DutyEngine`
//! - **`config`**: Engine parameters, loadable from TOML
//! - **`validation`**: Input integrity checks (duplicate IDs, roster refs, date ranges)
//! - **`error`**: Run-level error types
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use u_roster::config::EngineConfig;
//! use u_roster::models::{DutyCategory, Group, HolidayCalendar};
//! use u_roster::scheduler::CalculationOrchestrator;
//!
//! let groups = vec![Group::new(1).with_roster_all(&["Kim", "Lee", "Park"])];
//! let calendar = HolidayCalendar::new().with_recurring_special_holiday(1, 1);
//! let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
//!
//! let run = CalculationOrchestrator::new(EngineConfig::default())
//!     .run(&groups, &calendar, start, end, false)
//!     .unwrap();
//!
//! assert_eq!(run.phase(DutyCategory::Special).unwrap().stats.dates, 1);
//! assert_eq!(run.assignments.assignment_count(), 31);
//! ```
//!
//! # References
//!
//! - Burke et al. (2004), "The State of the Art of Nurse Rostering"
//! - Ernst et al. (2004), "Staff scheduling and rostering: A review of
//!   applications, methods and models"

pub mod config;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod store;
pub mod validation;
