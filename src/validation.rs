//! Input validation for duty groups.
//!
//! Checks structural integrity of groups, rosters and availability data
//! before a calculation. Detects:
//! - Duplicate group IDs
//! - Duplicate names within one roster
//! - Roster names without a person record
//! - Inverted missing periods and disabled windows
//! - People listed in more than one group

use crate::models::Group;
use std::collections::{HashMap, HashSet};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two groups share the same ID.
    DuplicateId,
    /// A roster lists the same person twice.
    DuplicateRosterEntry,
    /// A roster names someone with no person record.
    UnknownPerson,
    /// A person record is stored under a different name.
    InconsistentPersonRecord,
    /// An interval ends before it starts.
    InvalidDateRange,
    /// A person belongs to more than one group.
    PersonInMultipleGroups,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates groups before a calculation.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_groups(groups: &[Group]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut group_ids = HashSet::new();
    // person -> first group seen
    let mut membership: HashMap<&str, u32> = HashMap::new();

    for group in groups {
        if !group_ids.insert(group.id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate group ID: {}", group.id),
            ));
        }

        for (category, roster) in &group.rosters {
            let mut seen = HashSet::new();
            for name in roster {
                if !seen.insert(name.as_str()) {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::DuplicateRosterEntry,
                        format!("Group {} {category} roster lists '{name}' twice", group.id),
                    ));
                }
                if group.person(name).is_none() {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::UnknownPerson,
                        format!(
                            "Group {} {category} roster names unknown person '{name}'",
                            group.id
                        ),
                    ));
                }
            }
        }

        for (key, person) in &group.people {
            if *key != person.name {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InconsistentPersonRecord,
                    format!(
                        "Group {} stores person '{}' under '{key}'",
                        group.id, person.name
                    ),
                ));
            }

            for period in &person.availability.missing {
                if period.end < period.start {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::InvalidDateRange,
                        format!(
                            "Missing period of '{}' ends {} before it starts {}",
                            person.name, period.end, period.start
                        ),
                    ));
                }
            }
            for rule in &person.availability.disabled {
                if let (Some(from), Some(until)) = (rule.from, rule.until) {
                    if until < from {
                        errors.push(ValidationError::new(
                            ValidationErrorKind::InvalidDateRange,
                            format!(
                                "Disabled window of '{}' ends {until} before it starts {from}",
                                person.name
                            ),
                        ));
                    }
                }
            }

            match membership.get(key.as_str()) {
                Some(&other) if other != group.id => errors.push(ValidationError::new(
                    ValidationErrorKind::PersonInMultipleGroups,
                    format!("'{key}' belongs to groups {other} and {}", group.id),
                )),
                Some(_) => {}
                None => {
                    membership.insert(key.as_str(), group.id);
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
