//! Duty categories and the adjacency-conflict relation.
//!
//! Every calendar date carries exactly one [`DutyCategory`]. Categories
//! are processed in a fixed phase order (Special → Weekend → Semi →
//! Normal); later phases treat earlier phases' results as fixed context.
//!
//! # Adjacency
//!
//! | Category | Conflicts with (previous / next calendar day) |
//! |----------|-----------------------------------------------|
//! | Normal   | Semi, Weekend, Special                        |
//! | Semi     | Normal, Weekend, Special                      |
//! | Weekend  | Normal, Semi                                  |
//! | Special  | Normal, Semi                                  |
//!
//! Weekend and Special never conflict with each other, and no category
//! conflicts with itself.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a duty day.
///
/// The declaration order is the phase order, so `Ord` sorts categories
/// the way the orchestrator processes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DutyCategory {
    /// Special holidays (highest priority).
    Special,
    /// Weekends and ordinary holidays.
    Weekend,
    /// Days preceding a weekend or holiday, and Fridays.
    Semi,
    /// Every other day.
    Normal,
}

/// Adjacency table indexed by `[a.index()][b.index()]`.
const CONFLICTS: [[bool; 4]; 4] = [
    // Special  Weekend Semi   Normal
    [false, false, true, true], // Special
    [false, false, true, true], // Weekend
    [true, true, false, true],  // Semi
    [true, true, true, false],  // Normal
];

impl DutyCategory {
    /// All categories in phase order.
    pub const ALL: [DutyCategory; 4] = [
        DutyCategory::Special,
        DutyCategory::Weekend,
        DutyCategory::Semi,
        DutyCategory::Normal,
    ];

    #[inline]
    fn index(self) -> usize {
        match self {
            DutyCategory::Special => 0,
            DutyCategory::Weekend => 1,
            DutyCategory::Semi => 2,
            DutyCategory::Normal => 3,
        }
    }

    /// Priority level (1 = processed first).
    #[inline]
    pub fn priority(self) -> u8 {
        self.index() as u8 + 1
    }

    /// Whether serving `self` and `other` on calendar-adjacent days is a conflict.
    ///
    /// The relation is symmetric: it does not matter which of the two
    /// days comes first.
    #[inline]
    pub fn conflicts_with(self, other: DutyCategory) -> bool {
        CONFLICTS[self.index()][other.index()]
    }

    /// Categories finalized before this one in a calculation run.
    pub fn predecessors(self) -> &'static [DutyCategory] {
        &Self::ALL[..self.index()]
    }

    /// Lowercase name used in logs and serialized data.
    pub fn as_str(self) -> &'static str {
        match self {
            DutyCategory::Special => "special",
            DutyCategory::Weekend => "weekend",
            DutyCategory::Semi => "semi",
            DutyCategory::Normal => "normal",
        }
    }
}

impl fmt::Display for DutyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DutyCategory::*;

    #[test]
    fn test_adjacency_table() {
        assert!(Normal.conflicts_with(Semi));
        assert!(Normal.conflicts_with(Weekend));
        assert!(Normal.conflicts_with(Special));
        assert!(Semi.conflicts_with(Weekend));
        assert!(Semi.conflicts_with(Special));
        assert!(Semi.conflicts_with(Normal));

        assert!(!Weekend.conflicts_with(Special));
        assert!(!Special.conflicts_with(Weekend));
        for c in DutyCategory::ALL {
            assert!(!c.conflicts_with(c), "{c} must not conflict with itself");
        }
    }

    #[test]
    fn test_adjacency_symmetric() {
        for a in DutyCategory::ALL {
            for b in DutyCategory::ALL {
                assert_eq!(a.conflicts_with(b), b.conflicts_with(a));
            }
        }
    }

    #[test]
    fn test_phase_order() {
        let mut sorted = vec![Normal, Weekend, Special, Semi];
        sorted.sort();
        assert_eq!(sorted, DutyCategory::ALL.to_vec());
        assert_eq!(Special.priority(), 1);
        assert_eq!(Normal.priority(), 4);
        assert_eq!(Semi.predecessors(), &[Special, Weekend]);
        assert!(Special.predecessors().is_empty());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Weekend).unwrap();
        assert_eq!(json, "\"weekend\"");
        let back: DutyCategory = serde_json::from_str("\"semi\"").unwrap();
        assert_eq!(back, Semi);
    }
}
