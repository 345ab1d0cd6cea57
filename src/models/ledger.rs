//! Assignment ledger.
//!
//! An append-only record of every slot whose occupant differs from pure
//! rotation, with the reason. Records are keyed by `(date, group, person)`;
//! a later record for the same key shadows the earlier one in lookups but
//! never removes it.
//!
//! # Record kinds
//!
//! | Kind | Meaning | Linked person |
//! |------|---------|---------------|
//! | Replacement | Substitute covers a missing person, or a returning person is reinserted | Displaced person |
//! | Swap | Two people exchanged dates (always recorded in pairs) | Swap partner |
//! | Shift | Slot changed only through a cascade started elsewhere | Previous occupant |

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{DutyCategory, GroupId};

/// Why a slot deviates from rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Covering for an absent person, or return-from-absence placement.
    Replacement,
    /// Symmetric two-slot exchange.
    Swap,
    /// Displacement caused by a cascade anchored on another date.
    Shift,
}

/// Metadata flags on a ledger record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordFlags {
    /// Placement of a person returning from a missing period.
    pub return_from_absence: bool,
    /// Target or partner date lies before the origin date.
    pub backward_placement: bool,
    /// Target or partner date lies in a different month.
    pub cross_month: bool,
}

/// One ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    /// Slot date.
    pub date: NaiveDate,
    /// Slot group.
    pub group: GroupId,
    /// Person now occupying the slot.
    pub person: String,
    /// Category of the slot.
    pub category: DutyCategory,
    /// Record kind.
    pub kind: RecordKind,
    /// Free-text reason.
    pub reason: String,
    /// Displaced person or swap partner.
    pub linked_person: Option<String>,
    /// Shared by exactly two Swap records.
    pub swap_pair_id: Option<u64>,
    /// For Swap records: the partner's date.
    pub partner_date: Option<NaiveDate>,
    /// For Shift records: the date whose change started the cascade.
    pub anchor_date: Option<NaiveDate>,
    /// Metadata flags.
    #[serde(default)]
    pub flags: RecordFlags,
}

impl AssignmentRecord {
    /// Creates a record with no links.
    pub fn new(
        date: NaiveDate,
        group: GroupId,
        person: impl Into<String>,
        category: DutyCategory,
        kind: RecordKind,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            date,
            group,
            person: person.into(),
            category,
            kind,
            reason: reason.into(),
            linked_person: None,
            swap_pair_id: None,
            partner_date: None,
            anchor_date: None,
            flags: RecordFlags::default(),
        }
    }

    /// Sets the linked person.
    pub fn with_linked(mut self, person: impl Into<String>) -> Self {
        self.linked_person = Some(person.into());
        self
    }

    /// Sets the anchor date.
    pub fn with_anchor(mut self, date: NaiveDate) -> Self {
        self.anchor_date = Some(date);
        self
    }

    /// Sets the flags.
    pub fn with_flags(mut self, flags: RecordFlags) -> Self {
        self.flags = flags;
        self
    }
}

type RecordKey = (NaiveDate, GroupId, String);

/// Append-only ledger of assignment records.
///
/// Serialized as the plain record list; the index is rebuilt on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<AssignmentRecord>", into = "Vec<AssignmentRecord>")]
pub struct Ledger {
    records: Vec<AssignmentRecord>,
    index: HashMap<RecordKey, usize>,
    next_pair_id: u64,
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ledger from previously persisted records.
    ///
    /// New swap pair ids continue after the largest id seen.
    pub fn from_records(records: Vec<AssignmentRecord>) -> Self {
        let mut ledger = Self::new();
        for record in records {
            ledger.push(record);
        }
        ledger
    }

    /// Starts new swap pair ids at `id` or later.
    ///
    /// Keeps pair ids of a new run distinct from those of earlier runs.
    pub fn with_next_pair_id(mut self, id: u64) -> Self {
        self.next_pair_id = self.next_pair_id.max(id);
        self
    }

    /// Id the next recorded swap pair will get.
    pub fn next_pair_id(&self) -> u64 {
        self.next_pair_id
    }

    /// Appends a record.
    pub fn push(&mut self, record: AssignmentRecord) {
        if let Some(id) = record.swap_pair_id {
            self.next_pair_id = self.next_pair_id.max(id + 1);
        }
        let key = (record.date, record.group, record.person.clone());
        self.index.insert(key, self.records.len());
        self.records.push(record);
    }

    /// Records a symmetric swap as two linked records.
    ///
    /// `first` now serves `first_date` (previously `second`'s date) and
    /// vice versa. Returns the shared pair id.
    #[allow(clippy::too_many_arguments)]
    pub fn record_swap(
        &mut self,
        group: GroupId,
        category: DutyCategory,
        first: &str,
        first_date: NaiveDate,
        second: &str,
        second_date: NaiveDate,
        reason: &str,
        flags: RecordFlags,
    ) -> u64 {
        let pair_id = self.next_pair_id;
        self.next_pair_id += 1;

        for (person, date, partner, partner_date) in [
            (first, first_date, second, second_date),
            (second, second_date, first, first_date),
        ] {
            let mut record =
                AssignmentRecord::new(date, group, person, category, RecordKind::Swap, reason)
                    .with_linked(partner)
                    .with_flags(flags);
            record.swap_pair_id = Some(pair_id);
            record.partner_date = Some(partner_date);
            self.push(record);
        }
        pair_id
    }

    /// The latest record explaining why `person` serves `group` on `date`.
    pub fn get_reason(
        &self,
        date: NaiveDate,
        group: GroupId,
        person: &str,
    ) -> Option<&AssignmentRecord> {
        self.index
            .get(&(date, group, person.to_string()))
            .map(|&i| &self.records[i])
    }

    /// Date of the other half of a swap pair.
    ///
    /// `date` is the date of the half the caller already has.
    pub fn find_swap_partner_date(&self, swap_pair_id: u64, date: NaiveDate) -> Option<NaiveDate> {
        self.records
            .iter()
            .find(|r| r.swap_pair_id == Some(swap_pair_id) && r.date != date)
            .map(|r| r.date)
    }

    /// All records in insertion order.
    pub fn records(&self) -> &[AssignmentRecord] {
        &self.records
    }

    /// Records of one kind.
    pub fn records_of_kind(&self, kind: RecordKind) -> impl Iterator<Item = &AssignmentRecord> {
        self.records.iter().filter(move |r| r.kind == kind)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consumes the ledger, returning its records.
    pub fn into_records(self) -> Vec<AssignmentRecord> {
        self.records
    }
}

impl From<Vec<AssignmentRecord>> for Ledger {
    fn from(records: Vec<AssignmentRecord>) -> Self {
        Self::from_records(records)
    }
}

impl From<Ledger> for Vec<AssignmentRecord> {
    fn from(ledger: Ledger) -> Self {
        ledger.records
    }
}
