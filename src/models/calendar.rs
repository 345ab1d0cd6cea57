//! Calendar classification models.
//!
//! The engine never decides holidays itself. A [`DayClassifier`] labels
//! each date with its [`DutyCategory`]; [`CategoryCalendar`] freezes those
//! labels for one calculation run so every phase sees the same answer.
//!
//! [`HolidayCalendar`] is a reference classifier built from explicit and
//! recurring holiday dates.
//!
//! # Classification rules (HolidayCalendar)
//! 1. Special holiday → `Special`
//! 2. Holiday, Saturday or Sunday → `Weekend`
//! 3. December 30 → `Semi` when it is a Friday, otherwise `Normal`
//! 4. Day before a weekend, holiday or special holiday → `Semi`
//! 5. Friday → `Semi`
//! 6. Otherwise → `Normal`

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::DutyCategory;

/// Labels a calendar date with its duty category.
///
/// Must be a pure function: the same date always yields the same
/// category for the duration of a run.
pub trait DayClassifier {
    /// Category of `date`.
    fn classify(&self, date: NaiveDate) -> DutyCategory;
}

impl<F> DayClassifier for F
where
    F: Fn(NaiveDate) -> DutyCategory,
{
    fn classify(&self, date: NaiveDate) -> DutyCategory {
        self(date)
    }
}

/// A calendar month, used as the checkpoint key.
///
/// Serialized as `"YYYY-MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct YearMonth {
    /// Calendar year.
    pub year: i32,
    /// Month (1-12).
    pub month: u32,
}

impl YearMonth {
    /// Creates a month key. Returns `None` for an out-of-range month.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The month before this one.
    pub fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// The month after this one.
    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Whether `date` falls in this month.
    #[inline]
    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (y, m) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid month key '{s}', expected YYYY-MM"))?;
        let year = y
            .parse::<i32>()
            .map_err(|e| format!("invalid year in '{s}': {e}"))?;
        let month = m
            .parse::<u32>()
            .map_err(|e| format!("invalid month in '{s}': {e}"))?;
        Self::new(year, month).ok_or_else(|| format!("month out of range in '{s}'"))
    }
}

impl From<YearMonth> for String {
    fn from(ym: YearMonth) -> Self {
        ym.to_string()
    }
}

impl TryFrom<String> for YearMonth {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A holiday that repeats every year on the same month/day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringHoliday {
    /// Month (1-12).
    pub month: u32,
    /// Day of month.
    pub day: u32,
}

impl RecurringHoliday {
    /// Creates a recurring holiday.
    pub fn new(month: u32, day: u32) -> Self {
        Self { month, day }
    }

    #[inline]
    fn matches(&self, date: NaiveDate) -> bool {
        date.month() == self.month && date.day() == self.day
    }
}

/// Reference classifier driven by holiday lists.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use u_roster::models::{DayClassifier, DutyCategory, HolidayCalendar};
///
/// let cal = HolidayCalendar::new()
///     .with_special_holiday(NaiveDate::from_ymd_opt(2026, 12, 24).unwrap());
///
/// // Thursday before a Friday: normal
/// assert_eq!(cal.classify(NaiveDate::from_ymd_opt(2026, 1, 8).unwrap()), DutyCategory::Normal);
/// // Friday: semi
/// assert_eq!(cal.classify(NaiveDate::from_ymd_opt(2026, 1, 9).unwrap()), DutyCategory::Semi);
/// // Saturday: weekend
/// assert_eq!(cal.classify(NaiveDate::from_ymd_opt(2026, 1, 10).unwrap()), DutyCategory::Weekend);
/// // Special holiday wins over everything
/// assert_eq!(cal.classify(NaiveDate::from_ymd_opt(2026, 12, 24).unwrap()), DutyCategory::Special);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HolidayCalendar {
    /// Explicit special holiday dates.
    pub special_holidays: BTreeSet<NaiveDate>,
    /// Special holidays repeating every year.
    pub recurring_special_holidays: Vec<RecurringHoliday>,
    /// Explicit holiday dates.
    pub holidays: BTreeSet<NaiveDate>,
    /// Holidays repeating every year.
    pub recurring_holidays: Vec<RecurringHoliday>,
}

impl HolidayCalendar {
    /// Creates a calendar with no holidays (weekends only).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an explicit special holiday.
    pub fn with_special_holiday(mut self, date: NaiveDate) -> Self {
        self.special_holidays.insert(date);
        self
    }

    /// Adds a special holiday that repeats every year.
    pub fn with_recurring_special_holiday(mut self, month: u32, day: u32) -> Self {
        self.recurring_special_holidays
            .push(RecurringHoliday::new(month, day));
        self
    }

    /// Adds an explicit holiday.
    pub fn with_holiday(mut self, date: NaiveDate) -> Self {
        self.holidays.insert(date);
        self
    }

    /// Adds a holiday that repeats every year.
    pub fn with_recurring_holiday(mut self, month: u32, day: u32) -> Self {
        self.recurring_holidays
            .push(RecurringHoliday::new(month, day));
        self
    }

    /// Whether `date` is a special holiday.
    pub fn is_special_holiday(&self, date: NaiveDate) -> bool {
        self.special_holidays.contains(&date)
            || self.recurring_special_holidays.iter().any(|h| h.matches(date))
    }

    /// Whether `date` is an ordinary holiday.
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date) || self.recurring_holidays.iter().any(|h| h.matches(date))
    }

    fn is_day_off(&self, date: NaiveDate) -> bool {
        is_weekend(date) || self.is_holiday(date) || self.is_special_holiday(date)
    }
}

impl DayClassifier for HolidayCalendar {
    fn classify(&self, date: NaiveDate) -> DutyCategory {
        if self.is_special_holiday(date) {
            return DutyCategory::Special;
        }
        if self.is_holiday(date) || is_weekend(date) {
            return DutyCategory::Weekend;
        }

        // Dec 30 precedes the Dec 31 special holiday in most setups but stays a working day.
        if date.month() == 12 && date.day() == 30 {
            return if date.weekday() == Weekday::Fri {
                DutyCategory::Semi
            } else {
                DutyCategory::Normal
            };
        }

        let next_is_off = date.succ_opt().is_some_and(|next| self.is_day_off(next));
        if next_is_off || date.weekday() == Weekday::Fri {
            DutyCategory::Semi
        } else {
            DutyCategory::Normal
        }
    }
}

/// Whether `date` is a Saturday or Sunday.
#[inline]
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Counts days of `category` in `[from, to)`.
///
/// Returns a negative count when `to < from`, so callers can take the
/// result modulo a roster length with `rem_euclid`.
pub fn category_days_between(
    classifier: &dyn DayClassifier,
    category: DutyCategory,
    from: NaiveDate,
    to: NaiveDate,
) -> i64 {
    let (lo, hi, sign) = if from <= to {
        (from, to, 1)
    } else {
        (to, from, -1)
    };
    let count = lo
        .iter_days()
        .take_while(|d| *d < hi)
        .filter(|d| classifier.classify(*d) == category)
        .count() as i64;
    count * sign
}

/// Frozen classification for one calculation run.
///
/// Covers `[start, end]` plus one day of padding on either side, so
/// adjacency checks at the range boundaries see the neighbouring
/// categories.
#[derive(Debug, Clone)]
pub struct CategoryCalendar {
    start: NaiveDate,
    end: NaiveDate,
    days: BTreeMap<NaiveDate, DutyCategory>,
    by_category: BTreeMap<DutyCategory, Vec<NaiveDate>>,
}

impl CategoryCalendar {
    /// Classifies every date of `[start - 1, end + 1]`.
    ///
    /// An inverted range produces an empty calendar.
    pub fn build(classifier: &dyn DayClassifier, start: NaiveDate, end: NaiveDate) -> Self {
        let mut days = BTreeMap::new();
        let mut by_category: BTreeMap<DutyCategory, Vec<NaiveDate>> = BTreeMap::new();

        if start <= end {
            let lo = start.pred_opt().unwrap_or(start);
            let hi = end.succ_opt().unwrap_or(end);
            for date in lo.iter_days().take_while(|d| *d <= hi) {
                let category = classifier.classify(date);
                days.insert(date, category);
                if date >= start && date <= end {
                    by_category.entry(category).or_default().push(date);
                }
            }
        }

        Self {
            start,
            end,
            days,
            by_category,
        }
    }

    /// First date of the run.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last date of the run.
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether `date` lies inside the run range.
    #[inline]
    pub fn in_range(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Category of `date`, including the padding days.
    pub fn category(&self, date: NaiveDate) -> Option<DutyCategory> {
        self.days.get(&date).copied()
    }

    /// In-range dates of `category`, ascending.
    pub fn dates(&self, category: DutyCategory) -> &[NaiveDate] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The previous and next calendar days of `date`.
    pub fn neighbours(date: NaiveDate) -> impl Iterator<Item = NaiveDate> {
        [date - Duration::days(1), date + Duration::days(1)].into_iter()
    }

    /// All classified in-range days, ascending.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, DutyCategory)> + '_ {
        self.days
            .range(self.start..=self.end)
            .map(|(d, c)| (*d, *c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_year_month_navigation() {
        let jan = YearMonth::new(2026, 1).unwrap();
        assert_eq!(jan.previous(), YearMonth::new(2025, 12).unwrap());
        assert_eq!(jan.next(), YearMonth::new(2026, 2).unwrap());
        assert_eq!(YearMonth::of(d(2026, 12, 31)).next(), YearMonth::new(2027, 1).unwrap());
        assert!(jan.contains(d(2026, 1, 31)));
        assert!(!jan.contains(d(2026, 2, 1)));
        assert!(YearMonth::new(2026, 13).is_none());
    }

    #[test]
    fn test_year_month_string_form() {
        let ym = YearMonth::new(2026, 3).unwrap();
        assert_eq!(ym.to_string(), "2026-03");
        assert_eq!("2026-03".parse::<YearMonth>().unwrap(), ym);
        assert!("2026/03".parse::<YearMonth>().is_err());
        assert!("2026-00".parse::<YearMonth>().is_err());

        let json = serde_json::to_string(&ym).unwrap();
        assert_eq!(json, "\"2026-03\"");
    }

    #[test]
    fn test_weekday_classification() {
        let cal = HolidayCalendar::new();
        // 2026-01-05 is a Monday
        assert_eq!(cal.classify(d(2026, 1, 5)), DutyCategory::Normal);
        assert_eq!(cal.classify(d(2026, 1, 8)), DutyCategory::Normal);
        assert_eq!(cal.classify(d(2026, 1, 9)), DutyCategory::Semi);
        assert_eq!(cal.classify(d(2026, 1, 10)), DutyCategory::Weekend);
        assert_eq!(cal.classify(d(2026, 1, 11)), DutyCategory::Weekend);
    }

    #[test]
    fn test_day_before_holiday_is_semi() {
        // Wednesday 2026-03-25 holiday → Tuesday becomes semi
        let cal = HolidayCalendar::new().with_recurring_holiday(3, 25);
        assert_eq!(cal.classify(d(2026, 3, 25)), DutyCategory::Weekend);
        assert_eq!(cal.classify(d(2026, 3, 24)), DutyCategory::Semi);
        assert_eq!(cal.classify(d(2026, 3, 23)), DutyCategory::Normal);
    }

    #[test]
    fn test_special_overrides_weekend() {
        // 2026-12-26 is a Saturday
        let cal = HolidayCalendar::new().with_special_holiday(d(2026, 12, 26));
        assert_eq!(cal.classify(d(2026, 12, 26)), DutyCategory::Special);
        // Friday before it is semi either way
        assert_eq!(cal.classify(d(2026, 12, 25)), DutyCategory::Semi);
    }

    #[test]
    fn test_december_30_rule() {
        let cal = HolidayCalendar::new().with_recurring_special_holiday(12, 31);
        // 2026-12-30 is a Wednesday, before a special holiday
        assert_eq!(cal.classify(d(2026, 12, 30)), DutyCategory::Normal);
        // 2022-12-30 is a Friday
        assert_eq!(cal.classify(d(2022, 12, 30)), DutyCategory::Semi);
    }

    #[test]
    fn test_category_days_between() {
        let cal = HolidayCalendar::new();
        // 2026-01-05 (Mon) .. 2026-01-12 (Mon): Mon-Thu = 4 normal days
        let n = category_days_between(&cal, DutyCategory::Normal, d(2026, 1, 5), d(2026, 1, 12));
        assert_eq!(n, 4);
        let back = category_days_between(&cal, DutyCategory::Normal, d(2026, 1, 12), d(2026, 1, 5));
        assert_eq!(back, -4);
        assert_eq!(
            category_days_between(&cal, DutyCategory::Weekend, d(2026, 1, 5), d(2026, 1, 5)),
            0
        );
    }

    #[test]
    fn test_category_calendar_build() {
        let cal = HolidayCalendar::new();
        let cc = CategoryCalendar::build(&cal, d(2026, 1, 5), d(2026, 1, 11));
        assert_eq!(cc.dates(DutyCategory::Normal).len(), 4);
        assert_eq!(cc.dates(DutyCategory::Semi), &[d(2026, 1, 9)]);
        assert_eq!(cc.dates(DutyCategory::Weekend).len(), 2);
        assert!(cc.dates(DutyCategory::Special).is_empty());

        // Padding days are classified but not listed.
        assert_eq!(cc.category(d(2026, 1, 4)), Some(DutyCategory::Weekend));
        assert_eq!(cc.category(d(2026, 1, 12)), Some(DutyCategory::Normal));
        assert_eq!(cc.category(d(2026, 1, 13)), None);
        assert!(!cc.in_range(d(2026, 1, 4)));
        assert_eq!(cc.iter().count(), 7);
    }

    #[test]
    fn test_closure_classifier() {
        let all_normal = |_: NaiveDate| DutyCategory::Normal;
        let cc = CategoryCalendar::build(&all_normal, d(2026, 1, 1), d(2026, 1, 3));
        assert_eq!(cc.dates(DutyCategory::Normal).len(), 3);
    }
}
