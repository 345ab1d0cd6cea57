//! Normal (weekday) swap policy.
//!
//! Weekdays are paired into tracks: Monday with Wednesday, Tuesday with
//! Thursday. Any other Normal weekday only matches itself.
//!
//! # Search order
//! 1. Paired weekday in the same ISO week
//! 2. Same weekday one week later
//! 3. Paired weekday in the week after next and each later week
//! 4. Earlier dates on the same or paired weekday, nearest first
//! 5. First same weekday in the following month (optional)
//!
//! Steps 1-4 stay within the origin's month.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use super::conflict::{SwapCandidate, SwapPolicy};
use super::lane::DutyLane;
use crate::models::YearMonth;

/// The weekday sharing a swap track with `day`.
pub fn paired_weekday(day: Weekday) -> Option<Weekday> {
    match day {
        Weekday::Mon => Some(Weekday::Wed),
        Weekday::Wed => Some(Weekday::Mon),
        Weekday::Tue => Some(Weekday::Thu),
        Weekday::Thu => Some(Weekday::Tue),
        _ => None,
    }
}

/// Whether `a` and `b` are on the same weekday track.
pub fn same_track(a: Weekday, b: Weekday) -> bool {
    a == b || paired_weekday(a) == Some(b)
}

/// Swap-partner search for Normal conflicts.
#[derive(Debug, Clone, Copy)]
pub struct NormalSwapPolicy {
    next_month: bool,
}

impl NormalSwapPolicy {
    /// Creates the policy. `next_month` enables step 5.
    pub fn new(next_month: bool) -> Self {
        Self { next_month }
    }
}

impl Default for NormalSwapPolicy {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SwapPolicy for NormalSwapPolicy {
    fn name(&self) -> &'static str {
        "normal"
    }

    fn candidates(&self, lane: &DutyLane, origin: usize) -> Vec<SwapCandidate> {
        let date = lane.date(origin);
        let month = YearMonth::of(date);
        let weekday = date.weekday();
        let pair = paired_weekday(weekday);

        let mut out: Vec<SwapCandidate> = Vec::new();
        let push = |out: &mut Vec<SwapCandidate>, day: NaiveDate, step: &'static str| {
            if !month.contains(day) {
                return;
            }
            if let Some(j) = lane.position(day) {
                if j != origin && out.iter().all(|c| c.index != j) {
                    out.push(SwapCandidate::new(j, step));
                }
            }
        };

        let paired_day = pair.map(|p| {
            let offset =
                p.num_days_from_monday() as i64 - weekday.num_days_from_monday() as i64;
            date + Duration::days(offset)
        });

        if let Some(pd) = paired_day {
            push(&mut out, pd, "paired_weekday");
        }
        push(&mut out, date + Duration::days(7), "next_week");
        if let Some(pd) = paired_day {
            let mut day = pd + Duration::days(14);
            while month.contains(day) {
                push(&mut out, day, "paired_later_week");
                day += Duration::days(7);
            }
        }

        for j in (0..origin).rev() {
            let day = lane.date(j);
            if same_track(weekday, day.weekday()) {
                push(&mut out, day, "backward");
            }
        }

        if self.next_month {
            let next = month.next();
            let found = (origin + 1..lane.len())
                .find(|&j| next.contains(lane.date(j)) && lane.date(j).weekday() == weekday);
            if let Some(j) = found {
                if out.iter().all(|c| c.index != j) {
                    out.push(SwapCandidate::new(j, "next_month"));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DutyCategory;

    fn lane(days: &[(u32, u32)]) -> DutyLane {
        let dates: Vec<_> = days
            .iter()
            .map(|&(m, d)| NaiveDate::from_ymd_opt(2026, m, d).unwrap())
            .collect();
        DutyLane::new(1, DutyCategory::Normal, &dates)
    }

    fn order(lane: &DutyLane, policy: NormalSwapPolicy, origin: usize) -> Vec<(u32, &'static str)> {
        policy
            .candidates(lane, origin)
            .iter()
            .map(|c| (lane.date(c.index).day(), c.step))
            .collect()
    }

    #[test]
    fn test_weekday_tracks() {
        assert_eq!(paired_weekday(Weekday::Mon), Some(Weekday::Wed));
        assert_eq!(paired_weekday(Weekday::Thu), Some(Weekday::Tue));
        assert_eq!(paired_weekday(Weekday::Fri), None);
        assert!(same_track(Weekday::Tue, Weekday::Thu));
        assert!(!same_track(Weekday::Mon, Weekday::Tue));
    }

    #[test]
    fn test_search_order_monday() {
        // Jan 2026 Mon-Thu weeks starting 5, 12, 19, 26; Feb 2 is a Monday
        let mut days = Vec::new();
        for w in [5u32, 12, 19, 26] {
            for k in 0..4 {
                days.push((1, w + k));
            }
        }
        days.push((2, 2));
        let lane = lane(&days);
        let origin = lane.position(NaiveDate::from_ymd_opt(2026, 1, 12).unwrap()).unwrap();

        let got = order(&lane, NormalSwapPolicy::default(), origin);
        assert_eq!(
            got,
            vec![
                (14, "paired_weekday"),
                (19, "next_week"),
                (28, "paired_later_week"),
                (7, "backward"),
                (5, "backward"),
                (2, "next_month"),
            ]
        );

        let got = order(&lane, NormalSwapPolicy::new(false), origin);
        assert_eq!(got.last(), Some(&(5, "backward")));
    }

    #[test]
    fn test_later_weeks_start_after_next_week() {
        let mut days = Vec::new();
        for w in [5u32, 12, 19, 26] {
            for k in 0..4 {
                days.push((1, w + k));
            }
        }
        days.push((2, 2));
        let lane = lane(&days);

        // Jan 19 is Monday + 14, not a paired weekday
        let got = order(&lane, NormalSwapPolicy::default(), 0);
        assert_eq!(
            got,
            vec![
                (7, "paired_weekday"),
                (12, "next_week"),
                (21, "paired_later_week"),
                (28, "paired_later_week"),
                (2, "next_month"),
            ]
        );
    }

    #[test]
    fn test_unpaired_weekday_only_matches_itself() {
        // Fridays classified Normal by a custom calendar
        let lane = lane(&[(1, 2), (1, 5), (1, 9), (1, 16)]);
        // Jan 16 is a Friday
        let got = order(&lane, NormalSwapPolicy::default(), 3);
        assert_eq!(got, vec![(9, "backward"), (2, "backward")]);
    }
}
