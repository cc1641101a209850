use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::time::{CalendarZone, days_between};

//
// ─── STREAK STATE ──────────────────────────────────────────────────────────────
//

/// Snapshot of the learner's consecutive-day streak.
///
/// `longest_streak >= current_streak` holds for every value produced by
/// [`StreakCalculator`]. `last_study_date` is `None` only before the first
/// study event (or after a reset).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakInfo {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_study_date: Option<NaiveDate>,
}

impl StreakInfo {
    /// Rebuild streak state from persisted fields, repairing impossible combinations.
    ///
    /// A longest streak below the current one is raised, and a date-less
    /// record with a non-zero streak is reset.
    #[must_use]
    pub fn from_persisted(
        current_streak: u32,
        longest_streak: u32,
        last_study_date: Option<NaiveDate>,
    ) -> Self {
        match last_study_date {
            None => Self {
                current_streak: 0,
                longest_streak,
                last_study_date: None,
            },
            Some(date) => Self {
                current_streak,
                longest_streak: longest_streak.max(current_streak),
                last_study_date: Some(date),
            },
        }
    }
}

/// Which branch of the state machine a study event took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakTransition {
    FirstStudy,
    SameDay,
    Continued,
    Broken { missed_days: i64 },
}

//
// ─── CALCULATOR ────────────────────────────────────────────────────────────────
//

/// Maintains current and longest streaks from study timestamps.
///
/// Days are compared as calendar dates in `zone`, never by subtracting raw
/// instants, so 23:50 and 00:10 the next local morning are consecutive days.
///
/// # Examples
///
/// ```
/// # use chrono::Duration;
/// # use sentence_core::streak::StreakCalculator;
/// # use sentence_core::time::fixed_now;
/// # use sentence_core::CalendarZone;
/// let mut calc = StreakCalculator::new(CalendarZone::east_hours(0).unwrap());
/// calc.on_study_event(fixed_now());
/// calc.on_study_event(fixed_now() + Duration::days(1));
/// assert_eq!(calc.current_streak(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StreakCalculator {
    zone: CalendarZone,
    state: StreakInfo,
}

impl StreakCalculator {
    #[must_use]
    pub fn new(zone: CalendarZone) -> Self {
        Self {
            zone,
            state: StreakInfo::default(),
        }
    }

    #[must_use]
    pub fn with_state(zone: CalendarZone, state: StreakInfo) -> Self {
        Self { zone, state }
    }

    #[must_use]
    pub fn zone(&self) -> CalendarZone {
        self.zone
    }

    /// Local calendar date `at` falls on.
    #[must_use]
    pub fn date_of(&self, at: DateTime<Utc>) -> NaiveDate {
        self.zone.date_of(at)
    }

    /// Apply a study event that happened at `now`.
    pub fn on_study_event(&mut self, now: DateTime<Utc>) -> StreakTransition {
        let today = self.zone.date_of(now);
        let state = &mut self.state;

        let Some(last) = state.last_study_date else {
            state.current_streak = 1;
            state.longest_streak = state.longest_streak.max(1);
            state.last_study_date = Some(today);
            return StreakTransition::FirstStudy;
        };

        match days_between(last, today) {
            // A clock that moved backwards is treated as "already studied today".
            gap if gap < 0 => StreakTransition::SameDay,
            0 => {
                state.last_study_date = Some(today);
                StreakTransition::SameDay
            }
            1 => {
                state.current_streak = state.current_streak.saturating_add(1);
                state.longest_streak = state.longest_streak.max(state.current_streak);
                state.last_study_date = Some(today);
                StreakTransition::Continued
            }
            gap => {
                state.current_streak = 1;
                state.longest_streak = state.longest_streak.max(1);
                state.last_study_date = Some(today);
                StreakTransition::Broken {
                    missed_days: gap - 1,
                }
            }
        }
    }

    #[must_use]
    pub fn current_streak(&self) -> u32 {
        self.state.current_streak
    }

    #[must_use]
    pub fn streak_info(&self) -> StreakInfo {
        self.state
    }

    /// Back to `{0, 0, None}`.
    pub fn reset(&mut self) {
        self.state = StreakInfo::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn utc_zone() -> CalendarZone {
        CalendarZone::east_hours(0).unwrap()
    }

    fn day(n: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, n, 10, 0, 0).unwrap()
    }

    #[test]
    fn transition_table_from_empty_state() {
        let mut calc = StreakCalculator::new(utc_zone());

        assert_eq!(calc.on_study_event(day(1)), StreakTransition::FirstStudy);
        assert_eq!(calc.current_streak(), 1);

        assert_eq!(
            calc.on_study_event(day(1) + Duration::hours(5)),
            StreakTransition::SameDay
        );
        assert_eq!(calc.current_streak(), 1);

        assert_eq!(calc.on_study_event(day(2)), StreakTransition::Continued);
        assert_eq!(calc.current_streak(), 2);

        assert_eq!(
            calc.on_study_event(day(4)),
            StreakTransition::Broken { missed_days: 1 }
        );
        let info = calc.streak_info();
        assert_eq!(info.current_streak, 1);
        assert_eq!(info.longest_streak, 2);
        assert_eq!(
            info.last_study_date,
            NaiveDate::from_ymd_opt(2024, 3, 4)
        );
    }

    #[test]
    fn midnight_boundary_counts_as_consecutive_in_local_zone() {
        let seoul = CalendarZone::east_hours(9).unwrap();
        let mut calc = StreakCalculator::new(seoul);
        // 23:30 and 00:30 Seoul time, one hour apart.
        let before_midnight = Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap();
        let after_midnight = Utc.with_ymd_and_hms(2024, 3, 1, 15, 30, 0).unwrap();

        calc.on_study_event(before_midnight);
        assert_eq!(
            calc.on_study_event(after_midnight),
            StreakTransition::Continued
        );
        assert_eq!(calc.current_streak(), 2);
    }

    #[test]
    fn same_utc_day_can_span_two_local_days() {
        let seoul = CalendarZone::east_hours(9).unwrap();
        let mut calc = StreakCalculator::new(seoul);
        // Both on 2024-03-01 in UTC, but 2024-03-01 and 2024-03-02 in Seoul.
        calc.on_study_event(Utc.with_ymd_and_hms(2024, 3, 1, 1, 0, 0).unwrap());
        calc.on_study_event(Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap());
        assert_eq!(calc.current_streak(), 2);
    }

    #[test]
    fn nearly_two_days_apart_but_one_calendar_day_is_consecutive() {
        let mut calc = StreakCalculator::new(utc_zone());
        calc.on_study_event(Utc.with_ymd_and_hms(2024, 3, 1, 0, 1, 0).unwrap());
        calc.on_study_event(Utc.with_ymd_and_hms(2024, 3, 2, 23, 59, 0).unwrap());
        assert_eq!(calc.current_streak(), 2);
    }

    #[test]
    fn backwards_clock_keeps_state() {
        let mut calc = StreakCalculator::new(utc_zone());
        calc.on_study_event(day(5));
        let before = calc.streak_info();
        assert_eq!(calc.on_study_event(day(3)), StreakTransition::SameDay);
        assert_eq!(calc.streak_info(), before);
    }

    #[test]
    fn longest_never_below_current() {
        let mut calc = StreakCalculator::new(utc_zone());
        let pattern = [1_u32, 2, 3, 3, 6, 7, 8, 9, 20, 21];
        for n in pattern {
            calc.on_study_event(day(n));
            let info = calc.streak_info();
            assert!(info.longest_streak >= info.current_streak);
        }
        assert_eq!(calc.streak_info().longest_streak, 4);
        assert_eq!(calc.current_streak(), 2);
    }

    #[test]
    fn reset_returns_to_empty_state() {
        let mut calc = StreakCalculator::new(utc_zone());
        calc.on_study_event(day(1));
        calc.reset();
        assert_eq!(calc.streak_info(), StreakInfo::default());
    }

    #[test]
    fn from_persisted_repairs_inconsistent_values() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1);
        assert_eq!(StreakInfo::from_persisted(5, 2, date).longest_streak, 5);
        let dateless = StreakInfo::from_persisted(3, 7, None);
        assert_eq!(dateless.current_streak, 0);
        assert_eq!(dateless.longest_streak, 7);
    }
}
