use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, Utc};

/// A simple clock abstraction for deterministic time in services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    /// Returns true if this clock is fixed.
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Clock::Fixed(_))
    }
}

/// Time zone used to turn instants into the learner's calendar dates.
///
/// Streaks are counted in local calendar days, so two study events one hour
/// apart can land on different days depending on the zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CalendarZone {
    /// The operating system's local time zone.
    #[default]
    Local,
    /// A fixed UTC offset, mostly for tests and headless environments.
    Fixed(FixedOffset),
}

impl CalendarZone {
    /// Zone with a fixed offset of `hours` east of UTC.
    ///
    /// Returns `None` when the offset is out of range (more than 23 hours).
    #[must_use]
    pub fn east_hours(hours: i32) -> Option<Self> {
        hours
            .checked_mul(3_600)
            .and_then(FixedOffset::east_opt)
            .map(Self::Fixed)
    }

    /// The calendar date `at` falls on in this zone.
    #[must_use]
    pub fn date_of(&self, at: DateTime<Utc>) -> NaiveDate {
        match self {
            CalendarZone::Local => at.with_timezone(&Local).date_naive(),
            CalendarZone::Fixed(offset) => at.with_timezone(offset).date_naive(),
        }
    }
}

/// Whole calendar days from `earlier` to `later`.
///
/// Negative when `later` is actually before `earlier`.
#[must_use]
pub fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    later.signed_duration_since(earlier).num_days()
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}
