//! Calendar week arithmetic.
//!
//! Weeks follow the US locale convention used by the agenda UI: a week runs
//! Sunday through Saturday, and week 1 of a year is the week that contains
//! January 1st. A week that straddles New Year therefore belongs to the new
//! year, and a year has either 52 or 53 weeks.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::weekday::Weekday;

/// Earliest year accepted by [`Week::new`].
pub const MIN_YEAR: i32 = 1;

/// Latest year accepted by [`Week::new`].
pub const MAX_YEAR: i32 = 9999;

/// Errors produced when building or parsing a [`Week`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CalendarError {
    /// Year outside [`MIN_YEAR`]..=[`MAX_YEAR`].
    #[error("year {0} out of supported range")]
    YearOutOfRange(i32),
    /// Week number not present in the given year.
    #[error("week {number} does not exist in {year} (max {max})")]
    WeekOutOfRange {
        /// Requested year.
        year: i32,
        /// Requested week number.
        number: u32,
        /// Number of weeks in that year.
        max: u32,
    },
    /// Text that is not of the form `YYYY-Www`.
    #[error("invalid week format: {0} (expected YYYY-Www)")]
    InvalidFormat(String),
}

/// A calendar week selector: `(year, number)` with Sunday-start weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Week {
    year: i32,
    number: u32,
}

impl Week {
    /// Builds a week after checking that it exists.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::YearOutOfRange`] or
    /// [`CalendarError::WeekOutOfRange`].
    pub fn new(year: i32, number: u32) -> Result<Self, CalendarError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(CalendarError::YearOutOfRange(year));
        }
        let max = weeks_in_year(year);
        if number == 0 || number > max {
            return Err(CalendarError::WeekOutOfRange { year, number, max });
        }
        Ok(Self { year, number })
    }

    /// The week containing `date`.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        let start = sunday_on_or_before(date);
        // The Saturday decides the year: the week holding Jan 1 is week 1.
        let year = plus_days(start, 6).year();
        let offset = (start - week_one_start(year)).num_days();
        let number = u32::try_from(offset / 7 + 1).unwrap_or(1);
        Self { year, number }
    }

    /// The week containing today's local date.
    #[must_use]
    pub fn current() -> Self {
        Self::of(chrono::Local::now().date_naive())
    }

    /// Week-based year (may differ from the calendar year of its Sunday).
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// Week number within [`year`](Self::year), starting at 1.
    #[must_use]
    pub const fn number(self) -> u32 {
        self.number
    }

    /// The Sunday that opens this week.
    #[must_use]
    pub fn first_day(self) -> NaiveDate {
        plus_days(week_one_start(self.year), 7 * u64::from(self.number - 1))
    }

    /// The concrete date of `day` within this week.
    #[must_use]
    pub fn date_of(self, day: Weekday) -> NaiveDate {
        plus_days(self.first_day(), u64::from(day.index()))
    }

    /// Whether `date` falls inside this week.
    #[must_use]
    pub fn contains(self, date: NaiveDate) -> bool {
        Self::of(date) == self
    }

    /// The following week.
    #[must_use]
    pub fn next(self) -> Self {
        Self::of(plus_days(self.first_day(), 7))
    }

    /// The preceding week.
    #[must_use]
    pub fn prev(self) -> Self {
        Self::of(minus_days(self.first_day(), 7))
    }
}

impl fmt::Display for Week {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.number)
    }
}

impl FromStr for Week {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CalendarError::InvalidFormat(s.to_string());
        let (year, number) = s.trim().split_once("-W").ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let number = number.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, number)
    }
}

/// Number of weeks in a week-based year (52 or 53).
#[must_use]
pub fn weeks_in_year(year: i32) -> u32 {
    let last_saturday_of_year = minus_days(week_one_start(year + 1), 1);
    Week::of(last_saturday_of_year).number
}

fn sunday_on_or_before(date: NaiveDate) -> NaiveDate {
    minus_days(date, u64::from(date.weekday().num_days_from_sunday()))
}

// Saturates at the ends of chrono's date range, so the first and last weeks
// are truncated.
fn plus_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}

fn minus_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

fn week_one_start(year: i32) -> NaiveDate {
    NaiveDate::from_yo_opt(year, 1).map_or(NaiveDate::MIN, sunday_on_or_before)
}
