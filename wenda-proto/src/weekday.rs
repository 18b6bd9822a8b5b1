//! Weekday classification keys for the agenda buckets.
//!
//! A [`Weekday`] is never stored on a task. It is derived from the task's
//! date and used to group tasks into the seven day columns of a week.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Errors produced when building a [`Weekday`] from user input.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WeekdayError {
    /// Numeric weekday outside `0..=6`.
    #[error("weekday index out of range: {0} (expected 0-6)")]
    OutOfRange(u8),
    /// Name that matches no weekday.
    #[error("unknown weekday: {0}")]
    Unknown(String),
}

/// Day of the week, Sunday = 0 through Saturday = 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Weekday(u8);

const NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

impl Weekday {
    /// Sunday (0).
    pub const SUNDAY: Self = Self(0);
    /// Monday (1).
    pub const MONDAY: Self = Self(1);
    /// Tuesday (2).
    pub const TUESDAY: Self = Self(2);
    /// Wednesday (3).
    pub const WEDNESDAY: Self = Self(3);
    /// Thursday (4).
    pub const THURSDAY: Self = Self(4);
    /// Friday (5).
    pub const FRIDAY: Self = Self(5);
    /// Saturday (6).
    pub const SATURDAY: Self = Self(6);

    /// All seven days in display order, starting with Sunday.
    pub const ALL: [Self; 7] = [
        Self::SUNDAY,
        Self::MONDAY,
        Self::TUESDAY,
        Self::WEDNESDAY,
        Self::THURSDAY,
        Self::FRIDAY,
        Self::SATURDAY,
    ];

    /// Builds a weekday from its index.
    ///
    /// # Errors
    ///
    /// Returns [`WeekdayError::OutOfRange`] if `index > 6`.
    pub const fn new(index: u8) -> Result<Self, WeekdayError> {
        if index > 6 {
            return Err(WeekdayError::OutOfRange(index));
        }
        Ok(Self(index))
    }

    /// The weekday a date falls on.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        // num_days_from_sunday is always 0..=6
        Self(u8::try_from(date.weekday().num_days_from_sunday()).unwrap_or(0))
    }

    /// Numeric index, Sunday = 0.
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Full English name, e.g. `"Tuesday"`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        NAMES[self.0 as usize]
    }
}

impl From<Weekday> for u8 {
    fn from(day: Weekday) -> Self {
        day.0
    }
}

impl TryFrom<u8> for Weekday {
    type Error = WeekdayError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::new(index)
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Weekday {
    type Err = WeekdayError;

    /// Accepts a digit (`"2"`), a full name (`"tuesday"`), or any prefix of
    /// at least three letters (`"tue"`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(index) = trimmed.parse::<u8>() {
            return Self::new(index);
        }
        let lower = trimmed.to_ascii_lowercase();
        if lower.len() >= 3 {
            for day in Self::ALL {
                if day.name().to_ascii_lowercase().starts_with(&lower) {
                    return Ok(day);
                }
            }
        }
        Err(WeekdayError::Unknown(trimmed.to_string()))
    }
}
