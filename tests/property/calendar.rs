//! Property tests for calendar weeks.
//!
//! Uses proptest to verify:
//! 1. Every date is recovered from its week and weekday.
//! 2. `next` and `prev` are inverse and step exactly seven days.
//! 3. `Display` output parses back to the same week.

#![allow(clippy::unwrap_used)]

use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use wenda_proto::calendar::{Week, weeks_in_year};
use wenda_proto::weekday::Weekday;

/// Dates between 1900-01-01 and roughly 2199.
fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0u64..109_500).prop_map(|offset| {
        NaiveDate::from_ymd_opt(1900, 1, 1).unwrap() + Days::new(offset)
    })
}

proptest! {
    #[test]
    fn date_is_recovered_from_week_and_weekday(date in arb_date()) {
        let week = Week::of(date);
        prop_assert_eq!(week.date_of(Weekday::of(date)), date);
        prop_assert!(week.contains(date));
    }

    #[test]
    fn week_number_is_in_range(date in arb_date()) {
        let week = Week::of(date);
        prop_assert!(week.number() >= 1);
        prop_assert!(week.number() <= weeks_in_year(week.year()));
    }

    #[test]
    fn next_and_prev_are_inverse(date in arb_date()) {
        let week = Week::of(date);
        prop_assert_eq!(week.next().prev(), week);
        prop_assert_eq!(week.prev().next(), week);
        prop_assert_eq!(week.next().first_day(), week.first_day() + Days::new(7));
    }

    #[test]
    fn display_parses_back(date in arb_date()) {
        let week = Week::of(date);
        let parsed: Week = week.to_string().parse().unwrap();
        prop_assert_eq!(parsed, week);
    }
}
