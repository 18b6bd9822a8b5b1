//! Weekday partitioning of a flat task collection.
//!
//! All functions are pure: they scan the input once, clone the matching
//! tasks into a new vector and never touch the input.

use std::cmp::Ordering;

use wenda_proto::calendar::Week;
use wenda_proto::weekday::Weekday;

use super::Task;

/// Tasks on `day`, ascending by ordinal, ties broken by task id.
#[must_use]
pub fn tasks_for_day(tasks: &[Task], day: Weekday) -> Vec<Task> {
    let mut bucket: Vec<Task> = tasks
        .iter()
        .filter(|t| t.weekday() == day)
        .cloned()
        .collect();
    bucket.sort_by(compare_position);
    bucket
}

/// Tasks not on `day`. Order is unspecified.
#[must_use]
pub fn tasks_not_for_day(tasks: &[Task], day: Weekday) -> Vec<Task> {
    tasks
        .iter()
        .filter(|t| t.weekday() != day)
        .cloned()
        .collect()
}

/// Tasks whose date falls in `week`, in collection order.
#[must_use]
pub fn tasks_for_week(tasks: &[Task], week: Week) -> Vec<Task> {
    tasks.iter().filter(|t| week.contains(t.date)).cloned().collect()
}

/// Display order within a bucket.
pub(crate) fn compare_position(a: &Task, b: &Task) -> Ordering {
    a.ordinal
        .total_cmp(&b.ordinal)
        .then_with(|| a.id.cmp(&b.id))
}

/// References to the tasks of `week` on `day`, in display order.
pub(crate) fn bucket<'a>(tasks: &'a [Task], week: Week, day: Weekday) -> Vec<&'a Task> {
    let mut bucket: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.weekday() == day && week.contains(t.date))
        .collect();
    bucket.sort_by(|a, b| compare_position(a, b));
    bucket
}
