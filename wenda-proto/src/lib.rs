//! Shared task model and wire types for the Wenda weekly agenda.

pub mod calendar;
pub mod task;
pub mod weekday;
