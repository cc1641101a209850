#![forbid(unsafe_code)]

pub mod catalog;
pub mod model;
pub mod speech;
pub mod streak;
pub mod time;

pub use time::{CalendarZone, Clock};
