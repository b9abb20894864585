//! Shared utilities.

pub mod datetime;

pub use datetime::{format_timestamp, now_timestamp, parse_timestamp};
