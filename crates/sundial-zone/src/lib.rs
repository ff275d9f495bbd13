//! Sundial Zone - politically-correct local time
//!
//! Converts a UTC instant into local time for a single region described by
//! two calendar rules (standard and daylight time). No tz database: the rule
//! model is "nth or last weekday of a month, at a given hour", which covers
//! every region with at most one daylight regime.

pub mod rule;
pub mod timezone;

pub use rule::*;
pub use timezone::*;
