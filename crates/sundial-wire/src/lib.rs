//! Sundial Wire Protocol - NTP v3 client/server packet format
//!
//! This crate implements the 48-byte time-exchange record:
//! - Flags byte (leap indicator, version, mode), stratum, poll, precision
//! - Root delay, root dispersion, 4-byte reference identifier
//! - Four 8-byte fixed-point timestamps (reference, originate, receive, transmit)

pub mod packet;
pub mod timestamp;

pub use packet::*;
pub use timestamp::*;
