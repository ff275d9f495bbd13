//! Sundial Core - Fundamental types and primitives
//!
//! This crate defines the types shared across the sundial workspace:
//! - Time primitives (NTP-era instants at microsecond resolution)
//! - The local clock store and its shared handle
//! - Error types

pub mod clock;
pub mod error;
pub mod time;

pub use clock::*;
pub use error::*;
pub use time::*;
