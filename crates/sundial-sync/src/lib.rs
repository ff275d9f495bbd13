//! Sundial Sync - the clock discipline engine
//!
//! This crate implements the synchronization core:
//! - Offset/RTT estimation from the four exchange timestamps
//! - Pure reply validation (version, mode, timestamp ordering)
//! - The bounded server registry (insert-or-update, never evict)
//! - The two-phase controller: ACQUIRING hard-sets the clock until the
//!   measured offset converges, STEADY applies damped corrections

pub mod controller;
pub mod estimate;
pub mod registry;
pub mod validate;

pub use controller::*;
pub use estimate::*;
pub use registry::*;
pub use validate::*;
