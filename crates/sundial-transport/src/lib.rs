//! Sundial Transport - the datagram seam between the sync engine and the network
//!
//! The synchronization controller only needs two operations: send a request
//! and receive a reply within a bounded timeout. `Datagram` captures that
//! contract; `UdpEndpoint` is the production tokio implementation. Tests drive
//! the controller with a scripted in-memory implementation instead.

pub mod datagram;
pub mod udp;

pub use datagram::*;
pub use udp::*;
