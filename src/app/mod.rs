//! Application core.
//!
//! The status controller and its boundary.  All interaction with hardware
//! and the network happens through the **port traits** defined in
//! [`ports`], keeping this layer testable without real peripherals.

pub mod controller;
pub mod events;
pub mod ports;
