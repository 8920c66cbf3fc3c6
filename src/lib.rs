//! Busylight controller library.
//!
//! A desk presence light: a status state machine drives an animated LED
//! strip, a debounced bell button with buzzer, and best-effort state
//! notifications to peer lights.  Exposes every module for integration
//! testing; the binary wires them to simulated hardware.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod peers;

pub use app::controller::{Hardware, StatusController, StatusReport};
pub use config::BusyLightConfig;
pub use error::{Error, Result};
pub use fsm::{State, Trigger};
pub use peers::PeerAddr;
