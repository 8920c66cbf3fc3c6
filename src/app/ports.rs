//! Port traits: the hexagonal boundary between the controller and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ StatusController (domain)
//! ```
//!
//! Driven adapters (LED strip, peer transport, event sinks, config storage)
//! implement these traits.  GPIO pins use the `embedded-hal` digital traits
//! directly, so any HAL pin plugs in without an adapter.

use core::ops::RangeInclusive;
use std::sync::{Arc, Mutex};

use crate::config::BusyLightConfig;
use crate::error::PeerSendError;
use crate::peers::PeerAddr;

/// Colour as (R, G, B) tuple, each 0–255.
pub type Rgb = (u8, u8, u8);

// ───────────────────────────────────────────────────────────────
// LED strip port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Addressable region of the strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Top,
    Bottom,
    All,
    Pixel(u16),
}

/// Pixel layout shared by every strip adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripLayout {
    pub count: u16,
    /// Inclusive pixel range of the top segment.
    pub top: (u16, u16),
    /// Inclusive pixel range of the bottom segment.
    pub bottom: (u16, u16),
}

impl StripLayout {
    pub fn from_config(config: &BusyLightConfig) -> Self {
        Self {
            count: config.led_count,
            top: config.top_segment,
            bottom: config.bottom_segment,
        }
    }

    /// Pixel indices covered by `zone`, clipped to the strip.
    pub fn pixels(&self, zone: Zone) -> RangeInclusive<u16> {
        let last = self.count.saturating_sub(1);
        let (lo, hi) = match zone {
            Zone::Top => self.top,
            Zone::Bottom => self.bottom,
            Zone::All => (0, last),
            Zone::Pixel(i) => (i, i),
        };
        if self.count == 0 || lo > last {
            return RangeInclusive::new(1, 0);
        }
        lo..=hi.min(last)
    }
}

/// Write-side port for the LED strip.  Changes are buffered until
/// [`flush`](LedStrip::flush).
pub trait LedStrip {
    /// Fill every pixel of `zone` with `colour`.
    fn set_pixels(&mut self, zone: Zone, colour: Rgb);

    /// Global brightness, 0–255.
    fn set_brightness(&mut self, level: u8);

    /// Turn every pixel off.
    fn clear(&mut self);

    /// Push the buffered frame to the hardware.
    fn flush(&mut self);

    fn layout(&self) -> StripLayout;
}

/// Strip handle shared between the controller and the animation task.
pub type SharedStrip = Arc<Mutex<dyn LedStrip + Send>>;

// ───────────────────────────────────────────────────────────────
// Edge source (driven adapter: GPIO interrupt → domain)
// ───────────────────────────────────────────────────────────────

/// Raw-edge subscription on an input line.
pub trait EdgeSource {
    /// Register `handler`; it receives the instantaneous level on every
    /// transition.  Replaces any previous handler.
    fn subscribe(&self, handler: Box<dyn Fn(bool) + Send + Sync>);
}

// ───────────────────────────────────────────────────────────────
// Peer transport port (driven adapter: domain → network)
// ───────────────────────────────────────────────────────────────

/// Short-timeout, fire-and-forget delivery of one request to a peer.
pub trait PeerTransport: Send + Sync {
    fn send(&self, peer: &PeerAddr, request: &[u8]) -> Result<(), PeerSendError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The controller emits structured [`StatusEvent`](super::events::StatusEvent)s
/// through this port.  Called from background tasks as well, so sinks are
/// shared and take `&self`.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &super::events::StatusEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists controller configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration.
    /// Returns [`BusyLightConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<BusyLightConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &BusyLightConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::Corrupted => Self::Config("stored config corrupted"),
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::IoError => Self::Config("config I/O error"),
        }
    }
}
