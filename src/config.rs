//! System configuration parameters
//!
//! All tunable parameters for the busylight controller.
//! Values can be overridden from a JSON file (see
//! [`JsonConfigFile`](crate::adapters::config_file::JsonConfigFile)).

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Maximum number of on/off steps in the buzzer sequence.
pub const BUZZER_SEQUENCE_CAPACITY: usize = 8;

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusyLightConfig {
    // --- Bell ---
    /// Delay before REQUEST auto-reverts to VIDEO (milliseconds)
    pub bell_timeout_ms: u32,
    /// Grace window after leaving VIDEO during which the bell button is ignored
    pub bell_rearm_grace_ms: u32,
    /// Buzzer on/off pulse lengths, starting with "on" (milliseconds)
    pub buzzer_sequence_ms: heapless::Vec<u32, BUZZER_SEQUENCE_CAPACITY>,

    // --- Button ---
    /// Settle time before a raw level is accepted (milliseconds)
    pub debounce_ms: u32,
    /// Poll interval of the settle check (milliseconds)
    pub debounce_poll_ms: u32,

    // --- Peers ---
    /// Lifetime of a peer registration without contact (seconds)
    pub peer_expiry_secs: u32,
    /// Default peer port when an address carries none
    pub peer_port: u16,
    /// Connect / write timeout of a single notification (milliseconds)
    pub peer_send_timeout_ms: u32,

    // --- LED strip ---
    /// Total pixel count of the strip
    pub led_count: u16,
    /// First and last pixel (inclusive) of the top segment
    pub top_segment: (u16, u16),
    /// First and last pixel (inclusive) of the bottom segment
    pub bottom_segment: (u16, u16),
    /// Brightness applied at the start of every pattern
    pub max_brightness: u8,

    // --- Animations ---
    /// REQUEST pulse period (milliseconds)
    pub pulse_period_ms: u32,
    /// REQUEST pulse brightness floor
    pub pulse_min: u8,
    /// REQUEST pulse brightness ceiling
    pub pulse_max: u8,
    /// Frame interval of pulsing / scrolling patterns (milliseconds)
    pub frame_interval_ms: u32,
    /// COFFEE strobe step (milliseconds)
    pub strobe_step_ms: u32,
    /// Ambient scrolling show while idle
    pub light_show_enabled: bool,

    // --- Tasks ---
    /// Longest wait for a canceled background task to finish (milliseconds)
    pub task_join_timeout_ms: u32,

    // --- Pins ---
    pub pin_leds: u8,
    pub pin_button: u8,
    pub pin_buzzer: u8,

    // --- Logging ---
    /// `error`, `warn`, `info`, `debug` or `trace`
    pub log_level: heapless::String<8>,
}

impl Default for BusyLightConfig {
    fn default() -> Self {
        let mut buzzer_sequence_ms = heapless::Vec::new();
        for step in [150, 100, 150, 100, 350] {
            let _ = buzzer_sequence_ms.push(step);
        }
        let mut log_level = heapless::String::new();
        let _ = log_level.push_str("info");

        Self {
            // Bell
            bell_timeout_ms: 30_000,
            bell_rearm_grace_ms: 1_000,
            buzzer_sequence_ms,

            // Button
            debounce_ms: 50,
            debounce_poll_ms: 1,

            // Peers
            peer_expiry_secs: 3 * 60 * 60,
            peer_port: 9001,
            peer_send_timeout_ms: 1_000,

            // LED strip
            led_count: 13,
            top_segment: (0, 5),
            bottom_segment: (7, 12),
            max_brightness: 255,

            // Animations
            pulse_period_ms: 800,
            pulse_min: 30,
            pulse_max: 255,
            frame_interval_ms: 20, // 50 fps
            strobe_step_ms: 50,
            light_show_enabled: false,

            // Tasks
            task_join_timeout_ms: 1_000,

            // Pins
            pin_leds: 18,
            pin_button: 23,
            pin_buzzer: 24,

            log_level,
        }
    }
}

impl BusyLightConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bell_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("bell_timeout_ms must be > 0"));
        }
        if self.buzzer_sequence_ms.is_empty() {
            return Err(ConfigError::ValidationFailed("buzzer_sequence_ms is empty"));
        }
        if self.buzzer_sequence_ms.iter().any(|&ms| ms == 0 || ms > 5_000) {
            return Err(ConfigError::ValidationFailed(
                "buzzer_sequence_ms steps must be 1..=5000",
            ));
        }
        if self.debounce_poll_ms == 0 || self.debounce_poll_ms > self.debounce_ms {
            return Err(ConfigError::ValidationFailed(
                "debounce_poll_ms must be 1..=debounce_ms",
            ));
        }
        if self.peer_expiry_secs == 0 {
            return Err(ConfigError::ValidationFailed("peer_expiry_secs must be > 0"));
        }
        if self.peer_port == 0 {
            return Err(ConfigError::ValidationFailed("peer_port must be > 0"));
        }
        if self.peer_send_timeout_ms == 0 || self.peer_send_timeout_ms > 10_000 {
            return Err(ConfigError::ValidationFailed(
                "peer_send_timeout_ms must be 1..=10000",
            ));
        }
        if self.led_count == 0 {
            return Err(ConfigError::ValidationFailed("led_count must be > 0"));
        }
        for (lo, hi) in [self.top_segment, self.bottom_segment] {
            if lo > hi || hi >= self.led_count {
                return Err(ConfigError::ValidationFailed(
                    "segment out of range of led_count",
                ));
            }
        }
        if self.pulse_period_ms == 0 {
            return Err(ConfigError::ValidationFailed("pulse_period_ms must be > 0"));
        }
        if self.pulse_min > self.pulse_max {
            return Err(ConfigError::ValidationFailed("pulse_min above pulse_max"));
        }
        // Cancellation latency is bounded by the longest sleep slice.
        if self.frame_interval_ms == 0 || self.frame_interval_ms > 50 {
            return Err(ConfigError::ValidationFailed(
                "frame_interval_ms must be 1..=50",
            ));
        }
        if self.strobe_step_ms == 0 {
            return Err(ConfigError::ValidationFailed("strobe_step_ms must be > 0"));
        }
        if self.task_join_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "task_join_timeout_ms must be > 0",
            ));
        }
        if self.log_filter().is_none() {
            return Err(ConfigError::ValidationFailed("unknown log_level"));
        }
        Ok(())
    }

    pub fn bell_timeout(&self) -> Duration {
        Duration::from_millis(self.bell_timeout_ms.into())
    }

    pub fn bell_rearm_grace(&self) -> Duration {
        Duration::from_millis(self.bell_rearm_grace_ms.into())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.into())
    }

    pub fn debounce_poll(&self) -> Duration {
        Duration::from_millis(self.debounce_poll_ms.into())
    }

    pub fn peer_expiry(&self) -> Duration {
        Duration::from_secs(self.peer_expiry_secs.into())
    }

    pub fn peer_send_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_send_timeout_ms.into())
    }

    pub fn task_join_timeout(&self) -> Duration {
        Duration::from_millis(self.task_join_timeout_ms.into())
    }

    /// Parsed `log_level`, or `None` when unrecognised.
    pub fn log_filter(&self) -> Option<log::LevelFilter> {
        self.log_level.parse().ok()
    }
}
