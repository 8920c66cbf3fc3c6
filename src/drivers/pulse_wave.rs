//! Cosine pulse oscillator.
//!
//! `get() = 0.5 * (cos(2π · elapsed / period) + 1)`: 1.0 at the start of a
//! period, 0.0 at half period, back to 1.0 at the full period.

use core::f32::consts::TAU;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct PulseWave {
    period: Duration,
    origin: Instant,
}

impl PulseWave {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            origin: Instant::now(),
        }
    }

    /// Restart the wave at phase 0.
    pub fn reset(&mut self) {
        self.origin = Instant::now();
    }

    /// Current value in `[0.0, 1.0]`.
    pub fn get(&self) -> f32 {
        self.value_at(self.origin.elapsed())
    }

    /// Current value mapped linearly into `[lo, hi]`.
    pub fn get_scaled(&self, lo: u8, hi: u8) -> u8 {
        Self::scale(self.get(), lo, hi)
    }

    /// Value after `elapsed` time since the origin.  A zero period yields
    /// a constant 1.0.
    pub fn value_at(&self, elapsed: Duration) -> f32 {
        if self.period.is_zero() {
            return 1.0;
        }
        let phase = elapsed.as_secs_f32() / self.period.as_secs_f32();
        (0.5 * ((TAU * phase).cos() + 1.0)).clamp(0.0, 1.0)
    }

    pub fn scale(value: f32, lo: u8, hi: u8) -> u8 {
        let (lo_f, hi_f) = (f32::from(lo), f32::from(hi));
        (lo_f + value.clamp(0.0, 1.0) * (hi_f - lo_f)).round() as u8
    }
}
