//! LED pattern engine driven by the controller state.
//!
//! Every state change restarts the `light` task with the new state.  Each
//! generation first clears the strip and applies full brightness, then
//! runs one pattern:
//!
//! | State   | Pattern                                         | Rate        |
//! |---------|-------------------------------------------------|-------------|
//! | CALL    | Solid amber, bottom segment                     | -           |
//! | VIDEO   | Solid red, top segment                          | -           |
//! | REQUEST | Accent on top, brightness pulsed 30..255        | 0.8 s cycle |
//! | COFFEE  | Random colour strobe alternating top / bottom   | 50 ms step  |
//! | NONE    | Dark, or a scrolling colour wheel (light show)  | 20 ms frame |
//!
//! The light show pauses while the bell button is held.  Its scroll
//! position survives restarts until reset on leaving NONE.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use rand::Rng;

use super::pulse_wave::PulseWave;
use super::task::{CancelToken, CancellableTask, lock};
use crate::app::ports::{Rgb, SharedStrip, Zone};
use crate::config::BusyLightConfig;
use crate::error::Result;
use crate::fsm::State;

// ── Colour constants ─────────────────────────────────────────

pub const COLOUR_CALL: Rgb = (255, 150, 0); // Amber
pub const COLOUR_VIDEO: Rgb = (255, 0, 0); // Red
pub const COLOUR_REQUEST: Rgb = (0, 200, 255); // Accent cyan

/// Timing and limits for the patterns.
#[derive(Debug, Clone, Copy)]
pub struct AnimationTiming {
    pub max_brightness: u8,
    pub pulse_period: Duration,
    pub pulse_min: u8,
    pub pulse_max: u8,
    pub frame: Duration,
    pub strobe_step: Duration,
    pub light_show: bool,
}

impl AnimationTiming {
    pub fn from_config(c: &BusyLightConfig) -> Self {
        Self {
            max_brightness: c.max_brightness,
            pulse_period: Duration::from_millis(c.pulse_period_ms.into()),
            pulse_min: c.pulse_min,
            pulse_max: c.pulse_max,
            frame: Duration::from_millis(c.frame_interval_ms.into()),
            strobe_step: Duration::from_millis(c.strobe_step_ms.into()),
            light_show: c.light_show_enabled,
        }
    }
}

pub struct LightAnimator {
    task: CancellableTask<State>,
    show_position: Arc<AtomicU32>,
}

impl LightAnimator {
    /// `button_held` is read by the light show to pause scrolling.
    pub fn new(
        strip: SharedStrip,
        timing: AnimationTiming,
        button_held: Arc<AtomicBool>,
        join_timeout: Duration,
    ) -> Self {
        let show_position = Arc::new(AtomicU32::new(0));
        let position = Arc::clone(&show_position);

        let task = CancellableTask::new("light", join_timeout, move |state, token| {
            begin(&strip, timing.max_brightness);
            match state {
                State::Call => solid(&strip, Zone::Bottom, COLOUR_CALL),
                State::Video => solid(&strip, Zone::Top, COLOUR_VIDEO),
                State::Request => pulse(&strip, &timing, token),
                State::Coffee => strobe(&strip, timing.strobe_step, token),
                State::None if timing.light_show => {
                    light_show(&strip, timing.frame, &position, &button_held, token);
                }
                State::None => {}
            }
        });

        Self {
            task,
            show_position,
        }
    }

    /// Replace the running pattern with the one for `state`.
    pub fn on_state_changed(&self, state: State) -> Result<()> {
        self.task.restart(state)
    }

    /// Rewind the light show to its first frame.
    pub fn reset_light_show(&self) {
        self.show_position.store(0, Ordering::Relaxed);
    }

    pub fn light_show_position(&self) -> u32 {
        self.show_position.load(Ordering::Relaxed)
    }

    pub fn is_animating(&self) -> bool {
        self.task.is_running()
    }

    pub fn generations(&self) -> u64 {
        self.task.starts()
    }

    pub fn stop(&self) -> Result<()> {
        self.task.cancel_and_join()
    }
}

// ── Patterns ─────────────────────────────────────────────────

fn begin(strip: &SharedStrip, brightness: u8) {
    let mut s = lock(strip);
    s.clear();
    s.set_brightness(brightness);
    s.flush();
}

fn solid(strip: &SharedStrip, zone: Zone, colour: Rgb) {
    let mut s = lock(strip);
    s.set_pixels(zone, colour);
    s.flush();
}

fn pulse(strip: &SharedStrip, timing: &AnimationTiming, token: &CancelToken) {
    let wave = PulseWave::new(timing.pulse_period);
    lock(strip).set_pixels(Zone::Top, COLOUR_REQUEST);
    loop {
        {
            let mut s = lock(strip);
            s.set_brightness(wave.get_scaled(timing.pulse_min, timing.pulse_max));
            s.flush();
        }
        if !token.sleep(timing.frame) {
            return;
        }
    }
}

fn strobe(strip: &SharedStrip, step: Duration, token: &CancelToken) {
    let mut rng = rand::thread_rng();
    let mut top = true;
    loop {
        {
            let mut s = lock(strip);
            s.clear();
            s.set_pixels(
                if top { Zone::Top } else { Zone::Bottom },
                random_colour(&mut rng),
            );
            s.flush();
        }
        top = !top;
        if !token.sleep(step) {
            return;
        }
    }
}

fn light_show(
    strip: &SharedStrip,
    frame: Duration,
    position: &AtomicU32,
    paused: &AtomicBool,
    token: &CancelToken,
) {
    loop {
        if !paused.load(Ordering::Acquire) {
            let offset = position.fetch_add(1, Ordering::Relaxed);
            let mut s = lock(strip);
            let count = s.layout().count.max(1);
            for i in 0..count {
                let hue = (u32::from(i) * 256 / u32::from(count)).wrapping_add(offset) & 0xFF;
                s.set_pixels(Zone::Pixel(i), wheel(hue as u8));
            }
            s.flush();
        }
        if !token.sleep(frame) {
            return;
        }
    }
}

/// Channel values in steps of a tenth of full scale.
pub fn random_colour(rng: &mut impl Rng) -> Rgb {
    (channel(rng), channel(rng), channel(rng))
}

fn channel(rng: &mut impl Rng) -> u8 {
    (rng.gen_range(0..=10u16) * 255 / 10) as u8
}

/// Colour wheel: red → green → blue → red over 0..=255.
pub fn wheel(pos: u8) -> Rgb {
    let pos = 255 - pos;
    match pos {
        0..=84 => (255 - pos * 3, 0, pos * 3),
        85..=169 => {
            let p = pos - 85;
            (0, p * 3, 255 - p * 3)
        }
        _ => {
            let p = pos - 170;
            (p * 3, 255 - p * 3, 0)
        }
    }
}
