//! Simulated peripherals for running the controller on a desktop.
//!
//! * [`ConsoleStrip`] keeps a frame buffer and traces each flushed frame.
//! * [`SimInputPin`] is a button line driven by [`SimInputPin::set_level`],
//!   delivering edges to its subscriber like a GPIO interrupt would.
//! * [`SimOutputPin`] records the buzzer level.

use core::convert::Infallible;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use log::{debug, trace};

use crate::app::ports::{EdgeSource, LedStrip, Rgb, StripLayout, Zone};
use crate::drivers::task::lock;

// ───────────────────────────────────────────────────────────────
// LED strip
// ───────────────────────────────────────────────────────────────

pub struct ConsoleStrip {
    layout: StripLayout,
    pixels: Vec<Rgb>,
    brightness: u8,
    last_frame: String,
}

impl ConsoleStrip {
    pub fn new(layout: StripLayout) -> Self {
        Self {
            layout,
            pixels: vec![(0, 0, 0); usize::from(layout.count)],
            brightness: 0,
            last_frame: String::new(),
        }
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Last flushed frame, one hex triple per pixel, `-` for dark ones.
    pub fn last_frame(&self) -> &str {
        &self.last_frame
    }

    fn render(&self) -> String {
        let mut out = String::with_capacity(self.pixels.len() * 7 + 8);
        for &(r, g, b) in &self.pixels {
            if (r, g, b) == (0, 0, 0) {
                out.push_str("------ ");
            } else {
                let _ = write!(out, "{r:02x}{g:02x}{b:02x} ");
            }
        }
        let _ = write!(out, "@{}", self.brightness);
        out
    }
}

impl LedStrip for ConsoleStrip {
    fn set_pixels(&mut self, zone: Zone, colour: Rgb) {
        for i in self.layout.pixels(zone) {
            if let Some(p) = self.pixels.get_mut(usize::from(i)) {
                *p = colour;
            }
        }
    }

    fn set_brightness(&mut self, level: u8) {
        self.brightness = level;
    }

    fn clear(&mut self) {
        self.pixels.fill((0, 0, 0));
    }

    fn flush(&mut self) {
        let frame = self.render();
        if frame != self.last_frame {
            trace!("strip {}", frame);
            self.last_frame = frame;
        }
    }

    fn layout(&self) -> StripLayout {
        self.layout
    }
}

// ───────────────────────────────────────────────────────────────
// Button line
// ───────────────────────────────────────────────────────────────

type EdgeHandler = Box<dyn Fn(bool) + Send + Sync>;

#[derive(Default)]
struct Line {
    level: AtomicBool,
    handler: Mutex<Option<EdgeHandler>>,
}

/// Cloneable handle; all clones share one line.
#[derive(Clone, Default)]
pub struct SimInputPin(Arc<Line>);

impl SimInputPin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive the line.  Subscribers see an edge only on an actual change.
    pub fn set_level(&self, high: bool) {
        let previous = self.0.level.swap(high, Ordering::AcqRel);
        if previous == high {
            return;
        }
        if let Some(handler) = lock(&self.0.handler).as_ref() {
            handler(high);
        }
    }

    pub fn level(&self) -> bool {
        self.0.level.load(Ordering::Acquire)
    }
}

impl ErrorType for SimInputPin {
    type Error = Infallible;
}

impl InputPin for SimInputPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.level())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.level())
    }
}

impl EdgeSource for SimInputPin {
    fn subscribe(&self, handler: Box<dyn Fn(bool) + Send + Sync>) {
        *lock(&self.0.handler) = Some(handler);
    }
}

// ───────────────────────────────────────────────────────────────
// Buzzer line
// ───────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct SimOutputPin(Arc<AtomicBool>);

impl SimOutputPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set_high(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn drive(&self, high: bool) {
        if self.0.swap(high, Ordering::AcqRel) != high {
            debug!("buzzer {}", if high { "on" } else { "off" });
        }
    }
}

impl ErrorType for SimOutputPin {
    type Error = Infallible;
}

impl OutputPin for SimOutputPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.drive(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.drive(true);
        Ok(())
    }
}
