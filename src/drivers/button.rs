//! Debounced bell button.
//!
//! ## Hardware
//!
//! Momentary switch read as active-high.  The GPIO edge source calls
//! [`DebouncedInput::on_edge`] on every raw transition; each edge restarts
//! a settle check on the `debounce` task.
//!
//! ## Settle check
//!
//! The check snapshots the raw level and polls the pin every
//! `poll` (1 ms by default) for the full threshold (50 ms by default).
//! A differing read or a newer edge aborts it silently.  A level that
//! survives the threshold becomes the debounced state and fires
//! `pressed` or `released` exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use embedded_hal::digital::InputPin;
use log::{debug, warn};

use super::task::{CancellableTask, lock};
use crate::error::Result;

/// Callback fired on a debounced edge.
pub type EdgeCallback = Box<dyn Fn() + Send + Sync>;

/// Settle-time parameters.
#[derive(Debug, Clone, Copy)]
pub struct DebounceTiming {
    pub threshold: Duration,
    pub poll: Duration,
    pub join_timeout: Duration,
}

pub struct DebouncedInput {
    task: CancellableTask<bool>,
    stable: Arc<AtomicBool>,
}

impl DebouncedInput {
    pub fn new<P>(
        pin: P,
        timing: DebounceTiming,
        on_pressed: EdgeCallback,
        on_released: EdgeCallback,
    ) -> Self
    where
        P: InputPin + Send + 'static,
    {
        let pin = Mutex::new(pin);
        let stable = Arc::new(AtomicBool::new(false));
        let debounced = Arc::clone(&stable);

        let task = CancellableTask::new("debounce", timing.join_timeout, move |snapshot, token| {
            let end = Instant::now() + timing.threshold;
            while Instant::now() < end {
                if token.is_canceled() || read(&mut *lock(&pin)) != snapshot {
                    debug!("debounce check for {} aborted", level_name(snapshot));
                    return;
                }
                std::thread::sleep(timing.poll);
            }

            debounced.store(snapshot, Ordering::Release);
            if snapshot {
                on_pressed();
            } else {
                on_released();
            }
        });

        Self { task, stable }
    }

    /// Raw edge with the instantaneous level; restarts the settle check.
    pub fn on_edge(&self, raw: bool) -> Result<()> {
        self.task.restart(raw)
    }

    /// Last debounced level (`true` = held).
    pub fn is_pressed(&self) -> bool {
        self.stable.load(Ordering::Acquire)
    }

    /// Shared view of the debounced level for readers on other tasks.
    pub fn pressed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stable)
    }

    pub fn is_checking(&self) -> bool {
        self.task.is_running()
    }

    pub fn stop(&self) -> Result<()> {
        self.task.cancel_and_join()
    }
}

fn read<P: InputPin>(pin: &mut P) -> bool {
    pin.is_high().unwrap_or_else(|e| {
        warn!("button read failed: {:?}", e);
        false
    })
}

fn level_name(level: bool) -> &'static str {
    if level { "press" } else { "release" }
}
