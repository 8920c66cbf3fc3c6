//! Bell buzzer driver.
//!
//! Plays a fixed on/off pulse sequence once per [`Buzzer::ring`].  A ring
//! requested while one is in progress is dropped, never queued.  The output
//! is driven low at the end of every sequence, including interrupted ones.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use embedded_hal::digital::OutputPin;
use log::{info, warn};

use super::task::{CancellableTask, lock};
use crate::error::Result;

pub struct Buzzer {
    task: CancellableTask<()>,
}

impl Buzzer {
    /// `sequence_ms` alternates on/off durations, starting with "on".
    pub fn new<O>(pin: O, sequence_ms: &[u32], join_timeout: Duration) -> Self
    where
        O: OutputPin + Send + 'static,
    {
        let pin = Arc::new(Mutex::new(pin));
        let steps: Vec<Duration> = sequence_ms
            .iter()
            .map(|&ms| Duration::from_millis(ms.into()))
            .collect();

        drive(&mut *lock(&pin), false);

        let task = CancellableTask::new("buzzer", join_timeout, move |(), token| {
            let mut on = true;
            for step in &steps {
                if token.is_canceled() {
                    break;
                }
                drive(&mut *lock(&pin), on);
                on = !on;
                if !token.sleep(*step) {
                    break;
                }
            }
            drive(&mut *lock(&pin), false);
        });

        Self { task }
    }

    /// Ring once.  Returns `false` when a ring is already active.
    pub fn ring(&self) -> bool {
        match self.task.start_if_idle(()) {
            Ok(true) => {
                info!("bell ringing");
                true
            }
            Ok(false) => false,
            Err(e) => {
                warn!("bell could not ring: {}", e);
                false
            }
        }
    }

    pub fn is_ringing(&self) -> bool {
        self.task.is_running()
    }

    /// Interrupt a ring in progress; the output ends low.
    pub fn stop(&self) -> Result<()> {
        self.task.cancel_and_join()
    }

    /// Number of rings started.
    pub fn rings(&self) -> u64 {
        self.task.starts()
    }
}

fn drive<O: OutputPin>(pin: &mut O, high: bool) {
    let result = if high { pin.set_high() } else { pin.set_low() };
    if let Err(e) = result {
        warn!("buzzer pin write failed: {:?}", e);
    }
}
