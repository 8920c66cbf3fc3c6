//! Mock hardware and network adapters for integration tests.
//!
//! Records every strip call, buzzer level, peer request and event so tests
//! can assert on the full history without real GPIO or sockets.

use core::convert::Infallible;
use std::collections::HashSet;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use busylight::app::events::StatusEvent;
use busylight::app::ports::{EventSink, LedStrip, PeerTransport, Rgb, StripLayout, Zone};
use busylight::config::BusyLightConfig;
use busylight::error::PeerSendError;
use busylight::peers::PeerAddr;
use busylight::peers::wire::{Notification, read_notification};
use busylight::{Hardware, StatusController};
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

// ── Strip call record ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum StripCall {
    SetPixels(Zone, Rgb),
    Brightness(u8),
    Clear,
    Flush,
}

pub struct RecordingStrip {
    pub calls: Vec<StripCall>,
    layout: StripLayout,
}

#[allow(dead_code)]
impl RecordingStrip {
    pub fn new(layout: StripLayout) -> Self {
        Self {
            calls: Vec::new(),
            layout,
        }
    }

    pub fn last_fill(&self) -> Option<(Zone, Rgb)> {
        self.calls.iter().rev().find_map(|c| match c {
            StripCall::SetPixels(z, rgb) => Some((*z, *rgb)),
            _ => None,
        })
    }

    /// True when the last pixel-affecting call was a clear.
    pub fn is_dark(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find(|c| matches!(c, StripCall::SetPixels(..) | StripCall::Clear))
            .is_none_or(|c| *c == StripCall::Clear)
    }
}

impl LedStrip for RecordingStrip {
    fn set_pixels(&mut self, zone: Zone, colour: Rgb) {
        self.calls.push(StripCall::SetPixels(zone, colour));
    }

    fn set_brightness(&mut self, level: u8) {
        self.calls.push(StripCall::Brightness(level));
    }

    fn clear(&mut self) {
        self.calls.push(StripCall::Clear);
    }

    fn flush(&mut self) {
        self.calls.push(StripCall::Flush);
    }

    fn layout(&self) -> StripLayout {
        self.layout
    }
}

// ── Pins ──────────────────────────────────────────────────────

/// Button line whose level the test sets directly.
#[derive(Clone, Default)]
pub struct ScriptedPin(Arc<AtomicBool>);

impl ScriptedPin {
    pub fn set(&self, high: bool) {
        self.0.store(high, Ordering::SeqCst);
    }
}

impl ErrorType for ScriptedPin {
    type Error = Infallible;
}

impl InputPin for ScriptedPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.0.load(Ordering::SeqCst))
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.0.load(Ordering::SeqCst))
    }
}

/// Buzzer line recording every level written.
#[derive(Clone, Default)]
pub struct RecordingPin(Arc<Mutex<Vec<bool>>>);

#[allow(dead_code)]
impl RecordingPin {
    pub fn levels(&self) -> Vec<bool> {
        self.0.lock().unwrap().clone()
    }

    pub fn rises(&self) -> usize {
        self.levels().windows(2).filter(|w| !w[0] && w[1]).count()
    }

    pub fn is_high(&self) -> bool {
        self.0.lock().unwrap().last().copied().unwrap_or(false)
    }
}

impl ErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.lock().unwrap().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.lock().unwrap().push(true);
        Ok(())
    }
}

// ── Network ───────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(PeerAddr, Vec<u8>)>>,
    unreachable: Mutex<HashSet<PeerAddr>>,
}

#[allow(dead_code)]
impl RecordingTransport {
    pub fn fail_for(&self, peer: PeerAddr) {
        self.unreachable.lock().unwrap().insert(peer);
    }

    pub fn requests(&self) -> Vec<(PeerAddr, Vec<u8>)> {
        self.sent.lock().unwrap().clone()
    }

    /// Delivered notifications, decoded.
    pub fn notifications(&self) -> Vec<(PeerAddr, Notification)> {
        self.requests()
            .into_iter()
            .map(|(peer, bytes)| (peer, read_notification(Cursor::new(bytes)).unwrap()))
            .collect()
    }

    pub fn sent_to(&self, peer: &PeerAddr) -> usize {
        self.requests().iter().filter(|(p, _)| p == peer).count()
    }
}

impl PeerTransport for RecordingTransport {
    fn send(&self, peer: &PeerAddr, request: &[u8]) -> Result<(), PeerSendError> {
        if self.unreachable.lock().unwrap().contains(peer) {
            return Err(PeerSendError::Timeout);
        }
        self.sent.lock().unwrap().push((*peer, request.to_vec()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink(Mutex<Vec<StatusEvent>>);

#[allow(dead_code)]
impl RecordingSink {
    pub fn events(&self) -> Vec<StatusEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, f: impl Fn(&StatusEvent) -> bool) -> usize {
        self.events().iter().filter(|e| f(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &StatusEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

/// Controller wired to mocks, with handles on every mock.
pub struct Rig {
    pub controller: StatusController,
    pub strip: Arc<Mutex<RecordingStrip>>,
    pub button: ScriptedPin,
    pub buzzer: RecordingPin,
    pub transport: Arc<RecordingTransport>,
    pub sink: Arc<RecordingSink>,
}

/// Fast timings so tests finish quickly.
pub fn test_config() -> BusyLightConfig {
    let mut c = BusyLightConfig::default();
    c.bell_timeout_ms = 200;
    c.bell_rearm_grace_ms = 0;
    c.buzzer_sequence_ms.clear();
    for step in [10, 10, 10, 10, 10] {
        c.buzzer_sequence_ms.push(step).unwrap();
    }
    c
}

pub fn rig() -> Rig {
    rig_with(&test_config())
}

pub fn rig_with(config: &BusyLightConfig) -> Rig {
    let strip = Arc::new(Mutex::new(RecordingStrip::new(StripLayout::from_config(config))));
    let button = ScriptedPin::default();
    let buzzer = RecordingPin::default();
    let transport = Arc::new(RecordingTransport::default());
    let sink = Arc::new(RecordingSink::default());

    let controller = StatusController::new(
        config,
        Hardware {
            strip: strip.clone(),
            button: button.clone(),
            buzzer: buzzer.clone(),
        },
        transport.clone(),
        sink.clone(),
    )
    .unwrap();

    Rig {
        controller,
        strip,
        button,
        buzzer,
        transport,
        sink,
    }
}

#[allow(dead_code)]
impl Rig {
    /// Raw press as the GPIO interrupt would report it.
    pub fn press(&self) {
        self.button.set(true);
        self.controller.button_edge(true);
    }

    pub fn release(&self) {
        self.button.set(false);
        self.controller.button_edge(false);
    }

    pub fn flush(&self) {
        assert!(self.controller.flush_notifications(Duration::from_secs(2)));
    }
}

/// Poll `f` until it holds or `timeout` passes.
#[allow(dead_code)]
pub fn wait_until(timeout: Duration, f: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if f() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    f()
}
