//! Shared mutable context threaded through every FSM hook.
//!
//! `ControllerContext` is the single struct the enter/exit/after-change
//! hooks act on: the LED animator, the buzzer, the bell timeout, and the
//! peer registry with its notifier.  It lives next to the [`Fsm`](super::Fsm)
//! under the controller's transition lock, so hooks never race each other.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::app::ports::EventSink;
use crate::drivers::buzzer::Buzzer;
use crate::drivers::led_patterns::LightAnimator;
use crate::drivers::timeout::DeferredAction;
use crate::peers::PeerRegistry;
use crate::peers::notifier::PeerNotifier;

/// Callback run by the bell timeout with its arming id.
pub type BellExpired = Arc<dyn Fn(u64) + Send + Sync>;

pub struct ControllerContext {
    // --- Outputs ---
    pub animator: LightAnimator,
    pub buzzer: Buzzer,

    // --- Bell ---
    pub bell_timer: DeferredAction,
    pub bell_timeout: Duration,
    pub bell_expired: BellExpired,
    /// Arming id of the outstanding auto-revert, if any.
    pub armed_bell: Option<u64>,
    pub bell_rearm_grace: Duration,
    /// Bell presses before this instant are ignored.
    pub bell_blocked_until: Option<Instant>,

    // --- Peers ---
    pub registry: Arc<Mutex<PeerRegistry>>,
    pub notifier: PeerNotifier,

    pub sink: Arc<dyn EventSink>,
}

impl ControllerContext {
    /// Cancel the outstanding auto-revert.  Idempotent.
    pub fn disarm_bell(&mut self) {
        self.bell_timer.cancel();
        self.armed_bell = None;
    }

    /// Whether the bell button may fire a request at `now`.
    pub fn bell_allowed_at(&self, now: Instant) -> bool {
        self.bell_blocked_until.is_none_or(|until| now >= until)
    }
}
