//! Status controller: the hexagonal core.
//!
//! [`StatusController`] owns the FSM, its hook context, the debounced bell
//! button, and the peer registry.  It is a cheap, cloneable handle: the
//! HTTP layer, the GPIO edge handler and background timers all hold one.
//!
//! ```text
//!  HTTP / button ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                    │     StatusController      │
//!   PeerTransport ◀──│  FSM · animator · bell    │──▶ LedStrip
//!                    └──────────────────────────┘
//! ```
//!
//! Transitions are serialized by one mutex around the FSM and its
//! context.  Lock order: transition lock, then registry lock.

use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use embedded_hal::digital::{InputPin, OutputPin};
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::config::BusyLightConfig;
use crate::drivers::button::{DebounceTiming, DebouncedInput};
use crate::drivers::buzzer::Buzzer;
use crate::drivers::led_patterns::{AnimationTiming, LightAnimator};
use crate::drivers::task::lock;
use crate::drivers::timeout::DeferredAction;
use crate::error::{Result, TransitionError};
use crate::fsm::context::{BellExpired, ControllerContext};
use crate::fsm::states::{after_state_change, build_hook_table};
use crate::fsm::{Fsm, State, TRANSITIONS, Trigger};
use crate::peers::notifier::PeerNotifier;
use crate::peers::wire::Notification;
use crate::peers::{PeerAddr, PeerRegistry, PeerSummary};

use super::events::StatusEvent;
use super::ports::{EventSink, PeerTransport, SharedStrip};

/// Peripherals the controller drives.
pub struct Hardware<B, Z> {
    pub strip: SharedStrip,
    pub button: B,
    pub buzzer: Z,
}

/// Snapshot returned by [`StatusController::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub state: State,
    pub remotes: Vec<Ipv4Addr>,
    pub uptime_secs: u64,
    pub total_transitions: u64,
    pub peers: Vec<PeerSummary>,
}

struct Core {
    fsm: Fsm<ControllerContext>,
    ctx: ControllerContext,
}

struct Shared {
    core: Mutex<Core>,
    button: DebouncedInput,
    registry: Arc<Mutex<PeerRegistry>>,
    strip: SharedStrip,
    sink: Arc<dyn EventSink>,
    started_at: Instant,
}

// ───────────────────────────────────────────────────────────────
// StatusController
// ───────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct StatusController {
    shared: Arc<Shared>,
}

impl StatusController {
    /// Validate configuration and transition table, wire up the drivers,
    /// and start in NONE.
    pub fn new<B, Z>(
        config: &BusyLightConfig,
        hw: Hardware<B, Z>,
        transport: Arc<dyn PeerTransport>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self>
    where
        B: InputPin + Send + 'static,
        Z: OutputPin + Send + 'static,
    {
        config.validate()?;

        let fsm = Fsm::new(TRANSITIONS, build_hook_table(), after_state_change, State::None)?;
        let registry = Arc::new(Mutex::new(PeerRegistry::new(config.peer_expiry())));
        let notifier = PeerNotifier::start(transport, Arc::clone(&registry), Arc::clone(&sink))?;
        let join_timeout = config.task_join_timeout();

        let shared = Arc::new_cyclic(|weak: &Weak<Shared>| {
            let on_pressed = weak.clone();
            let button = DebouncedInput::new(
                hw.button,
                DebounceTiming {
                    threshold: config.debounce(),
                    poll: config.debounce_poll(),
                    join_timeout,
                },
                Box::new(move || {
                    if let Some(shared) = on_pressed.upgrade() {
                        StatusController { shared }.on_bell_button();
                    }
                }),
                Box::new(|| debug!("bell button released")),
            );

            let on_expired = weak.clone();
            let bell_expired: BellExpired = Arc::new(move |id| {
                if let Some(shared) = on_expired.upgrade() {
                    StatusController { shared }.on_bell_timeout(id);
                }
            });

            let ctx = ControllerContext {
                animator: LightAnimator::new(
                    Arc::clone(&hw.strip),
                    AnimationTiming::from_config(config),
                    button.pressed_flag(),
                    join_timeout,
                ),
                buzzer: Buzzer::new(hw.buzzer, &config.buzzer_sequence_ms, join_timeout),
                bell_timer: DeferredAction::new("bell-timeout"),
                bell_timeout: config.bell_timeout(),
                bell_expired,
                armed_bell: None,
                bell_rearm_grace: config.bell_rearm_grace(),
                bell_blocked_until: None,
                registry: Arc::clone(&registry),
                notifier,
                sink: Arc::clone(&sink),
            };

            Shared {
                core: Mutex::new(Core { fsm, ctx }),
                button,
                registry,
                strip: hw.strip,
                sink,
                started_at: Instant::now(),
            }
        });

        let controller = Self { shared };
        {
            let mut core = lock(&controller.shared.core);
            let Core { fsm, ctx } = &mut *core;
            fsm.start(ctx);
        }
        controller.shared.sink.emit(&StatusEvent::Started(State::None));
        info!("busylight controller started");
        Ok(controller)
    }

    // ── Transitions ───────────────────────────────────────────

    /// Fire the named trigger.  Returns the new state, or why it was
    /// rejected; rejection leaves everything unchanged.
    pub fn try_transition(&self, trigger: &str) -> core::result::Result<State, TransitionError> {
        let trigger: Trigger = trigger.parse()?;
        let mut core = lock(&self.shared.core);
        self.fire_locked(&mut core, trigger)
    }

    /// Boolean form of [`try_transition`](Self::try_transition).
    pub fn request_transition(&self, trigger: &str) -> bool {
        match self.try_transition(trigger) {
            Ok(_) => true,
            Err(e) => {
                debug!("transition refused: {}", e);
                false
            }
        }
    }

    /// Alias used by the HTTP layer.
    pub fn set_state(&self, name: &str) -> bool {
        self.request_transition(name)
    }

    pub fn state(&self) -> State {
        lock(&self.shared.core).fsm.current_state()
    }

    /// Current state, lowercase.
    pub fn get_state(&self) -> String {
        self.state().name().to_string()
    }

    pub fn total_transitions(&self) -> u64 {
        lock(&self.shared.core).fsm.total_transitions()
    }

    fn fire_locked(
        &self,
        core: &mut Core,
        trigger: Trigger,
    ) -> core::result::Result<State, TransitionError> {
        let Core { fsm, ctx } = core;
        let (from, to) = fsm.fire(trigger, ctx)?;
        self.shared.sink.emit(&StatusEvent::StateChanged { from, to });
        Ok(to)
    }

    // ── Bell ──────────────────────────────────────────────────

    /// Debounced bell press: VIDEO asks for attention, COFFEE ends away
    /// mode, anything else is ignored.
    pub fn on_bell_button(&self) {
        info!("bell button triggered");
        let mut core = lock(&self.shared.core);
        let trigger = match core.fsm.current_state() {
            State::Video if !core.ctx.bell_allowed_at(Instant::now()) => {
                info!("bell ignored during re-arm grace");
                return;
            }
            State::Video => Trigger::Request,
            State::Coffee => Trigger::None,
            other => {
                debug!("bell ignored in '{}'", other);
                return;
            }
        };
        if let Err(e) = self.fire_locked(&mut core, trigger) {
            warn!("bell transition failed: {}", e);
        }
    }

    /// Raw level change on the bell button line.
    pub fn button_edge(&self, raw: bool) {
        if let Err(e) = self.shared.button.on_edge(raw) {
            error!("button edge dropped: {}", e);
        }
    }

    pub fn button_pressed(&self) -> bool {
        self.shared.button.is_pressed()
    }

    /// Whether an auto-revert is armed.
    pub fn bell_pending(&self) -> bool {
        lock(&self.shared.core).ctx.bell_timer.is_pending()
    }

    pub fn bell_rings(&self) -> u64 {
        lock(&self.shared.core).ctx.buzzer.rings()
    }

    fn on_bell_timeout(&self, id: u64) {
        let mut core = lock(&self.shared.core);
        if core.ctx.armed_bell != Some(id) || core.fsm.current_state() != State::Request {
            debug!("stale bell timeout #{} ignored", id);
            return;
        }
        info!("bell request unanswered; back to video");
        match self.fire_locked(&mut core, Trigger::Video) {
            Ok(_) => self.shared.sink.emit(&StatusEvent::AutoReverted),
            Err(e) => error!("auto-revert failed: {}", e),
        }
    }

    // ── Remotes ───────────────────────────────────────────────

    /// Peers after an expiry sweep.
    pub fn remotes(&self) -> Vec<PeerSummary> {
        let now = Instant::now();
        let mut registry = lock(&self.shared.registry);
        registry.sweep_expired_at(now);
        registry.summaries_at(now)
    }

    pub fn add_or_update_remote(&self, peer: PeerAddr) {
        lock(&self.shared.registry).add_or_update(peer);
    }

    /// Returns `true` if the peer was registered.
    pub fn delete_remote(&self, peer: &PeerAddr) -> bool {
        lock(&self.shared.registry).remove(peer)
    }

    /// Returns how many expired peers were dropped.
    pub fn sweep_expired_remotes(&self) -> usize {
        lock(&self.shared.registry).sweep_expired()
    }

    pub fn activate_remote(&self, peer: &PeerAddr) -> bool {
        lock(&self.shared.registry).activate_at(peer, Instant::now())
    }

    pub fn deactivate_remote(&self, peer: &PeerAddr) -> bool {
        lock(&self.shared.registry).deactivate(peer)
    }

    /// Inbound contact from `peer`.  It is refreshed and skipped on the
    /// next fan-out, since it already knows the state it asked for.
    pub fn on_remote_request(&self, peer: PeerAddr, count_tx: bool) {
        debug!("incoming request from {}", peer);
        lock(&self.shared.registry).on_remote_request_at(peer, count_tx, Instant::now());
    }

    /// Wait until queued peer notifications are delivered.
    pub fn flush_notifications(&self, timeout: Duration) -> bool {
        lock(&self.shared.core).ctx.notifier.wait_idle(timeout)
    }

    // ── Reporting ─────────────────────────────────────────────

    /// `{"state": ..., "remotes": [...]}` plus counters.
    pub fn status(&self) -> StatusReport {
        let (state, total_transitions) = {
            let core = lock(&self.shared.core);
            (core.fsm.current_state(), core.fsm.total_transitions())
        };
        let now = Instant::now();
        let mut registry = lock(&self.shared.registry);
        registry.sweep_expired_at(now);
        StatusReport {
            state,
            remotes: registry.addresses(),
            uptime_secs: self.uptime().as_secs(),
            total_transitions,
            peers: registry.summaries_at(now),
        }
    }

    /// Backend reply shape: state and registered remotes only.
    pub fn notification(&self) -> Notification {
        let report = self.status();
        Notification {
            state: report.state,
            remotes: report.remotes,
        }
    }

    pub fn uptime(&self) -> Duration {
        self.shared.started_at.elapsed()
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Stop every background task, silence the buzzer, blank the strip.
    pub fn shutdown(&self) -> Result<()> {
        // The button's callback takes the transition lock; stop it first.
        let mut result = self.shared.button.stop();

        {
            let mut core = lock(&self.shared.core);
            let ctx = &mut core.ctx;
            ctx.disarm_bell();
            for step in [ctx.animator.stop(), ctx.buzzer.stop()] {
                if let Err(e) = step {
                    error!("shutdown: {}", e);
                    result = result.and(Err(e));
                }
            }
            ctx.notifier.shutdown();
        }

        let mut strip = lock(&self.shared.strip);
        strip.clear();
        strip.flush();
        info!("busylight controller stopped");
        result
    }
}
