//! Concrete state hooks and table builder.
//!
//! Each state registers plain `fn` pointers for enter and exit; one global
//! after-change hook runs on every transition.  No name-based dispatch.
//!
//! ```text
//!  any ──[call]──▶ CALL        any ──[none]──▶ NONE
//!  any ──[video]─▶ VIDEO ──[request]──▶ REQUEST ──[30 s]──▶ VIDEO
//!  NONE ──[coffee]──▶ COFFEE ──[request]──▶ NONE
//! ```

use std::time::Instant;

use log::{error, info};

use super::context::ControllerContext;
use super::{State, StateHooks};
use crate::app::events::StatusEvent;
use crate::drivers::task::lock;
use crate::peers::wire::Notification;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the hook table.  Called once at startup.
pub fn build_hook_table() -> [StateHooks<ControllerContext>; State::COUNT] {
    [
        // Index 0: None
        StateHooks {
            state: State::None,
            on_enter: None,
            on_exit: Some(none_exit),
        },
        // Index 1: Call
        StateHooks {
            state: State::Call,
            on_enter: None,
            on_exit: None,
        },
        // Index 2: Video
        StateHooks {
            state: State::Video,
            on_enter: None,
            on_exit: Some(video_exit),
        },
        // Index 3: Request
        StateHooks {
            state: State::Request,
            on_enter: Some(request_enter),
            on_exit: Some(request_exit),
        },
        // Index 4: Coffee
        StateHooks {
            state: State::Coffee,
            on_enter: None,
            on_exit: None,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  Every transition
// ═══════════════════════════════════════════════════════════════════════════

/// Restart the light pattern, then sweep and notify peers.
pub fn after_state_change(ctx: &mut ControllerContext, state: State) {
    if let Err(e) = ctx.animator.on_state_changed(state) {
        error!("light pattern for '{}' not started: {}", state, e);
    }

    if state != State::Request {
        ctx.disarm_bell();
    }

    let (targets, remotes) = {
        let mut registry = lock(&ctx.registry);
        let targets = registry.plan_fanout_at(Instant::now());
        (targets, registry.addresses())
    };
    ctx.notifier
        .notify_all(Notification { state, remotes }, targets);
}

// ═══════════════════════════════════════════════════════════════════════════
//  NONE state
// ═══════════════════════════════════════════════════════════════════════════

fn none_exit(ctx: &mut ControllerContext, _: State) {
    ctx.animator.reset_light_show();
}

// ═══════════════════════════════════════════════════════════════════════════
//  VIDEO state
// ═══════════════════════════════════════════════════════════════════════════

fn video_exit(ctx: &mut ControllerContext, _: State) {
    ctx.bell_blocked_until = Some(Instant::now() + ctx.bell_rearm_grace);
}

// ═══════════════════════════════════════════════════════════════════════════
//  REQUEST state
// ═══════════════════════════════════════════════════════════════════════════

fn request_enter(ctx: &mut ControllerContext, _: State) {
    if ctx.buzzer.ring() {
        ctx.sink.emit(&StatusEvent::BellRang);
    }

    let expired = ctx.bell_expired.clone();
    match ctx.bell_timer.arm(ctx.bell_timeout, move |id| expired(id)) {
        Ok(id) => {
            ctx.armed_bell = Some(id);
            info!("REQUEST: reverting to video in {:?} unless answered", ctx.bell_timeout);
        }
        Err(e) => error!("REQUEST: auto-revert not armed: {}", e),
    }
}

fn request_exit(ctx: &mut ControllerContext, _: State) {
    ctx.disarm_bell();
}
