//! Status controller tests against mock hardware.

use std::time::Duration;

use busylight::State;
use busylight::app::events::StatusEvent;
use busylight::drivers::led_patterns::{COLOUR_CALL, COLOUR_REQUEST, COLOUR_VIDEO};
use busylight::app::ports::Zone;
use busylight::error::TransitionError;
use busylight::fsm::Trigger;

use crate::mock_hw::{StripCall, rig, rig_with, test_config, wait_until};

const SETTLE: Duration = Duration::from_millis(150);

fn auto_reverts(events: &[StatusEvent]) -> usize {
    events.iter().filter(|e| **e == StatusEvent::AutoReverted).count()
}

// ── Basics ────────────────────────────────────────────────────

#[test]
fn starts_in_none() {
    let r = rig();
    assert_eq!(r.controller.get_state(), "none");
    assert_eq!(r.sink.events()[0], StatusEvent::Started(State::None));
    assert_eq!(r.controller.total_transitions(), 0);
    assert!(wait_until(SETTLE, || r.strip.lock().unwrap().calls.contains(&StripCall::Clear)));
}

#[test]
fn triggers_are_case_insensitive() {
    let r = rig();
    assert!(r.controller.request_transition("VIDEO"));
    assert_eq!(r.controller.state(), State::Video);
    assert!(r.controller.set_state("None"));
    assert_eq!(r.controller.get_state(), "none");
}

#[test]
fn rejected_trigger_has_no_side_effects() {
    let r = rig();
    r.controller.set_state("call");
    let events_before = r.sink.events().len();
    let transitions_before = r.controller.total_transitions();

    assert!(!r.controller.request_transition("coffee"));
    assert!(!r.controller.request_transition("request"));
    assert!(!r.controller.request_transition("disco"));

    assert_eq!(r.controller.state(), State::Call);
    assert_eq!(r.sink.events().len(), events_before);
    assert_eq!(r.controller.total_transitions(), transitions_before);
}

#[test]
fn try_transition_reports_reason() {
    let r = rig();
    assert_eq!(
        r.controller.try_transition("request"),
        Err(TransitionError::NotAllowed {
            trigger: Trigger::Request,
            from: State::None
        })
    );
    assert!(matches!(
        r.controller.try_transition("party"),
        Err(TransitionError::UnknownTrigger(_))
    ));
    assert_eq!(r.controller.try_transition("coffee"), Ok(State::Coffee));
}

#[test]
fn coffee_request_returns_to_none() {
    let r = rig();
    assert!(r.controller.set_state("coffee"));
    assert!(r.controller.set_state("request"));
    assert_eq!(r.controller.state(), State::None);
    assert_eq!(r.controller.bell_rings(), 0);
    assert!(!r.controller.bell_pending());
}

#[test]
fn self_transition_counts_and_notifies() {
    let r = rig();
    assert!(r.controller.set_state("none"));
    assert_eq!(r.controller.total_transitions(), 1);
    assert!(r.sink.events().contains(&StatusEvent::StateChanged {
        from: State::None,
        to: State::None
    }));
}

// ── LED patterns ──────────────────────────────────────────────

#[test]
fn call_lights_bottom_amber() {
    let r = rig();
    r.controller.set_state("call");
    assert!(wait_until(SETTLE, || {
        r.strip.lock().unwrap().last_fill() == Some((Zone::Bottom, COLOUR_CALL))
    }));
}

#[test]
fn video_lights_top_red() {
    let r = rig();
    r.controller.set_state("video");
    assert!(wait_until(SETTLE, || {
        r.strip.lock().unwrap().last_fill() == Some((Zone::Top, COLOUR_VIDEO))
    }));
}

#[test]
fn every_pattern_starts_with_clear_and_full_brightness() {
    let r = rig();
    r.controller.set_state("video");
    std::thread::sleep(Duration::from_millis(30));
    r.strip.lock().unwrap().calls.clear();
    r.controller.set_state("call");
    assert!(wait_until(SETTLE, || r.strip.lock().unwrap().calls.len() >= 5));
    let calls = r.strip.lock().unwrap().calls.clone();
    assert_eq!(calls[0], StripCall::Clear);
    assert_eq!(calls[1], StripCall::Brightness(255));
}

#[test]
fn request_pulses_accent_on_top() {
    let r = rig();
    r.controller.set_state("video");
    r.controller.set_state("request");
    std::thread::sleep(Duration::from_millis(100));
    let calls = r.strip.lock().unwrap().calls.clone();
    assert!(calls.contains(&StripCall::SetPixels(Zone::Top, COLOUR_REQUEST)));
    let levels: Vec<u8> = calls
        .iter()
        .filter_map(|c| match c {
            StripCall::Brightness(l) => Some(*l),
            _ => None,
        })
        .collect();
    assert!(levels.iter().any(|&l| l < 255));
    assert!(levels.iter().all(|&l| l >= 30));
}

// ── Bell and auto-revert ──────────────────────────────────────

#[test]
fn answered_request_does_not_revert() {
    let r = rig();
    assert!(r.controller.set_state("video"));
    assert!(r.controller.set_state("request"));
    assert!(r.controller.bell_pending());
    assert_eq!(r.controller.bell_rings(), 1);

    assert!(r.controller.set_state("video"));
    assert!(!r.controller.bell_pending());

    std::thread::sleep(Duration::from_millis(350));
    assert_eq!(r.controller.state(), State::Video);
    assert_eq!(auto_reverts(&r.sink.events()), 0);
    assert_eq!(r.controller.total_transitions(), 3);
    assert_eq!(r.sink.count(|e| *e == StatusEvent::BellRang), 1);
    assert_eq!(r.buzzer.rises(), 3);
}

#[test]
fn unanswered_request_reverts_once() {
    let r = rig();
    r.controller.set_state("video");
    r.controller.set_state("request");
    assert!(wait_until(Duration::from_secs(1), || r.controller.state() == State::Video));
    std::thread::sleep(Duration::from_millis(300));

    assert_eq!(r.controller.state(), State::Video);
    assert_eq!(auto_reverts(&r.sink.events()), 1);
    assert_eq!(r.controller.total_transitions(), 3);
    assert!(!r.controller.bell_pending());
}

#[test]
fn superseding_change_cancels_revert() {
    let r = rig();
    r.controller.set_state("video");
    r.controller.set_state("request");
    r.controller.set_state("call");
    std::thread::sleep(Duration::from_millis(350));
    assert_eq!(r.controller.state(), State::Call);
    assert_eq!(auto_reverts(&r.sink.events()), 0);
}

#[test]
fn re_entering_request_arms_a_fresh_timeout() {
    let r = rig();
    r.controller.set_state("video");
    r.controller.set_state("request");
    std::thread::sleep(Duration::from_millis(120));
    r.controller.set_state("video");
    r.controller.set_state("request");
    // The first arming would have fired by now.
    std::thread::sleep(Duration::from_millis(120));
    assert_eq!(r.controller.state(), State::Request);
    assert!(wait_until(Duration::from_secs(1), || r.controller.state() == State::Video));
    assert_eq!(auto_reverts(&r.sink.events()), 1);
}

#[test]
fn bell_button_dispatch() {
    let r = rig();
    r.controller.on_bell_button();
    assert_eq!(r.controller.state(), State::None);

    r.controller.set_state("call");
    r.controller.on_bell_button();
    assert_eq!(r.controller.state(), State::Call);

    r.controller.set_state("video");
    r.controller.on_bell_button();
    assert_eq!(r.controller.state(), State::Request);

    r.controller.set_state("none");
    r.controller.set_state("coffee");
    r.controller.on_bell_button();
    assert_eq!(r.controller.state(), State::None);
}

#[test]
fn bell_ignored_during_rearm_grace() {
    let mut config = test_config();
    config.bell_rearm_grace_ms = 300;
    let r = rig_with(&config);

    r.controller.set_state("video");
    r.controller.on_bell_button();
    assert_eq!(r.controller.state(), State::Request);
    r.controller.set_state("video");

    r.controller.on_bell_button();
    assert_eq!(r.controller.state(), State::Video);

    std::thread::sleep(Duration::from_millis(350));
    r.controller.on_bell_button();
    assert_eq!(r.controller.state(), State::Request);
}

// ── Debounced button ──────────────────────────────────────────

#[test]
fn held_press_rings_the_bell() {
    let r = rig();
    r.controller.set_state("video");
    r.press();
    assert!(wait_until(Duration::from_millis(500), || r.controller.state() == State::Request));
    assert!(r.controller.button_pressed());
    r.release();
    assert!(wait_until(Duration::from_millis(500), || !r.controller.button_pressed()));
    assert_eq!(r.controller.bell_rings(), 1);
}

#[test]
fn bouncing_button_does_nothing() {
    let r = rig();
    r.controller.set_state("video");
    for _ in 0..5 {
        r.press();
        std::thread::sleep(Duration::from_millis(5));
        r.release();
        std::thread::sleep(Duration::from_millis(5));
    }
    std::thread::sleep(Duration::from_millis(150));
    assert_eq!(r.controller.state(), State::Video);
    assert!(!r.controller.button_pressed());
}

// ── Concurrency ───────────────────────────────────────────────

#[test]
fn concurrent_callers_serialize_transitions() {
    let mut config = test_config();
    config.bell_timeout_ms = 3;
    config.debounce_ms = 2;
    config.light_show_enabled = true;
    let r = rig_with(&config);
    let remote: busylight::PeerAddr = "10.0.0.20".parse().unwrap();
    r.controller.add_or_update_remote(remote);

    const NAMES: [&str; 6] = ["none", "call", "video", "request", "coffee", "VIDEO"];
    std::thread::scope(|s| {
        for worker in 0..6usize {
            let r = &r;
            s.spawn(move || {
                for step in 0..120usize {
                    match (worker + step) % 8 {
                        6 => r.controller.on_bell_button(),
                        7 if worker % 2 == 0 => {
                            if step % 16 < 8 { r.press() } else { r.release() }
                        }
                        n => {
                            r.controller.request_transition(NAMES[n % NAMES.len()]);
                        }
                    }
                    if step % 10 == 0 {
                        std::thread::sleep(Duration::from_millis(1));
                    }
                }
            });
        }
    });
    std::thread::sleep(Duration::from_millis(30));

    let (done_tx, done_rx) = std::sync::mpsc::channel();
    let controller = r.controller.clone();
    std::thread::spawn(move || {
        done_tx.send(controller.shutdown().is_ok()).unwrap();
    });
    assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)), Ok(true));

    let total = r.controller.total_transitions();
    let changes = r
        .sink
        .count(|e| matches!(e, StatusEvent::StateChanged { .. }));
    assert!(total > 0);
    assert_eq!(total, changes as u64);
    assert_eq!(r.transport.sent_to(&remote) as u64, total);
    assert!(!r.buzzer.is_high());
    assert!(r.strip.lock().unwrap().is_dark());
}

// ── Shutdown ──────────────────────────────────────────────────

#[test]
fn shutdown_blanks_strip_and_silences_buzzer() {
    let r = rig();
    r.controller.set_state("video");
    r.controller.set_state("request");
    r.controller.shutdown().unwrap();

    assert!(!r.controller.bell_pending());
    assert!(!r.buzzer.is_high());
    assert!(r.strip.lock().unwrap().is_dark());
    assert_eq!(r.strip.lock().unwrap().calls.last(), Some(&StripCall::Flush));

    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(r.controller.state(), State::Request);
}

#[test]
fn status_report_shape() {
    let r = rig();
    r.controller.set_state("call");
    let json = serde_json::to_value(r.controller.status()).unwrap();
    assert_eq!(json["state"], "call");
    assert_eq!(json["remotes"], serde_json::json!([]));
    assert_eq!(json["total_transitions"], 1);
    assert!(json["uptime_secs"].is_u64());
}
