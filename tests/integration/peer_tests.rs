//! Remote registry and fan-out through the controller.

use std::net::Ipv4Addr;
use std::time::Duration;

use busylight::app::events::StatusEvent;
use busylight::error::PeerSendError;
use busylight::peers::wire::Notification;
use busylight::{PeerAddr, State};

use crate::mock_hw::{rig, rig_with, test_config};

fn peer(s: &str) -> PeerAddr {
    s.parse().unwrap()
}

#[test]
fn state_change_notifies_registered_peer() {
    let r = rig();
    let p = peer("10.0.0.5:9001");
    r.controller.add_or_update_remote(p);
    assert!(r.controller.set_state("call"));
    r.flush();

    let sent = r.transport.notifications();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, p);
    assert_eq!(
        sent[0].1,
        Notification {
            state: State::Call,
            remotes: vec![Ipv4Addr::new(10, 0, 0, 5)],
        }
    );

    let (_, bytes) = &r.transport.requests()[0];
    let text = String::from_utf8(bytes.clone()).unwrap();
    assert!(text.starts_with("GET /remote HTTP/1.1\nHost: 10.0.0.5\n\n"));
    assert!(text.ends_with("{\"state\":\"call\",\"remotes\":[\"10.0.0.5\"]}\n"));
}

#[test]
fn every_peer_hears_every_change_in_order() {
    let r = rig();
    let a = peer("10.0.0.5");
    let b = peer("10.0.0.6:1234");
    r.controller.add_or_update_remote(a);
    r.controller.add_or_update_remote(b);

    for name in ["video", "request", "video"] {
        assert!(r.controller.set_state(name));
    }
    r.flush();

    for p in [a, b] {
        let states: Vec<State> = r
            .transport
            .notifications()
            .into_iter()
            .filter(|(to, _)| *to == p)
            .map(|(_, n)| n.state)
            .collect();
        assert_eq!(states, [State::Video, State::Request, State::Video]);
    }
    assert_eq!(
        r.sink.count(|e| matches!(e, StatusEvent::PeerNotified { .. })),
        6
    );
}

#[test]
fn originator_is_skipped_once() {
    let r = rig();
    let p = peer("10.0.0.7");
    r.controller.on_remote_request(p, false);
    assert!(r.controller.remotes()[0].skip_once);

    r.controller.set_state("call");
    r.flush();
    assert_eq!(r.transport.sent_to(&p), 0);

    r.controller.set_state("video");
    r.flush();
    assert_eq!(r.transport.sent_to(&p), 1);

    let summary = &r.controller.remotes()[0];
    assert!(!summary.skip_once);
    assert_eq!(summary.counters.received, 1);
    assert_eq!(summary.counters.sent, 1);
}

#[test]
fn failing_peer_does_not_block_others() {
    let r = rig();
    let dead = peer("10.0.0.8");
    let live = peer("10.0.0.9");
    r.transport.fail_for(dead);
    r.controller.add_or_update_remote(dead);
    r.controller.add_or_update_remote(live);

    r.controller.set_state("call");
    r.controller.set_state("none");
    r.flush();

    assert_eq!(r.controller.state(), State::None);
    assert_eq!(r.transport.sent_to(&live), 2);
    assert_eq!(r.transport.sent_to(&dead), 0);

    let remotes = r.controller.remotes();
    let dead_summary = remotes.iter().find(|s| s.address == dead.ip).unwrap();
    assert_eq!(dead_summary.counters.sent, 2);
    assert_eq!(dead_summary.counters.errors, 2);
    let live_summary = remotes.iter().find(|s| s.address == live.ip).unwrap();
    assert_eq!(live_summary.counters.errors, 0);

    assert_eq!(
        r.sink.count(|e| *e
            == StatusEvent::PeerSendFailed {
                peer: dead,
                error: PeerSendError::Timeout
            }),
        2
    );
}

#[test]
fn deactivated_peer_is_listed_but_not_notified() {
    let r = rig();
    let p = peer("10.0.0.10");
    r.controller.add_or_update_remote(p);
    assert!(r.controller.deactivate_remote(&p));

    r.controller.set_state("video");
    r.flush();
    assert_eq!(r.transport.sent_to(&p), 0);

    let status = r.controller.status();
    assert_eq!(status.remotes, vec![p.ip]);
    assert!(!status.peers[0].active);

    assert!(r.controller.activate_remote(&p));
    r.controller.set_state("call");
    r.flush();
    assert_eq!(r.transport.sent_to(&p), 1);
}

#[test]
fn duplicate_add_keeps_one_entry() {
    let r = rig();
    let p = peer("10.0.0.11");
    r.controller.add_or_update_remote(p);
    r.controller.add_or_update_remote(p);
    r.controller.add_or_update_remote(peer("10.0.0.11:9002"));
    assert_eq!(r.controller.remotes().len(), 2);

    r.controller.set_state("call");
    r.flush();
    assert_eq!(r.transport.sent_to(&p), 1);
}

#[test]
fn deleted_peer_is_forgotten() {
    let r = rig();
    let p = peer("10.0.0.12");
    r.controller.add_or_update_remote(p);
    assert!(r.controller.delete_remote(&p));
    assert!(!r.controller.delete_remote(&p));
    assert!(!r.controller.deactivate_remote(&p));

    r.controller.set_state("call");
    r.flush();
    assert!(r.transport.requests().is_empty());
    assert!(r.controller.status().remotes.is_empty());
}

#[test]
fn expired_peer_is_swept() {
    let mut config = test_config();
    config.peer_expiry_secs = 1;
    let r = rig_with(&config);
    r.controller.add_or_update_remote(peer("10.0.0.13"));
    assert_eq!(r.controller.sweep_expired_remotes(), 0);

    std::thread::sleep(Duration::from_millis(1100));
    r.controller.set_state("call");
    r.flush();
    assert!(r.transport.requests().is_empty());
    assert!(r.controller.remotes().is_empty());
}

#[test]
fn notification_reply_lists_remotes() {
    let r = rig();
    r.controller.add_or_update_remote(peer("10.0.0.14"));
    r.controller.add_or_update_remote(peer("10.0.0.15:7000"));
    r.controller.set_state("coffee");

    let json = r.controller.notification().to_json().unwrap();
    assert_eq!(
        json,
        "{\"state\":\"coffee\",\"remotes\":[\"10.0.0.14\",\"10.0.0.15\"]}"
    );
}
