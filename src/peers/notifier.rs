//! Fire-and-forget fan-out of state notifications.
//!
//! The control path hands a snapshot of targets to the `peer-notify`
//! worker and returns immediately.  The worker delivers each batch
//! sequentially through the [`PeerTransport`] port, bounded by the
//! transport's timeout, and books the outcome on the registry.  A failed
//! peer is counted and logged; the rest of the batch still goes out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use super::wire::{Notification, encode_request};
use super::{PeerAddr, PeerRegistry};
use crate::app::events::StatusEvent;
use crate::app::ports::{EventSink, PeerTransport};
use crate::drivers::task::{lock, spawn_named};
use crate::error::Result;

struct Batch {
    notification: Notification,
    targets: Vec<PeerAddr>,
}

pub struct PeerNotifier {
    tx: Option<Sender<Batch>>,
    worker: Option<JoinHandle<()>>,
    in_flight: Arc<AtomicUsize>,
}

impl PeerNotifier {
    pub fn start(
        transport: Arc<dyn PeerTransport>,
        registry: Arc<Mutex<PeerRegistry>>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let pending = Arc::clone(&in_flight);
        let worker = spawn_named("peer-notify", move || {
            run(&rx, transport.as_ref(), &registry, sink.as_ref(), &pending);
        })?;
        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
            in_flight,
        })
    }

    /// Queue `notification` for every address in `targets`.
    pub fn notify_all(&self, notification: Notification, targets: Vec<PeerAddr>) {
        if targets.is_empty() {
            return;
        }
        let Some(tx) = &self.tx else {
            warn!("notifier stopped; dropping update for {} peers", targets.len());
            return;
        };
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        if tx.send(Batch { notification, targets }).is_err() {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            error!("notifier worker gone; update dropped");
        }
    }

    /// Wait until every queued batch is delivered.  Returns `false` on
    /// timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight.load(Ordering::Acquire) > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Stop accepting batches, deliver what is queued, join the worker.
    pub fn shutdown(&mut self) {
        drop(self.tx.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("notifier worker panicked");
            }
        }
    }
}

impl Drop for PeerNotifier {
    fn drop(&mut self) {
        drop(self.tx.take());
    }
}

fn run(
    rx: &Receiver<Batch>,
    transport: &dyn PeerTransport,
    registry: &Mutex<PeerRegistry>,
    sink: &dyn EventSink,
    in_flight: &AtomicUsize,
) {
    while let Ok(batch) = rx.recv() {
        deliver(&batch, transport, registry, sink);
        in_flight.fetch_sub(1, Ordering::AcqRel);
    }
    debug!("notifier worker exiting");
}

fn deliver(
    batch: &Batch,
    transport: &dyn PeerTransport,
    registry: &Mutex<PeerRegistry>,
    sink: &dyn EventSink,
) {
    let body = match batch.notification.to_json() {
        Ok(body) => body,
        Err(e) => {
            error!("could not encode notification: {}", e);
            return;
        }
    };
    let state = batch.notification.state;

    for peer in &batch.targets {
        let outcome = transport.send(peer, &encode_request(peer, &body));
        lock(registry).record_send(peer, outcome);
        match outcome {
            Ok(()) => {
                info!("state update sent to {}", peer);
                sink.emit(&StatusEvent::PeerNotified { peer: *peer, state });
            }
            Err(e) => {
                error!("could not send status update to {} ({})", peer, e);
                sink.emit(&StatusEvent::PeerSendFailed { peer: *peer, error: e });
            }
        }
    }
}
