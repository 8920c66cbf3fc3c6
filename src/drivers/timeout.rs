//! One-shot deferred action with cancellation.
//!
//! At most one action is outstanding: arming cancels the previous one.
//! Cancelling only raises the flag and never joins, so it is safe to call
//! from inside the action itself (the bell timeout fires a transition whose
//! exit hook cancels the very timer that fired it).
//!
//! The flag closes most races; an action that already passed its check
//! when cancelled still runs, so actions must re-validate under their own
//! lock.  Each arming gets an id for that purpose.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use log::debug;

use super::task::{CancelToken, lock, spawn_named};
use crate::error::Result;

struct Pending {
    id: u64,
    token: CancelToken,
    fired: Arc<AtomicBool>,
}

pub struct DeferredAction {
    name: &'static str,
    pending: Mutex<Option<Pending>>,
    next_id: AtomicU64,
}

impl DeferredAction {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            pending: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Run `action(id)` after `delay` unless cancelled first.  Replaces any
    /// outstanding action.  Returns the arming id.
    pub fn arm(
        &self,
        delay: Duration,
        action: impl FnOnce(u64) + Send + 'static,
    ) -> Result<u64> {
        let mut slot = lock(&self.pending);
        if let Some(old) = slot.take() {
            old.token.cancel();
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancelToken::new();
        let fired = Arc::new(AtomicBool::new(false));
        let (t, f) = (token.clone(), Arc::clone(&fired));
        let name = self.name;

        spawn_named(self.name, move || {
            if t.sleep(delay) {
                f.store(true, Ordering::Release);
                debug!("'{}' #{} fired", name, id);
                action(id);
            }
        })?;

        *slot = Some(Pending { id, token, fired });
        debug!("'{}' #{} armed for {:?}", self.name, id, delay);
        Ok(id)
    }

    /// Cancel the outstanding action.  Returns `true` if one was pending.
    /// Idempotent.
    pub fn cancel(&self) -> bool {
        let Some(p) = lock(&self.pending).take() else {
            return false;
        };
        p.token.cancel();
        let was_pending = !p.fired.load(Ordering::Acquire);
        if was_pending {
            debug!("'{}' #{} canceled", self.name, p.id);
        }
        was_pending
    }

    /// Id of the action still waiting to fire, if any.
    pub fn pending_id(&self) -> Option<u64> {
        lock(&self.pending)
            .as_ref()
            .filter(|p| !p.token.is_canceled() && !p.fired.load(Ordering::Acquire))
            .map(|p| p.id)
    }

    pub fn is_pending(&self) -> bool {
        self.pending_id().is_some()
    }
}

impl Drop for DeferredAction {
    fn drop(&mut self) {
        self.cancel();
    }
}
