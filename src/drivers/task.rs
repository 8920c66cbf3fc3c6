//! Supervised background tasks.
//!
//! Every looping piece of work (LED animation, buzzer sequence, debounce
//! check, bell timeout) runs on its own named thread.  A
//! [`CancellableTask`] owns at most one live generation of its work
//! function; replacing it always cancels and joins the previous generation
//! first, so two generations never drive the same output.
//!
//! Cancellation is cooperative: work functions poll [`CancelToken`] or
//! sleep through [`CancelToken::sleep`], which wakes at least every
//! [`CANCEL_POLL`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error};

use crate::error::{Error, Result};

/// Longest uninterrupted sleep inside a cancellable wait.
pub const CANCEL_POLL: Duration = Duration::from_millis(10);

/// Stack size for background tasks (bytes).
const TASK_STACK_BYTES: usize = 64 * 1024;

/// Lock a mutex, recovering the data if a previous holder panicked.
pub fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Spawn a named background thread.
pub fn spawn_named(
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> Result<JoinHandle<()>> {
    debug!("spawning '{}' (stack={}KB)", name, TASK_STACK_BYTES / 1024);
    thread::Builder::new()
        .name(name.into())
        .stack_size(TASK_STACK_BYTES)
        .spawn(f)
        .map_err(|e| {
            error!("could not spawn '{}': {}", name, e);
            Error::TaskSpawn(name)
        })
}

// ---------------------------------------------------------------------------
// Cancel token
// ---------------------------------------------------------------------------

/// Shared cancellation flag of one task generation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Sleep for `duration` in slices of at most [`CANCEL_POLL`].
    /// Returns `false` as soon as cancellation is observed.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_canceled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(CANCEL_POLL));
        }
    }
}

// ---------------------------------------------------------------------------
// Cancellable task
// ---------------------------------------------------------------------------

type WorkFn<A> = dyn Fn(A, &CancelToken) + Send + Sync;

struct Generation {
    token: CancelToken,
    handle: JoinHandle<()>,
}

/// One supervised kind of background work with replaceable arguments.
pub struct CancellableTask<A> {
    name: &'static str,
    work: Arc<WorkFn<A>>,
    join_timeout: Duration,
    current: Mutex<Option<Generation>>,
    starts: AtomicU64,
}

impl<A: Send + 'static> CancellableTask<A> {
    pub fn new(
        name: &'static str,
        join_timeout: Duration,
        work: impl Fn(A, &CancelToken) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            work: Arc::new(work),
            join_timeout,
            current: Mutex::new(None),
            starts: AtomicU64::new(0),
        }
    }

    /// Start a generation with `args`, first cancelling and joining any
    /// previous one.  If the previous generation does not stop within the
    /// join timeout, the replacement is not started.
    pub fn start(&self, args: A) -> Result<()> {
        let mut slot = lock(&self.current);
        Self::stop_locked(self.name, self.join_timeout, &mut slot)?;
        *slot = Some(self.spawn(args)?);
        Ok(())
    }

    /// Same as [`start`](Self::start); the name used at call sites that
    /// replace a running generation.
    pub fn restart(&self, args: A) -> Result<()> {
        self.start(args)
    }

    /// Start only if no generation is currently executing.
    /// Returns `Ok(false)` when one is.
    pub fn start_if_idle(&self, args: A) -> Result<bool> {
        let mut slot = lock(&self.current);
        if slot.as_ref().is_some_and(|g| !g.handle.is_finished()) {
            return Ok(false);
        }
        Self::stop_locked(self.name, self.join_timeout, &mut slot)?;
        *slot = Some(self.spawn(args)?);
        Ok(true)
    }

    /// Request cancellation and wait for the work function to return.
    pub fn cancel_and_join(&self) -> Result<()> {
        let mut slot = lock(&self.current);
        Self::stop_locked(self.name, self.join_timeout, &mut slot)
    }

    /// Whether the current generation's work function is still executing.
    pub fn is_running(&self) -> bool {
        lock(&self.current)
            .as_ref()
            .is_some_and(|g| !g.handle.is_finished())
    }

    /// Whether cancellation was requested for the current generation.
    pub fn is_canceled(&self) -> bool {
        lock(&self.current)
            .as_ref()
            .is_some_and(|g| g.token.is_canceled())
    }

    /// Number of generations started so far.
    pub fn starts(&self) -> u64 {
        self.starts.load(Ordering::Relaxed)
    }

    fn spawn(&self, args: A) -> Result<Generation> {
        let token = CancelToken::new();
        let work = Arc::clone(&self.work);
        let worker_token = token.clone();
        let handle = spawn_named(self.name, move || work(args, &worker_token))?;
        self.starts.fetch_add(1, Ordering::Relaxed);
        Ok(Generation { token, handle })
    }

    fn stop_locked(
        name: &'static str,
        join_timeout: Duration,
        slot: &mut Option<Generation>,
    ) -> Result<()> {
        let Some(generation) = slot.take() else {
            return Ok(());
        };
        generation.token.cancel();

        // A work function replacing its own task cannot join itself.
        if generation.handle.thread().id() == thread::current().id() {
            debug!("'{}' canceled from its own thread", name);
            return Ok(());
        }

        let deadline = Instant::now() + join_timeout;
        while !generation.handle.is_finished() {
            if Instant::now() >= deadline {
                error!(
                    "task '{}' still running {:?} after cancel; replacement not started",
                    name, join_timeout
                );
                *slot = Some(generation);
                return Err(Error::TaskStuck(name));
            }
            thread::sleep(Duration::from_millis(1));
        }
        if generation.handle.join().is_err() {
            error!("task '{}' panicked", name);
        }
        Ok(())
    }
}

impl<A> Drop for CancellableTask<A> {
    fn drop(&mut self) {
        if let Some(generation) = lock(&self.current).take() {
            generation.token.cancel();
        }
    }
}
