//! Bounded waiting on asynchronous platform calls.
//!
//! Platform calls complete on the platform's own callback mechanism, which the
//! calling thread has to keep servicing while it waits. `Waiter` polls a
//! one-shot channel and hands the `EventPump` a short slice between polls until
//! the signal arrives or the deadline passes. There is no cancellation: on
//! timeout the platform call may still be running, and its late result is
//! dropped with the channel.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Duration, Instant};

use crate::platform::{Completion, EventPump, PlatformError};

/// Default time handed to the event pump between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Upper bound on any single wait.
pub const MAX_WAIT: Duration = Duration::from_secs(3600);

/// Reported when a platform call discards its completion unused.
pub const COMPLETION_DROPPED: &str = "The platform dropped the completion without a result";

enum Unsignalled {
    TimedOut,
    Dropped,
}

/// A point in time plus the budget it was derived from, for reporting.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// Budgets above `MAX_WAIT` are capped.
    pub fn after(budget: Duration) -> Self {
        let budget = budget.min(MAX_WAIT);
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    pub fn instant(&self) -> Instant {
        self.at
    }

    /// The full wait this deadline allowed, in seconds.
    pub fn budget_secs(&self) -> f64 {
        self.budget.as_secs_f64()
    }
}

/// Blocks the calling thread on a one-shot signal while servicing an `EventPump`.
pub struct Waiter<'a> {
    pump: &'a dyn EventPump,
    slice: Duration,
}

impl<'a> Waiter<'a> {
    pub fn new(pump: &'a dyn EventPump, slice: Duration) -> Self {
        Self { pump, slice }
    }

    /// Waits up to `timeout` for `signal`.
    ///
    /// Returns `Some(value)` if the signal arrived in time, `None` otherwise.
    pub fn await_signal<T>(&self, signal: &Receiver<T>, timeout: Duration) -> Option<T> {
        self.await_until(signal, Instant::now() + timeout.min(MAX_WAIT))
    }

    /// Waits until `deadline` for `signal`.
    ///
    /// A sender dropped without signalling can never signal, so that case
    /// returns `None` without waiting out the deadline.
    pub fn await_until<T>(&self, signal: &Receiver<T>, deadline: Instant) -> Option<T> {
        self.wait(signal, deadline).ok()
    }

    fn wait<T>(&self, signal: &Receiver<T>, deadline: Instant) -> Result<T, Unsignalled> {
        let started = Instant::now();
        loop {
            match signal.try_recv() {
                Ok(value) => {
                    log::debug!("waiter: signalled after {:?}", started.elapsed());
                    return Ok(value);
                }
                Err(TryRecvError::Disconnected) => {
                    log::warn!("waiter: completion dropped without signalling");
                    return Err(Unsignalled::Dropped);
                }
                Err(TryRecvError::Empty) => {}
            }

            let now = Instant::now();
            if now >= deadline {
                log::debug!("waiter: timed out after {:?}", started.elapsed());
                return Err(Unsignalled::TimedOut);
            }
            self.pump.pump(self.slice.min(deadline - now));
        }
    }

    /// Starts an asynchronous platform call and waits for its completion.
    ///
    /// `start` receives the `Completion` to hand to the platform. Returns
    /// `None` if the completion did not fire before `deadline`. A completion
    /// the platform drops without calling becomes a `PlatformError`.
    pub fn call<T, F>(&self, deadline: Instant, start: F) -> Option<Result<T, PlatformError>>
    where
        T: Send + 'static,
        F: FnOnce(Completion<T>),
    {
        let (tx, rx) = mpsc::channel();
        start(Box::new(move |result| {
            // The receiver is gone if the waiter already gave up.
            let _ = tx.send(result);
        }));
        match self.wait(&rx, deadline) {
            Ok(result) => Some(result),
            Err(Unsignalled::Dropped) => Some(Err(PlatformError::new(COMPLETION_DROPPED))),
            Err(Unsignalled::TimedOut) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
