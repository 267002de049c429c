//! Long-duration timer built from capped primitive sleeps
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! A single primitive sleep is capped at `MAX_PRIMITIVE_MS` (about 24.8
//! days). Longer delays are split into chained sleeps; the callback runs only
//! after the last one. Firing is "no earlier than" the delay, with drift
//! bounded by the jitter of each chained sleep.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Largest delay armed as one primitive sleep, 2^31 - 1 milliseconds
pub const MAX_PRIMITIVE_MS: i64 = (1 << 31) - 1;

type Callback = Box<dyn FnOnce() + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    Pending,
    Fired,
    Cancelled,
}

struct Inner {
    remaining_ms: i64,
    handle: Option<JoinHandle<()>>,
    callback: Option<Callback>,
    state: TimerState,
}

/// One-shot timer for arbitrarily long delays
///
/// Positive delays must be created inside a tokio runtime. Dropping the
/// handle does not cancel the timer; call `clear`.
#[derive(Clone)]
pub struct LongTimer {
    inner: Arc<Mutex<Inner>>,
}

impl LongTimer {
    /// Run `callback` once `delay_ms` milliseconds have passed
    ///
    /// A delay of zero or less runs the callback before returning.
    pub fn new<F>(callback: F, delay_ms: i64) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        if delay_ms <= 0 {
            callback();
            return Self::with_inner(Inner {
                remaining_ms: 0,
                handle: None,
                callback: None,
                state: TimerState::Fired,
            });
        }

        let timer = Self::with_inner(Inner {
            remaining_ms: delay_ms,
            handle: None,
            callback: Some(Box::new(callback)),
            state: TimerState::Pending,
        });
        {
            let mut inner = timer.lock();
            timer.arm(&mut inner);
        }
        timer
    }

    fn with_inner(inner: Inner) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Cancel the timer; later calls and calls after firing do nothing
    pub fn clear(&self) {
        let mut inner = self.lock();
        if inner.state != TimerState::Pending {
            return;
        }
        inner.state = TimerState::Cancelled;
        inner.callback = None;
        if let Some(handle) = inner.handle.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.lock().state == TimerState::Pending
    }

    /// Delay still to be armed, counting the current sleep in full
    pub fn remaining_ms(&self) -> i64 {
        let inner = self.lock();
        match inner.state {
            TimerState::Pending => inner.remaining_ms,
            _ => 0,
        }
    }

    /// Spawn the next primitive sleep; caller holds the lock
    fn arm(&self, inner: &mut Inner) {
        let step = inner.remaining_ms.min(MAX_PRIMITIVE_MS);
        let timer = self.clone();
        inner.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(step as u64)).await;
            timer.elapsed(step);
        }));
    }

    fn elapsed(&self, step: i64) {
        let mut inner = self.lock();
        if inner.state != TimerState::Pending {
            return;
        }

        inner.remaining_ms -= step;
        if inner.remaining_ms > 0 {
            log::debug!("Long timer re-armed, {}ms remaining", inner.remaining_ms);
            self.arm(&mut inner);
            return;
        }

        inner.state = TimerState::Fired;
        inner.handle = None;
        let callback = inner.callback.take();
        drop(inner);

        if let Some(callback) = callback {
            callback();
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
