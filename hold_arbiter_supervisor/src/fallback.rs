//! Degraded single-shot timer for platforms without durable scheduling.
//!
//! Not durable: a suspended or killed process loses the timer. Completion is
//! best-effort only.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const ARMED: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Stateless factory; all per-timer state lives in the returned handle.
#[derive(Clone, Copy, Debug, Default)]
pub struct FallbackTimer;

impl FallbackTimer {
    /// Run `callback` once after `delay` of wall-clock time on a dedicated
    /// thread. The callback is injected by the caller and owns whatever it
    /// mutates. A delay past the end of `Instant`'s range never fires; the
    /// timer stays armed until cancelled.
    pub fn after<F>(delay: Duration, callback: F) -> std::io::Result<FallbackHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        let state = Arc::new(AtomicU8::new(ARMED));
        let thread_state = Arc::clone(&state);
        let deadline = Instant::now().checked_add(delay);

        let thread = thread::Builder::new()
            .name("hold-fallback".to_string())
            .spawn(move || {
                loop {
                    if thread_state.load(Ordering::Acquire) != ARMED {
                        return false;
                    }
                    let Some(deadline) = deadline else {
                        thread::park();
                        continue;
                    };
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    thread::park_timeout(deadline - now);
                }
                if thread_state
                    .compare_exchange(ARMED, FIRED, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    return false;
                }
                tracing::debug!(delay_ms = delay.as_millis() as u64, "fallback timer fired");
                callback();
                true
            })?;

        Ok(FallbackHandle {
            state,
            thread: Some(thread),
        })
    }
}

/// Handle to an armed fallback timer. Dropping it detaches the timer; the
/// callback still fires.
#[derive(Debug)]
pub struct FallbackHandle {
    state: Arc<AtomicU8>,
    thread: Option<JoinHandle<bool>>,
}

impl FallbackHandle {
    /// Cancel before the callback runs. Returns false if it already fired.
    pub fn cancel(&self) -> bool {
        let won = self
            .state
            .compare_exchange(ARMED, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if let Some(t) = &self.thread {
            t.thread().unpark();
        }
        won
    }

    pub fn has_fired(&self) -> bool {
        self.state.load(Ordering::Acquire) == FIRED
    }

    /// Block until the timer resolves. Returns true if the callback ran.
    pub fn join(mut self) -> bool {
        match self.thread.take() {
            Some(t) => t.join().unwrap_or(false),
            None => false,
        }
    }
}
