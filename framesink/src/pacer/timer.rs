//! Periodic timer thread
//!
//! Calls a tick callback at a fixed interval from a dedicated thread.
//! Deadlines are absolute (`next += interval`) so ticks do not drift; if
//! the thread falls more than a tick behind it re-bases on the current time
//! instead of firing a burst of catch-up ticks.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::error::SinkError;

#[derive(Default)]
struct CancelSignal {
    cancelled: Mutex<bool>,
    cvar: Condvar,
}

impl CancelSignal {
    fn flag(&self) -> MutexGuard<'_, bool> {
        self.cancelled.lock().unwrap_or_else(|e| {
            warn!("Frame timer mutex poisoned; continuing");
            e.into_inner()
        })
    }
}

/// Handle to an armed periodic timer
///
/// Dropping the handle cancels the timer and joins its thread.
pub struct PeriodicTimer {
    interval: Duration,
    cancel: Arc<CancelSignal>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTimer {
    /// Start calling `on_tick` every `interval`
    ///
    /// `on_tick` runs on the timer thread and should do no more than post a
    /// notification. Intervals below 1ms are raised to 1ms.
    pub fn arm<F>(interval: Duration, on_tick: F) -> Result<Self, SinkError>
    where
        F: Fn() + Send + 'static,
    {
        let interval = interval.max(Duration::from_millis(1));
        let cancel = Arc::new(CancelSignal::default());
        let thread_cancel = cancel.clone();

        let handle = thread::Builder::new()
            .name("frame-timer".into())
            .spawn(move || run(interval, &thread_cancel, on_tick))?;

        debug!("Frame timer armed at {:?}", interval);

        Ok(Self {
            interval,
            cancel,
            handle: Some(handle),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        *self.cancel.flag() = true;
        self.cancel.cvar.notify_all();

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        trace!("Frame timer cancelled");
    }
}

fn run(interval: Duration, cancel: &CancelSignal, on_tick: impl Fn()) {
    let mut next = Instant::now() + interval;
    let mut cancelled = cancel.flag();

    while !*cancelled {
        let now = Instant::now();
        if now >= next {
            on_tick();
            next += interval;
            if next <= now {
                next = now + interval;
            }
            continue;
        }

        let (guard, _) = cancel
            .cvar
            .wait_timeout(cancelled, next - now)
            .unwrap_or_else(|e| {
                warn!("Frame timer mutex poisoned; continuing");
                e.into_inner()
            });
        cancelled = guard;
    }
}
