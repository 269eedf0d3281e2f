//! Auto-reset wake event
//!
//! A single-slot flag plus condition variable. `signal` sets the flag and
//! wakes one waiter; a successful wait consumes the flag. Signals that land
//! while nobody waits collapse into one.

use std::sync::{Condvar, Mutex, MutexGuard};
#[cfg(test)]
use std::time::{Duration, Instant};

use tracing::warn;

#[derive(Debug, Default)]
pub struct WakeEvent {
    signaled: Mutex<bool>,
    cvar: Condvar,
}

impl WakeEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the event and wake a waiter
    ///
    /// Holds the lock only long enough to set the flag; safe to call from
    /// a timer thread.
    pub fn signal(&self) {
        *self.flag() = true;
        self.cvar.notify_one();
    }

    /// Block until signaled, then reset
    pub fn wait(&self) {
        let mut signaled = self.flag();
        while !*signaled {
            signaled = self.cvar.wait(signaled).unwrap_or_else(|e| {
                warn!("Wake event mutex poisoned; continuing");
                e.into_inner()
            });
        }
        *signaled = false;
    }

    /// Block until signaled or `timeout` passes
    ///
    /// Returns true if the event was consumed.
    #[cfg(test)]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut signaled = self.flag();
        while !*signaled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .cvar
                .wait_timeout(signaled, deadline - now)
                .unwrap_or_else(|e| {
                    warn!("Wake event mutex poisoned; continuing");
                    e.into_inner()
                });
            signaled = guard;
        }
        *signaled = false;
        true
    }

    fn flag(&self) -> MutexGuard<'_, bool> {
        self.signaled.lock().unwrap_or_else(|e| {
            warn!("Wake event mutex poisoned; continuing");
            e.into_inner()
        })
    }
}
