//! Fallback frame pacing
//!
//! When no audio buffer is available, playback can no longer hold the
//! emulator to real time. A periodic timer takes over: each tick signals a
//! wake event, and each submitted frame waits for the next tick.
//!
//! ```text
//! frame-timer thread              Emulation thread
//!     │                                │
//! [tick]──signal──►[WakeEvent]◄──wait──[submit]
//!     │                                │
//! [tick]──signal──►[WakeEvent]◄──wait──[submit]
//! ```

mod event;
mod timer;

#[cfg(test)]
mod tests;

pub use event::WakeEvent;
pub use timer::PeriodicTimer;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

/// Milliseconds between emulated frames at the given speed
///
/// `speed_percent` of 100 is normal speed, 200 double speed. Never less
/// than 1ms; an effective rate below 1 frame per second is treated as 1.
pub fn frame_interval_ms(frames_per_second: u32, speed_percent: u32) -> u32 {
    let effective_fps = (frames_per_second as u64 * speed_percent as u64 / 100).max(1);
    (1000 / effective_fps).max(1) as u32
}

/// Timer-driven stand-in for audio-paced emulation
pub struct FramePacer {
    event: Arc<WakeEvent>,
    timer: Option<PeriodicTimer>,
    /// Interval last requested, kept even when arming failed
    interval_ms: Option<u32>,
    arm_count: u64,
}

impl FramePacer {
    /// A pacer with no timer armed yet
    ///
    /// The timer starts on the first `wait_frame` (or `update`), once the
    /// frame rate and speed are known.
    pub fn new() -> Self {
        Self {
            event: Arc::new(WakeEvent::new()),
            timer: None,
            interval_ms: None,
            arm_count: 0,
        }
    }

    pub fn interval_ms(&self) -> Option<u32> {
        self.interval_ms
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Number of times a timer has been started
    pub fn arm_count(&self) -> u64 {
        self.arm_count
    }

    /// Re-arm the timer if the frame interval changed
    ///
    /// Returns true if a new timer was started. A failure to start one is
    /// reported once as a warning and not retried until the interval changes
    /// again.
    pub fn update(&mut self, frames_per_second: u32, speed_percent: u32) -> bool {
        let interval_ms = frame_interval_ms(frames_per_second, speed_percent);
        if self.interval_ms == Some(interval_ms) {
            return false;
        }

        // Cancel the old timer before starting its replacement
        self.timer = None;
        self.interval_ms = Some(interval_ms);

        let event = self.event.clone();
        match PeriodicTimer::arm(Duration::from_millis(interval_ms as u64), move || {
            event.signal()
        }) {
            Ok(timer) => {
                debug!(
                    "Frame pacing at {}ms ({} fps x {}%)",
                    interval_ms, frames_per_second, speed_percent
                );
                self.timer = Some(timer);
                self.arm_count += 1;
                true
            }
            Err(e) => {
                warn!("{}. Emulation speed is no longer limited.", e);
                false
            }
        }
    }

    /// Block until the next frame is due
    ///
    /// Returns false without waiting if no timer could be armed, so a broken
    /// timer never hangs the emulation thread.
    pub fn wait_frame(&mut self, frames_per_second: u32, speed_percent: u32) -> bool {
        self.update(frames_per_second, speed_percent);
        if self.timer.is_none() {
            return false;
        }
        self.event.wait();
        true
    }
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::new()
    }
}
