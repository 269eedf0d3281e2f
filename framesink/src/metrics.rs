//! Sink health counters and periodic diagnostics

use std::time::{Duration, Instant};

use tracing::debug;

const LOG_INTERVAL: Duration = Duration::from_secs(1);

/// Cumulative sink counters since construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkMetrics {
    /// Bytes passed to `submit`
    pub bytes_submitted: u64,
    /// Bytes committed into the device buffer
    pub bytes_written: u64,
    /// Bytes discarded by aborted submits
    pub bytes_dropped: u64,
    /// Polls that found no space at the play cursor
    pub poll_stalls: u64,
    /// Submits cut short by a device failure
    pub aborted_submits: u64,
    /// Frames paced by the fallback timer
    pub fallback_waits: u64,
}

impl SinkMetrics {
    fn since(&self, earlier: &Self) -> Self {
        Self {
            bytes_submitted: self.bytes_submitted - earlier.bytes_submitted,
            bytes_written: self.bytes_written - earlier.bytes_written,
            bytes_dropped: self.bytes_dropped - earlier.bytes_dropped,
            poll_stalls: self.poll_stalls - earlier.poll_stalls,
            aborted_submits: self.aborted_submits - earlier.aborted_submits,
            fallback_waits: self.fallback_waits - earlier.fallback_waits,
        }
    }
}

/// Counters plus the bookkeeping for once-per-second logging
#[derive(Debug, Clone)]
pub(crate) struct MetricsLog {
    pub totals: SinkMetrics,
    logged: SinkMetrics,
    last_log_time: Instant,
}

impl MetricsLog {
    pub fn new() -> Self {
        Self {
            totals: SinkMetrics::default(),
            logged: SinkMetrics::default(),
            last_log_time: Instant::now(),
        }
    }

    pub fn record_abort(&mut self, dropped: usize) {
        self.totals.aborted_submits += 1;
        self.totals.bytes_dropped += dropped as u64;
    }

    /// Log the last interval's activity if a second has passed
    pub fn maybe_log(&mut self) {
        if self.last_log_time.elapsed() < LOG_INTERVAL {
            return;
        }

        let delta = self.totals.since(&self.logged);
        debug!(
            "SINK METRICS: submitted={}B, written={}B, dropped={}B, stalls={}, aborts={}, timer_waits={}",
            delta.bytes_submitted,
            delta.bytes_written,
            delta.bytes_dropped,
            delta.poll_stalls,
            delta.aborted_submits,
            delta.fallback_waits
        );

        self.logged = self.totals;
        self.last_log_time = Instant::now();
    }
}
