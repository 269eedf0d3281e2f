//! Circular buffer writer
//!
//! Tracks the sink's own write offset into the device's looping buffer and
//! fills only bytes the play cursor has already passed:
//!
//! ```text
//!   0                                                        size
//!   ├──────────────┬───────────────────────┬───────────────────┤
//!   │  free space  │  queued (not played)  │    free space     │
//!   └──────────────┴───────────────────────┴───────────────────┘
//!                  ▲ play cursor           ▲ write offset
//!
//!   space = (size + play - write_offset) % size
//! ```
//!
//! The device offers no "space available" notification, so a submit that
//! finds the ring full sleeps for the poll interval and asks again.

use std::thread;
use std::time::Duration;

use tracing::trace;

use crate::device::{HardwareBuffer, LockedRegion};
use crate::error::SinkError;
use crate::metrics::MetricsLog;


/// Write-side state of a looping device buffer
#[derive(Debug, Clone)]
pub(crate) struct RingWriter {
    /// Next byte to write, always < size
    write_offset: usize,
    size: usize,
    poll_interval: Duration,
}

impl RingWriter {
    /// A writer for a `size` byte ring, starting at offset 0
    ///
    /// `size` must be non-zero.
    pub fn new(size: usize, poll_interval: Duration) -> Self {
        Self {
            write_offset: 0,
            size: size.max(1),
            poll_interval,
        }
    }

    pub fn write_offset(&self) -> usize {
        self.write_offset
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Bytes between the write offset and the play cursor, safe to overwrite
    ///
    /// When the two coincide the ring counts as full: the device may still
    /// be reading everything ahead of the play cursor.
    pub fn space_before(&self, play_cursor: usize) -> usize {
        (self.size + play_cursor % self.size - self.write_offset) % self.size
    }

    /// Write all of `data` into the ring, waiting for the play cursor as needed
    ///
    /// A device failure abandons the rest of the block; the caller still gets
    /// `true` because the emulator must keep running regardless.
    pub(crate) fn submit<B: HardwareBuffer>(
        &mut self,
        buffer: &mut B,
        data: &[u8],
        metrics: &mut MetricsLog,
    ) -> bool {
        let mut remaining = data;

        while !remaining.is_empty() {
            let cursors = match buffer.position() {
                Ok(cursors) => cursors,
                Err(e) => {
                    trace!("Submit aborted: {}", e);
                    metrics.record_abort(remaining.len());
                    break;
                }
            };

            let space = self.space_before(cursors.play).min(remaining.len());

            if space > 0 {
                match self.write(buffer, &remaining[..space]) {
                    Ok(written) => {
                        remaining = &remaining[written..];
                        metrics.totals.bytes_written += written as u64;
                    }
                    Err(e) => {
                        trace!("Submit aborted: {}", e);
                        metrics.record_abort(remaining.len());
                        break;
                    }
                }
            } else {
                metrics.totals.poll_stalls += 1;
            }

            if remaining.is_empty() {
                break;
            }

            // Wait for the play cursor to free more space
            if !self.poll_interval.is_zero() {
                thread::sleep(self.poll_interval);
            }
        }

        true
    }

    /// Lock, copy and commit one chunk at the write offset
    ///
    /// Returns the bytes committed, which may be fewer than `data.len()` if
    /// the device hands back a shorter region.
    fn write<B: HardwareBuffer>(&mut self, buffer: &mut B, data: &[u8]) -> Result<usize, SinkError> {
        let offset = self.write_offset;

        let written = {
            let mut region = buffer.lock(offset, data.len())?;
            let (first, second) = region.spans();

            let len1 = first.len().min(data.len());
            first[..len1].copy_from_slice(&data[..len1]);

            let len2 = second.len().min(data.len() - len1);
            second[..len2].copy_from_slice(&data[len1..len1 + len2]);

            len1 + len2
        };

        buffer.unlock(offset, written)?;

        self.write_offset = (offset + written) % self.size;
        Ok(written)
    }

    /// Zero the whole ring and restart writing at the play cursor
    ///
    /// Clearing everything (not just the unplayed part) stops stale audio
    /// looping while the emulator is paused.
    pub(crate) fn silence<B: HardwareBuffer>(&mut self, buffer: &mut B) {
        let zeroed = match buffer.lock(0, self.size) {
            Ok(mut region) => {
                let (first, second) = region.spans();
                first.fill(0);
                second.fill(0);
                true
            }
            Err(e) => {
                trace!("Silence skipped: {}", e);
                false
            }
        };
        if zeroed {
            if let Err(e) = buffer.unlock(0, self.size) {
                trace!("Silence commit failed: {}", e);
            }
        }

        match buffer.position() {
            Ok(cursors) => self.write_offset = cursors.play % self.size,
            Err(e) => trace!("Write offset not resynchronized: {}", e),
        }
    }
}
