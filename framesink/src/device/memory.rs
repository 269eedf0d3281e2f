//! In-process looping buffer with a manually driven play cursor
//!
//! Nothing plays the bytes. The play cursor moves only when told to, through
//! a [`MemoryProbe`] or a fixed step applied on every position query, which
//! makes the writer's timing fully deterministic. Faults can be injected at
//! each device call.

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

use super::ring::{LoopingRing, RingRegion};
use super::{AudioBackend, AudioDevice, Cursors, HardwareBuffer, LockedRegion};
use crate::error::SinkError;
use crate::format::AudioFormat;

/// Device calls that should fail
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryFaults {
    /// `AudioBackend::open` fails with `DeviceUnavailable`
    pub open: bool,
    /// `AudioDevice::create_buffer` fails with `FormatRejected`
    pub format: bool,
    /// `HardwareBuffer::play_looping` fails with `DeviceUnavailable`
    pub play: bool,
    /// `HardwareBuffer::position` fails with `PositionQueryFailed`
    pub position: bool,
    /// `HardwareBuffer::lock` fails with `LockFailed`
    pub lock: bool,
    /// `HardwareBuffer::unlock` fails with `LockFailed`
    pub unlock: bool,
}

/// One committed write, split the way the ring stored it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub first: Range<usize>,
    pub second: Range<usize>,
}

impl Commit {
    pub fn len(&self) -> usize {
        self.first.len() + self.second.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
struct ProbeState {
    ring: Mutex<Option<Arc<LoopingRing>>>,
    faults: Mutex<MemoryFaults>,
    commits: Mutex<Vec<Commit>>,
    /// Bytes the play cursor advances on every position query
    playback_step: AtomicUsize,
    opened: AtomicUsize,
    live_buffers: AtomicUsize,
}

/// Observer and remote control for a [`MemoryBackend`]
///
/// Cloned handles share state, so a test can keep one after moving the
/// backend into a sink.
#[derive(Clone, Default)]
pub struct MemoryProbe {
    state: Arc<ProbeState>,
}

impl MemoryProbe {
    /// Contents of the current buffer, if one exists
    pub fn ring_bytes(&self) -> Option<Vec<u8>> {
        self.ring().map(|ring| ring.snapshot())
    }

    /// Overwrite the current buffer's contents from offset 0
    pub fn fill_ring(&self, byte: u8) {
        let Some(ring) = self.ring() else {
            return;
        };
        if let Ok(mut region) = ring.lock(0, ring.size()) {
            let (first, second) = region.spans();
            first.fill(byte);
            second.fill(byte);
        }
    }

    pub fn cursors(&self) -> Option<Cursors> {
        self.ring().map(|ring| ring.cursors())
    }

    pub fn set_play_cursor(&self, position: usize) {
        if let Some(ring) = self.ring() {
            ring.set_play(position);
        }
    }

    pub fn advance_play_cursor(&self, bytes: usize) {
        if let Some(ring) = self.ring() {
            ring.advance(bytes);
        }
    }

    /// Simulate playback: advance the play cursor by `bytes` per query
    pub fn set_playback_step(&self, bytes: usize) {
        self.state.playback_step.store(bytes, Ordering::Relaxed);
    }

    pub fn set_faults(&self, faults: MemoryFaults) {
        *lock(&self.state.faults) = faults;
    }

    pub fn faults(&self) -> MemoryFaults {
        *lock(&self.state.faults)
    }

    /// Every committed write so far
    pub fn commits(&self) -> Vec<Commit> {
        lock(&self.state.commits).clone()
    }

    pub fn clear_commits(&self) {
        lock(&self.state.commits).clear();
    }

    /// Total bytes committed into the ring
    pub fn bytes_committed(&self) -> usize {
        lock(&self.state.commits).iter().map(Commit::len).sum()
    }

    /// Number of successful device opens
    pub fn opened(&self) -> usize {
        self.state.opened.load(Ordering::Relaxed)
    }

    /// Buffers created and not yet dropped
    pub fn live_buffers(&self) -> usize {
        self.state.live_buffers.load(Ordering::Relaxed)
    }

    fn ring(&self) -> Option<Arc<LoopingRing>> {
        lock(&self.state.ring).clone()
    }
}

/// In-memory host backend for tests and headless runs
#[derive(Default)]
pub struct MemoryBackend {
    probe: MemoryProbe,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose play cursor advances `bytes` per position query
    pub fn with_playback_step(bytes: usize) -> Self {
        let backend = Self::new();
        backend.probe.set_playback_step(bytes);
        backend
    }

    pub fn probe(&self) -> MemoryProbe {
        self.probe.clone()
    }
}

impl AudioBackend for MemoryBackend {
    type Device = MemoryDevice;

    fn open(&mut self) -> Result<MemoryDevice, SinkError> {
        if self.probe.faults().open {
            return Err(SinkError::DeviceUnavailable(
                "memory device disabled".to_string(),
            ));
        }
        self.probe.state.opened.fetch_add(1, Ordering::Relaxed);
        Ok(MemoryDevice {
            probe: self.probe.clone(),
        })
    }
}

pub struct MemoryDevice {
    probe: MemoryProbe,
}

impl AudioDevice for MemoryDevice {
    type Buffer = MemoryBuffer;

    fn create_buffer(
        &mut self,
        format: &AudioFormat,
        size_bytes: usize,
    ) -> Result<MemoryBuffer, SinkError> {
        if self.probe.faults().format {
            return Err(SinkError::FormatRejected(format!(
                "{}Hz {}-bit x{} not accepted",
                format.sample_rate,
                format.bits_per_sample(),
                format.channels
            )));
        }
        if size_bytes == 0 || size_bytes % format.block_align().max(1) != 0 {
            return Err(SinkError::FormatRejected(format!(
                "buffer size {} is not a whole number of {} byte blocks",
                size_bytes,
                format.block_align()
            )));
        }

        let ring = Arc::new(LoopingRing::new(size_bytes));
        *lock(&self.probe.state.ring) = Some(ring.clone());
        self.probe.state.live_buffers.fetch_add(1, Ordering::Relaxed);

        Ok(MemoryBuffer {
            ring,
            probe: self.probe.clone(),
        })
    }
}

pub struct MemoryBuffer {
    ring: Arc<LoopingRing>,
    probe: MemoryProbe,
}

impl HardwareBuffer for MemoryBuffer {
    type Region<'a> = RingRegion<'a>;

    fn size_bytes(&self) -> usize {
        self.ring.size()
    }

    fn play_looping(&mut self) -> Result<(), SinkError> {
        if self.probe.faults().play {
            return Err(SinkError::DeviceUnavailable(
                "memory buffer refused to play".to_string(),
            ));
        }
        Ok(())
    }

    fn position(&mut self) -> Result<Cursors, SinkError> {
        if self.probe.faults().position {
            return Err(SinkError::PositionQueryFailed(
                "injected position fault".to_string(),
            ));
        }
        let step = self.probe.state.playback_step.load(Ordering::Relaxed);
        if step > 0 {
            self.ring.advance(step);
        }
        Ok(self.ring.cursors())
    }

    fn lock(&mut self, offset: usize, len: usize) -> Result<RingRegion<'_>, SinkError> {
        if self.probe.faults().lock {
            return Err(SinkError::LockFailed("injected lock fault".to_string()));
        }
        self.ring.lock(offset, len)
    }

    fn unlock(&mut self, offset: usize, written: usize) -> Result<(), SinkError> {
        if self.probe.faults().unlock {
            return Err(SinkError::LockFailed("injected commit fault".to_string()));
        }
        let size = self.ring.size();
        let first_len = written.min(size - offset);
        let commit = Commit {
            first: offset..offset + first_len,
            second: 0..written - first_len,
        };
        lock(&self.probe.state.commits).push(commit);
        Ok(())
    }
}

impl Drop for MemoryBuffer {
    fn drop(&mut self) {
        self.probe
            .state
            .live_buffers
            .fetch_sub(1, Ordering::Relaxed);
        let mut current = lock(&self.probe.state.ring);
        if current
            .as_ref()
            .is_some_and(|ring| Arc::ptr_eq(ring, &self.ring))
        {
            *current = None;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| {
        warn!("Memory device mutex poisoned; continuing");
        e.into_inner()
    })
}
