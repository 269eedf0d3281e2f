//! Shared looping byte ring
//!
//! Backs both host backends. The writer side locks byte ranges through
//! `lock()`; the reader side (an audio callback, or a test) advances the play
//! cursor, wrapping at the end and replaying whatever the ring holds.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, TryLockError};

use tracing::warn;

use super::{Cursors, LockedRegion};
use crate::error::SinkError;
use crate::format::SampleDepth;

pub(crate) struct LoopingRing {
    data: Mutex<Box<[u8]>>,
    size: usize,
    /// Read position, always < size
    play: AtomicUsize,
    /// Bytes consumed by the most recent read, the region "in flight"
    chunk: AtomicUsize,
}

impl LoopingRing {
    pub fn new(size: usize) -> Self {
        Self {
            data: Mutex::new(vec![0u8; size].into_boxed_slice()),
            size,
            play: AtomicUsize::new(0),
            chunk: AtomicUsize::new(0),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cursors(&self) -> Cursors {
        let play = self.play.load(Ordering::Acquire);
        let chunk = self.chunk.load(Ordering::Relaxed);
        Cursors {
            play,
            write: (play + chunk) % self.size,
        }
    }

    pub fn set_play(&self, position: usize) {
        self.play.store(position % self.size, Ordering::Release);
    }

    /// Move the play cursor forward without decoding anything
    pub fn advance(&self, bytes: usize) {
        let play = self.play.load(Ordering::Acquire);
        self.chunk.store(bytes.min(self.size), Ordering::Relaxed);
        self.play.store((play + bytes) % self.size, Ordering::Release);
    }

    /// Copy of the ring contents
    pub fn snapshot(&self) -> Vec<u8> {
        self.data().to_vec()
    }

    pub fn lock(&self, offset: usize, len: usize) -> Result<RingRegion<'_>, SinkError> {
        if offset >= self.size || len > self.size {
            return Err(SinkError::LockFailed(format!(
                "range {}+{} outside {} byte buffer",
                offset, len, self.size
            )));
        }
        Ok(RingRegion {
            guard: self.data(),
            offset,
            len,
        })
    }

    /// Decode samples from the play cursor into `out`, advancing the cursor
    ///
    /// Called from the device callback, so it never blocks: if the writer
    /// holds a locked region, `out` is filled with silence, the play cursor
    /// stays put and false is returned. The ring size is a multiple of the
    /// block alignment, so a sample never straddles the wrap point.
    pub fn pull<T>(&self, out: &mut [T], depth: SampleDepth, convert: impl Fn(f32) -> T) -> bool {
        let data = match self.data.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
            Err(TryLockError::WouldBlock) => {
                out.fill_with(|| convert(0.0));
                return false;
            }
        };

        let step = depth.bytes();
        let mut pos = self.play.load(Ordering::Acquire);
        for sample in out.iter_mut() {
            *sample = convert(depth.decode(&data[pos..pos + step]));
            pos = (pos + step) % self.size;
        }
        drop(data);

        self.chunk
            .store((out.len() * step).min(self.size), Ordering::Relaxed);
        self.play.store(pos, Ordering::Release);
        true
    }

    fn data(&self) -> MutexGuard<'_, Box<[u8]>> {
        self.data.lock().unwrap_or_else(|e| {
            warn!("Audio ring mutex poisoned; continuing");
            e.into_inner()
        })
    }
}

/// Locked range of a `LoopingRing`, held until dropped
pub struct RingRegion<'a> {
    guard: MutexGuard<'a, Box<[u8]>>,
    offset: usize,
    len: usize,
}

impl LockedRegion for RingRegion<'_> {
    fn spans(&mut self) -> (&mut [u8], &mut [u8]) {
        let first_len = self.len.min(self.guard.len() - self.offset);
        let second_len = self.len - first_len;
        let (head, tail) = self.guard.split_at_mut(self.offset);
        (&mut tail[..first_len], &mut head[..second_len])
    }
}
