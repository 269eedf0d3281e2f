//! Host audio device abstraction
//!
//! Models a device that plays a fixed-size looping buffer and exposes only
//! cursor polling plus lock/unlock access to its memory:
//!
//! ```text
//! AudioBackend ──open──► AudioDevice ──create_buffer──► HardwareBuffer
//!                                                        ├─ play_looping()
//!                                                        ├─ position()  -> Cursors
//!                                                        ├─ lock()      -> LockedRegion (1-2 spans)
//!                                                        └─ unlock()    commit
//! ```
//!
//! Releasing is dropping: a buffer stops playing when dropped, a device
//! closes when dropped.

mod cpal_host;
mod memory;
mod ring;


pub use cpal_host::{CpalBackend, CpalBuffer, CpalDevice};
pub use memory::{Commit, MemoryBackend, MemoryBuffer, MemoryDevice, MemoryFaults, MemoryProbe};

use crate::error::SinkError;
use crate::format::AudioFormat;

/// Point-in-time snapshot of the device cursors, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursors {
    /// Byte currently being read by the device
    pub play: usize,
    /// First byte the device will not read imminently
    pub write: usize,
}

/// A locked range of the hardware buffer
pub trait LockedRegion {
    /// The writable spans in playback order
    ///
    /// The second span is empty unless the range wraps past the end of the
    /// ring, in which case it starts at offset 0.
    fn spans(&mut self) -> (&mut [u8], &mut [u8]);
}

/// A fixed-size looping playback buffer owned by a device
pub trait HardwareBuffer {
    type Region<'a>: LockedRegion
    where
        Self: 'a;

    /// Buffer size in bytes
    fn size_bytes(&self) -> usize;

    /// Start looping playback from the current play cursor
    fn play_looping(&mut self) -> Result<(), SinkError>;

    /// Query the play and write cursors
    fn position(&mut self) -> Result<Cursors, SinkError>;

    /// Lock `len` bytes starting at `offset` for writing
    fn lock(&mut self, offset: usize, len: usize) -> Result<Self::Region<'_>, SinkError>;

    /// Commit `written` bytes of a region previously locked at `offset`
    fn unlock(&mut self, offset: usize, written: usize) -> Result<(), SinkError>;
}

/// An opened output device
pub trait AudioDevice {
    type Buffer: HardwareBuffer;

    /// Create a looping buffer of `size_bytes` playing PCM in `format`
    fn create_buffer(
        &mut self,
        format: &AudioFormat,
        size_bytes: usize,
    ) -> Result<Self::Buffer, SinkError>;
}

/// Entry point to a host audio system
pub trait AudioBackend {
    type Device: AudioDevice;

    /// Open the output device with priority control over its format
    fn open(&mut self) -> Result<Self::Device, SinkError>;
}
