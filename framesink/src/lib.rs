//! framesink: frame-paced PCM output for emulators
//!
//! Streams one block of PCM bytes per emulated frame into a host device's
//! looping hardware buffer, staying behind the device's play cursor, and
//! falls back to a periodic timer for frame pacing when no device is usable.
//!
//! # Architecture
//!
//! ```text
//! Emulation Thread                 Device / Timer Context
//!     │                                    │
//! [Produce frame]                          │
//!     │                                    │
//! [Sink::submit]──┬──(device)──►[position]◄──── play cursor advances
//!     │           │             [lock ─ copy ─ unlock]
//!     │           │             [sleep poll_interval, retry]
//!     │           │                        │
//!     │           └─(fallback)─►[wait]◄──────── timer tick signals event
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let mut sink = Sink::new(CpalBackend::new(), config.sink_config());
//! sink.init(true);
//!
//! loop {
//!     let frame = emulate_frame();
//!     sink.submit(&frame);
//! }
//! ```

pub mod config;
pub mod device;
mod error;
mod format;
mod metrics;
pub mod pacer;
mod sink;
mod writer;

pub use device::{AudioBackend, AudioDevice, CpalBackend, Cursors, HardwareBuffer, LockedRegion};
pub use device::{MemoryBackend, MemoryFaults, MemoryProbe};
pub use error::SinkError;
pub use format::{AudioFormat, SampleDepth};
pub use metrics::SinkMetrics;
pub use pacer::{FramePacer, frame_interval_ms};
pub use sink::{Sink, SinkConfig, SinkLifecycle};
