//! Sink lifecycle controller
//!
//! Owns everything the emulation loop needs for audio output: the device,
//! its looping buffer and the writer tracking it, or, when no device could
//! be acquired, the fallback frame pacer. The two are mutually exclusive.
//!
//! Every public operation is infallible from the caller's point of view.
//! Sound is best-effort; the emulator keeps running whatever the device does.

use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::device::{AudioBackend, AudioDevice, HardwareBuffer};
use crate::error::SinkError;
use crate::format::AudioFormat;
use crate::metrics::{MetricsLog, SinkMetrics};
use crate::pacer::FramePacer;
use crate::writer::RingWriter;

#[cfg(test)]
mod tests;

/// Runtime settings for a `Sink`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkConfig {
    /// Try to open an audio device at all
    pub sound_enabled: bool,
    /// PCM format of submitted blocks, plus latency frames
    pub format: AudioFormat,
    /// Emulated frames per second at 100% speed
    pub frames_per_second: u32,
    /// Emulation speed (100 = normal)
    pub speed_percent: u32,
    /// Sleep between polls while waiting for buffer space
    pub poll_interval: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            format: AudioFormat::default(),
            frames_per_second: 50,
            speed_percent: 100,
            poll_interval: Duration::from_millis(2),
        }
    }
}

/// Which output resource the sink currently holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkLifecycle {
    /// Never initialized, or exited
    Uninitialized,
    /// Streaming into a device buffer
    ActiveWithDevice,
    /// No device; frames paced by the timer
    ActiveFallback,
    /// Releasing resources inside `exit`
    ShuttingDown,
}

type BufferOf<B> = <<B as AudioBackend>::Device as AudioDevice>::Buffer;

enum Output<B: AudioBackend> {
    Uninitialized,
    Device {
        // Field order is drop order: buffer before the device owning it
        buffer: BufferOf<B>,
        device: B::Device,
        writer: RingWriter,
    },
    Fallback(FramePacer),
    ShuttingDown,
}

/// Frame-paced audio sink
///
/// Single-threaded by construction: the emulation thread owns it and calls
/// every operation. The timer and the device run in their own contexts and
/// never touch sink state.
pub struct Sink<B: AudioBackend> {
    backend: B,
    config: SinkConfig,
    output: Output<B>,
    metrics: MetricsLog,
}

impl<B: AudioBackend> Sink<B> {
    /// Create an uninitialized sink; call `init` before submitting
    pub fn new(backend: B, config: SinkConfig) -> Self {
        Self {
            backend,
            config,
            output: Output::Uninitialized,
            metrics: MetricsLog::new(),
        }
    }

    /// (Re)initialize output
    ///
    /// Tears down any previous state, then tries to acquire a device buffer
    /// if sound is enabled. Falls back to timer pacing if that fails. Always
    /// returns true: a missing sound device is never fatal.
    pub fn init(&mut self, first_init: bool) -> bool {
        self.exit(true);
        trace!("-> Sink::init({})", if first_init { "first" } else { "" });

        let output = if !self.config.sound_enabled {
            debug!("Sound disabled, nothing to initialise");
            None
        } else {
            match self.acquire() {
                Ok(output) => Some(output),
                Err(e) => {
                    warn!("{}. Falling back to timer pacing.", e);
                    None
                }
            }
        };

        self.output = output.unwrap_or_else(|| Output::Fallback(FramePacer::new()));

        trace!("<- Sink::init()");
        true
    }

    /// Open the device, create and start its looping buffer
    fn acquire(&mut self) -> Result<Output<B>, SinkError> {
        let format = self.config.format;
        let size = format.buffer_size_bytes(self.config.frames_per_second);

        let mut device = self.backend.open()?;
        let mut buffer = device.create_buffer(&format, size)?;
        buffer.play_looping()?;

        let size = buffer.size_bytes();
        info!(
            "Audio output: {}Hz {}-bit x{}, {} byte buffer ({} latency frames, ~{}ms)",
            format.sample_rate,
            format.bits_per_sample(),
            format.channels,
            size,
            format.latency_frames,
            size * 1000 / format.bytes_per_second().max(1)
        );

        Ok(Output::Device {
            buffer,
            device,
            writer: RingWriter::new(size, self.config.poll_interval),
        })
    }

    /// Release the device, buffer, timer and event
    ///
    /// Safe to call repeatedly, and before `init`.
    pub fn exit(&mut self, reinit: bool) {
        trace!("-> Sink::exit({})", if reinit { "reinit" } else { "" });

        match std::mem::replace(&mut self.output, Output::ShuttingDown) {
            Output::Device { buffer, device, .. } => {
                drop(buffer);
                drop(device);
                debug!("Audio device released");
            }
            Output::Fallback(pacer) => {
                // Dropping the pacer cancels its timer thread
                drop(pacer);
            }
            Output::Uninitialized | Output::ShuttingDown => {}
        }
        self.output = Output::Uninitialized;

        trace!("<- Sink::exit()");
    }

    /// Zero the whole device buffer and restart writing at the play cursor
    ///
    /// Use when emulation stops or pauses, so the looping buffer doesn't
    /// keep replaying the last frames. No effect without a device buffer.
    pub fn silence(&mut self) {
        if let Output::Device { buffer, writer, .. } = &mut self.output {
            writer.silence(buffer);
            trace!("Silenced; write offset now {}", writer.write_offset());
        }
    }

    /// Submit one frame's worth of PCM bytes
    ///
    /// With a device buffer, blocks until every byte is queued behind the
    /// play cursor and returns true (even if a device failure dropped part
    /// of the block). Without one, writes nothing, waits for the next frame
    /// tick and returns false.
    pub fn submit(&mut self, data: &[u8]) -> bool {
        self.metrics.totals.bytes_submitted += data.len() as u64;

        let written = match &mut self.output {
            Output::Device { buffer, writer, .. } => {
                writer.submit(buffer, data, &mut self.metrics)
            }
            Output::Fallback(pacer) => {
                if pacer.wait_frame(self.config.frames_per_second, self.config.speed_percent) {
                    self.metrics.totals.fallback_waits += 1;
                }
                false
            }
            Output::Uninitialized | Output::ShuttingDown => false,
        };

        self.metrics.maybe_log();
        written
    }

    pub fn lifecycle(&self) -> SinkLifecycle {
        match self.output {
            Output::Uninitialized => SinkLifecycle::Uninitialized,
            Output::Device { .. } => SinkLifecycle::ActiveWithDevice,
            Output::Fallback(_) => SinkLifecycle::ActiveFallback,
            Output::ShuttingDown => SinkLifecycle::ShuttingDown,
        }
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Replace the configuration; format and enable changes apply on next `init`
    pub fn set_config(&mut self, config: SinkConfig) {
        self.config = config;
    }

    /// Change emulation speed; takes effect on the next fallback frame
    pub fn set_speed_percent(&mut self, speed_percent: u32) {
        self.config.speed_percent = speed_percent;
    }

    /// Size of the device buffer, if one is held
    pub fn buffer_size(&self) -> Option<usize> {
        match &self.output {
            Output::Device { writer, .. } => Some(writer.size()),
            _ => None,
        }
    }

    /// The sink's write offset into the device buffer, if one is held
    pub fn write_offset(&self) -> Option<usize> {
        match &self.output {
            Output::Device { writer, .. } => Some(writer.write_offset()),
            _ => None,
        }
    }

    /// The fallback pacer, if active
    pub fn pacer(&self) -> Option<&FramePacer> {
        match &self.output {
            Output::Fallback(pacer) => Some(pacer),
            _ => None,
        }
    }

    pub fn metrics(&self) -> SinkMetrics {
        self.metrics.totals
    }
}

impl<B: AudioBackend> Drop for Sink<B> {
    fn drop(&mut self) {
        self.exit(false);
    }
}
