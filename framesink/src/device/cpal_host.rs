//! cpal-backed looping buffer
//!
//! cpal pulls samples through a callback rather than exposing a looping
//! buffer, so the buffer is emulated: a shared byte ring whose play cursor
//! the output callback advances, decoding the ring's PCM into whatever
//! sample type the device stream uses.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, error, trace};

use super::ring::{LoopingRing, RingRegion};
use super::{AudioBackend, AudioDevice, Cursors, HardwareBuffer};
use crate::error::SinkError;
use crate::format::AudioFormat;

/// Host backend using the platform's default cpal host
pub struct CpalBackend {
    host: cpal::Host,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    type Device = CpalDevice;

    fn open(&mut self) -> Result<CpalDevice, SinkError> {
        let device = self.host.default_output_device().ok_or_else(|| {
            SinkError::DeviceUnavailable("No audio output device available".to_string())
        })?;

        debug!(
            "Opened audio device {:?} on host {:?}",
            device.name().unwrap_or_default(),
            self.host.id()
        );

        Ok(CpalDevice { device })
    }
}

/// The default cpal output device
pub struct CpalDevice {
    device: cpal::Device,
}

impl CpalDevice {
    /// Find a stream config playing `format`'s rate and channel count
    fn find_config(&self, format: &AudioFormat) -> Result<cpal::SupportedStreamConfig, SinkError> {
        let wanted = cpal::SampleRate(format.sample_rate);

        let configs = self.device.supported_output_configs().map_err(|e| {
            SinkError::FormatRejected(format!("Failed to query output configs: {}", e))
        })?;

        configs
            .filter(|range| {
                range.channels() == format.channels
                    && range.min_sample_rate() <= wanted
                    && wanted <= range.max_sample_rate()
            })
            .find(|range| {
                matches!(
                    range.sample_format(),
                    cpal::SampleFormat::F32 | cpal::SampleFormat::I16 | cpal::SampleFormat::U16
                )
            })
            .map(|range| range.with_sample_rate(wanted))
            .ok_or_else(|| {
                SinkError::FormatRejected(format!(
                    "No output config for {}Hz, {} channel(s)",
                    format.sample_rate, format.channels
                ))
            })
    }
}

impl AudioDevice for CpalDevice {
    type Buffer = CpalBuffer;

    fn create_buffer(
        &mut self,
        format: &AudioFormat,
        size_bytes: usize,
    ) -> Result<CpalBuffer, SinkError> {
        if size_bytes == 0 || size_bytes % format.block_align().max(1) != 0 {
            return Err(SinkError::FormatRejected(format!(
                "buffer size {} is not a whole number of {} byte blocks",
                size_bytes,
                format.block_align()
            )));
        }
        let supported = self.find_config(format)?;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        let ring = Arc::new(LoopingRing::new(size_bytes));
        let lost = Arc::new(AtomicBool::new(false));
        let depth = format.depth;

        let error_callback = {
            let lost = lost.clone();
            move |err: cpal::StreamError| {
                error!("Audio stream error: {}", err);
                if matches!(err, cpal::StreamError::DeviceNotAvailable) {
                    lost.store(true, Ordering::Release);
                }
            }
        };

        let reader = ring.clone();
        let stream = match sample_format {
            cpal::SampleFormat::F32 => self.device.build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    reader.pull(data, depth, |s| s);
                },
                error_callback,
                None,
            ),
            cpal::SampleFormat::I16 => self.device.build_output_stream(
                &config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    reader.pull(data, depth, |s| {
                        (s * 32767.0).clamp(-32768.0, 32767.0) as i16
                    });
                },
                error_callback,
                None,
            ),
            cpal::SampleFormat::U16 => self.device.build_output_stream(
                &config,
                move |data: &mut [u16], _: &cpal::OutputCallbackInfo| {
                    reader.pull(data, depth, |s| {
                        (s * 32767.0 + 32768.0).clamp(0.0, 65535.0) as u16
                    });
                },
                error_callback,
                None,
            ),
            other => {
                return Err(SinkError::FormatRejected(format!(
                    "Unsupported sample format: {:?}",
                    other
                )));
            }
        }
        .map_err(|e| SinkError::FormatRejected(format!("Failed to build audio stream: {}", e)))?;

        debug!(
            "Created {} byte looping buffer ({}Hz, {}-bit, {} channel(s), device format {:?})",
            size_bytes,
            format.sample_rate,
            format.bits_per_sample(),
            format.channels,
            sample_format
        );

        Ok(CpalBuffer { ring, lost, stream })
    }
}

/// Looping buffer played by a cpal output stream
///
/// Dropping it stops the stream.
pub struct CpalBuffer {
    ring: Arc<LoopingRing>,
    /// Set by the stream error callback when the device goes away
    lost: Arc<AtomicBool>,
    stream: cpal::Stream,
}

impl HardwareBuffer for CpalBuffer {
    type Region<'a> = RingRegion<'a>;

    fn size_bytes(&self) -> usize {
        self.ring.size()
    }

    fn play_looping(&mut self) -> Result<(), SinkError> {
        self.stream
            .play()
            .map_err(|e| SinkError::DeviceUnavailable(format!("Failed to play audio stream: {}", e)))?;
        debug!("Audio stream started");
        Ok(())
    }

    fn position(&mut self) -> Result<Cursors, SinkError> {
        if self.lost.load(Ordering::Acquire) {
            return Err(SinkError::PositionQueryFailed(
                "audio device no longer available".to_string(),
            ));
        }
        Ok(self.ring.cursors())
    }

    fn lock(&mut self, offset: usize, len: usize) -> Result<RingRegion<'_>, SinkError> {
        self.ring.lock(offset, len)
    }

    fn unlock(&mut self, offset: usize, written: usize) -> Result<(), SinkError> {
        // The ring is live memory; releasing the region guard was the commit
        trace!("Committed {} bytes at {}", written, offset);
        Ok(())
    }
}
