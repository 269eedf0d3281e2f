//! PCM format description and ring buffer sizing

/// Sample encoding of the PCM feed
///
/// 8-bit samples are unsigned (silence at 0x80), 16-bit samples are signed
/// little endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleDepth {
    U8,
    #[default]
    I16,
}

impl SampleDepth {
    /// Map a configured bit depth to an encoding
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            8 => Some(Self::U8),
            16 => Some(Self::I16),
            _ => None,
        }
    }

    pub fn bits(self) -> u16 {
        match self {
            Self::U8 => 8,
            Self::I16 => 16,
        }
    }

    pub fn bytes(self) -> usize {
        self.bits() as usize / 8
    }

    /// Decode one sample to the -1.0..1.0 range
    ///
    /// `bytes` must hold at least `self.bytes()` bytes.
    #[inline]
    pub fn decode(self, bytes: &[u8]) -> f32 {
        match self {
            Self::U8 => (bytes[0] as f32 - 128.0) / 128.0,
            Self::I16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f32 / 32768.0,
        }
    }
}

/// PCM format of the sample feed plus the requested buffering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Samples per second, per channel
    pub sample_rate: u32,
    /// Sample encoding
    pub depth: SampleDepth,
    /// Interleaved channel count
    pub channels: u16,
    /// Extra emulated frames of buffering beyond the one being written
    pub latency_frames: u32,
}

impl AudioFormat {
    pub fn new(sample_rate: u32, depth: SampleDepth, channels: u16, latency_frames: u32) -> Self {
        Self {
            sample_rate,
            depth,
            channels,
            latency_frames,
        }
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.depth.bits()
    }

    /// Bytes per interleaved sample frame (channels x bytes per sample)
    pub fn block_align(&self) -> usize {
        self.channels as usize * self.depth.bytes()
    }

    pub fn bytes_per_second(&self) -> usize {
        self.sample_rate as usize * self.block_align()
    }

    /// Sample frames produced per emulated frame
    ///
    /// Rounded up by one so integer truncation never leaves the buffer a
    /// sample short of a full emulated frame.
    pub fn samples_per_frame(&self, frames_per_second: u32) -> usize {
        (self.sample_rate / frames_per_second.max(1)) as usize + 1
    }

    /// Size of the looping device buffer in bytes
    ///
    /// One emulated frame of samples, times one plus the latency frames.
    pub fn buffer_size_bytes(&self, frames_per_second: u32) -> usize {
        self.samples_per_frame(frames_per_second)
            * self.block_align()
            * (1 + self.latency_frames as usize)
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::new(44_100, SampleDepth::I16, 2, 5)
    }
}
