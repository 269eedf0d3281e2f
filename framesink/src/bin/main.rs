//! framesink - Demo Player
//!
//! Runs a fake emulation loop that produces one frame of a square-wave tone
//! per iteration and submits it to the sink, then reports the achieved
//! frame rate. Useful for checking a host's audio device and the fallback
//! pacing without an emulator attached.
//!
//! # Usage
//!
//! ```bash
//! framesink
//! framesink --frames 500 --tone 220
//! framesink --no-sound --speed 200
//! framesink --config ./my-config.toml --latency 2
//! ```

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use framesink::config::{self, Config};
use framesink::{AudioFormat, CpalBackend, SampleDepth, Sink};

#[derive(Parser)]
#[command(name = "framesink")]
#[command(author, version, about = "Frame-paced audio output demo player")]
struct Args {
    /// Config file to use instead of the platform config directory
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Disable sound output (frames paced by the fallback timer)
    #[arg(long)]
    no_sound: bool,

    /// Emulation speed in percent (100 = normal)
    #[arg(long, short = 's')]
    speed: Option<u32>,

    /// Extra emulated frames of audio buffering
    #[arg(long, short = 'l')]
    latency: Option<u32>,

    /// Number of emulated frames to run
    #[arg(long, short = 'n', default_value = "250")]
    frames: u32,

    /// Tone frequency in Hz
    #[arg(long, short = 't', default_value = "440")]
    tone: u32,
}

/// Square-wave generator writing interleaved PCM in the sink's format
struct SquareWave {
    format: AudioFormat,
    half_period: u32,
    phase: u32,
    high: bool,
}

impl SquareWave {
    fn new(format: AudioFormat, frequency: u32) -> Self {
        let half_period = (format.sample_rate / frequency.max(1).saturating_mul(2)).max(1);
        Self {
            format,
            half_period,
            phase: 0,
            high: true,
        }
    }

    /// Produce `samples` sample frames at a quarter of full scale
    fn frame(&mut self, samples: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(samples * self.format.block_align());
        for _ in 0..samples {
            for _ in 0..self.format.channels {
                match self.format.depth {
                    SampleDepth::U8 => out.push(if self.high { 0xA0 } else { 0x60 }),
                    SampleDepth::I16 => {
                        let value: i16 = if self.high { 8192 } else { -8192 };
                        out.extend_from_slice(&value.to_le_bytes());
                    }
                }
            }
            self.phase += 1;
            if self.phase >= self.half_period {
                self.phase = 0;
                self.high = !self.high;
            }
        }
        out
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => config::load(),
    };

    if args.no_sound {
        config.sound.enabled = false;
    }
    if let Some(speed) = args.speed {
        config.timing.speed_percent = speed;
    }
    if let Some(latency) = args.latency {
        config.sound.latency_frames = latency;
    }

    for warning in config.validate() {
        warn!("Config: {}", warning);
    }
    Ok(config)
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let sink_config = config.sink_config();

    let mut sink = Sink::new(CpalBackend::new(), sink_config);
    sink.init(true);
    info!("Sink state: {:?}", sink.lifecycle());

    let format = sink_config.format;
    let samples = (format.sample_rate / sink_config.frames_per_second) as usize;
    let mut tone = SquareWave::new(format, args.tone);

    let start = Instant::now();
    for _ in 0..args.frames {
        let frame = tone.frame(samples);
        sink.submit(&frame);
    }
    let elapsed = start.elapsed();

    sink.silence();
    sink.exit(false);

    let fps = args.frames as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    let metrics = sink.metrics();
    info!(
        "{} frames in {:.2}s ({:.1} fps, target {} at {}%)",
        args.frames,
        elapsed.as_secs_f64(),
        fps,
        sink_config.frames_per_second,
        sink_config.speed_percent
    );
    info!(
        "{} bytes written, {} dropped, {} stalls",
        metrics.bytes_written, metrics.bytes_dropped, metrics.poll_stalls
    );

    Ok(())
}
