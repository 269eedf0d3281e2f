//! Configuration management (`config.toml`)
//!
//! Handles loading, saving, and providing defaults for sink settings.
//! Settings are stored in TOML format in the platform-specific config directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::format::{AudioFormat, SampleDepth};
use crate::sink::SinkConfig;


/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Sound output settings
    #[serde(default)]
    pub sound: SoundConfig,
    /// Emulation timing settings
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Sound output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundConfig {
    /// Whether to open an audio device at all (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Output sample rate in Hz (default: 44100)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Bits per sample, 8 or 16 (default: 16)
    #[serde(default = "default_bits_per_sample")]
    pub bits_per_sample: u16,
    /// Channel count, 1 or 2 (default: 2)
    #[serde(default = "default_channels")]
    pub channels: u16,
    /// Extra emulated frames of buffering (default: 5, range: 0-20)
    #[serde(default = "default_latency_frames")]
    pub latency_frames: u32,
}

/// Emulation timing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Emulated frames per second at normal speed (default: 50)
    #[serde(default = "default_frames_per_second")]
    pub frames_per_second: u32,
    /// Emulation speed percentage, 100 = normal (default: 100)
    #[serde(default = "default_speed_percent")]
    pub speed_percent: u32,
    /// Sleep between device polls while the buffer is full (default: 2)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

const MAX_LATENCY_FRAMES: u32 = 20;
const MIN_SPEED_PERCENT: u32 = 10;
const MAX_SPEED_PERCENT: u32 = 1000;

fn default_true() -> bool {
    true
}
fn default_sample_rate() -> u32 {
    44_100
}
fn default_bits_per_sample() -> u16 {
    16
}
fn default_channels() -> u16 {
    2
}
fn default_latency_frames() -> u32 {
    5
}
fn default_frames_per_second() -> u32 {
    50
}
fn default_speed_percent() -> u32 {
    100
}
fn default_poll_interval_ms() -> u64 {
    2
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            sample_rate: default_sample_rate(),
            bits_per_sample: default_bits_per_sample(),
            channels: default_channels(),
            latency_frames: default_latency_frames(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            frames_per_second: default_frames_per_second(),
            speed_percent: default_speed_percent(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Config {
    /// Check settings, returning a warning for each out-of-range value.
    ///
    /// `sink_config()` clamps the same values, so a config with warnings is
    /// still usable.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if SampleDepth::from_bits(self.sound.bits_per_sample).is_none() {
            warnings.push(format!(
                "sound.bits_per_sample {} unsupported (8 or 16), using 16",
                self.sound.bits_per_sample
            ));
        }
        if !(1..=2).contains(&self.sound.channels) {
            warnings.push(format!(
                "sound.channels {} unsupported (1 or 2), using 2",
                self.sound.channels
            ));
        }
        if self.sound.sample_rate == 0 {
            warnings.push(format!(
                "sound.sample_rate must be non-zero, using {}",
                default_sample_rate()
            ));
        }
        if self.sound.latency_frames > MAX_LATENCY_FRAMES {
            warnings.push(format!(
                "sound.latency_frames {} too large, using {}",
                self.sound.latency_frames, MAX_LATENCY_FRAMES
            ));
        }
        if self.timing.frames_per_second == 0 {
            warnings.push(format!(
                "timing.frames_per_second must be non-zero, using {}",
                default_frames_per_second()
            ));
        }
        if !(MIN_SPEED_PERCENT..=MAX_SPEED_PERCENT).contains(&self.timing.speed_percent) {
            warnings.push(format!(
                "timing.speed_percent {} outside {}-{}, clamping",
                self.timing.speed_percent, MIN_SPEED_PERCENT, MAX_SPEED_PERCENT
            ));
        }

        warnings
    }

    /// Runtime sink settings, with out-of-range values replaced
    pub fn sink_config(&self) -> SinkConfig {
        let depth = SampleDepth::from_bits(self.sound.bits_per_sample).unwrap_or_default();
        let channels = if (1..=2).contains(&self.sound.channels) {
            self.sound.channels
        } else {
            default_channels()
        };
        let sample_rate = match self.sound.sample_rate {
            0 => default_sample_rate(),
            rate => rate,
        };
        let frames_per_second = match self.timing.frames_per_second {
            0 => default_frames_per_second(),
            fps => fps,
        };

        SinkConfig {
            sound_enabled: self.sound.enabled,
            format: AudioFormat::new(
                sample_rate,
                depth,
                channels,
                self.sound.latency_frames.min(MAX_LATENCY_FRAMES),
            ),
            frames_per_second,
            speed_percent: self
                .timing
                .speed_percent
                .clamp(MIN_SPEED_PERCENT, MAX_SPEED_PERCENT),
            poll_interval: Duration::from_millis(self.timing.poll_interval_ms),
        }
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\framesink\config`
/// On macOS: `~/Library/Application Support/io.framesink.framesink`
/// On Linux: `~/.config/framesink`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.framesink", "", "framesink")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Path of `config.toml` in the platform config directory
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Loads the configuration from disk.
///
/// Reads `config.toml` from the platform's configuration directory.
/// Returns default values if the file doesn't exist or cannot be parsed.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    if !path.exists() {
        return Config::default();
    }
    load_from(&path).unwrap_or_else(|e| {
        warn!("Ignoring config file {}: {}", path.display(), e);
        Config::default()
    })
}

/// Loads the configuration from a specific file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Saves the configuration to disk.
///
/// Writes `config.toml` to the platform's configuration directory.
/// Creates the directory if it doesn't exist.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    match config_path() {
        Some(path) => save_to(config, &path),
        None => Ok(()),
    }
}

/// Saves the configuration to a specific file, creating parent directories.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Errors reading or writing `config.toml`
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
