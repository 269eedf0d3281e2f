//! Sink error taxonomy
//!
//! None of these are fatal to the emulator. The public `Sink` API absorbs
//! them: acquisition errors demote to timer pacing, submit errors drop the
//! current block, timer errors warn once.

/// Errors raised by the device and pacer layers
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// No usable output device, or the device refused to open/play
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The device cannot play the requested PCM format
    #[error("Audio format rejected: {0}")]
    FormatRejected(String),

    /// Reading the play/write cursors failed
    #[error("Failed to get sound position: {0}")]
    PositionQueryFailed(String),

    /// Locking or committing a buffer region failed
    #[error("Failed to lock sound buffer: {0}")]
    LockFailed(String),

    /// The periodic frame timer could not be started
    #[error("Failed to start frame timer: {0}")]
    TimerArmFailed(#[from] std::io::Error),
}
