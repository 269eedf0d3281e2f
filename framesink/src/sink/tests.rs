//! Sink lifecycle tests

use std::time::{Duration, Instant};

use super::*;
use crate::device::{Commit, MemoryBackend, MemoryFaults, MemoryProbe};
use crate::format::SampleDepth;

/// 12750Hz / 50fps = 255 (+1) samples x 4 bytes x (1 + 3) frames = 4096 bytes
fn config_4096() -> SinkConfig {
    SinkConfig {
        sound_enabled: true,
        format: AudioFormat::new(12_750, SampleDepth::I16, 2, 3),
        frames_per_second: 50,
        speed_percent: 100,
        poll_interval: Duration::ZERO,
    }
}

fn memory_sink(config: SinkConfig) -> (Sink<MemoryBackend>, MemoryProbe) {
    let backend = MemoryBackend::new();
    let probe = backend.probe();
    (Sink::new(backend, config), probe)
}

fn memory_sink_with_faults(faults: MemoryFaults) -> (Sink<MemoryBackend>, MemoryProbe) {
    let (sink, probe) = memory_sink(config_4096());
    probe.set_faults(faults);
    (sink, probe)
}

// ============================================================================
// Init / Exit Tests
// ============================================================================

#[test]
fn test_new_sink_is_uninitialized() {
    let (sink, probe) = memory_sink(config_4096());
    assert_eq!(sink.lifecycle(), SinkLifecycle::Uninitialized);
    assert_eq!(sink.buffer_size(), None);
    assert_eq!(probe.opened(), 0);
}

#[test]
fn test_init_acquires_device_buffer() {
    let (mut sink, probe) = memory_sink(config_4096());

    assert!(sink.init(true));

    assert_eq!(sink.lifecycle(), SinkLifecycle::ActiveWithDevice);
    assert_eq!(sink.buffer_size(), Some(4096));
    assert_eq!(sink.write_offset(), Some(0));
    assert!(sink.pacer().is_none());
    assert_eq!(probe.opened(), 1);
    assert_eq!(probe.live_buffers(), 1);
}

#[test]
fn test_init_twice_releases_previous_buffer() {
    let (mut sink, probe) = memory_sink(config_4096());

    sink.init(true);
    sink.init(false);

    assert_eq!(probe.opened(), 2);
    assert_eq!(probe.live_buffers(), 1);
    assert_eq!(sink.lifecycle(), SinkLifecycle::ActiveWithDevice);
}

#[test]
fn test_init_sound_disabled_uses_fallback() {
    let (mut sink, probe) = memory_sink(SinkConfig {
        sound_enabled: false,
        ..config_4096()
    });

    assert!(sink.init(true));

    assert_eq!(sink.lifecycle(), SinkLifecycle::ActiveFallback);
    assert!(sink.pacer().is_some());
    assert_eq!(sink.buffer_size(), None);
    assert_eq!(probe.opened(), 0);
}

#[test]
fn test_init_device_unavailable_falls_back() {
    let (mut sink, probe) = memory_sink_with_faults(MemoryFaults {
        open: true,
        ..Default::default()
    });

    assert!(sink.init(true));
    assert_eq!(sink.lifecycle(), SinkLifecycle::ActiveFallback);
    assert_eq!(probe.live_buffers(), 0);
}

#[test]
fn test_init_format_rejected_falls_back() {
    let (mut sink, probe) = memory_sink_with_faults(MemoryFaults {
        format: true,
        ..Default::default()
    });

    assert!(sink.init(true));
    assert_eq!(sink.lifecycle(), SinkLifecycle::ActiveFallback);
    assert_eq!(probe.opened(), 1);
    assert_eq!(probe.live_buffers(), 0);
}

#[test]
fn test_init_play_failure_releases_buffer() {
    let (mut sink, probe) = memory_sink_with_faults(MemoryFaults {
        play: true,
        ..Default::default()
    });

    assert!(sink.init(true));
    assert_eq!(sink.lifecycle(), SinkLifecycle::ActiveFallback);
    assert_eq!(probe.live_buffers(), 0);
}

#[test]
fn test_set_config_applies_on_next_init() {
    let (mut sink, probe) = memory_sink(config_4096());
    sink.init(true);

    sink.set_config(SinkConfig {
        sound_enabled: false,
        ..config_4096()
    });
    assert_eq!(sink.lifecycle(), SinkLifecycle::ActiveWithDevice);
    assert!(!sink.config().sound_enabled);

    sink.init(false);
    assert_eq!(sink.lifecycle(), SinkLifecycle::ActiveFallback);
    assert_eq!(probe.live_buffers(), 0);
}

#[test]
fn test_exit_before_init() {
    let (mut sink, probe) = memory_sink(config_4096());
    sink.exit(false);
    assert_eq!(sink.lifecycle(), SinkLifecycle::Uninitialized);
    assert_eq!(probe.live_buffers(), 0);
}

#[test]
fn test_exit_twice_releases_everything() {
    let (mut sink, probe) = memory_sink(config_4096());
    sink.init(true);

    sink.exit(false);
    sink.exit(false);

    assert_eq!(sink.lifecycle(), SinkLifecycle::Uninitialized);
    assert_eq!(sink.buffer_size(), None);
    assert_eq!(sink.write_offset(), None);
    assert!(sink.pacer().is_none());
    assert_eq!(probe.live_buffers(), 0);
}

#[test]
fn test_exit_fallback_cancels_timer() {
    let (mut sink, _) = memory_sink(SinkConfig {
        sound_enabled: false,
        ..config_4096()
    });
    sink.init(true);
    sink.submit(&[0; 16]);
    assert!(sink.pacer().is_some_and(|p| p.is_armed()));

    let start = Instant::now();
    sink.exit(false);
    assert!(sink.pacer().is_none());
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_drop_releases_device() {
    let (mut sink, probe) = memory_sink(config_4096());
    sink.init(true);
    drop(sink);
    assert_eq!(probe.live_buffers(), 0);
}

// ============================================================================
// Submit Tests
// ============================================================================

#[test]
fn test_submit_uninitialized_returns_false() {
    let (mut sink, _) = memory_sink(config_4096());
    let start = Instant::now();
    assert!(!sink.submit(&[0; 64]));
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[test]
fn test_submit_device_mode_writes_and_returns_true() {
    let (mut sink, probe) = memory_sink(config_4096());
    sink.init(true);
    probe.set_play_cursor(2048);

    assert!(sink.submit(&[7; 1000]));

    assert_eq!(sink.write_offset(), Some(1000));
    assert_eq!(probe.bytes_committed(), 1000);
    assert_eq!(&probe.ring_bytes().unwrap()[..1000], &[7; 1000][..]);
    assert_eq!(sink.metrics().bytes_written, 1000);
    assert_eq!(sink.metrics().bytes_submitted, 1000);
}

#[test]
fn test_submit_wraps_at_end_of_ring() {
    let (mut sink, probe) = memory_sink(config_4096());
    sink.init(true);

    // Move the write offset to 4000
    probe.set_play_cursor(4000);
    sink.submit(&[1; 4000]);
    assert_eq!(sink.write_offset(), Some(4000));

    // Play cursor wrapped to just past the end of the next write
    probe.set_play_cursor(104);
    probe.clear_commits();
    let block: Vec<u8> = (0..200).map(|i| i as u8).collect();

    assert!(sink.submit(&block));

    assert_eq!(
        probe.commits(),
        vec![Commit {
            first: 4000..4096,
            second: 0..104,
        }]
    );
    let ring = probe.ring_bytes().unwrap();
    assert_eq!(&ring[4000..], &block[..96]);
    assert_eq!(&ring[..104], &block[96..]);
    assert_eq!(sink.write_offset(), Some(104));
}

#[test]
fn test_submit_position_failure_is_silent() {
    let (mut sink, probe) = memory_sink(config_4096());
    sink.init(true);
    probe.set_faults(MemoryFaults {
        position: true,
        ..Default::default()
    });

    assert!(sink.submit(&[0; 256]));

    let metrics = sink.metrics();
    assert_eq!(metrics.aborted_submits, 1);
    assert_eq!(metrics.bytes_dropped, 256);
    assert_eq!(sink.lifecycle(), SinkLifecycle::ActiveWithDevice);
}

#[test]
fn test_submit_empty_block_in_device_mode() {
    let (mut sink, probe) = memory_sink(config_4096());
    sink.init(true);
    assert!(sink.submit(&[]));
    assert!(probe.commits().is_empty());
}

// ============================================================================
// Silence Tests
// ============================================================================

#[test]
fn test_silence_clears_ring_and_resyncs_to_play_cursor() {
    let (mut sink, probe) = memory_sink(config_4096());
    sink.init(true);
    probe.set_play_cursor(3000);
    sink.submit(&[0xFF; 2500]);
    probe.set_play_cursor(1200);

    sink.silence();

    assert!(probe.ring_bytes().unwrap().iter().all(|&b| b == 0));
    assert_eq!(sink.write_offset(), Some(1200));
}

#[test]
fn test_silence_without_device_is_noop() {
    let (mut sink, _) = memory_sink(SinkConfig {
        sound_enabled: false,
        ..config_4096()
    });
    sink.silence();
    sink.init(true);
    sink.silence();
    assert_eq!(sink.lifecycle(), SinkLifecycle::ActiveFallback);
}

// ============================================================================
// Fallback Pacing Tests
// ============================================================================

#[test]
fn test_fallback_submit_returns_false() {
    let (mut sink, _) = memory_sink(SinkConfig {
        sound_enabled: false,
        ..config_4096()
    });
    sink.init(true);

    assert!(!sink.submit(&[0; 64]));
    assert_eq!(sink.metrics().fallback_waits, 1);
    assert_eq!(sink.metrics().bytes_written, 0);
}

#[test]
fn test_speed_change_rearms_timer() {
    let (mut sink, _) = memory_sink(SinkConfig {
        sound_enabled: false,
        ..config_4096()
    });
    sink.init(true);

    sink.submit(&[]);
    sink.submit(&[]);
    let pacer = sink.pacer().unwrap();
    assert_eq!(pacer.interval_ms(), Some(20));
    assert_eq!(pacer.arm_count(), 1);

    sink.set_speed_percent(200);
    sink.submit(&[]);
    let pacer = sink.pacer().unwrap();
    assert_eq!(pacer.interval_ms(), Some(10));
    assert_eq!(pacer.arm_count(), 2);
}

#[test]
fn test_reinit_resets_pacer() {
    let (mut sink, _) = memory_sink(SinkConfig {
        sound_enabled: false,
        ..config_4096()
    });
    sink.init(true);
    sink.submit(&[]);
    sink.init(false);

    let pacer = sink.pacer().unwrap();
    assert!(!pacer.is_armed());
    assert_eq!(pacer.arm_count(), 0);
}
