//! Fallback pacing through the public API
//!
//! With sound disabled the sink must still hold the emulation loop to the
//! configured frame rate. Timing assertions leave slack for busy CI hosts.

use std::time::{Duration, Instant};

use framesink::{MemoryBackend, Sink, SinkConfig, SinkLifecycle};

fn fallback_sink(speed_percent: u32) -> Sink<MemoryBackend> {
    let mut sink = Sink::new(
        MemoryBackend::new(),
        SinkConfig {
            sound_enabled: false,
            speed_percent,
            ..Default::default()
        },
    );
    assert!(sink.init(true));
    assert_eq!(sink.lifecycle(), SinkLifecycle::ActiveFallback);
    sink
}

#[test]
fn fallback_submits_are_paced_at_frame_rate() {
    let mut sink = fallback_sink(100);

    // First submit arms the timer and waits for its first tick
    let start = Instant::now();
    for frame in 0..3 {
        let call = Instant::now();
        assert!(!sink.submit(&[0; 1764]));
        let waited = call.elapsed();

        // One 20ms tick per call, less scheduler jitter
        assert!(
            waited >= Duration::from_millis(15),
            "frame {} returned after {:?}",
            frame,
            waited
        );
        assert!(waited < Duration::from_secs(1), "frame {}: {:?}", frame, waited);
    }
    let elapsed = start.elapsed();

    // 3 frames at 50fps = 60ms
    assert!(elapsed >= Duration::from_millis(55), "{:?}", elapsed);
    assert_eq!(sink.metrics().fallback_waits, 3);
    assert_eq!(sink.metrics().bytes_written, 0);
}

#[test]
fn fallback_double_speed_halves_frame_time() {
    let mut sink = fallback_sink(200);

    let start = Instant::now();
    for _ in 0..4 {
        sink.submit(&[]);
    }
    let elapsed = start.elapsed();

    // 4 frames at 10ms
    assert!(elapsed >= Duration::from_millis(35), "{:?}", elapsed);
    assert_eq!(sink.pacer().and_then(|p| p.interval_ms()), Some(10));
}

#[test]
fn fallback_exit_and_reinit_keep_pacing() {
    let mut sink = fallback_sink(100);
    sink.submit(&[]);

    sink.exit(true);
    assert_eq!(sink.lifecycle(), SinkLifecycle::Uninitialized);
    assert!(!sink.submit(&[]));

    sink.init(false);
    let start = Instant::now();
    assert!(!sink.submit(&[]));
    assert!(start.elapsed() >= Duration::from_millis(15));
}
