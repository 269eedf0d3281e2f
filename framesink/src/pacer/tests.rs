//! Pacer tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use super::*;

// ============================================================================
// Interval Tests
// ============================================================================

#[test]
fn test_interval_normal_speed() {
    assert_eq!(frame_interval_ms(50, 100), 20);
    assert_eq!(frame_interval_ms(60, 100), 16);
}

#[test]
fn test_interval_double_speed() {
    assert_eq!(frame_interval_ms(50, 200), 10);
}

#[test]
fn test_interval_half_speed() {
    assert_eq!(frame_interval_ms(50, 50), 40);
}

#[test]
fn test_interval_never_below_one_ms() {
    assert_eq!(frame_interval_ms(50, 10_000), 1);
    assert_eq!(frame_interval_ms(50, 100_000), 1);
}

#[test]
fn test_interval_degenerate_rate() {
    // 50 fps at 1% is half a frame per second; clamp to one
    assert_eq!(frame_interval_ms(50, 1), 1000);
    assert_eq!(frame_interval_ms(0, 100), 1000);
    assert_eq!(frame_interval_ms(50, 0), 1000);
}

// ============================================================================
// WakeEvent Tests
// ============================================================================

#[test]
fn test_event_auto_resets() {
    let event = WakeEvent::new();
    event.signal();
    assert!(event.wait_timeout(Duration::from_millis(10)));
    // Consumed by the first wait
    assert!(!event.wait_timeout(Duration::from_millis(10)));
}

#[test]
fn test_event_signals_collapse() {
    let event = WakeEvent::new();
    event.signal();
    event.signal();
    event.signal();
    assert!(event.wait_timeout(Duration::from_millis(10)));
    assert!(!event.wait_timeout(Duration::from_millis(10)));
}

#[test]
fn test_event_wakes_waiting_thread() {
    let event = Arc::new(WakeEvent::new());
    let remote = event.clone();
    let signaller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        remote.signal();
    });

    event.wait();
    signaller.join().unwrap();
}

// ============================================================================
// PeriodicTimer Tests
// ============================================================================

#[test]
fn test_timer_ticks_repeatedly() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = ticks.clone();
    let timer = PeriodicTimer::arm(Duration::from_millis(5), move || {
        counter.fetch_add(1, Ordering::Relaxed);
    })
    .unwrap();

    thread::sleep(Duration::from_millis(60));
    drop(timer);

    let count = ticks.load(Ordering::Relaxed);
    assert!(count >= 3, "expected several ticks, got {}", count);
}

#[test]
fn test_timer_stops_on_drop() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = ticks.clone();
    let timer = PeriodicTimer::arm(Duration::from_millis(2), move || {
        counter.fetch_add(1, Ordering::Relaxed);
    })
    .unwrap();
    thread::sleep(Duration::from_millis(10));
    drop(timer);

    let after_drop = ticks.load(Ordering::Relaxed);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(ticks.load(Ordering::Relaxed), after_drop);
}

#[test]
fn test_timer_interval_clamped_to_one_ms() {
    let timer = PeriodicTimer::arm(Duration::ZERO, || {}).unwrap();
    assert_eq!(timer.interval(), Duration::from_millis(1));
}

#[test]
fn test_timer_cancel_is_prompt() {
    let timer = PeriodicTimer::arm(Duration::from_secs(10), || {}).unwrap();
    let start = Instant::now();
    drop(timer);
    assert!(start.elapsed() < Duration::from_secs(1));
}

// ============================================================================
// FramePacer Tests
// ============================================================================

#[test]
fn test_pacer_starts_unarmed() {
    let pacer = FramePacer::new();
    assert!(!pacer.is_armed());
    assert_eq!(pacer.interval_ms(), None);
    assert_eq!(pacer.arm_count(), 0);
}

#[test]
fn test_pacer_rearms_only_on_interval_change() {
    let mut pacer = FramePacer::new();

    assert!(pacer.update(50, 100));
    assert_eq!(pacer.interval_ms(), Some(20));
    assert_eq!(pacer.arm_count(), 1);

    // Same interval: timer left alone
    assert!(!pacer.update(50, 100));
    assert_eq!(pacer.arm_count(), 1);

    // Different speed, same integer interval (1000 / 51 == 19, 1000 / 52 == 19)
    assert!(pacer.update(50, 102));
    assert!(!pacer.update(50, 104));
    assert_eq!(pacer.arm_count(), 2);

    assert!(pacer.update(50, 200));
    assert_eq!(pacer.interval_ms(), Some(10));
    assert_eq!(pacer.arm_count(), 3);
    assert!(pacer.is_armed());
}

#[test]
fn test_pacer_wait_frame_takes_one_interval() {
    let mut pacer = FramePacer::new();

    let start = Instant::now();
    assert!(pacer.wait_frame(50, 100));
    assert!(pacer.wait_frame(50, 100));
    let elapsed = start.elapsed();

    // Two ticks at 20ms; allow scheduler slack below
    assert!(elapsed >= Duration::from_millis(35), "{:?}", elapsed);
}
