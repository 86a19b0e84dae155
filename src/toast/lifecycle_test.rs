#![allow(clippy::float_cmp)]

use super::*;

fn config(duration_ms: f64, auto_dismiss: bool, pause_on_hover: bool) -> ToastConfig {
    ToastConfig { duration_ms, auto_dismiss, pause_on_hover }
}

fn counting(duration_ms: f64) -> ToastLifecycle {
    let mut toast = ToastLifecycle::new(&config(duration_ms, true, true));
    assert!(toast.start_countdown(0.0));
    toast
}

// =============================================================
// Creation
// =============================================================

#[test]
fn new_toast_is_showing_with_full_remainder() {
    let toast = ToastLifecycle::new(&config(5000.0, true, true));
    assert_eq!(toast.phase(), ToastPhase::Showing);
    assert_eq!(toast.remaining_ms(), 5000.0);
    assert_eq!(toast.tick(100.0), Tick::Idle);
}

#[test]
fn ids_are_unique() {
    let a = ToastLifecycle::new(&ToastConfig::default());
    let b = ToastLifecycle::new(&ToastConfig::default());
    assert_ne!(a.id(), b.id());
}

// =============================================================
// Countdown
// =============================================================

#[test]
fn zero_duration_never_counts_down() {
    let mut toast = ToastLifecycle::new(&config(0.0, true, true));
    assert!(!toast.countdown_enabled());
    assert!(!toast.start_countdown(0.0));
    assert_eq!(toast.phase(), ToastPhase::Showing);
}

#[test]
fn negative_duration_never_counts_down() {
    let mut toast = ToastLifecycle::new(&config(-10.0, true, true));
    assert!(!toast.start_countdown(0.0));
}

#[test]
fn auto_dismiss_off_never_counts_down() {
    let mut toast = ToastLifecycle::new(&config(1000.0, false, true));
    assert!(!toast.start_countdown(0.0));
    assert_eq!(toast.tick(5000.0), Tick::Idle);
}

#[test]
fn progress_is_remaining_fraction() {
    let toast = counting(1000.0);
    assert_eq!(toast.tick(0.0), Tick::Progress(1.0));
    assert_eq!(toast.tick(250.0), Tick::Progress(0.75));
    assert_eq!(toast.tick(1000.0), Tick::Expired);
    assert_eq!(toast.tick(4000.0), Tick::Expired);
}

#[test]
fn restarting_countdown_keeps_elapsed_time() {
    let mut toast = counting(1000.0);
    assert!(toast.start_countdown(400.0));
    assert_eq!(toast.remaining_ms(), 600.0);
    assert_eq!(toast.tick(1000.0), Tick::Expired);
}

// =============================================================
// Pause / resume
// =============================================================

#[test]
fn pause_freezes_remaining_time() {
    let mut toast = counting(1000.0);
    assert!(toast.pause(400.0));
    assert_eq!(toast.phase(), ToastPhase::Paused);
    assert_eq!(toast.remaining_ms(), 600.0);
    assert_eq!(toast.remaining_at(10_000.0), 600.0);
    assert_eq!(toast.tick(10_000.0), Tick::Idle);
}

#[test]
fn paused_time_is_not_charged() {
    let mut toast = counting(1000.0);
    toast.pause(400.0);
    assert!(toast.resume(700.0));
    assert_eq!(toast.tick(1299.0), Tick::Progress(1.0 / 1000.0));
    assert_eq!(toast.tick(1300.0), Tick::Expired);
}

#[test]
fn double_pause_is_noop() {
    let mut toast = counting(1000.0);
    assert!(toast.pause(400.0));
    assert!(!toast.pause(600.0));
    assert_eq!(toast.remaining_ms(), 600.0);
}

#[test]
fn resume_without_pause_is_noop() {
    let mut toast = counting(1000.0);
    assert!(!toast.resume(300.0));
    assert_eq!(toast.tick(999.0), Tick::Progress(1.0 / 1000.0));
}

#[test]
fn pause_requires_pause_on_hover() {
    let mut toast = ToastLifecycle::new(&config(1000.0, true, false));
    toast.start_countdown(0.0);
    assert!(!toast.hover_pauses());
    assert!(!toast.pause(100.0));
    assert_eq!(toast.phase(), ToastPhase::CountingDown);
}

#[test]
fn pause_before_countdown_is_noop() {
    let mut toast = ToastLifecycle::new(&config(1000.0, true, true));
    assert!(!toast.pause(10.0));
    assert_eq!(toast.phase(), ToastPhase::Showing);
}

#[test]
fn remaining_never_increases_across_cycles() {
    let mut toast = counting(1000.0);
    let mut last = toast.remaining_ms();
    let mut now = 0.0;
    for _ in 0..4 {
        now += 100.0;
        toast.pause(now);
        assert!(toast.remaining_ms() <= last);
        last = toast.remaining_ms();
        now += 500.0;
        toast.resume(now);
    }
    assert_eq!(toast.remaining_ms(), 600.0);
}

// =============================================================
// Dismissal
// =============================================================

#[test]
fn dismiss_from_any_live_phase() {
    let mut showing = ToastLifecycle::new(&config(0.0, false, false));
    assert!(showing.begin_dismiss(0.0));

    let mut paused = counting(1000.0);
    paused.pause(10.0);
    assert!(paused.begin_dismiss(20.0));
    assert_eq!(paused.phase(), ToastPhase::Dismissing);
}

#[test]
fn dismissing_ignores_further_transitions() {
    let mut toast = counting(1000.0);
    assert!(toast.begin_dismiss(100.0));
    assert!(!toast.begin_dismiss(150.0));
    assert!(!toast.pause(150.0));
    assert!(!toast.resume(150.0));
    assert!(!toast.start_countdown(150.0));
    assert_eq!(toast.tick(5000.0), Tick::Idle);
}

#[test]
fn removed_is_terminal() {
    let mut toast = counting(1000.0);
    assert!(!toast.finish_removal());
    toast.begin_dismiss(10.0);
    assert!(toast.finish_removal());
    assert_eq!(toast.phase(), ToastPhase::Removed);

    assert!(!toast.finish_removal());
    assert!(!toast.begin_dismiss(20.0));
    assert!(!toast.start_countdown(20.0));
    assert!(!toast.resume(20.0));
    assert_eq!(toast.phase(), ToastPhase::Removed);
}
