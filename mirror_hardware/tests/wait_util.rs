use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::{Duration, Instant};

use mirror_hardware::error::HwError;
use mirror_hardware::util::{measure_high_pulse, wait_for_level};

#[test]
fn wait_for_level_success_path() {
    let high = Arc::new(AtomicBool::new(true));
    let high_bg = high.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(3));
        high_bg.store(false, Ordering::Relaxed);
    });

    let res = wait_for_level(
        || high.load(Ordering::Relaxed),
        false,
        Instant::now() + Duration::from_millis(200),
        Duration::from_micros(200),
    );
    assert!(res.is_ok(), "expected success, got {res:?}");
}

#[test]
fn wait_for_level_timeout_path() {
    let err = wait_for_level(
        || true,
        false,
        Instant::now() + Duration::from_millis(5),
        Duration::ZERO,
    )
    .expect_err("expected timeout error");

    match err {
        HwError::LevelTimeout => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn pulse_that_never_rises_is_none() {
    let res = measure_high_pulse(|| false, Duration::from_millis(2)).unwrap();
    assert_eq!(res, None);
}

#[test]
fn pulse_that_never_falls_is_none() {
    let res = measure_high_pulse(|| true, Duration::from_millis(2)).unwrap();
    assert_eq!(res, None);
}

#[test]
fn scripted_pulse_width_is_measured() {
    // Low for a few polls, then high for ~2ms, then low.
    let mut polls = 0u32;
    let mut rose_at: Option<Instant> = None;
    let res = measure_high_pulse(
        || {
            polls += 1;
            if polls < 5 {
                return false;
            }
            let t = *rose_at.get_or_insert_with(Instant::now);
            t.elapsed() < Duration::from_millis(2)
        },
        Duration::from_millis(50),
    )
    .unwrap()
    .expect("pulse");
    assert!(res >= Duration::from_millis(1), "width {res:?}");
    assert!(res < Duration::from_millis(50));
}
