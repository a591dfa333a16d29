use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Wait until `read_level()` returns `want`, or `deadline` passes.
///
/// Returns the instant at which the level was observed. A zero `poll_interval`
/// busy-spins, which is what microsecond pulse timing needs; a non-zero one
/// sleeps between checks.
pub fn wait_for_level(
    mut read_level: impl FnMut() -> bool,
    want: bool,
    deadline: Instant,
    poll_interval: Duration,
) -> Result<Instant> {
    loop {
        if read_level() == want {
            return Ok(Instant::now());
        }
        if Instant::now() >= deadline {
            return Err(HwError::LevelTimeout);
        }
        if poll_interval.is_zero() {
            std::hint::spin_loop();
        } else {
            std::thread::sleep(poll_interval);
        }
    }
}

/// Measure the width of the next high pulse, in the manner of a
/// `pulse_in(pin, HIGH, timeout)`: wait for the rising edge, then for the
/// falling edge, each bounded by `timeout`. `Ok(None)` means no complete pulse.
pub fn measure_high_pulse(
    mut read_level: impl FnMut() -> bool,
    timeout: Duration,
) -> Result<Option<Duration>> {
    let start_deadline = Instant::now() + timeout;
    let rise = match wait_for_level(&mut read_level, true, start_deadline, Duration::ZERO) {
        Ok(t) => t,
        Err(HwError::LevelTimeout) => return Ok(None),
        Err(e) => return Err(e),
    };
    match wait_for_level(&mut read_level, false, rise + timeout, Duration::ZERO) {
        Ok(fall) => Ok(Some(fall.saturating_duration_since(rise))),
        Err(HwError::LevelTimeout) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Busy-wait for `us` microseconds; sleeping is far too coarse at this scale.
#[inline]
pub fn spin_delay_us(us: u32) {
    let deadline = Instant::now() + Duration::from_micros(u64::from(us));
    while Instant::now() < deadline {
        std::hint::spin_loop();
    }
}
