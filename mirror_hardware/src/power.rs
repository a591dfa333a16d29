//! Inter-poll sleep strategies.

use std::sync::Arc;
use std::time::{Duration, Instant};

use mirror_traits::{Clock, PowerManager};

/// How the control loop waits between polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SleepMode {
    /// Yield the CPU for the whole interval.
    #[default]
    Idle,
    /// Spin until the deadline; tighter wake-up, more power.
    Busy,
}

/// Sleeps through a `Clock`, so a test clock advances instead of blocking.
#[derive(Clone)]
pub struct ClockSleep {
    clock: Arc<dyn Clock + Send + Sync>,
}

impl ClockSleep {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self { clock }
    }
}

impl PowerManager for ClockSleep {
    fn sleep(&mut self, duration_ms: u64) {
        self.clock.sleep(Duration::from_millis(duration_ms));
    }
}

/// Spins on the wall clock until the interval has elapsed.
#[derive(Debug, Default, Clone, Copy)]
pub struct BusyWait;

impl PowerManager for BusyWait {
    fn sleep(&mut self, duration_ms: u64) {
        let deadline = Instant::now() + Duration::from_millis(duration_ms);
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}

/// Power manager for the configured mode.
pub fn for_mode(
    mode: SleepMode,
    clock: Arc<dyn Clock + Send + Sync>,
) -> Box<dyn PowerManager + Send> {
    match mode {
        SleepMode::Idle => Box::new(ClockSleep::new(clock)),
        SleepMode::Busy => Box::new(BusyWait),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_traits::clock::test_clock::TestClock;

    #[test]
    fn clock_sleep_advances_test_clock() {
        let clock = TestClock::new();
        let epoch = clock.now();
        let mut pm = ClockSleep::new(Arc::new(clock.clone()));
        pm.sleep(100);
        pm.sleep(100);
        assert_eq!(clock.ms_since(epoch), 200);
    }

    #[test]
    fn busy_wait_blocks_at_least_the_interval() {
        let start = Instant::now();
        BusyWait.sleep(2);
        assert!(start.elapsed() >= Duration::from_millis(2));
    }
}
