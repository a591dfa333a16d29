//! The control loop: measure, classify, update, act, sleep.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use mirror_traits::{Clock, DistanceSensor, LightOutput, PowerManager};
use tracing::{info, trace, warn};

use crate::builder::{ControlLoopBuilder, Missing};
use crate::config::DistanceBand;
use crate::error::Result;
use crate::light::LightController;
use crate::presence::{PresenceDetector, classify};
use crate::status::{Edge, PresenceState, StepReport};

/// Counters accumulated over the loop's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub polls: u64,
    pub activations: u64,
    pub deactivations: u64,
    pub failed_readings: u64,
    /// Light transitions that returned an error (logged, loop continued).
    pub light_errors: u64,
}

/// Owns the sensor, light, and detector; runs on the calling thread.
pub struct ControlLoop {
    pub(crate) sensor: Box<dyn DistanceSensor + Send>,
    pub(crate) light: LightController<Box<dyn LightOutput + Send>>,
    pub(crate) power: Option<Box<dyn PowerManager + Send>>,
    pub(crate) detector: PresenceDetector,
    pub(crate) band: DistanceBand,
    pub(crate) poll_interval_ms: u64,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,
    pub(crate) stats: LoopStats,
}

impl core::fmt::Debug for ControlLoop {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ControlLoop")
            .field("sensor", &self.sensor.sensor_kind())
            .field("state", &self.detector.state())
            .field("light", &self.light)
            .field("band", &self.band)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("stats", &self.stats)
            .finish()
    }
}

impl ControlLoop {
    pub fn builder() -> ControlLoopBuilder<Missing, Missing> {
        ControlLoopBuilder::default()
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn state(&self) -> PresenceState {
        self.detector.state()
    }

    pub fn detector(&self) -> &PresenceDetector {
        &self.detector
    }

    pub fn light(&self) -> &LightController<Box<dyn LightOutput + Send>> {
        &self.light
    }

    pub fn band(&self) -> DistanceBand {
        self.band
    }

    pub fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
    }

    pub fn sensor_kind(&self) -> &'static str {
        self.sensor.sensor_kind()
    }

    /// Milliseconds of loop time since construction.
    pub fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    /// One poll without the trailing sleep.
    ///
    /// Light failures are logged and counted; the detector keeps its state so
    /// the next edge is still acted on.
    pub fn step(&mut self) -> StepReport {
        let reading = self.sensor.measure();
        let present = classify(reading, &self.band);
        let now_ms = self.now_ms();
        let edge = self.detector.update(present, now_ms);
        let state = self.detector.state();

        self.stats.polls += 1;
        if !reading.is_valid() {
            self.stats.failed_readings += 1;
        }
        trace!(
            distance_cm = reading.sentinel_cm(),
            present,
            state = %state,
            "poll"
        );

        match edge {
            Edge::ActivatedNow => {
                self.stats.activations += 1;
                if let Err(e) = self.light.on() {
                    self.stats.light_errors += 1;
                    warn!(error = %e, edge = edge.as_str(), "light on failed");
                }
            }
            Edge::DeactivatedNow => {
                self.stats.deactivations += 1;
                if let Err(e) = self.light.off() {
                    self.stats.light_errors += 1;
                    warn!(error = %e, edge = edge.as_str(), "light off failed");
                }
            }
            Edge::NoChange => {}
        }

        StepReport {
            reading,
            present,
            state,
            edge,
            now_ms,
        }
    }

    /// Block for one poll interval through the power manager (or the clock
    /// when none was supplied).
    pub fn sleep(&mut self) {
        match self.power.as_mut() {
            Some(p) => p.sleep(self.poll_interval_ms),
            None => self.clock.sleep(Duration::from_millis(self.poll_interval_ms)),
        }
    }

    /// Poll until `shutdown` is set, or `max_polls` polls have run.
    /// The flag is checked once per poll, before measuring.
    pub fn run(&mut self, max_polls: Option<u64>, shutdown: &AtomicBool) -> LoopStats {
        info!(
            sensor = self.sensor.sensor_kind(),
            poll_interval_ms = self.poll_interval_ms,
            "control loop started"
        );
        let mut n = 0u64;
        while !shutdown.load(Ordering::Relaxed) {
            if max_polls.is_some_and(|max| n >= max) {
                break;
            }
            self.step();
            n += 1;
            self.sleep();
        }
        info!(
            polls = self.stats.polls,
            activations = self.stats.activations,
            deactivations = self.stats.deactivations,
            "control loop stopped"
        );
        self.stats
    }

    /// Run exactly `polls` polls.
    pub fn run_for(&mut self, polls: u64) -> LoopStats {
        self.run(Some(polls), &AtomicBool::new(false))
    }

    /// Turn the light off (with its normal fade) and reset the detector.
    pub fn shutdown(&mut self) -> Result<()> {
        self.detector.reset();
        self.light.off()?;
        Ok(())
    }
}
