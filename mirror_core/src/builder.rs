//! Type-state builder for `ControlLoop`.
//!
//! The builder enforces at compile time that a sensor and a light output
//! are provided before `build()` is available. `try_build()` is always
//! available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use mirror_traits::clock::{Clock, MonotonicClock};
use mirror_traits::{DistanceSensor, LightOutput, PowerManager};

use crate::config::{DistanceBand, LightMode, LoopCfg, PresenceCfg};
use crate::error::{BuildError, Result};
use crate::light::LightController;
use crate::presence::PresenceDetector;
use crate::runner::{ControlLoop, LoopStats};

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `ControlLoop`. All fields are validated on `build()`.
pub struct ControlLoopBuilder<S, L> {
    sensor: Option<Box<dyn DistanceSensor + Send>>,
    light: Option<Box<dyn LightOutput + Send>>,
    power: Option<Box<dyn PowerManager + Send>>,
    band: DistanceBand,
    presence: PresenceCfg,
    light_mode: LightMode,
    loop_cfg: LoopCfg,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    _s: PhantomData<S>,
    _l: PhantomData<L>,
}

impl Default for ControlLoopBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            sensor: None,
            light: None,
            power: None,
            band: DistanceBand::default(),
            presence: PresenceCfg::default(),
            light_mode: LightMode::default(),
            loop_cfg: LoopCfg::default(),
            clock: None,
            _s: PhantomData,
            _l: PhantomData,
        }
    }
}

impl<S, L> ControlLoopBuilder<S, L> {
    fn retype<S2, L2>(self) -> ControlLoopBuilder<S2, L2> {
        ControlLoopBuilder {
            sensor: self.sensor,
            light: self.light,
            power: self.power,
            band: self.band,
            presence: self.presence,
            light_mode: self.light_mode,
            loop_cfg: self.loop_cfg,
            clock: self.clock,
            _s: PhantomData,
            _l: PhantomData,
        }
    }

    pub fn with_power(mut self, power: impl PowerManager + Send + 'static) -> Self {
        self.power = Some(Box::new(power));
        self
    }

    pub fn with_band(mut self, band: DistanceBand) -> Self {
        self.band = band;
        self
    }

    pub fn with_presence(mut self, presence: PresenceCfg) -> Self {
        self.presence = presence;
        self
    }

    pub fn with_light_mode(mut self, mode: LightMode) -> Self {
        self.light_mode = mode;
        self
    }

    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.loop_cfg.poll_interval_ms = ms;
        self
    }

    /// Clock for timestamps, fade steps, and (without a power manager) poll sleeps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Take band, dwell times, light mode, and poll interval from a loaded config.
    pub fn apply_config(mut self, cfg: &mirror_config::Config) -> Self {
        self.band = DistanceBand::from(&cfg.sensor);
        self.presence = PresenceCfg::from(&cfg.timing);
        self.light_mode = LightMode::from(&cfg.light);
        self.loop_cfg = LoopCfg::from(&cfg.timing);
        self
    }

    /// Build without compile-time guarantees; missing parts become `BuildError`s.
    pub fn try_build(self) -> Result<ControlLoop> {
        let Some(sensor) = self.sensor else {
            return Err(eyre::Report::new(BuildError::MissingSensor));
        };
        let Some(light) = self.light else {
            return Err(eyre::Report::new(BuildError::MissingLight));
        };
        validate_and_build(
            sensor,
            light,
            self.power,
            self.band,
            self.presence,
            self.light_mode,
            self.loop_cfg,
            self.clock,
        )
    }
}

impl<L> ControlLoopBuilder<Missing, L> {
    pub fn with_sensor(mut self, sensor: impl DistanceSensor + Send + 'static) -> ControlLoopBuilder<Set, L> {
        self.sensor = Some(Box::new(sensor));
        self.retype()
    }
}

impl<S> ControlLoopBuilder<S, Missing> {
    pub fn with_light(mut self, light: impl LightOutput + Send + 'static) -> ControlLoopBuilder<S, Set> {
        self.light = Some(Box::new(light));
        self.retype()
    }
}

impl ControlLoopBuilder<Set, Set> {
    pub fn build(self) -> Result<ControlLoop> {
        self.try_build()
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

/// Validate configuration and construct the loop.
#[allow(clippy::too_many_arguments)]
fn validate_and_build(
    sensor: Box<dyn DistanceSensor + Send>,
    light: Box<dyn LightOutput + Send>,
    power: Option<Box<dyn PowerManager + Send>>,
    band: DistanceBand,
    presence: PresenceCfg,
    light_mode: LightMode,
    loop_cfg: LoopCfg,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
) -> Result<ControlLoop> {
    // ── Validation ───────────────────────────────────────────────────────────
    if !band.min_cm.is_finite() || !band.max_cm.is_finite() {
        return Err(invalid("distance band must be finite"));
    }
    if band.min_cm < 0.0 {
        return Err(invalid("min distance must be >= 0"));
    }
    if band.max_cm <= band.min_cm {
        return Err(invalid("max distance must be > min distance"));
    }
    if loop_cfg.poll_interval_ms == 0 {
        return Err(invalid("poll interval must be >= 1 ms"));
    }
    if let LightMode::Fade { steps: 0, .. } = light_mode {
        return Err(invalid("fade steps must be >= 1"));
    }

    // ── Construction ─────────────────────────────────────────────────────────
    let clock: Arc<dyn Clock + Send + Sync> = clock.unwrap_or_else(|| Arc::new(MonotonicClock::new()));
    let light = LightController::new(light, light_mode, clock.clone())?;
    let epoch = clock.now();

    Ok(ControlLoop {
        sensor,
        light,
        power,
        detector: PresenceDetector::new(presence),
        band,
        poll_interval_ms: loop_cfg.poll_interval_ms,
        clock,
        epoch,
        stats: LoopStats::default(),
    })
}
