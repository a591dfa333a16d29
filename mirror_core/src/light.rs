//! Light output control: discrete switching or a stepped PWM fade.

use std::sync::Arc;
use std::time::Duration;

use mirror_traits::{Clock, LightOutput};
use tracing::{debug, info};

use crate::config::LightMode;
use crate::error::CoreError;
use crate::hw_error::map_hw_error;

/// Full-scale duty (16-bit).
pub const MAX_DUTY: u16 = u16::MAX;

/// Drives a `LightOutput` on/off, optionally fading.
///
/// In fade mode `is_on()` changes only after the ramp has completed, so a
/// reader mid-fade sees the pre-transition value. The fade blocks the
/// calling thread; its sleeps go through the clock.
pub struct LightController<L: LightOutput> {
    out: L,
    mode: LightMode,
    clock: Arc<dyn Clock + Send + Sync>,
    is_on: bool,
    level: u16,
}

impl<L: LightOutput> core::fmt::Debug for LightController<L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LightController")
            .field("mode", &self.mode)
            .field("is_on", &self.is_on)
            .field("level", &self.level)
            .finish()
    }
}

fn out_err(e: Box<dyn std::error::Error + Send + Sync>) -> CoreError {
    map_hw_error(e.as_ref())
}

impl<L: LightOutput> LightController<L> {
    /// Take the output and drive it to "off" (line at its off level, or duty 0).
    pub fn new(
        mut out: L,
        mode: LightMode,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Result<Self, CoreError> {
        match mode {
            LightMode::Discrete { inverted } => out.set_level(inverted).map_err(out_err)?,
            LightMode::Fade { .. } => out.set_duty(0).map_err(out_err)?,
        }
        Ok(Self {
            out,
            mode,
            clock,
            is_on: false,
            level: 0,
        })
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    /// Current duty (fade mode) or `0`/`MAX_DUTY` (discrete).
    pub fn level(&self) -> u16 {
        self.level
    }

    pub fn mode(&self) -> LightMode {
        self.mode
    }

    /// Turn on. No-op when already on; never restarts a fade.
    pub fn on(&mut self) -> Result<(), CoreError> {
        if self.is_on {
            return Ok(());
        }
        self.drive(true)?;
        self.is_on = true;
        info!(level = self.level, "light on");
        Ok(())
    }

    /// Turn off. No-op when already off.
    pub fn off(&mut self) -> Result<(), CoreError> {
        if !self.is_on {
            return Ok(());
        }
        self.drive(false)?;
        self.is_on = false;
        info!("light off");
        Ok(())
    }

    pub fn toggle(&mut self) -> Result<(), CoreError> {
        if self.is_on { self.off() } else { self.on() }
    }

    /// Jump straight to `percent` brightness (clamped to 100). Fade mode only;
    /// a no-op for a discrete light.
    pub fn set_brightness(&mut self, percent: u8) -> Result<(), CoreError> {
        if matches!(self.mode, LightMode::Discrete { .. }) {
            return Ok(());
        }
        let percent = percent.min(100);
        let duty = (u32::from(percent) * u32::from(MAX_DUTY) / 100) as u16;
        self.out.set_duty(duty).map_err(out_err)?;
        self.level = duty;
        self.is_on = percent > 0;
        debug!(percent, duty, "brightness set");
        Ok(())
    }

    fn drive(&mut self, on: bool) -> Result<(), CoreError> {
        match self.mode {
            LightMode::Discrete { inverted } => {
                self.out.set_level(on != inverted).map_err(out_err)?;
                self.level = if on { MAX_DUTY } else { 0 };
                Ok(())
            }
            LightMode::Fade { duration_ms, steps } => {
                let target = if on { MAX_DUTY } else { 0 };
                self.fade_to(target, duration_ms, steps)
            }
        }
    }

    /// Linear ramp from the current level to `target`.
    ///
    /// The per-step delta is floored, so a downward ramp can overshoot
    /// below zero before the clamp; the last step writes `target` itself.
    fn fade_to(&mut self, target: u16, duration_ms: u64, steps: u32) -> Result<(), CoreError> {
        let steps = steps.max(1);
        let delay = Duration::from_millis(duration_ms / u64::from(steps));
        let start = i64::from(self.level);
        let delta = (i64::from(target) - start).div_euclid(i64::from(steps));
        debug!(from = self.level, to = target, steps, "fade");

        for i in 1..=steps {
            let duty = if i == steps {
                target
            } else {
                (start + delta * i64::from(i)).clamp(0, i64::from(MAX_DUTY)) as u16
            };
            self.out.set_duty(duty).map_err(out_err)?;
            self.level = duty;
            self.clock.sleep(delay);
        }
        Ok(())
    }
}
