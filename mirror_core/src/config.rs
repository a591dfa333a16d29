//! Runtime configuration for the control loop.
//!
//! Separate from the TOML schema in `mirror_config`; see `conversions` for
//! the mapping.

/// Presence band in centimeters: `min_cm <= d < max_cm`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceBand {
    /// Anything closer is treated as sensor noise, not presence.
    pub min_cm: f32,
    /// Exclusive upper bound.
    pub max_cm: f32,
}

impl Default for DistanceBand {
    fn default() -> Self {
        Self {
            min_cm: 3.0,
            max_cm: 40.0,
        }
    }
}

impl DistanceBand {
    #[inline]
    pub fn contains(&self, cm: f32) -> bool {
        cm >= self.min_cm && cm < self.max_cm
    }
}

/// Hysteresis dwell times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceCfg {
    /// Uninterrupted presence before activation.
    pub activation_ms: u64,
    /// Uninterrupted absence before deactivation.
    pub timeout_ms: u64,
}

impl Default for PresenceCfg {
    fn default() -> Self {
        Self {
            activation_ms: 1000,
            timeout_ms: 3000,
        }
    }
}

/// How the light is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightMode {
    /// Plain on/off line. `inverted` drives low for "on".
    Discrete { inverted: bool },
    /// Linear duty ramp over `duration_ms` in `steps` equal steps.
    Fade { duration_ms: u64, steps: u32 },
}

impl Default for LightMode {
    fn default() -> Self {
        LightMode::Fade {
            duration_ms: 600,
            steps: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopCfg {
    pub poll_interval_ms: u64,
}

impl Default for LoopCfg {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
        }
    }
}
