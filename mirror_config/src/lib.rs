#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the mirror light.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated once
//!   at startup; nothing is reloaded at runtime.
//! - Every section except `[pins]` has working defaults, so a minimal file
//!   only needs to name the light pin (and trigger/echo for ultrasonic).
use std::path::Path;

use serde::Deserialize;

/// Sensor selection and its measurement parameters.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SensorCfg {
    /// Registry name of the driver: "vl53l0x" or "ultrasonic".
    pub kind: String,
    /// Readings below this are treated as noise (cm).
    pub min_distance_cm: f32,
    /// Presence band upper bound, exclusive (cm).
    pub max_distance_cm: f32,
    /// Echo wait budget for ultrasonic sensors (µs).
    pub timeout_us: u32,
    /// One-way µs per cm for ultrasonic sensors.
    pub sound_speed_divisor: f32,
    pub i2c_bus: u8,
    pub i2c_address: u16,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            kind: "vl53l0x".to_string(),
            min_distance_cm: 3.0,
            max_distance_cm: 40.0,
            timeout_us: 30_000,
            sound_speed_divisor: 29.1,
            i2c_bus: 1,
            i2c_address: 0x29,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Pins {
    /// Ultrasonic trigger output (BCM numbering).
    pub trigger: Option<u8>,
    /// Ultrasonic echo input.
    pub echo: Option<u8>,
    /// Light output (LED driver / MOSFET gate).
    pub light: u8,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TimingCfg {
    /// Uninterrupted presence required before the light turns on.
    pub activation_ms: u64,
    /// Uninterrupted absence required before the light turns off.
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            activation_ms: 1000,
            timeout_ms: 3000,
            poll_interval_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LightCfg {
    /// Drive the line low for "on" (active-low drivers). Discrete mode only.
    pub inverted: bool,
    pub use_fade: bool,
    pub fade_duration_ms: u64,
    pub fade_steps: u32,
    pub pwm_freq_hz: u32,
}

impl Default for LightCfg {
    fn default() -> Self {
        Self {
            inverted: false,
            use_fade: true,
            fade_duration_ms: 600,
            fade_steps: 50,
            pwm_freq_hz: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PowerMode {
    /// Yield the CPU between polls.
    #[default]
    Idle,
    /// Spin between polls.
    Busy,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PowerCfg {
    pub mode: PowerMode,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub sensor: SensorCfg,
    pub pins: Pins,
    #[serde(default)]
    pub timing: TimingCfg,
    #[serde(default)]
    pub light: LightCfg,
    #[serde(default)]
    pub power: PowerCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a config file. Does not validate.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {}", path.display(), e))
}

const HOUR_MS: u64 = 60 * 60 * 1000;

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Sensor
        let s = &self.sensor;
        if !s.min_distance_cm.is_finite() || !s.max_distance_cm.is_finite() {
            eyre::bail!("sensor distances must be finite");
        }
        if s.min_distance_cm < 0.0 {
            eyre::bail!("sensor.min_distance_cm must be >= 0");
        }
        if s.max_distance_cm <= s.min_distance_cm {
            eyre::bail!("sensor.max_distance_cm must be > sensor.min_distance_cm");
        }
        if s.timeout_us == 0 {
            eyre::bail!("sensor.timeout_us must be > 0");
        }
        if !(s.sound_speed_divisor.is_finite() && s.sound_speed_divisor > 0.0) {
            eyre::bail!("sensor.sound_speed_divisor must be > 0");
        }
        if s.i2c_address > 0x7F {
            eyre::bail!("sensor.i2c_address must be a 7-bit address (<= 0x7f)");
        }
        // An unknown kind is left to the sensor registry, which can list what exists.
        if s.kind == "ultrasonic" && (self.pins.trigger.is_none() || self.pins.echo.is_none()) {
            eyre::bail!("pins.trigger and pins.echo are required for the ultrasonic sensor");
        }

        // Timing
        let t = &self.timing;
        if t.activation_ms > HOUR_MS {
            eyre::bail!("timing.activation_ms is unreasonably large (>1h)");
        }
        if t.timeout_ms > HOUR_MS {
            eyre::bail!("timing.timeout_ms is unreasonably large (>1h)");
        }
        if t.poll_interval_ms == 0 {
            eyre::bail!("timing.poll_interval_ms must be >= 1");
        }
        if t.poll_interval_ms > 60_000 {
            eyre::bail!("timing.poll_interval_ms is unreasonably large (>60s)");
        }

        // Light
        if self.light.use_fade && self.light.fade_steps == 0 {
            eyre::bail!("light.fade_steps must be >= 1 when use_fade is set");
        }
        if self.light.fade_duration_ms > 60_000 {
            eyre::bail!("light.fade_duration_ms is unreasonably large (>60s)");
        }
        if self.light.pwm_freq_hz == 0 {
            eyre::bail!("light.pwm_freq_hz must be > 0");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}
