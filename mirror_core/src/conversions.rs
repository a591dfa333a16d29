//! `From` impls mapping the TOML schema onto runtime config types.

use crate::config::{DistanceBand, LightMode, LoopCfg, PresenceCfg};

// ── Sensor ───────────────────────────────────────────────────────────────────

impl From<&mirror_config::SensorCfg> for DistanceBand {
    fn from(s: &mirror_config::SensorCfg) -> Self {
        DistanceBand {
            min_cm: s.min_distance_cm,
            max_cm: s.max_distance_cm,
        }
    }
}

// ── Timing ───────────────────────────────────────────────────────────────────

impl From<&mirror_config::TimingCfg> for PresenceCfg {
    fn from(t: &mirror_config::TimingCfg) -> Self {
        PresenceCfg {
            activation_ms: t.activation_ms,
            timeout_ms: t.timeout_ms,
        }
    }
}

impl From<&mirror_config::TimingCfg> for LoopCfg {
    fn from(t: &mirror_config::TimingCfg) -> Self {
        LoopCfg {
            poll_interval_ms: t.poll_interval_ms,
        }
    }
}

// ── Light ────────────────────────────────────────────────────────────────────

impl From<&mirror_config::LightCfg> for LightMode {
    fn from(l: &mirror_config::LightCfg) -> Self {
        if l.use_fade {
            LightMode::Fade {
                duration_ms: l.fade_duration_ms,
                steps: l.fade_steps,
            }
        } else {
            LightMode::Discrete {
                inverted: l.inverted,
            }
        }
    }
}
