//! Test and helper mocks for mirror_core.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use mirror_traits::{DistanceSensor, ReadFailure, Reading};

/// A sensor that replays a fixed script, then repeats its last reading
/// (or times out when the script was empty).
#[derive(Debug, Clone)]
pub struct ScriptedSensor {
    script: VecDeque<Reading>,
    last: Reading,
}

impl ScriptedSensor {
    pub fn new(readings: impl IntoIterator<Item = Reading>) -> Self {
        Self {
            script: readings.into_iter().collect(),
            last: Reading::Failed(ReadFailure::Timeout),
        }
    }

    /// Script from flat centimeter values; negative values are failures.
    pub fn from_cm(values: &[f32]) -> Self {
        Self::new(values.iter().map(|&v| Reading::from_cm(v)))
    }
}

impl DistanceSensor for ScriptedSensor {
    fn measure(&mut self) -> Reading {
        if let Some(r) = self.script.pop_front() {
            self.last = r;
        }
        self.last
    }

    fn sensor_kind(&self) -> &'static str {
        "scripted"
    }
}

/// One write observed by `RecordingLight`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightOp {
    Level(bool),
    Duty(u16),
}

/// Light output that records every write; clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingLight {
    ops: Arc<Mutex<Vec<LightOp>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingLight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<LightOp> {
        self.ops.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Duty values written, in order.
    pub fn duties(&self) -> Vec<u16> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                LightOp::Duty(d) => Some(d),
                LightOp::Level(_) => None,
            })
            .collect()
    }

    /// Make subsequent writes fail.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    fn record(&self, op: LightOp) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(Box::new(std::io::Error::other("recording light: write refused")));
        }
        if let Ok(mut g) = self.ops.lock() {
            g.push(op);
        }
        Ok(())
    }
}

impl mirror_traits::LightOutput for RecordingLight {
    fn set_level(&mut self, high: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.record(LightOp::Level(high))
    }

    fn set_duty(&mut self, duty: u16) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.record(LightOp::Duty(duty))
    }
}
