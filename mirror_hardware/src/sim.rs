//! Simulated buses and outputs for host runs and tests.
//!
//! Every simulator is a cheap handle over shared state: keep a clone to
//! inspect or steer it after the original has been moved into a driver.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use mirror_traits::LightOutput;

use crate::echo::{EchoPort, DEFAULT_SOUND_DIVISOR};
use crate::error::{HwError, Result};
use crate::tof::{reg, EXPECTED_MODEL_ID};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── Echo ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct EchoState {
    queued: VecDeque<Option<u32>>,
    steady: Option<u32>,
    trigger_log: Vec<bool>,
    delays_us: Vec<u32>,
    fail_trigger: bool,
}

/// Echo port whose pulse widths are scripted.
#[derive(Debug, Clone, Default)]
pub struct SimEchoPort {
    state: Arc<Mutex<EchoState>>,
}

impl SimEchoPort {
    /// A port that never sees an echo.
    pub fn silent() -> Self {
        Self::default()
    }

    /// A port that answers every trigger with the same pulse width.
    pub fn with_pulse_us(us: u32) -> Self {
        let port = Self::default();
        locked(&port.state).steady = Some(us);
        port
    }

    /// A port that reports an object at `cm` for the default transducer.
    pub fn with_distance_cm(cm: f32) -> Self {
        let us = (cm * 2.0 * DEFAULT_SOUND_DIVISOR).round().max(0.0) as u32;
        Self::with_pulse_us(us)
    }

    /// Queue one-shot results served before the steady value; `None` is a timeout.
    pub fn push_pulse(&self, pulse: Option<u32>) {
        locked(&self.state).queued.push_back(pulse);
    }

    pub fn set_steady(&self, pulse: Option<u32>) {
        locked(&self.state).steady = pulse;
    }

    pub fn set_fail_trigger(&self, fail: bool) {
        locked(&self.state).fail_trigger = fail;
    }

    pub fn trigger_log(&self) -> Vec<bool> {
        locked(&self.state).trigger_log.clone()
    }

    pub fn delays_us(&self) -> Vec<u32> {
        locked(&self.state).delays_us.clone()
    }

    pub fn clear_log(&self) {
        let mut s = locked(&self.state);
        s.trigger_log.clear();
        s.delays_us.clear();
    }
}

impl EchoPort for SimEchoPort {
    fn set_trigger(&mut self, high: bool) -> Result<()> {
        let mut s = locked(&self.state);
        if s.fail_trigger {
            return Err(HwError::Gpio("simulated trigger fault".into()));
        }
        s.trigger_log.push(high);
        Ok(())
    }

    fn delay_us(&mut self, us: u32) {
        locked(&self.state).delays_us.push(us);
    }

    fn pulse_width_us(&mut self, timeout_us: u32) -> Result<Option<u32>> {
        let mut s = locked(&self.state);
        let pulse = match s.queued.pop_front() {
            Some(p) => p,
            None => s.steady,
        };
        Ok(pulse.filter(|&us| us <= timeout_us))
    }
}

// ── I2C registers ────────────────────────────────────────────────────────────

#[derive(Debug)]
struct RegisterState {
    regs: HashMap<u8, u8>,
    writes: Vec<(u8, u8)>,
    range_block: [u8; 12],
    ready_after: Option<u32>,
    status_reads: u32,
    fail: bool,
}

/// A VL53L0X register file: answers the model ID, raises data-ready after a
/// configurable number of status polls, and serves a scripted range block.
#[derive(Debug, Clone)]
pub struct SimRegisterBus {
    state: Arc<Mutex<RegisterState>>,
}

impl Default for SimRegisterBus {
    fn default() -> Self {
        let mut regs = HashMap::new();
        regs.insert(reg::IDENTIFICATION_MODEL_ID, EXPECTED_MODEL_ID);
        Self {
            state: Arc::new(Mutex::new(RegisterState {
                regs,
                writes: Vec::new(),
                range_block: [0; 12],
                ready_after: Some(1),
                status_reads: 0,
                fail: false,
            })),
        }
    }
}

impl SimRegisterBus {
    /// A sensor reporting an object at `mm`.
    pub fn with_range_mm(mm: u16) -> Self {
        let bus = Self::default();
        bus.set_range_mm(mm);
        bus
    }

    pub fn set_range_mm(&self, mm: u16) {
        let [hi, lo] = mm.to_be_bytes();
        let mut s = locked(&self.state);
        s.range_block[10] = hi;
        s.range_block[11] = lo;
    }

    pub fn set_range_block(&self, block: [u8; 12]) {
        locked(&self.state).range_block = block;
    }

    pub fn set_model_id(&self, id: u8) {
        locked(&self.state)
            .regs
            .insert(reg::IDENTIFICATION_MODEL_ID, id);
    }

    /// Data-ready appears on the n-th status read after a range start;
    /// `None` means it never does.
    pub fn set_ready_after(&self, polls: Option<u32>) {
        locked(&self.state).ready_after = polls;
    }

    pub fn set_fail(&self, fail: bool) {
        locked(&self.state).fail = fail;
    }

    pub fn writes(&self) -> Vec<(u8, u8)> {
        locked(&self.state).writes.clone()
    }

    pub fn status_reads(&self) -> u32 {
        locked(&self.state).status_reads
    }
}

impl crate::tof::RegisterBus for SimRegisterBus {
    fn write_reg(&mut self, r: u8, value: u8) -> Result<()> {
        let mut s = locked(&self.state);
        if s.fail {
            return Err(HwError::I2c("simulated NACK".into()));
        }
        s.writes.push((r, value));
        if r == reg::SYSRANGE_START {
            s.status_reads = 0;
        }
        s.regs.insert(r, value);
        Ok(())
    }

    fn read_reg(&mut self, r: u8) -> Result<u8> {
        let mut s = locked(&self.state);
        if s.fail {
            return Err(HwError::I2c("simulated NACK".into()));
        }
        if r == reg::RESULT_INTERRUPT_STATUS {
            s.status_reads += 1;
            let ready = s.ready_after.is_some_and(|n| s.status_reads >= n);
            return Ok(if ready { 0x07 } else { 0x00 });
        }
        Ok(s.regs.get(&r).copied().unwrap_or(0))
    }

    fn read_regs(&mut self, r: u8, buf: &mut [u8]) -> Result<()> {
        let s = locked(&self.state);
        if s.fail {
            return Err(HwError::I2c("simulated NACK".into()));
        }
        if r == reg::RESULT_RANGE_STATUS {
            let n = buf.len().min(s.range_block.len());
            buf[..n].copy_from_slice(&s.range_block[..n]);
        } else {
            buf.fill(0);
        }
        Ok(())
    }
}

// ── Light ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct LightState {
    level: Option<bool>,
    duty_history: Vec<u16>,
    fail: bool,
}

/// Light output that records what was written to it.
#[derive(Debug, Clone, Default)]
pub struct SimulatedLight {
    state: Arc<Mutex<LightState>>,
}

impl SimulatedLight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last raw level written, if any.
    pub fn level(&self) -> Option<bool> {
        locked(&self.state).level
    }

    /// Last duty written (0 when none yet).
    pub fn duty(&self) -> u16 {
        locked(&self.state).duty_history.last().copied().unwrap_or(0)
    }

    pub fn duty_history(&self) -> Vec<u16> {
        locked(&self.state).duty_history.clone()
    }

    pub fn set_fail(&self, fail: bool) {
        locked(&self.state).fail = fail;
    }
}

impl LightOutput for SimulatedLight {
    fn set_level(&mut self, high: bool) -> std::result::Result<(), BoxError> {
        let mut s = locked(&self.state);
        if s.fail {
            return Err(Box::new(HwError::Gpio("simulated light fault".into())));
        }
        if s.level != Some(high) {
            tracing::debug!(high, "light line (simulated)");
        }
        s.level = Some(high);
        Ok(())
    }

    fn set_duty(&mut self, duty: u16) -> std::result::Result<(), BoxError> {
        let mut s = locked(&self.state);
        if s.fail {
            return Err(Box::new(HwError::Pwm("simulated light fault".into())));
        }
        s.duty_history.push(duty);
        Ok(())
    }
}
