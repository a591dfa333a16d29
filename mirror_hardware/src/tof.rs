//! VL53L0X time-of-flight ranging over I2C.
//!
//! Register addresses and the init sequence must match the silicon exactly.

use std::sync::Arc;
use std::time::Duration;

use mirror_traits::{Clock, DistanceSensor, ReadFailure, Reading};
use tracing::{debug, trace, warn};

use crate::error::Result;

pub const DEFAULT_ADDRESS: u16 = 0x29;
pub const EXPECTED_MODEL_ID: u8 = 0xEE;

/// Register map used by the single-shot ranging path.
pub mod reg {
    pub const SYSRANGE_START: u8 = 0x00;
    pub const SYSTEM_INTERRUPT_CLEAR: u8 = 0x0B;
    pub const RESULT_INTERRUPT_STATUS: u8 = 0x13;
    pub const RESULT_RANGE_STATUS: u8 = 0x14;
    pub const IDENTIFICATION_MODEL_ID: u8 = 0xC0;
}

/// Vendor-mandated writes issued once before the first measurement.
pub const INIT_SEQUENCE: [(u8, u8); 7] = [
    (0x88, 0x00),
    (0x80, 0x01),
    (0xFF, 0x01),
    (0x00, 0x00),
    (0x00, 0x01),
    (0xFF, 0x00),
    (0x80, 0x00),
];

const POLL_INTERVAL: Duration = Duration::from_millis(5);
const POLL_ATTEMPTS: u32 = 100;
const DATA_READY_MASK: u8 = 0x07;
const RANGE_BLOCK_LEN: usize = 12;
const RANGE_MM_OFFSET: usize = 10;
/// Range values at or above this are the sensor's "nothing in range" code.
pub const OUT_OF_RANGE_MM: u16 = 8190;

/// Single-byte register access on a device that is already addressed.
pub trait RegisterBus {
    fn write_reg(&mut self, reg: u8, value: u8) -> Result<()>;
    fn read_reg(&mut self, reg: u8) -> Result<u8>;
    /// Read `buf.len()` consecutive registers starting at `reg`.
    fn read_regs(&mut self, reg: u8, buf: &mut [u8]) -> Result<()>;
}

/// Distance in millimeters from a 12-byte block read at `RESULT_RANGE_STATUS`.
#[inline]
pub fn range_mm(block: &[u8; RANGE_BLOCK_LEN]) -> u16 {
    u16::from_be_bytes([block[RANGE_MM_OFFSET], block[RANGE_MM_OFFSET + 1]])
}

pub struct TimeOfFlightSensor<B: RegisterBus> {
    bus: B,
    clock: Arc<dyn Clock + Send + Sync>,
    model_id: u8,
}

impl<B: RegisterBus> TimeOfFlightSensor<B> {
    /// Check the model ID and run the init sequence.
    ///
    /// A mismatched ID is only logged: clones report other values but range fine.
    pub fn new(mut bus: B, clock: Arc<dyn Clock + Send + Sync>) -> Result<Self> {
        let model_id = bus.read_reg(reg::IDENTIFICATION_MODEL_ID)?;
        if model_id != EXPECTED_MODEL_ID {
            warn!(
                model_id = %format!("{model_id:#04x}"),
                expected = %format!("{EXPECTED_MODEL_ID:#04x}"),
                "unexpected VL53L0X model id; continuing"
            );
        }
        for (r, v) in INIT_SEQUENCE {
            bus.write_reg(r, v)?;
        }
        debug!(model_id, "VL53L0X initialised");
        Ok(Self {
            bus,
            clock,
            model_id,
        })
    }

    /// Model ID read at construction.
    pub fn model_id(&self) -> u8 {
        self.model_id
    }

    fn wait_data_ready(&mut self) -> Result<bool> {
        for _ in 0..POLL_ATTEMPTS {
            self.clock.sleep(POLL_INTERVAL);
            let status = self.bus.read_reg(reg::RESULT_INTERRUPT_STATUS)?;
            if status & DATA_READY_MASK != 0 {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn range_once(&mut self) -> Result<Reading> {
        self.bus.write_reg(reg::SYSRANGE_START, 0x01)?;

        if !self.wait_data_ready()? {
            debug!("VL53L0X data-ready timeout");
            return Ok(Reading::Failed(ReadFailure::Timeout));
        }

        self.bus.write_reg(reg::SYSTEM_INTERRUPT_CLEAR, 0x01)?;

        let mut block = [0u8; RANGE_BLOCK_LEN];
        self.bus.read_regs(reg::RESULT_RANGE_STATUS, &mut block)?;
        let mm = range_mm(&block);
        trace!(distance_mm = mm, "tof range");

        if mm >= OUT_OF_RANGE_MM {
            return Ok(Reading::Failed(ReadFailure::OutOfRange));
        }
        Ok(Reading::Cm(f32::from(mm) / 10.0))
    }
}

impl<B: RegisterBus> DistanceSensor for TimeOfFlightSensor<B> {
    fn measure(&mut self) -> Reading {
        match self.range_once() {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "VL53L0X bus error");
                Reading::Failed(ReadFailure::Bus)
            }
        }
    }

    fn sensor_kind(&self) -> &'static str {
        "vl53l0x"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_big_endian_at_offsets_10_and_11() {
        let mut block = [0u8; 12];
        block[10] = 0x01;
        block[11] = 0x2C;
        assert_eq!(range_mm(&block), 300);
    }
}
