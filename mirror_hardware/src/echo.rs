//! Trigger/echo ranging (HC-SR04, AJ-SR04M, JSN-SR04T and compatibles).
//!
//! A measurement is a 10µs trigger pulse followed by timing the high pulse
//! on the echo line; the pulse width is the acoustic round trip.

use mirror_traits::{DistanceSensor, ReadFailure, Reading};
use tracing::{debug, trace};

use crate::error::Result;

/// Default echo timeout, roughly a 5m round trip.
pub const DEFAULT_TIMEOUT_US: u32 = 30_000;
/// Microseconds of one-way travel per centimeter.
pub const DEFAULT_SOUND_DIVISOR: f32 = 29.1;

const TRIGGER_SETTLE_US: u32 = 2;
const TRIGGER_PULSE_US: u32 = 10;

/// Pin-level access an echo ranger needs.
pub trait EchoPort {
    fn set_trigger(&mut self, high: bool) -> Result<()>;
    fn delay_us(&mut self, us: u32);
    /// Width of the next high pulse on the echo line, or `None` when no
    /// complete pulse arrived within `timeout_us`.
    fn pulse_width_us(&mut self, timeout_us: u32) -> Result<Option<u32>>;
}

/// Transducer parameters; both vary between sensor models.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EchoParams {
    pub timeout_us: u32,
    pub sound_divisor: f32,
}

impl Default for EchoParams {
    fn default() -> Self {
        Self {
            timeout_us: DEFAULT_TIMEOUT_US,
            sound_divisor: DEFAULT_SOUND_DIVISOR,
        }
    }
}

/// Convert an echo pulse width into a one-way distance in centimeters.
#[inline]
pub fn echo_to_cm(duration_us: u32, sound_divisor: f32) -> f32 {
    (duration_us as f32 / 2.0) / sound_divisor
}

pub struct EchoTimingSensor<P: EchoPort> {
    port: P,
    params: EchoParams,
}

impl<P: EchoPort> EchoTimingSensor<P> {
    /// Take ownership of the port and park the trigger line low.
    pub fn new(mut port: P, params: EchoParams) -> Result<Self> {
        port.set_trigger(false)?;
        Ok(Self { port, params })
    }

    pub fn params(&self) -> EchoParams {
        self.params
    }

    fn send_trigger_pulse(&mut self) -> Result<()> {
        self.port.set_trigger(false)?;
        self.port.delay_us(TRIGGER_SETTLE_US);
        self.port.set_trigger(true)?;
        self.port.delay_us(TRIGGER_PULSE_US);
        self.port.set_trigger(false)
    }
}

impl<P: EchoPort> DistanceSensor for EchoTimingSensor<P> {
    fn measure(&mut self) -> Reading {
        if let Err(e) = self.send_trigger_pulse() {
            debug!(error = %e, "echo trigger failed");
            return Reading::Failed(ReadFailure::Bus);
        }
        match self.port.pulse_width_us(self.params.timeout_us) {
            Ok(Some(duration_us)) => {
                let cm = echo_to_cm(duration_us, self.params.sound_divisor);
                trace!(duration_us, distance_cm = cm, "echo");
                Reading::from_cm(cm)
            }
            Ok(None) => {
                debug!(timeout_us = self.params.timeout_us, "no echo");
                Reading::Failed(ReadFailure::Timeout)
            }
            Err(e) => {
                debug!(error = %e, "echo read failed");
                Reading::Failed(ReadFailure::Bus)
            }
        }
    }

    fn sensor_kind(&self) -> &'static str {
        "ultrasonic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimEchoPort;

    #[test]
    fn trigger_sequence_is_low_high_low_with_2_and_10_us() {
        let port = SimEchoPort::with_pulse_us(1000);
        let probe = port.clone();
        let mut sensor = EchoTimingSensor::new(port, EchoParams::default()).unwrap();
        probe.clear_log();

        let _ = sensor.measure();

        assert_eq!(probe.trigger_log(), vec![false, true, false]);
        assert_eq!(probe.delays_us(), vec![2, 10]);
    }

    #[test]
    fn custom_divisor_is_honoured() {
        let params = EchoParams {
            timeout_us: 30_000,
            sound_divisor: 20.0,
        };
        let mut sensor = EchoTimingSensor::new(SimEchoPort::with_pulse_us(1000), params).unwrap();
        assert_eq!(sensor.measure(), Reading::Cm(25.0));
    }
}
