//! Sensor registry: maps a configured kind name to a driver constructor.
//!
//! Built explicitly at startup and passed down; there is no global table.
//! Construction parameters are a closed enum, so each constructor matches
//! exhaustively on what it accepts.

use std::collections::BTreeMap;
use std::sync::Arc;

use mirror_traits::{Clock, DistanceSensor};
use thiserror::Error;

use crate::echo::{EchoParams, EchoTimingSensor};
use crate::error::HwError;
use crate::sim::{SimEchoPort, SimRegisterBus};
use crate::tof::TimeOfFlightSensor;

pub type BoxedSensor = Box<dyn DistanceSensor + Send>;
pub type Constructor =
    Box<dyn Fn(&SensorParams) -> Result<BoxedSensor, RegistryError> + Send + Sync>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown sensor kind '{kind}' (available: {available})")]
    UnknownSensorKind { kind: String, available: String },
    #[error("sensor kind '{kind}' needs {expected} parameters")]
    ParamsMismatch {
        kind: &'static str,
        expected: &'static str,
    },
    #[error("failed to initialise {kind} sensor: {source}")]
    Init {
        kind: &'static str,
        #[source]
        source: HwError,
    },
}

/// The sensor kinds this crate ships drivers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Ultrasonic,
    Vl53l0x,
}

impl SensorKind {
    pub const ALL: [SensorKind; 2] = [SensorKind::Ultrasonic, SensorKind::Vl53l0x];

    pub fn name(self) -> &'static str {
        match self {
            SensorKind::Ultrasonic => "ultrasonic",
            SensorKind::Vl53l0x => "vl53l0x",
        }
    }
}

/// Construction parameters, one variant per bus type.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorParams {
    Echo {
        trigger_pin: u8,
        echo_pin: u8,
        echo: EchoParams,
    },
    TimeOfFlight {
        i2c_bus: u8,
        address: u16,
    },
}

pub struct SensorRegistry {
    entries: BTreeMap<&'static str, Constructor>,
}

impl core::fmt::Debug for SensorRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SensorRegistry")
            .field("kinds", &self.available_kinds())
            .finish()
    }
}

impl Default for SensorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Associate `kind` with a constructor. A later registration under the
    /// same name replaces the earlier one.
    pub fn register<F>(&mut self, kind: &'static str, ctor: F)
    where
        F: Fn(&SensorParams) -> Result<BoxedSensor, RegistryError> + Send + Sync + 'static,
    {
        self.entries.insert(kind, Box::new(ctor));
    }

    /// Build a sensor of the named kind.
    pub fn create(&self, kind: &str, params: &SensorParams) -> Result<BoxedSensor, RegistryError> {
        let Some(ctor) = self.entries.get(kind) else {
            let available = self.available_kinds();
            return Err(RegistryError::UnknownSensorKind {
                kind: kind.to_string(),
                available: if available.is_empty() {
                    "none".to_string()
                } else {
                    available.join(", ")
                },
            });
        };
        let sensor = ctor(params)?;
        tracing::info!(kind = sensor.sensor_kind(), "sensor created");
        Ok(sensor)
    }

    /// Registered kind names, sorted.
    pub fn available_kinds(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    /// Registry with both drivers over simulated buses. `distance_cm = None`
    /// simulates an empty scene: the echo never returns and the time-of-flight
    /// sensor reports out of range.
    pub fn simulated(distance_cm: Option<f32>, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let mut reg = Self::new();
        reg.register(SensorKind::Ultrasonic.name(), move |params| {
            let SensorParams::Echo { echo, .. } = params else {
                return Err(mismatch(SensorKind::Ultrasonic));
            };
            let port = match distance_cm {
                Some(cm) => {
                    let us = (cm * 2.0 * echo.sound_divisor).round().max(0.0) as u32;
                    SimEchoPort::with_pulse_us(us)
                }
                None => SimEchoPort::silent(),
            };
            let sensor = EchoTimingSensor::new(port, *echo).map_err(init_err(SensorKind::Ultrasonic))?;
            Ok(Box::new(sensor) as BoxedSensor)
        });
        reg.register(SensorKind::Vl53l0x.name(), move |params| {
            let SensorParams::TimeOfFlight { .. } = params else {
                return Err(mismatch(SensorKind::Vl53l0x));
            };
            let mm = distance_cm
                .map(|cm| (cm * 10.0).round().clamp(0.0, f32::from(u16::MAX)) as u16)
                .unwrap_or(crate::tof::OUT_OF_RANGE_MM);
            let bus = SimRegisterBus::with_range_mm(mm);
            let sensor =
                TimeOfFlightSensor::new(bus, clock.clone()).map_err(init_err(SensorKind::Vl53l0x))?;
            Ok(Box::new(sensor) as BoxedSensor)
        });
        reg
    }

    /// Registry with both drivers on Raspberry Pi GPIO / I2C.
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    pub fn hardware(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        use crate::rpi::{RpiEchoPort, RpiI2cBus};

        let mut reg = Self::new();
        reg.register(SensorKind::Ultrasonic.name(), |params| {
            let SensorParams::Echo {
                trigger_pin,
                echo_pin,
                echo,
            } = params
            else {
                return Err(mismatch(SensorKind::Ultrasonic));
            };
            let port = RpiEchoPort::open(*trigger_pin, *echo_pin)
                .map_err(init_err(SensorKind::Ultrasonic))?;
            let sensor = EchoTimingSensor::new(port, *echo).map_err(init_err(SensorKind::Ultrasonic))?;
            Ok(Box::new(sensor) as BoxedSensor)
        });
        reg.register(SensorKind::Vl53l0x.name(), move |params| {
            let SensorParams::TimeOfFlight { i2c_bus, address } = params else {
                return Err(mismatch(SensorKind::Vl53l0x));
            };
            let bus = RpiI2cBus::open(*i2c_bus, *address).map_err(init_err(SensorKind::Vl53l0x))?;
            let sensor =
                TimeOfFlightSensor::new(bus, clock.clone()).map_err(init_err(SensorKind::Vl53l0x))?;
            Ok(Box::new(sensor) as BoxedSensor)
        });
        reg
    }
}

fn mismatch(kind: SensorKind) -> RegistryError {
    RegistryError::ParamsMismatch {
        kind: kind.name(),
        expected: match kind {
            SensorKind::Ultrasonic => "trigger/echo",
            SensorKind::Vl53l0x => "I2C",
        },
    }
}

fn init_err(kind: SensorKind) -> impl Fn(HwError) -> RegistryError {
    move |source| RegistryError::Init {
        kind: kind.name(),
        source,
    }
}
