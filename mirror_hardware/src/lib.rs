//! Distance-sensor drivers, the sensor registry, and light/power backends.
//!
//! Drivers are generic over small port traits (`EchoPort`, `RegisterBus`) so
//! the protocol logic runs unchanged on simulated buses and on Raspberry Pi
//! GPIO/I2C (`hardware` feature).

pub mod echo;
pub mod error;
pub mod power;
pub mod registry;
pub mod sim;
pub mod tof;
pub mod util;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod rpi;

pub use echo::{EchoParams, EchoPort, EchoTimingSensor};
pub use error::HwError;
pub use registry::{BoxedSensor, RegistryError, SensorKind, SensorParams, SensorRegistry};
pub use sim::{SimEchoPort, SimRegisterBus, SimulatedLight};
pub use tof::{RegisterBus, TimeOfFlightSensor};
