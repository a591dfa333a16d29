pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Why a distance measurement produced no usable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFailure {
    /// No echo / no data-ready within the driver's time budget.
    Timeout,
    /// The sensor answered but the target is beyond its range.
    OutOfRange,
    /// Pin or bus access failed.
    Bus,
}

impl std::fmt::Display for ReadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReadFailure::Timeout => "timeout",
            ReadFailure::OutOfRange => "out of range",
            ReadFailure::Bus => "bus error",
        };
        f.write_str(s)
    }
}

/// One distance measurement in centimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// A valid, non-negative distance.
    Cm(f32),
    Failed(ReadFailure),
}

impl Reading {
    /// Value reported in place of a distance when a measurement failed.
    pub const FAILURE_SENTINEL_CM: f32 = -1.0;

    /// Wrap a computed distance; negative or non-finite values are not valid readings.
    pub fn from_cm(cm: f32) -> Self {
        if cm.is_finite() && cm >= 0.0 {
            Reading::Cm(cm)
        } else {
            Reading::Failed(ReadFailure::OutOfRange)
        }
    }

    /// The distance, if the measurement succeeded.
    #[inline]
    pub fn cm(&self) -> Option<f32> {
        match *self {
            Reading::Cm(v) => Some(v),
            Reading::Failed(_) => None,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        matches!(self, Reading::Cm(_))
    }

    /// Flat representation: the distance, or `-1.0` on failure.
    #[inline]
    pub fn sentinel_cm(&self) -> f32 {
        self.cm().unwrap_or(Self::FAILURE_SENTINEL_CM)
    }
}

/// A distance sensor. `measure()` never fails: faults become `Reading::Failed`.
pub trait DistanceSensor {
    fn measure(&mut self) -> Reading;

    /// Stable identifier for diagnostics (e.g. "ultrasonic").
    fn sensor_kind(&self) -> &'static str;
}

impl<T: DistanceSensor + ?Sized> DistanceSensor for Box<T> {
    fn measure(&mut self) -> Reading {
        (**self).measure()
    }

    fn sensor_kind(&self) -> &'static str {
        (**self).sensor_kind()
    }
}

/// The physical light line: either driven as a digital level or by PWM duty.
pub trait LightOutput {
    /// Drive the raw line level (true = high). Inversion is the caller's concern.
    fn set_level(&mut self, high: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Set PWM duty in 16-bit units (0..=65535).
    fn set_duty(&mut self, duty: u16) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: LightOutput + ?Sized> LightOutput for Box<T> {
    fn set_level(&mut self, high: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_level(high)
    }

    fn set_duty(&mut self, duty: u16) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_duty(duty)
    }
}

/// Blocks between polls. Whether that is an idle wait or a busy spin is up
/// to the implementation.
pub trait PowerManager {
    fn sleep(&mut self, duration_ms: u64);
}

impl<T: PowerManager + ?Sized> PowerManager for Box<T> {
    fn sleep(&mut self, duration_ms: u64) {
        (**self).sleep(duration_ms);
    }
}
