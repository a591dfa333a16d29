use std::time::Duration;

use mirror_traits::LightOutput;
use rppal::gpio::{Gpio, InputPin, OutputPin};
use rppal::i2c::I2c;
use tracing::trace;

use crate::echo::EchoPort;
use crate::error::{HwError, Result};
use crate::tof::RegisterBus;
use crate::util::{measure_high_pulse, spin_delay_us};

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

fn i2c_err(e: rppal::i2c::Error) -> HwError {
    HwError::I2c(e.to_string())
}

/// Trigger output + echo input on Raspberry Pi GPIO.
pub struct RpiEchoPort {
    trigger: OutputPin,
    echo: InputPin,
}

impl RpiEchoPort {
    pub fn open(trigger_pin: u8, echo_pin: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let trigger = gpio.get(trigger_pin).map_err(gpio_err)?.into_output_low();
        let echo = gpio.get(echo_pin).map_err(gpio_err)?.into_input();
        Ok(Self { trigger, echo })
    }
}

impl EchoPort for RpiEchoPort {
    fn set_trigger(&mut self, high: bool) -> Result<()> {
        if high {
            self.trigger.set_high();
        } else {
            self.trigger.set_low();
        }
        Ok(())
    }

    fn delay_us(&mut self, us: u32) {
        spin_delay_us(us);
    }

    fn pulse_width_us(&mut self, timeout_us: u32) -> Result<Option<u32>> {
        let echo = &self.echo;
        let width = measure_high_pulse(|| echo.is_high(), Duration::from_micros(u64::from(timeout_us)))?;
        let us = width.map(|d| d.as_micros().min(u128::from(u32::MAX)) as u32);
        trace!(pulse_us = ?us, "echo pulse");
        Ok(us)
    }
}

/// VL53L0X on a Linux I2C bus (`/dev/i2c-N`).
pub struct RpiI2cBus {
    i2c: I2c,
}

impl RpiI2cBus {
    pub fn open(bus: u8, address: u16) -> Result<Self> {
        let mut i2c = I2c::with_bus(bus).map_err(i2c_err)?;
        i2c.set_slave_address(address).map_err(i2c_err)?;
        Ok(Self { i2c })
    }
}

impl RegisterBus for RpiI2cBus {
    fn write_reg(&mut self, reg: u8, value: u8) -> Result<()> {
        self.i2c.smbus_write_byte(reg, value).map_err(i2c_err)
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8> {
        self.i2c.smbus_read_byte(reg).map_err(i2c_err)
    }

    fn read_regs(&mut self, reg: u8, buf: &mut [u8]) -> Result<()> {
        self.i2c.write_read(&[reg], buf).map_err(i2c_err)
    }
}

/// Light line on a GPIO pin; duty is produced by rppal's software PWM.
pub struct RpiLight {
    pin: OutputPin,
    pwm_freq_hz: f64,
    pwm_active: bool,
}

impl RpiLight {
    pub fn open(pin: u8, pwm_freq_hz: u32) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let pin = gpio.get(pin).map_err(gpio_err)?.into_output_low();
        Ok(Self {
            pin,
            pwm_freq_hz: f64::from(pwm_freq_hz.max(1)),
            pwm_active: false,
        })
    }
}

impl LightOutput for RpiLight {
    fn set_level(&mut self, high: bool) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.pwm_active {
            self.pin.clear_pwm().map_err(|e| HwError::Pwm(e.to_string()))?;
            self.pwm_active = false;
        }
        if high {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        Ok(())
    }

    fn set_duty(&mut self, duty: u16) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let fraction = f64::from(duty) / f64::from(u16::MAX);
        self.pin
            .set_pwm_frequency(self.pwm_freq_hz, fraction)
            .map_err(|e| HwError::Pwm(e.to_string()))?;
        self.pwm_active = true;
        Ok(())
    }
}
