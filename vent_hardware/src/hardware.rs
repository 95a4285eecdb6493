//! Raspberry Pi drivers over `rppal`.
//!
//! Constructors fail with `HwError`; once built, every trait call is
//! infallible and logs device errors instead of returning them.

use rppal::gpio::{Gpio, InputPin as GpioPin, OutputPin};
use rppal::pwm::{Channel, Polarity, Pwm};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use vent_traits::{
    ActuatorDriver, BreathPhase, InputPin, InputSource, Level, PhaseIndicator, PressureSensor,
};

use crate::error::{HwError, Result};

/// BCM pin numbers of the operator inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputPins {
    pub rotary_clk: u8,
    pub rotary_dt: u8,
    pub select: u8,
    pub confirm: u8,
    pub cancel: u8,
}

/// Operator inputs on GPIO lines with internal pull-ups.
pub struct GpioInputs {
    clk: GpioPin,
    dt: GpioPin,
    select: GpioPin,
    confirm: GpioPin,
    cancel: GpioPin,
}

impl GpioInputs {
    pub fn new(pins: InputPins) -> Result<Self> {
        let gpio = Gpio::new()?;
        let get = |n: u8| -> Result<GpioPin> { Ok(gpio.get(n)?.into_input_pullup()) };
        let inputs = Self {
            clk: get(pins.rotary_clk)?,
            dt: get(pins.rotary_dt)?,
            select: get(pins.select)?,
            confirm: get(pins.confirm)?,
            cancel: get(pins.cancel)?,
        };
        tracing::debug!(?pins, "gpio inputs ready");
        Ok(inputs)
    }
}

impl InputSource for GpioInputs {
    fn level(&self, pin: InputPin) -> Level {
        let p = match pin {
            InputPin::RotaryClock => &self.clk,
            InputPin::RotaryData => &self.dt,
            InputPin::Select => &self.select,
            InputPin::Confirm => &self.confirm,
            InputPin::Cancel => &self.cancel,
        };
        Level::from_bool(p.is_high())
    }
}

/// Inhale and exhale LEDs; exactly one is lit.
pub struct GpioIndicator {
    inhale: OutputPin,
    exhale: OutputPin,
}

impl GpioIndicator {
    pub fn new(inhale_pin: u8, exhale_pin: u8) -> Result<Self> {
        let gpio = Gpio::new()?;
        let mut inhale = gpio.get(inhale_pin)?.into_output();
        let mut exhale = gpio.get(exhale_pin)?.into_output();
        inhale.set_low();
        exhale.set_low();
        Ok(Self { inhale, exhale })
    }
}

impl PhaseIndicator for GpioIndicator {
    fn set_indicator(&mut self, phase: BreathPhase) {
        match phase {
            BreathPhase::Inhale => {
                self.exhale.set_low();
                self.inhale.set_high();
            }
            BreathPhase::Exhale => {
                self.inhale.set_low();
                self.exhale.set_high();
            }
        }
    }
}

/// Hardware PWM channel 0. Duty cycle is `magnitude / full_scale`.
pub struct PwmActuator {
    pwm: Pwm,
    last_duty: f64,
}

impl PwmActuator {
    pub fn new(frequency_hz: f64) -> Result<Self> {
        let pwm = Pwm::with_frequency(Channel::Pwm0, frequency_hz, 0.0, Polarity::Normal, true)?;
        tracing::debug!(frequency_hz, "pwm actuator ready");
        Ok(Self {
            pwm,
            last_duty: 0.0,
        })
    }
}

impl ActuatorDriver for PwmActuator {
    fn set_output(&mut self, magnitude: u32, full_scale: u32) {
        let duty = if full_scale == 0 {
            0.0
        } else {
            (f64::from(magnitude) / f64::from(full_scale)).clamp(0.0, 1.0)
        };
        if (duty - self.last_duty).abs() < f64::EPSILON {
            return;
        }
        match self.pwm.set_duty_cycle(duty) {
            Ok(()) => self.last_duty = duty,
            Err(e) => tracing::warn!(error = %e, duty, "pwm duty update failed"),
        }
    }
}

impl Drop for PwmActuator {
    fn drop(&mut self) {
        if let Err(e) = self.pwm.set_duty_cycle(0.0) {
            tracing::warn!(error = %e, "pwm park on drop failed");
        }
    }
}

/// MCP3008 10-bit ADC on SPI0/CE0, single-ended.
pub struct Mcp3008Pressure {
    spi: Spi,
    channel: u8,
    last: u32,
}

impl Mcp3008Pressure {
    const CLOCK_HZ: u32 = 1_350_000;

    pub fn new(channel: u8) -> Result<Self> {
        if channel > 7 {
            return Err(HwError::AdcChannel(channel));
        }
        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, Self::CLOCK_HZ, Mode::Mode0)?;
        Ok(Self {
            spi,
            channel,
            last: 0,
        })
    }

    fn sample(&mut self) -> Result<u32> {
        let write = [0x01, (0x08 | self.channel) << 4, 0x00];
        let mut read = [0u8; 3];
        self.spi.transfer(&mut read, &write)?;
        Ok(decode_mcp3008(read))
    }
}

impl PressureSensor for Mcp3008Pressure {
    fn read_instantaneous(&mut self) -> u32 {
        match self.sample() {
            Ok(v) => {
                self.last = v;
                v
            }
            Err(e) => {
                // keep the control loop going on the previous reading
                tracing::warn!(error = %e, "adc read failed");
                self.last
            }
        }
    }
}

/// 10-bit result from the last two bytes of an MCP3008 transfer.
#[inline]
pub fn decode_mcp3008(read: [u8; 3]) -> u32 {
    (u32::from(read[1] & 0x03) << 8) | u32::from(read[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mcp3008_decodes_ten_bits() {
        assert_eq!(decode_mcp3008([0xFF, 0x03, 0xFF]), 1023);
        assert_eq!(decode_mcp3008([0x00, 0xFC, 0x10]), 16);
        assert_eq!(decode_mcp3008([0x00, 0x01, 0x00]), 256);
    }
}
