//! Capability interfaces between the breath-cycle core and the outside world.
//!
//! Every method here is infallible from the caller's point of view. A device
//! that fails is expected to log and carry on; the control loop has no error
//! path to take.

pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Half of a breath cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreathPhase {
    Inhale,
    Exhale,
}

impl BreathPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inhale => "inhale",
            Self::Exhale => "exhale",
        }
    }
}

/// Digital line level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    High,
    Low,
}

impl Level {
    pub const fn from_bool(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }

    pub const fn is_high(self) -> bool {
        matches!(self, Self::High)
    }
}

/// Logical input lines read by the foreground loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputPin {
    RotaryClock,
    RotaryData,
    /// Push switch on the rotary encoder.
    Select,
    Confirm,
    Cancel,
}

/// Drives the breathing actuator. `magnitude` is in `[0, full_scale]`.
pub trait ActuatorDriver {
    fn set_output(&mut self, magnitude: u32, full_scale: u32);
}

pub trait PhaseIndicator {
    fn set_indicator(&mut self, phase: BreathPhase);
}

/// Raw pressure reading. Conversion to physical units belongs to the caller.
pub trait PressureSensor {
    fn read_instantaneous(&mut self) -> u32;
}

pub trait DisplayDriver {
    fn show_label(&mut self, text: &str);
    fn show_value(&mut self, value: u32, unit: &str);
    fn clear(&mut self);
}

pub trait InputSource {
    fn level(&self, pin: InputPin) -> Level;
}

impl<T: ActuatorDriver + ?Sized> ActuatorDriver for Box<T> {
    fn set_output(&mut self, magnitude: u32, full_scale: u32) {
        (**self).set_output(magnitude, full_scale);
    }
}

impl<T: PhaseIndicator + ?Sized> PhaseIndicator for Box<T> {
    fn set_indicator(&mut self, phase: BreathPhase) {
        (**self).set_indicator(phase);
    }
}

impl<T: PressureSensor + ?Sized> PressureSensor for Box<T> {
    fn read_instantaneous(&mut self) -> u32 {
        (**self).read_instantaneous()
    }
}

impl<T: DisplayDriver + ?Sized> DisplayDriver for Box<T> {
    fn show_label(&mut self, text: &str) {
        (**self).show_label(text);
    }

    fn show_value(&mut self, value: u32, unit: &str) {
        (**self).show_value(value, unit);
    }

    fn clear(&mut self) {
        (**self).clear();
    }
}

impl<T: InputSource + ?Sized> InputSource for Box<T> {
    fn level(&self, pin: InputPin) -> Level {
        (**self).level(pin)
    }
}

impl<T: InputSource + ?Sized> InputSource for &T {
    fn level(&self, pin: InputPin) -> Level {
        (**self).level(pin)
    }
}
