#![allow(dead_code)]

use std::cell::Cell;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use vent_traits::{ActuatorDriver, DisplayDriver, InputPin, InputSource, Level, PressureSensor};

/// Input lines the test flips by hand. Everything starts high, which with
/// active-low buttons means nothing is pressed.
#[derive(Debug)]
pub struct ScriptedInputs {
    levels: [Cell<Level>; 5],
}

impl Default for ScriptedInputs {
    fn default() -> Self {
        Self {
            levels: std::array::from_fn(|_| Cell::new(Level::High)),
        }
    }
}

fn slot(pin: InputPin) -> usize {
    match pin {
        InputPin::RotaryClock => 0,
        InputPin::RotaryData => 1,
        InputPin::Select => 2,
        InputPin::Confirm => 3,
        InputPin::Cancel => 4,
    }
}

impl ScriptedInputs {
    pub fn set(&self, pin: InputPin, level: Level) {
        self.levels[slot(pin)].set(level);
    }

    pub fn press(&self, pin: InputPin) {
        self.set(pin, Level::Low);
    }

    pub fn release(&self, pin: InputPin) {
        self.set(pin, Level::High);
    }

    /// Move the clock line to `clock` with the data line in quadrature for
    /// the requested direction.
    pub fn turn(&self, clock: Level, clockwise: bool) {
        let data = if clockwise {
            Level::from_bool(!clock.is_high())
        } else {
            clock
        };
        self.set(InputPin::RotaryData, data);
        self.set(InputPin::RotaryClock, clock);
    }
}

impl InputSource for ScriptedInputs {
    fn level(&self, pin: InputPin) -> Level {
        self.levels[slot(pin)].get()
    }
}

#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub labels: Vec<String>,
    pub values: Vec<(u32, String)>,
    pub clears: u32,
}

impl DisplayDriver for RecordingDisplay {
    fn show_label(&mut self, text: &str) {
        self.labels.push(text.to_owned());
    }

    fn show_value(&mut self, value: u32, unit: &str) {
        self.values.push((value, unit.to_owned()));
    }

    fn clear(&mut self) {
        self.clears += 1;
    }
}

/// Actuator that remembers every output it was given.
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator {
    pub outputs: Arc<std::sync::Mutex<Vec<u32>>>,
}

impl ActuatorDriver for RecordingActuator {
    fn set_output(&mut self, magnitude: u32, _full_scale: u32) {
        self.outputs.lock().unwrap().push(magnitude);
    }
}

/// Pressure sensor whose reading the test can change between ticks.
#[derive(Debug, Clone)]
pub struct SharedPressure(pub Arc<AtomicU32>);

impl SharedPressure {
    pub fn new(raw: u32) -> Self {
        Self(Arc::new(AtomicU32::new(raw)))
    }

    pub fn set(&self, raw: u32) {
        self.0.store(raw, Ordering::Relaxed);
    }
}

impl PressureSensor for SharedPressure {
    fn read_instantaneous(&mut self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Raw reading well above any trigger threshold (~127 cmH2O).
pub const HIGH_PRESSURE: u32 = 1000;
/// Raw reading below the default 5 cmH2O threshold (~1 cmH2O).
pub const LOW_PRESSURE: u32 = 50;
