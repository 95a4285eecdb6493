#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Breath-cycle control logic (hardware-agnostic).
//!
//! All hardware interactions go through the `vent_traits` interfaces: an
//! actuator, a pressure sensor, a phase indicator, a display and the operator
//! inputs.
//!
//! ## Architecture
//!
//! - **Controller**: inhale/exhale phase machine driven once per tick (`controller`)
//! - **Timing**: ticks per inhale and exhale from rate and I:E ratio (`timing`)
//! - **Waveform**: drive lookup tables scaled by tidal volume (`waveform`)
//! - **Parameters**: bounded operator settings and the committed store (`parameters`)
//! - **Editor**: rotary/button settings state machine (`editor`, `rotary`, `button`)
//! - **Hand-off**: commit from the foreground, pickup at inhale start (`handoff`)
//! - **Scheduling**: periodic tick thread with a suspend window (`scheduler`)
//!
//! The tick path never allocates, never blocks on a lock and never waits on
//! the foreground.

pub mod builder;
pub mod button;
pub mod config;
pub mod context;
pub mod controller;
pub mod conversions;
pub mod editor;
pub mod error;
pub mod events;
pub mod fixed_point;
pub mod foreground;
pub mod handoff;
pub mod mocks;
pub mod parameters;
pub mod pressure;
pub mod rotary;
pub mod runner;
pub mod scheduler;
pub mod status;
pub mod telemetry;
pub mod timing;
pub mod util;
pub mod waveform;

pub use builder::{ControllerBuilder, DynController, build_controller};
pub use button::{ButtonConfirmer, ButtonId, ButtonPolarity, ButtonTimer, Confirmation};
pub use config::{ControllerCfg, EditorCfg, ForegroundCfg, SpontaneousCfg};
pub use context::VentContext;
pub use controller::BreathController;
pub use editor::{EditorContext, EditorState, SettingsEditor};
pub use error::{BuildError, Report, Result, VentError};
pub use events::{BreathEvent, EventReceiver, EventSender};
pub use foreground::{Foreground, ForegroundEvent, ForegroundStats};
pub use handoff::Handoff;
pub use parameters::{
    ParameterKind, ParameterSet, ParameterSpec, ParameterStore, ParameterTable, VentilationMode,
};
pub use pressure::{PressureScale, RunningAverage, TriggerSource};
pub use rotary::{RotaryDecoder, RotaryStep};
pub use runner::{RunSummary, run};
pub use scheduler::{ManualGate, PeriodicScheduler, Suspension, TickGate};
pub use status::{EditorProgress, TickReport};
pub use telemetry::{Telemetry, TelemetrySnapshot};
pub use timing::CycleTiming;
pub use waveform::{DriveWaveform, WaveformProfile};
