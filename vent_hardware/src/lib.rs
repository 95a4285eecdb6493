#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Collaborators behind the `vent_traits` interfaces.
//!
//! `sim` is always built and drives the controller without hardware. The
//! Raspberry Pi drivers in `hardware` need the `hardware` feature; the
//! real-time thread helpers in `rt` need the `rt` feature.

pub mod error;
pub mod sim;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod hardware;

#[cfg(all(feature = "rt", target_os = "linux"))]
pub mod rt;

pub use error::HwError;
pub use sim::{LogDisplay, SimActuator, SimIndicator, SimInputs, SimOperator, SimPressure};
