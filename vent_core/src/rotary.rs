//! Quadrature decoding for the rotary encoder, gated by its select switch.
//!
//! Each clock-line edge is one detent. On an edge, a data line that differs
//! from the new clock level means clockwise. While the select switch is held
//! the decoder is locked and reports nothing; the release that completes the
//! select confirmation reports `EditEnded`. Whenever decoding resumes the
//! clock level is re-read first, so turning the knob with the switch held
//! never produces a step.

use std::time::{Duration, Instant};

use vent_traits::{InputPin, InputSource, Level};

use crate::button::{ButtonConfirmer, ButtonId, Confirmation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotaryStep {
    Increment,
    Decrement,
    NoChange,
    EditEnded,
}

impl RotaryStep {
    /// Signed step for value nudging; zero for non-rotation results.
    #[inline]
    pub const fn delta(self) -> i64 {
        match self {
            Self::Increment => 1,
            Self::Decrement => -1,
            Self::NoChange | Self::EditEnded => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RotaryState {
    /// Next poll re-reads the clock line before decoding.
    Resync,
    Decoding { last_clock: Level },
    Locked,
}

#[derive(Debug, Clone)]
pub struct RotaryDecoder {
    state: RotaryState,
}

impl Default for RotaryDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RotaryDecoder {
    pub fn new() -> Self {
        Self {
            state: RotaryState::Resync,
        }
    }

    /// Forget the last clock level; the next poll only resynchronises.
    pub fn reset(&mut self) {
        self.state = RotaryState::Resync;
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.state == RotaryState::Locked
    }

    /// One decode step. Call once per foreground iteration.
    pub fn poll<I: InputSource + ?Sized>(
        &mut self,
        inputs: &I,
        buttons: &mut ButtonConfirmer,
        now: Instant,
    ) -> RotaryStep {
        if buttons.confirm(ButtonId::Select, Duration::ZERO, inputs, now) == Confirmation::Confirmed
        {
            self.state = RotaryState::Resync;
            return RotaryStep::EditEnded;
        }
        if buttons.is_pressed(inputs, ButtonId::Select) {
            self.state = RotaryState::Locked;
            return RotaryStep::NoChange;
        }

        let clock = inputs.level(InputPin::RotaryClock);
        match self.state {
            RotaryState::Resync | RotaryState::Locked => {
                self.state = RotaryState::Decoding { last_clock: clock };
                RotaryStep::NoChange
            }
            RotaryState::Decoding { last_clock } if last_clock == clock => RotaryStep::NoChange,
            RotaryState::Decoding { .. } => {
                self.state = RotaryState::Decoding { last_clock: clock };
                if inputs.level(InputPin::RotaryData) == clock {
                    RotaryStep::Decrement
                } else {
                    RotaryStep::Increment
                }
            }
        }
    }
}
