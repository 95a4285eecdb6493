//! Polled button confirmation with optional minimum hold.
//!
//! `Idle -> PressDetected -> (WaitForRelease | WaitForTimedRelease) -> Idle`.
//! A zero hold confirms any press-and-release; a non-zero hold confirms only
//! presses that lasted at least that long and rejects shorter ones.

use std::time::{Duration, Instant};

use vent_traits::{InputPin, InputSource, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonId {
    Select,
    Confirm,
    Cancel,
}

impl ButtonId {
    pub const fn pin(self) -> InputPin {
        match self {
            Self::Select => InputPin::Select,
            Self::Confirm => InputPin::Confirm,
            Self::Cancel => InputPin::Cancel,
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Select => 0,
            Self::Confirm => 1,
            Self::Cancel => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Gesture not finished (or not started).
    Unknown,
    Confirmed,
    /// Released before the required hold elapsed.
    Rejected,
}

/// Which raw level means "pressed". Pull-up wiring reads low when pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonPolarity {
    #[default]
    ActiveLow,
    ActiveHigh,
}

impl ButtonPolarity {
    #[inline]
    pub fn is_pressed(self, level: Level) -> bool {
        match self {
            Self::ActiveLow => level == Level::Low,
            Self::ActiveHigh => level == Level::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum TimerState {
    #[default]
    Idle,
    PressDetected {
        hold: Duration,
    },
    WaitForRelease,
    WaitForTimedRelease {
        start: Instant,
        hold: Duration,
    },
}

/// Confirmation state machine for a single button.
#[derive(Debug, Clone, Copy, Default)]
pub struct ButtonTimer {
    state: TimerState,
}

impl ButtonTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one step given the current pressed state.
    pub fn poll(&mut self, pressed: bool, required_hold: Duration, now: Instant) -> Confirmation {
        match self.state {
            TimerState::Idle => {
                if pressed {
                    self.state = TimerState::PressDetected {
                        hold: required_hold,
                    };
                }
                Confirmation::Unknown
            }
            TimerState::PressDetected { hold } => {
                self.state = if hold.is_zero() {
                    TimerState::WaitForRelease
                } else {
                    TimerState::WaitForTimedRelease { start: now, hold }
                };
                Confirmation::Unknown
            }
            TimerState::WaitForRelease => {
                if pressed {
                    return Confirmation::Unknown;
                }
                self.state = TimerState::Idle;
                Confirmation::Confirmed
            }
            TimerState::WaitForTimedRelease { start, hold } => {
                if pressed {
                    return Confirmation::Unknown;
                }
                self.state = TimerState::Idle;
                if now.saturating_duration_since(start) >= hold {
                    Confirmation::Confirmed
                } else {
                    Confirmation::Rejected
                }
            }
        }
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.state == TimerState::Idle
    }

    pub fn reset(&mut self) {
        self.state = TimerState::Idle;
    }
}

/// One timer per button, reading raw levels through an `InputSource`.
#[derive(Debug, Clone, Default)]
pub struct ButtonConfirmer {
    timers: [ButtonTimer; 3],
    polarity: ButtonPolarity,
}

impl ButtonConfirmer {
    pub fn new(polarity: ButtonPolarity) -> Self {
        Self {
            timers: [ButtonTimer::new(); 3],
            polarity,
        }
    }

    /// Raw pressed state, without touching the timer.
    #[inline]
    pub fn is_pressed<I: InputSource + ?Sized>(&self, inputs: &I, id: ButtonId) -> bool {
        self.polarity.is_pressed(inputs.level(id.pin()))
    }

    /// Poll the confirmation state machine for `id`. Never blocks.
    pub fn confirm<I: InputSource + ?Sized>(
        &mut self,
        id: ButtonId,
        required_hold: Duration,
        inputs: &I,
        now: Instant,
    ) -> Confirmation {
        let pressed = self.is_pressed(inputs, id);
        self.timers[id.index()].poll(pressed, required_hold, now)
    }

    pub fn reset(&mut self, id: ButtonId) {
        self.timers[id.index()].reset();
    }
}
