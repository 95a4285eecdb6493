mod common;

use std::time::Duration;

use common::ScriptedInputs;
use rstest::rstest;
use vent_core::{ButtonConfirmer, ButtonId, ButtonPolarity, ButtonTimer, Confirmation};
use vent_core::{RotaryDecoder, RotaryStep};
use vent_traits::{Clock, InputPin, Level, ManualClock};

const POLL: Duration = Duration::from_millis(10);

/// Hold for `held` with 10 ms polls, then release; returns the final outcome.
fn hold_and_release(hold: Duration, held: Duration) -> Confirmation {
    let clock = ManualClock::new();
    let mut t = ButtonTimer::new();
    let mut elapsed = Duration::ZERO;
    while elapsed < held {
        assert_eq!(t.poll(true, hold, clock.now()), Confirmation::Unknown);
        clock.advance(POLL);
        elapsed += POLL;
    }
    t.poll(false, hold, clock.now())
}

#[rstest]
#[case(400, Confirmation::Rejected)]
#[case(600, Confirmation::Confirmed)]
#[case(2000, Confirmation::Confirmed)]
fn timed_hold_against_500ms(#[case] held_ms: u64, #[case] expected: Confirmation) {
    let got = hold_and_release(Duration::from_millis(500), Duration::from_millis(held_ms));
    assert_eq!(got, expected);
}

#[test]
fn zero_hold_confirms_on_release() {
    let clock = ManualClock::new();
    let mut t = ButtonTimer::new();
    assert_eq!(t.poll(true, Duration::ZERO, clock.now()), Confirmation::Unknown);
    assert_eq!(t.poll(true, Duration::ZERO, clock.now()), Confirmation::Unknown);
    assert_eq!(t.poll(true, Duration::ZERO, clock.now()), Confirmation::Unknown);
    assert_eq!(t.poll(false, Duration::ZERO, clock.now()), Confirmation::Confirmed);
    assert!(t.is_idle());
}

#[test]
fn idle_button_stays_unknown() {
    let clock = ManualClock::new();
    let mut t = ButtonTimer::new();
    for _ in 0..10 {
        assert_eq!(t.poll(false, POLL, clock.now()), Confirmation::Unknown);
    }
    assert!(t.is_idle());
}

#[test]
fn confirmer_respects_polarity() {
    let inputs = ScriptedInputs::default();
    let low = ButtonConfirmer::new(ButtonPolarity::ActiveLow);
    let high = ButtonConfirmer::new(ButtonPolarity::ActiveHigh);
    assert!(!low.is_pressed(&inputs, ButtonId::Cancel));
    assert!(high.is_pressed(&inputs, ButtonId::Cancel));
    inputs.press(InputPin::Cancel);
    assert!(low.is_pressed(&inputs, ButtonId::Cancel));
    assert!(!high.is_pressed(&inputs, ButtonId::Cancel));
}

struct Knob {
    inputs: ScriptedInputs,
    buttons: ButtonConfirmer,
    decoder: RotaryDecoder,
    clock: ManualClock,
    clk: Level,
}

impl Knob {
    fn new() -> Self {
        let mut k = Self {
            inputs: ScriptedInputs::default(),
            buttons: ButtonConfirmer::new(ButtonPolarity::ActiveLow),
            decoder: RotaryDecoder::new(),
            clock: ManualClock::new(),
            clk: Level::High,
        };
        assert_eq!(k.poll(), RotaryStep::NoChange);
        k
    }

    fn poll(&mut self) -> RotaryStep {
        self.clock.advance(POLL);
        self.decoder
            .poll(&self.inputs, &mut self.buttons, self.clock.now())
    }

    fn detent(&mut self, clockwise: bool) -> RotaryStep {
        self.clk = Level::from_bool(!self.clk.is_high());
        self.inputs.turn(self.clk, clockwise);
        self.poll()
    }
}

#[test]
fn clockwise_detents_increment() {
    let mut k = Knob::new();
    for _ in 0..4 {
        assert_eq!(k.detent(true), RotaryStep::Increment);
    }
}

#[test]
fn counter_clockwise_detents_decrement() {
    let mut k = Knob::new();
    for _ in 0..4 {
        assert_eq!(k.detent(false), RotaryStep::Decrement);
    }
}

#[test]
fn steady_clock_reports_nothing() {
    let mut k = Knob::new();
    k.inputs.set(InputPin::RotaryData, Level::Low);
    for _ in 0..5 {
        assert_eq!(k.poll(), RotaryStep::NoChange);
    }
}

#[test]
fn select_locks_then_release_ends_edit() {
    let mut k = Knob::new();
    k.inputs.press(InputPin::Select);
    assert_eq!(k.poll(), RotaryStep::NoChange);
    assert!(k.decoder.is_locked());

    // rotation while held is ignored
    assert_eq!(k.detent(true), RotaryStep::NoChange);
    assert_eq!(k.detent(false), RotaryStep::NoChange);

    k.inputs.release(InputPin::Select);
    assert_eq!(k.poll(), RotaryStep::EditEnded);
    assert!(!k.decoder.is_locked());
}

#[test]
fn decoding_resyncs_after_edit_ended() {
    let mut k = Knob::new();
    k.inputs.press(InputPin::Select);
    k.poll();
    k.poll();
    // clock moves while the switch is down
    k.clk = Level::Low;
    k.inputs.turn(Level::Low, true);
    k.inputs.release(InputPin::Select);
    assert_eq!(k.poll(), RotaryStep::EditEnded);

    // first poll after release only records the clock level
    assert_eq!(k.poll(), RotaryStep::NoChange);
    assert_eq!(k.detent(true), RotaryStep::Increment);
}

#[test]
fn step_deltas() {
    assert_eq!(RotaryStep::Increment.delta(), 1);
    assert_eq!(RotaryStep::Decrement.delta(), -1);
    assert_eq!(RotaryStep::NoChange.delta(), 0);
    assert_eq!(RotaryStep::EditEnded.delta(), 0);
}
