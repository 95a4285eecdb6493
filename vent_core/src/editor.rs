//! Settings editor: walk every parameter, nudge a staged copy with the
//! rotary encoder, then hand the whole set to the controller.
//!
//! `Init -> [SelectMode] -> StageValue -> ProcessValue -> ... -> AcceptAll
//! -> WaitForPickup -> Init`. `step` advances at most one state per call and
//! never blocks. Cancel during editing returns to `Init` without committing.

use std::time::{Duration, Instant};

use vent_traits::{DisplayDriver, InputSource};

use crate::button::{ButtonConfirmer, ButtonId, Confirmation};
use crate::config::EditorCfg;
use crate::handoff::Handoff;
use crate::parameters::{ParameterKind, ParameterSet};
use crate::rotary::{RotaryDecoder, RotaryStep};
use crate::scheduler::TickGate;
use crate::status::EditorProgress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Init,
    SelectMode,
    StageValue,
    ProcessValue,
    AcceptAll,
    WaitForPickup,
}

/// Everything one editor step touches, borrowed from the foreground loop.
pub struct EditorContext<'a> {
    pub inputs: &'a dyn InputSource,
    pub buttons: &'a mut ButtonConfirmer,
    pub display: &'a mut dyn DisplayDriver,
    pub handoff: &'a Handoff,
    pub gate: &'a dyn TickGate,
    pub now: Instant,
}

#[derive(Debug, Clone)]
pub struct SettingsEditor {
    state: EditorState,
    index: usize,
    staged: ParameterSet,
    decoder: RotaryDecoder,
    edit_mode: bool,
}

impl SettingsEditor {
    pub fn new(cfg: &EditorCfg) -> Self {
        Self {
            state: EditorState::Init,
            index: 0,
            staged: ParameterSet::default(),
            decoder: RotaryDecoder::new(),
            edit_mode: cfg.edit_mode,
        }
    }

    #[inline]
    pub fn state(&self) -> EditorState {
        self.state
    }

    #[inline]
    pub fn staged(&self) -> &ParameterSet {
        &self.staged
    }

    /// Parameter currently being edited, if any.
    pub fn current_kind(&self) -> Option<ParameterKind> {
        match self.state {
            EditorState::StageValue | EditorState::ProcessValue => {
                ParameterKind::ALL.get(self.index).copied()
            }
            _ => None,
        }
    }

    /// Drop any edit in progress. Nothing is committed.
    pub fn abort(&mut self) {
        self.state = EditorState::Init;
        self.index = 0;
        self.decoder.reset();
    }

    pub fn step(&mut self, cx: &mut EditorContext<'_>) -> EditorProgress {
        match self.state {
            EditorState::Init => {
                self.index = 0;
                self.staged = cx.handoff.committed();
                self.decoder.reset();
                if self.edit_mode {
                    show_mode(cx.display, &self.staged);
                    self.state = EditorState::SelectMode;
                } else {
                    self.state = EditorState::StageValue;
                }
                EditorProgress::Editing
            }
            EditorState::SelectMode => {
                if self.cancelled(cx) {
                    return EditorProgress::Cancelled;
                }
                match self.decoder.poll(cx.inputs, cx.buttons, cx.now) {
                    RotaryStep::Increment | RotaryStep::Decrement => {
                        self.staged.mode = self.staged.mode.toggled();
                        show_mode(cx.display, &self.staged);
                    }
                    RotaryStep::EditEnded => self.state = EditorState::StageValue,
                    RotaryStep::NoChange => {}
                }
                EditorProgress::Editing
            }
            EditorState::StageValue => {
                let kind = ParameterKind::ALL[self.index];
                self.staged.set(kind, cx.handoff.committed().get(kind));
                cx.display.clear();
                cx.display.show_label(kind.label());
                cx.display.show_value(self.staged.get(kind), kind.unit());
                self.state = EditorState::ProcessValue;
                EditorProgress::Editing
            }
            EditorState::ProcessValue => {
                if self.cancelled(cx) {
                    return EditorProgress::Cancelled;
                }
                let kind = ParameterKind::ALL[self.index];
                match self.decoder.poll(cx.inputs, cx.buttons, cx.now) {
                    RotaryStep::NoChange => {}
                    step @ (RotaryStep::Increment | RotaryStep::Decrement) => {
                        let spec = cx.handoff.spec(kind);
                        let candidate =
                            i64::from(self.staged.get(kind)) + i64::from(spec.step) * step.delta();
                        let v = spec.clamp(candidate);
                        self.staged.set(kind, v);
                        cx.display.show_value(v, kind.unit());
                    }
                    RotaryStep::EditEnded => {
                        tracing::debug!(
                            parameter = kind.name(),
                            value = self.staged.get(kind),
                            "parameter staged"
                        );
                        self.index += 1;
                        self.state = if self.index >= ParameterKind::COUNT {
                            EditorState::AcceptAll
                        } else {
                            EditorState::StageValue
                        };
                    }
                }
                EditorProgress::Editing
            }
            EditorState::AcceptAll => {
                cx.handoff.publish(&self.staged, cx.gate);
                cx.display.clear();
                cx.display.show_label("Adjusting...");
                self.state = EditorState::WaitForPickup;
                EditorProgress::Editing
            }
            EditorState::WaitForPickup => {
                if cx.handoff.is_pending() {
                    return EditorProgress::Editing;
                }
                cx.display.clear();
                self.state = EditorState::Init;
                EditorProgress::Committed
            }
        }
    }

    fn cancelled(&mut self, cx: &mut EditorContext<'_>) -> bool {
        let c = cx
            .buttons
            .confirm(ButtonId::Cancel, Duration::ZERO, cx.inputs, cx.now);
        if c != Confirmation::Confirmed {
            return false;
        }
        tracing::info!("settings edit cancelled");
        self.abort();
        cx.display.clear();
        true
    }
}

fn show_mode(display: &mut dyn DisplayDriver, staged: &ParameterSet) {
    display.clear();
    display.show_label("Mode");
    display.show_label(staged.mode.label());
}
