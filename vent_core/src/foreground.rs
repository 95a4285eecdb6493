//! The cooperative foreground loop.
//!
//! Idle: watch Confirm for the entry hold, refresh the pressure display, and
//! log controller events. Editing: run one settings-editor step per iteration.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use vent_traits::{Clock, DisplayDriver, InputSource};

use crate::button::{ButtonConfirmer, ButtonId, ButtonPolarity, Confirmation};
use crate::config::{EditorCfg, ForegroundCfg};
use crate::context::VentContext;
use crate::editor::{EditorContext, SettingsEditor};
use crate::events::{EventReceiver, log_event};
use crate::scheduler::TickGate;
use crate::status::EditorProgress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForegroundEvent {
    Idle,
    /// Confirm was held long enough; the editor is open.
    EditStarted,
    /// Confirm was released before the entry hold.
    EntryRejected,
    Editing,
    Committed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForegroundStats {
    pub iterations: u64,
    pub commits: u64,
    pub cancels: u64,
    pub rejected_entries: u64,
}

pub struct Foreground<In, D, C> {
    inputs: In,
    display: D,
    clock: C,
    buttons: ButtonConfirmer,
    editor: SettingsEditor,
    editing: bool,
    entry_hold: Duration,
    ctx: Arc<VentContext>,
    events: Option<EventReceiver>,
    cfg: ForegroundCfg,
    stats: ForegroundStats,
}

impl<In, D, C> Foreground<In, D, C>
where
    In: InputSource,
    D: DisplayDriver,
    C: Clock,
{
    pub fn new(
        inputs: In,
        display: D,
        clock: C,
        ctx: Arc<VentContext>,
        polarity: ButtonPolarity,
        editor: &EditorCfg,
        cfg: ForegroundCfg,
    ) -> Self {
        Self {
            inputs,
            display,
            clock,
            buttons: ButtonConfirmer::new(polarity),
            editor: SettingsEditor::new(editor),
            editing: false,
            entry_hold: editor.entry_hold,
            ctx,
            events: None,
            cfg,
            stats: ForegroundStats::default(),
        }
    }

    /// Drain and log controller events each iteration.
    #[must_use]
    pub fn with_events(mut self, rx: EventReceiver) -> Self {
        self.events = Some(rx);
        self
    }

    /// One foreground iteration. Never blocks.
    pub fn poll_once(&mut self, gate: &dyn TickGate) -> ForegroundEvent {
        self.stats.iterations += 1;
        self.drain_events();
        let now = self.clock.now();

        if self.editing {
            let mut cx = EditorContext {
                inputs: &self.inputs,
                buttons: &mut self.buttons,
                display: &mut self.display,
                handoff: &self.ctx.handoff,
                gate,
                now,
            };
            return match self.editor.step(&mut cx) {
                EditorProgress::Editing => ForegroundEvent::Editing,
                EditorProgress::Committed => {
                    self.editing = false;
                    self.stats.commits += 1;
                    tracing::info!("settings committed");
                    ForegroundEvent::Committed
                }
                EditorProgress::Cancelled => {
                    self.editing = false;
                    self.stats.cancels += 1;
                    ForegroundEvent::Cancelled
                }
            };
        }

        match self
            .buttons
            .confirm(ButtonId::Confirm, self.entry_hold, &self.inputs, now)
        {
            Confirmation::Confirmed => {
                self.editing = true;
                self.buttons.reset(ButtonId::Select);
                self.buttons.reset(ButtonId::Cancel);
                tracing::info!("entering settings editor");
                ForegroundEvent::EditStarted
            }
            Confirmation::Rejected => {
                self.stats.rejected_entries += 1;
                tracing::debug!("confirm released before entry hold");
                ForegroundEvent::EntryRejected
            }
            Confirmation::Unknown => {
                if self.stats.iterations % u64::from(self.cfg.display_refresh.max(1)) == 0 {
                    self.refresh_display();
                }
                ForegroundEvent::Idle
            }
        }
    }

    /// Poll until `shutdown` is raised, pacing with the configured interval.
    pub fn run_until(&mut self, gate: &dyn TickGate, shutdown: &AtomicBool) -> ForegroundStats {
        while !shutdown.load(Ordering::Acquire) {
            self.poll_once(gate);
            self.clock.sleep(self.cfg.poll_interval);
        }
        if self.editing {
            tracing::warn!("shutdown during settings edit; staged values discarded");
            self.editor.abort();
            self.editing = false;
        }
        self.drain_events();
        self.stats
    }

    fn drain_events(&mut self) {
        if let Some(rx) = &self.events {
            for ev in rx.try_iter() {
                log_event(&ev);
            }
        }
    }

    fn refresh_display(&mut self) {
        let t = self.ctx.telemetry.snapshot();
        let cm_h2o = self.cfg.pressure.display_cm_h2o(t.pressure_avg);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let shown = cm_h2o.round() as u32;
        self.display.clear();
        self.display.show_label(t.mode.label());
        self.display.show_value(shown, "cmH2O");
    }

    #[inline]
    pub fn is_editing(&self) -> bool {
        self.editing
    }

    #[inline]
    pub fn editor(&self) -> &SettingsEditor {
        &self.editor
    }

    #[inline]
    pub fn stats(&self) -> ForegroundStats {
        self.stats
    }

    #[inline]
    pub fn display(&self) -> &D {
        &self.display
    }

    #[inline]
    pub fn inputs(&self) -> &In {
        &self.inputs
    }
}
