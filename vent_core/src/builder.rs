//! Type-state builder for `BreathController` and the generic `build_controller`.
//!
//! The builder requires the actuator and the pressure sensor before `build()`
//! is available. `try_build()` is always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use vent_traits::{ActuatorDriver, PhaseIndicator, PressureSensor};

use crate::config::ControllerCfg;
use crate::context::VentContext;
use crate::controller::BreathController;
use crate::error::{BuildError, Result};
use crate::events::EventSender;
use crate::mocks::NoopIndicator;
use crate::parameters::ParameterKind;
use crate::timing;
use crate::util::ticks_per_minute;
use crate::waveform::{DriveWaveform, WaveformProfile};

pub type BoxedActuator = Box<dyn ActuatorDriver + Send>;
pub type BoxedPressure = Box<dyn PressureSensor + Send>;
pub type BoxedIndicator = Box<dyn PhaseIndicator + Send>;

/// Controller over boxed collaborators, as produced by the builder.
pub type DynController = BreathController<BoxedActuator, BoxedPressure, BoxedIndicator>;

impl DynController {
    pub fn builder() -> ControllerBuilder<Missing, Missing> {
        ControllerBuilder::default()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

pub struct ControllerBuilder<A, P> {
    actuator: Option<BoxedActuator>,
    pressure: Option<BoxedPressure>,
    indicator: Option<BoxedIndicator>,
    waveform: Option<DriveWaveform>,
    context: Option<Arc<VentContext>>,
    config: Option<ControllerCfg>,
    events: Option<EventSender>,
    _a: PhantomData<A>,
    _p: PhantomData<P>,
}

impl Default for ControllerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            actuator: None,
            pressure: None,
            indicator: None,
            waveform: None,
            context: None,
            config: None,
            events: None,
            _a: PhantomData,
            _p: PhantomData,
        }
    }
}

/// Validate configuration and construct the controller.
///
/// Shared by `ControllerBuilder::try_build()` and `build_controller()`.
fn validate_and_build<A, P, I>(
    actuator: A,
    pressure: P,
    indicator: I,
    waveform: DriveWaveform,
    ctx: Arc<VentContext>,
    cfg: ControllerCfg,
    events: Option<EventSender>,
) -> Result<BreathController<A, P, I>>
where
    A: ActuatorDriver,
    P: PressureSensor,
    I: PhaseIndicator,
{
    if cfg.tick_period.is_zero() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "tick period must be > 0",
        )));
    }
    let sp = &cfg.spontaneous;
    if !sp.threshold_cm_h2o.is_finite() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "trigger threshold must be finite",
        )));
    }
    if sp.smoothing_window == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "smoothing window must be >= 1",
        )));
    }
    if !cfg.pressure.multiplier.is_finite() || !cfg.pressure.constant.is_finite() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "pressure scale must be finite",
        )));
    }
    if waveform.full_scale() == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "waveform full scale must be > 0",
        )));
    }

    let table = ctx.handoff.table();
    table.validate()?;
    if table.get(ParameterKind::TidalVolume).max == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "tidal volume max must be > 0",
        )));
    }
    timing::check_range(&table, ticks_per_minute(cfg.tick_period))?;

    let ctrl = BreathController::new(actuator, pressure, indicator, waveform, ctx, cfg, events);
    tracing::debug!(
        ticks_per_inhale = ctrl.timing().ticks_per_inhale,
        ticks_per_exhale = ctrl.timing().ticks_per_exhale,
        mode = ctrl.working_set().mode.label(),
        "controller built"
    );
    Ok(ctrl)
}

impl<A, P> ControllerBuilder<A, P> {
    /// Fallible build available in any type-state; reports missing pieces.
    pub fn try_build(self) -> Result<DynController> {
        let actuator = self
            .actuator
            .ok_or_else(|| eyre::Report::new(BuildError::MissingActuator))?;
        let pressure = self
            .pressure
            .ok_or_else(|| eyre::Report::new(BuildError::MissingPressureSensor))?;
        let indicator = self
            .indicator
            .unwrap_or_else(|| Box::new(NoopIndicator) as BoxedIndicator);

        validate_and_build(
            actuator,
            pressure,
            indicator,
            self.waveform
                .unwrap_or_else(|| DriveWaveform::builtin(WaveformProfile::Pwm)),
            self.context.unwrap_or_default(),
            self.config.unwrap_or_default(),
            self.events,
        )
    }

    pub fn with_indicator(mut self, indicator: impl PhaseIndicator + Send + 'static) -> Self {
        self.indicator = Some(Box::new(indicator));
        self
    }

    pub fn with_waveform(mut self, waveform: DriveWaveform) -> Self {
        self.waveform = Some(waveform);
        self
    }

    /// Shared state; defaults to a fresh context with the default parameter table.
    pub fn with_context(mut self, ctx: Arc<VentContext>) -> Self {
        self.context = Some(ctx);
        self
    }

    pub fn with_config(mut self, cfg: ControllerCfg) -> Self {
        self.config = Some(cfg);
        self
    }

    pub fn with_events(mut self, tx: EventSender) -> Self {
        self.events = Some(tx);
        self
    }
}

// Setters that advance type-state
impl<P> ControllerBuilder<Missing, P> {
    pub fn with_actuator(
        self,
        actuator: impl ActuatorDriver + Send + 'static,
    ) -> ControllerBuilder<Set, P> {
        ControllerBuilder {
            actuator: Some(Box::new(actuator)),
            pressure: self.pressure,
            indicator: self.indicator,
            waveform: self.waveform,
            context: self.context,
            config: self.config,
            events: self.events,
            _a: PhantomData,
            _p: PhantomData,
        }
    }
}

impl<A> ControllerBuilder<A, Missing> {
    pub fn with_pressure_sensor(
        self,
        sensor: impl PressureSensor + Send + 'static,
    ) -> ControllerBuilder<A, Set> {
        ControllerBuilder {
            actuator: self.actuator,
            pressure: Some(Box::new(sensor)),
            indicator: self.indicator,
            waveform: self.waveform,
            context: self.context,
            config: self.config,
            events: self.events,
            _a: PhantomData,
            _p: PhantomData,
        }
    }
}

impl ControllerBuilder<Set, Set> {
    /// Validate and build. Only available once the actuator and sensor are set.
    pub fn build(self) -> Result<DynController> {
        self.try_build()
    }
}

/// Build a statically-dispatched controller from concrete collaborators.
///
/// Delegates to the shared `validate_and_build`.
pub fn build_controller<A, P, I>(
    actuator: A,
    pressure: P,
    indicator: I,
    waveform: DriveWaveform,
    ctx: Arc<VentContext>,
    cfg: ControllerCfg,
    events: Option<EventSender>,
) -> Result<BreathController<A, P, I>>
where
    A: ActuatorDriver,
    P: PressureSensor,
    I: PhaseIndicator,
{
    validate_and_build(actuator, pressure, indicator, waveform, ctx, cfg, events)
}
